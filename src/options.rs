//! Client configuration
//!
//! Collaborators and switches for a [`Client`](crate::client::Client),
//! assembled builder-style. Defaults: in-process cache, no transport,
//! empty document store, no plugins.

use std::collections::HashMap;

use crate::cache::{MemCache, ObjectCache};
use crate::plugin::{Plugin, PluginContainer};
use crate::sudsobject::Value;
use crate::transport::{NoTransport, Transport};

pub struct Options {
    pub cache: Box<dyn ObjectCache>,
    pub transport: Box<dyn Transport>,
    /// Documents served by name without touching the transport
    pub document_store: HashMap<String, Vec<u8>>,
    pub plugins: PluginContainer,
    /// Whether loads consult and populate the cache
    pub caching: bool,
    /// Service selection for multi-service WSDLs; first service when unset
    pub service: Option<String>,
    /// Port selection; first port when unset
    pub port: Option<String>,
    /// Extra elements marshalled into the SOAP Header of every request
    pub soap_headers: Vec<(String, Value)>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache: Box::new(MemCache::new()),
            transport: Box::new(NoTransport),
            document_store: HashMap::new(),
            plugins: PluginContainer::new(),
            caching: true,
            service: None,
            port: None,
            soap_headers: Vec::new(),
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(mut self, cache: Box<dyn ObjectCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Serve a document from memory for a given URL
    pub fn with_document(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.document_store.insert(url.into(), bytes);
        self
    }

    pub fn with_plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.add(plugin);
        self
    }

    pub fn with_caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// Add an element to the SOAP Header of every request
    pub fn with_soap_header(mut self, name: impl Into<String>, value: Value) -> Self {
        self.soap_headers.push((name.into(), value));
        self
    }
}
