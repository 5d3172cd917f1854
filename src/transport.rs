//! Transport collaborator
//!
//! The single seam between the client and the network. Implementations
//! own timeouts and connection policy; errors propagate unchanged and are
//! never retried here.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// An outgoing HTTP request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    pub headers: IndexMap<String, String>,
    pub message: Vec<u8>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_message(mut self, message: Vec<u8>) -> Self {
        self.message = message;
        self
    }
}

/// A transport reply.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub code: u16,
    pub headers: IndexMap<String, String>,
    pub message: Vec<u8>,
}

impl Reply {
    pub fn new(code: u16, message: Vec<u8>) -> Self {
        Self {
            code,
            headers: IndexMap::new(),
            message,
        }
    }
}

/// The transport seam: fetch a document, or send a SOAP message.
pub trait Transport {
    /// Fetch the document at the request URL
    fn open(&mut self, request: &Request) -> Result<Vec<u8>>;

    /// Send a SOAP message and collect the reply
    fn send(&mut self, request: &Request) -> Result<Reply>;
}

/// A transport that refuses every exchange, for offline use where every
/// document comes from the store or cache.
#[derive(Debug, Default)]
pub struct NoTransport;

impl Transport for NoTransport {
    fn open(&mut self, request: &Request) -> Result<Vec<u8>> {
        Err(Error::Transport(format!(
            "no transport configured: {}",
            request.url
        )))
    }

    fn send(&mut self, request: &Request) -> Result<Reply> {
        Err(Error::Transport(format!(
            "no transport configured: {}",
            request.url
        )))
    }
}
