//! XML namespace handling
//!
//! Namespaces are represented as a (prefix, URI) pair; a `None` prefix
//! means the default (unprefixed) namespace. Equality is by URI only, the
//! prefix is presentation. Qualified names pair a local name with a
//! resolved namespace URI.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::{SOAP_ENC_NAMESPACE, SOAP_ENV_NAMESPACE, XML_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};

/// An XML namespace: optional prefix plus URI.
#[derive(Debug, Clone, Eq)]
pub struct Namespace {
    /// Prefix, `None` for the default namespace
    pub prefix: Option<String>,
    /// Namespace URI
    pub uri: String,
}

impl Namespace {
    /// Create a namespace with a prefix
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        }
    }

    /// Create a default (unprefixed) namespace
    pub fn default_ns(uri: impl Into<String>) -> Self {
        Self {
            prefix: None,
            uri: uri.into(),
        }
    }

    /// The conventional `xs` namespace
    pub fn xsd() -> Self {
        Self::new("xs", XSD_NAMESPACE)
    }

    /// The SOAP envelope namespace with its conventional prefix
    pub fn soap_env() -> Self {
        Self::new("SOAP-ENV", SOAP_ENV_NAMESPACE)
    }

    /// Whether a URI is the XMLSchema namespace
    pub fn is_xsd(uri: &str) -> bool {
        uri == XSD_NAMESPACE
    }

    /// Whether a URI is the XMLSchema-instance namespace
    pub fn is_xsi(uri: &str) -> bool {
        uri == XSI_NAMESPACE
    }

    /// Whether a URI is either of the XMLSchema namespaces
    pub fn is_xs(uri: &str) -> bool {
        Self::is_xsd(uri) || Self::is_xsi(uri)
    }

    /// Whether a URI belongs to the envelope/encoding/xml infrastructure
    /// namespaces filtered out of unmarshalled attribute lists.
    pub fn is_reserved(uri: &str) -> bool {
        Self::is_xs(uri)
            || uri == XML_NAMESPACE
            || uri == SOAP_ENV_NAMESPACE
            || uri == SOAP_ENC_NAMESPACE
            || uri == "http://www.w3.org/2003/05/soap-envelope"
    }
}

impl PartialEq for Namespace {
    // Equality is by URI; the prefix is presentation only.
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "({}, {})", p, self.uri),
            None => write!(f, "(None, {})", self.uri),
        }
    }
}

/// Qualified name: local name plus resolved namespace URI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Split a node name into (prefix, local name).
///
/// The prefix is `None` when the name is unprefixed.
pub fn split_prefix(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((p, n)) => (Some(p), n),
        None => (None, name),
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<String, String>,
    /// Default namespace (no prefix)
    default_namespace: Option<String>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate over declared (prefix, uri) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// True when no prefixes and no default namespace are declared
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.default_namespace.is_none()
    }

    /// Merge declarations from an outer scope; local declarations win.
    pub fn inherit(&mut self, outer: &NamespaceContext) {
        for (p, u) in outer.prefixes.iter() {
            self.prefixes.entry(p.clone()).or_insert_with(|| u.clone());
        }
        if self.default_namespace.is_none() {
            self.default_namespace = outer.default_namespace.clone();
        }
    }

    /// Resolve a prefixed name to a QName
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        match split_prefix(prefixed_name) {
            (Some(prefix), local) => {
                let namespace = self
                    .get_namespace(prefix)
                    .ok_or_else(|| Error::Namespace(format!("unknown prefix: {}", prefix)))?;
                Ok(QName::namespaced(namespace, local))
            }
            (None, local) => Ok(QName::new(self.default_namespace.clone(), local)),
        }
    }
}
