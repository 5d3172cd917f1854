//! # lather
//!
//! A lightweight SOAP 1.1 web-service client for Rust.
//!
//! Given a WSDL service description, lather resolves the service's XML
//! Schema type system, builds strongly-typed request envelopes from method
//! arguments, sends them over a pluggable transport, and unmarshals XML
//! replies back into a typed in-memory value graph.
//!
//! The core of the crate is the schema resolution and marshalling pipeline:
//! a type-directed bidirectional transcoder between [`Value`](sudsobject::Value)
//! graphs and XML documents, driven by an XSD/WSDL type model that covers
//! inheritance, references, SOAP-encoded arrays and namespaces.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lather::{Client, Options, Value};
//!
//! let mut client = Client::new("http://example.com/service?wsdl", Options::default())?;
//! let reply = client.invoke("GetQuote", vec![Value::from("ACME")], Default::default())?;
//! ```
//!
//! Transports, caches and plugins are collaborator traits; the crate ships
//! in-memory implementations suitable for tests and embedding.

#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod document;
pub mod error;
pub mod namespaces;
pub mod options;
pub mod plugin;
pub mod reader;
pub mod sudsobject;
pub mod transport;
pub mod wsdl;

pub mod bindings;
pub mod mx;
pub mod umx;
pub mod xsd;

// Re-exports for convenience
pub use client::Client;
pub use error::{Error, Result};
pub use options::Options;
pub use sudsobject::{SudsObject, Value};

/// Version of the lather library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// SOAP 1.1 envelope namespace
pub const SOAP_ENV_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP section 5 encoding namespace
pub const SOAP_ENC_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// WSDL namespace
pub const WSDL_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/";

/// WSDL SOAP binding namespace
pub const WSDL_SOAP_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
