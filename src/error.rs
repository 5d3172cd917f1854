//! Error types for lather
//!
//! A single crate-wide error taxonomy covering schema lookup failures,
//! server faults and transport problems. Schema and type errors abort the
//! current marshal/unmarshal pass entirely; transport errors are surfaced
//! to the caller unchanged and never retried by the core.

use thiserror::Error;

use crate::document::Document;
use crate::sudsobject::SudsObject;

/// Result type alias using the lather Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lather operations
#[derive(Error, Debug)]
pub enum Error {
    /// A service method was not found in the WSDL
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// A service port was not found in the WSDL
    #[error("port not found: {0}")]
    PortNotFound(String),

    /// A service was not found in the WSDL
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// A schema type lookup failed
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// Auto-construction of a WSDL type instance failed
    #[error(
        "failed to build type '{name}': {reason}. \
         The type may be abstract or missing from the WSDL schema; \
         check the qualified name against the service's type definitions"
    )]
    Build {
        /// Name of the type being built
        name: String,
        /// Underlying failure
        reason: String,
    },

    /// A SOAP fault returned by the server
    #[error("server raised fault: ({code}) {string}")]
    WebFault {
        /// The faultcode value
        code: String,
        /// The faultstring value
        string: String,
        /// The parsed fault object (faultcode/faultstring/detail fields)
        fault: Box<SudsObject>,
        /// The raw reply document the fault was parsed from
        document: Box<Document>,
    },

    /// Transport-level failure, propagated unchanged
    #[error("transport error: {0}")]
    Transport(String),

    /// Schema or WSDL structural parse failure
    #[error("parse error: {0}")]
    Parse(String),

    /// XML well-formedness or tokenizer failure
    #[error("XML error: {0}")]
    Xml(String),

    /// Namespace or prefix resolution failure
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Type mismatch between a value and its schema declaration
    #[error("type error: {0}")]
    Type(String),

    /// An input the codec deliberately does not handle
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True when the error is one of the schema lookup failures that abort
    /// the current call without producing a partial result.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Error::MethodNotFound(_)
                | Error::PortNotFound(_)
                | Error::ServiceNotFound(_)
                | Error::TypeNotFound(_)
        )
    }
}
