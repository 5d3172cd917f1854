//! Unmarshallers: XML to object trees
//!
//! Mirrors of the `mx` marshallers for the reply direction. [`Basic`]
//! builds untyped objects straight off the XML; [`Typed`] resolves each
//! node against the schema and translates leaf text into typed values;
//! [`Encoded`] adds SOAP section-5 array decoding on top of [`Typed`].

pub mod basic;
pub mod core;
pub mod encoded;
pub mod typed;

pub use basic::Basic;
pub use core::{Content, Unmarshaller};
pub use encoded::Encoded;
pub use typed::Typed;
