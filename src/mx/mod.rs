//! Marshalling (value graph to XML)
//!
//! Three marshallers share one tree walk: [`Basic`](basic::Basic) walks a
//! value's own field order with no schema, [`Literal`](literal::Literal)
//! consults the schema type model, and [`Encoded`](encoded::Encoded) adds
//! SOAP section-5 array handling on top of the literal rules.

pub mod basic;
pub mod core;
pub mod encoded;
pub mod literal;
pub mod typer;

pub use core::{ArrayType, Content, Marshaller};
