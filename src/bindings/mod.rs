//! SOAP bindings
//!
//! A binding turns a method invocation into SOAP body content and a SOAP
//! reply body back into values. The three wire styles share the envelope
//! and parameter-binding logic here; [`document::DocumentLiteral`],
//! [`rpc::Rpc`], and [`rpc::RpcEncoded`] supply the style-specific parts.

pub mod document;
pub mod rpc;

use indexmap::IndexMap;

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::Namespace;
use crate::sudsobject::Value;
use crate::umx::Unmarshaller;
use crate::wsdl::{Method, SoapStyle, SoapUse};
use crate::xsd::schema::{NodeId, Schema};
use crate::{SOAP_ENV_NAMESPACE, XSD_NAMESPACE, XSI_NAMESPACE};

pub use document::DocumentLiteral;
pub use rpc::{Rpc, RpcEncoded};

/// One declared parameter of a method.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: String,
    /// The element or type declaration backing the parameter
    pub node: NodeId,
    pub optional: bool,
}

/// Select the binding matching a method's style and use.
pub fn select(method: &Method) -> Result<Box<dyn SoapBinding>> {
    match (method.style, method.use_) {
        (SoapStyle::Document, SoapUse::Literal) => Ok(Box::new(DocumentLiteral)),
        (SoapStyle::Rpc, SoapUse::Literal) => Ok(Box::new(Rpc)),
        (SoapStyle::Rpc, SoapUse::Encoded) => Ok(Box::new(RpcEncoded)),
        (SoapStyle::Document, SoapUse::Encoded) => Err(Error::Unsupported(
            "document/encoded binding".to_string(),
        )),
    }
}

/// A SOAP wire style.
pub trait SoapBinding {
    /// The declared parameters of a method
    fn param_defs(&self, schema: &Schema, method: &Method) -> Result<Vec<ParamDef>>;

    /// Marshal one bound parameter into an element
    fn mkparam(&self, schema: &Schema, def: &ParamDef, value: Value) -> Result<Element>;

    /// Marshal an invocation into SOAP body children
    fn bodycontent(
        &self,
        schema: &Schema,
        method: &Method,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> Result<Vec<Element>>;

    /// The reply nodes to unmarshal from a SOAP body
    fn replycontent<'a>(&self, body: &'a Element) -> Vec<&'a Element> {
        body.children.iter().collect()
    }

    /// Wrap body children in a SOAP envelope
    fn envelope(&self, header: Vec<Element>, body: Vec<Element>) -> Element {
        base_envelope(header, body)
    }

    /// Unmarshal reply nodes into the method's return value
    fn unmarshal(&self, schema: &Schema, method: &Method, nodes: Vec<&Element>) -> Result<Value>;
}

/// The shared SOAP 1.1 envelope: Header and Body children, with the
/// schema namespaces declared up front.
pub(crate) fn base_envelope(header: Vec<Element>, body: Vec<Element>) -> Element {
    let mut env = Element::with_ns("Envelope", &Namespace::soap_env());
    env.add_prefix("xsi", XSI_NAMESPACE);
    env.add_prefix("xsd", XSD_NAMESPACE);
    let mut head = soap_element("Header");
    for child in header {
        head.append(child);
    }
    env.append(head);
    let mut soap_body = soap_element("Body");
    for child in body {
        soap_body.append(child);
    }
    env.append(soap_body);
    env
}

/// A SOAP-ENV qualified element relying on the envelope's declaration.
pub(crate) fn soap_element(name: &str) -> Element {
    Element {
        prefix: Some("SOAP-ENV".to_string()),
        namespace: Some(SOAP_ENV_NAMESPACE.to_string()),
        ..Element::new(name)
    }
}

/// Bind positional then named arguments to parameter definitions, in
/// declaration order. Absent parameters are left unbound.
pub(crate) fn bind_args(
    defs: &[ParamDef],
    args: Vec<Value>,
    mut kwargs: IndexMap<String, Value>,
) -> Vec<(usize, Value)> {
    let mut bound = Vec::new();
    let mut positional = args.into_iter();
    for (index, def) in defs.iter().enumerate() {
        if let Some(value) = positional.next() {
            bound.push((index, value));
        } else if let Some(value) = kwargs.swap_remove(&def.name) {
            bound.push((index, value));
        }
    }
    bound
}

/// Unmarshal reply nodes: none is null, one is the value itself, several
/// compose into an object keyed by node name.
pub(crate) fn reply_value<U: Unmarshaller>(
    um: &mut U,
    schema: &Schema,
    method: &Method,
    nodes: Vec<&Element>,
) -> Result<Value> {
    match nodes.len() {
        0 => Ok(Value::Null),
        1 => node_value(um, schema, method, nodes[0]),
        _ => {
            let mut reply = crate::sudsobject::SudsObject::new(method.name.as_str());
            for node in nodes {
                let value = node_value(um, schema, method, node)?;
                reply.append(&node.name, value);
            }
            Ok(Value::Object(reply))
        }
    }
}

fn node_value<U: Unmarshaller>(
    um: &mut U,
    schema: &Schema,
    method: &Method,
    node: &Element,
) -> Result<Value> {
    // A single declared output part types the node even when the wire
    // name differs; otherwise match parts by name.
    let part = if method.output_parts.len() == 1 {
        method.output_parts.first()
    } else {
        method.output_parts.iter().find(|p| p.name == node.name)
    };
    let declared = part.and_then(|p| {
        schema
            .element(&p.type_ref)
            .or_else(|| schema.xsd_type(&p.type_ref))
    });
    match declared {
        Some(id) => um.process_typed(node, id),
        None => um.process(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<ParamDef> {
        ["a", "b", "c"]
            .iter()
            .map(|n| ParamDef {
                name: n.to_string(),
                node: NodeId(0),
                optional: true,
            })
            .collect()
    }

    #[test]
    fn test_positional_then_named() {
        let mut kwargs = IndexMap::new();
        kwargs.insert("c".to_string(), Value::from(3i64));
        let bound = bind_args(&defs(), vec![Value::from(1i64)], kwargs);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0], (0, Value::Int(1)));
        assert_eq!(bound[1], (2, Value::Int(3)));
    }

    #[test]
    fn test_absent_optional_skipped() {
        let bound = bind_args(&defs(), vec![], IndexMap::new());
        assert!(bound.is_empty());
    }

    #[test]
    fn test_envelope_shape() {
        let env = base_envelope(vec![], vec![Element::new("x")]);
        assert_eq!(env.name, "Envelope");
        assert_eq!(env.prefix.as_deref(), Some("SOAP-ENV"));
        assert_eq!(env.children[0].name, "Header");
        assert_eq!(env.children[1].name, "Body");
        assert_eq!(env.children[1].children[0].name, "x");
    }
}
