//! Rpc/literal and rpc/encoded bindings
//!
//! Both wrap the marshalled parts in a method-name root element qualified
//! by the soap:body namespace. The encoded variant additionally declares
//! the SOAP encoding namespace, stamps `encodingStyle` on the envelope,
//! and switches to the section-5 marshaller/unmarshaller pair.

use indexmap::IndexMap;

use crate::bindings::{bind_args, reply_value, ParamDef, SoapBinding};
use crate::document::Element;
use crate::error::{Error, Result};
use crate::mx::core::{Content, Marshaller};
use crate::mx::encoded::Encoded as EncodedMx;
use crate::mx::literal::Literal;
use crate::namespaces::Namespace;
use crate::sudsobject::Value;
use crate::umx::{Encoded as EncodedUmx, Typed};
use crate::wsdl::Method;
use crate::xsd::schema::Schema;
use crate::SOAP_ENC_NAMESPACE;

pub struct Rpc;

pub struct RpcEncoded;

/// The method-name wrapper element, qualified by the input body
/// namespace with the conventional `ns0` prefix.
fn method_root(method: &Method) -> Element {
    match &method.namespace {
        Some(uri) => Element::with_ns(method.name.as_str(), &Namespace::new("ns0", uri.clone())),
        None => Element::new(method.name.as_str()),
    }
}

fn part_defs(schema: &Schema, method: &Method) -> Result<Vec<ParamDef>> {
    method
        .input_parts
        .iter()
        .map(|part| {
            let node = if part.is_element {
                schema.element(&part.type_ref)
            } else {
                schema.xsd_type(&part.type_ref)
            }
            .ok_or_else(|| Error::TypeNotFound(part.type_ref.to_string()))?;
            Ok(ParamDef {
                name: part.name.clone(),
                node,
                optional: false,
            })
        })
        .collect()
}

/// Reply nodes for rpc: the children of the method-response wrapper.
fn rpc_replycontent(body: &Element) -> Vec<&Element> {
    body.children
        .first()
        .map(|wrapper| wrapper.children.iter().collect())
        .unwrap_or_default()
}

impl SoapBinding for Rpc {
    fn param_defs(&self, schema: &Schema, method: &Method) -> Result<Vec<ParamDef>> {
        part_defs(schema, method)
    }

    fn mkparam(&self, schema: &Schema, def: &ParamDef, value: Value) -> Result<Element> {
        let mut marshaller = Literal::new(schema);
        marshaller.process(Content::typed(def.name.as_str(), value, def.node))
    }

    fn bodycontent(
        &self,
        schema: &Schema,
        method: &Method,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> Result<Vec<Element>> {
        let defs = self.param_defs(schema, method)?;
        let mut root = method_root(method);
        for (index, value) in bind_args(&defs, args, kwargs) {
            root.append(self.mkparam(schema, &defs[index], value)?);
        }
        Ok(vec![root])
    }

    fn replycontent<'a>(&self, body: &'a Element) -> Vec<&'a Element> {
        rpc_replycontent(body)
    }

    fn unmarshal(&self, schema: &Schema, method: &Method, nodes: Vec<&Element>) -> Result<Value> {
        let mut um = Typed::new(schema);
        reply_value(&mut um, schema, method, nodes)
    }
}

impl SoapBinding for RpcEncoded {
    fn param_defs(&self, schema: &Schema, method: &Method) -> Result<Vec<ParamDef>> {
        part_defs(schema, method)
    }

    fn mkparam(&self, schema: &Schema, def: &ParamDef, value: Value) -> Result<Element> {
        let mut marshaller = EncodedMx::new(schema);
        marshaller.process(Content::typed(def.name.as_str(), value, def.node))
    }

    fn bodycontent(
        &self,
        schema: &Schema,
        method: &Method,
        args: Vec<Value>,
        kwargs: IndexMap<String, Value>,
    ) -> Result<Vec<Element>> {
        let defs = self.param_defs(schema, method)?;
        let mut root = method_root(method);
        for (index, value) in bind_args(&defs, args, kwargs) {
            root.append(self.mkparam(schema, &defs[index], value)?);
        }
        Ok(vec![root])
    }

    fn replycontent<'a>(&self, body: &'a Element) -> Vec<&'a Element> {
        rpc_replycontent(body)
    }

    fn envelope(&self, header: Vec<Element>, body: Vec<Element>) -> Element {
        let mut env = crate::bindings::base_envelope(header, body);
        env.add_prefix("SOAP-ENC", SOAP_ENC_NAMESPACE);
        env.set("SOAP-ENV:encodingStyle", SOAP_ENC_NAMESPACE);
        env
    }

    fn unmarshal(&self, schema: &Schema, method: &Method, nodes: Vec<&Element>) -> Result<Value> {
        let mut um = EncodedUmx::new(schema);
        reply_value(&mut um, schema, method, nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::wsdl::{Part, SoapStyle, SoapUse};
    use crate::xsd::schema::NoLoader;

    const CALC_XSD: &str = r#"
        <schema xmlns="http://www.w3.org/2001/XMLSchema"
                xmlns:xs="http://www.w3.org/2001/XMLSchema"
                targetNamespace="urn:calc"/>"#;

    fn calc_method() -> Method {
        Method {
            name: "add".to_string(),
            action: "urn:calc#add".to_string(),
            style: SoapStyle::Rpc,
            use_: SoapUse::Encoded,
            input_parts: vec![
                Part {
                    name: "a".to_string(),
                    type_ref: crate::namespaces::QName::namespaced(
                        crate::XSD_NAMESPACE,
                        "int",
                    ),
                    is_element: false,
                },
                Part {
                    name: "b".to_string(),
                    type_ref: crate::namespaces::QName::namespaced(
                        crate::XSD_NAMESPACE,
                        "int",
                    ),
                    is_element: false,
                },
            ],
            output_parts: vec![Part {
                name: "result".to_string(),
                type_ref: crate::namespaces::QName::namespaced(crate::XSD_NAMESPACE, "int"),
                is_element: false,
            }],
            namespace: Some("urn:calc".to_string()),
        }
    }

    fn calc_schema() -> Schema {
        let doc = Document::from_string(CALC_XSD).unwrap();
        let mut schema = Schema::new();
        schema.add_schema(doc.root().unwrap(), &mut NoLoader).unwrap();
        schema
    }

    #[test]
    fn test_rpc_wrapper() {
        let schema = calc_schema();
        let method = calc_method();
        let body = Rpc
            .bodycontent(
                &schema,
                &method,
                vec![Value::from(2i64), Value::from(3i64)],
                IndexMap::new(),
            )
            .unwrap();
        assert_eq!(body.len(), 1);
        let root = &body[0];
        assert_eq!(root.name, "add");
        assert_eq!(root.namespace.as_deref(), Some("urn:calc"));
        assert_eq!(root.prefix.as_deref(), Some("ns0"));
        assert_eq!(root.children[0].name, "a");
        assert_eq!(root.children[0].text(), Some("2"));
        assert_eq!(root.children[1].name, "b");
    }

    #[test]
    fn test_encoded_envelope_declares_encoding() {
        let env = RpcEncoded.envelope(vec![], vec![Element::new("x")]);
        assert_eq!(env.get("encodingStyle"), Some(SOAP_ENC_NAMESPACE));
    }

    #[test]
    fn test_encoded_params_carry_xsi_type() {
        let schema = calc_schema();
        let method = calc_method();
        let body = RpcEncoded
            .bodycontent(
                &schema,
                &method,
                vec![Value::from(2i64), Value::from(3i64)],
                IndexMap::new(),
            )
            .unwrap();
        let a = &body[0].children[0];
        assert!(a.get("type").is_some());
    }

    #[test]
    fn test_rpc_reply_unwrapped() {
        let schema = calc_schema();
        let method = calc_method();
        let xml = r#"<ns0:addResponse xmlns:ns0="urn:calc"><result>5</result></ns0:addResponse>"#;
        let doc = Document::from_string(xml).unwrap();
        let mut body = Element::new("Body");
        body.append(doc.root().unwrap().clone());
        let nodes = RpcEncoded.replycontent(&body);
        assert_eq!(nodes.len(), 1);
        let value = RpcEncoded.unmarshal(&schema, &method, nodes).unwrap();
        assert_eq!(value, Value::Int(5));
    }
}
