//! Document/literal binding
//!
//! Body children are the marshalled message parts themselves. The wrapped
//! convention is supported: a single element-backed part whose element
//! wraps the actual parameters exposes those child elements as the
//! method's parameter list.

use indexmap::IndexMap;

use crate::bindings::{bind_args, reply_value, ParamDef, SoapBinding};
use crate::document::Element;
use crate::error::{Error, Result};
use crate::mx::core::{Content, Marshaller};
use crate::mx::literal::Literal;
use crate::sudsobject::{SudsObject, Value};
use crate::umx::Typed;
use crate::wsdl::{Method, Part};
use crate::xsd::schema::{NodeId, Schema};

pub struct DocumentLiteral;

impl DocumentLiteral {
    /// The wrapper element declaration, when the method follows the
    /// wrapped convention.
    fn wrapper(&self, schema: &Schema, method: &Method) -> Option<NodeId> {
        match method.input_parts.as_slice() {
            [part] if part.is_element => schema.element(&part.type_ref),
            _ => None,
        }
    }

    fn part_def(&self, schema: &Schema, part: &Part) -> Result<ParamDef> {
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
    }
}

impl SoapBinding for DocumentLiteral {
    fn param_defs(&self, schema: &Schema, method: &Method) -> Result<Vec<ParamDef>> {
        if let Some(wrapper) = self.wrapper(schema, method) {
            // Wrapped: the wrapper's child elements are the parameters.
            let resolved = crate::xsd::resolver::NodeResolver::new(schema).real_type(wrapper);
            let defs = schema
                .type_elements(resolved)
                .into_iter()
                .map(|id| {
                    let node = schema.node(id);
                    ParamDef {
                        name: node.name.clone().unwrap_or_default(),
                        node: id,
                        optional: node.optional(),
                    }
                })
                .collect();
            return Ok(defs);
        }
        method
            .input_parts
            .iter()
            .map(|part| self.part_def(schema, part))
            .collect()
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
        let bound = bind_args(&defs, args, kwargs);
        if let Some(wrapper) = self.wrapper(schema, method) {
            let tag = schema
                .node(wrapper)
                .name
                .clone()
                .ok_or_else(|| Error::Type("unnamed wrapper element".to_string()))?;
            let mut object = SudsObject::new(tag.as_str());
            for (index, value) in bound {
                object.set(defs[index].name.as_str(), value);
            }
            let mut marshaller = Literal::new(schema);
            let node =
                marshaller.process(Content::typed(tag, Value::Object(object), wrapper))?;
            return Ok(vec![node]);
        }
        bound
            .into_iter()
            .map(|(index, value)| self.mkparam(schema, &defs[index], value))
            .collect()
    }

    fn unmarshal(&self, schema: &Schema, method: &Method, nodes: Vec<&Element>) -> Result<Value> {
        let mut um = Typed::new(schema);
        reply_value(&mut um, schema, method, nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wsdl::tests::price_definitions;

    #[test]
    fn test_wrapped_params() {
        let defs = price_definitions();
        let method = defs
            .service(None)
            .unwrap()
            .port(None)
            .unwrap()
            .method("getPrice")
            .unwrap();
        let binding = DocumentLiteral;
        let params = binding.param_defs(&defs.schema, method).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "symbol");
    }

    #[test]
    fn test_wrapped_bodycontent() {
        let defs = price_definitions();
        let method = defs
            .service(None)
            .unwrap()
            .port(None)
            .unwrap()
            .method("getPrice")
            .unwrap();
        let binding = DocumentLiteral;
        let body = binding
            .bodycontent(&defs.schema, method, vec![Value::from("ACME")], IndexMap::new())
            .unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body[0].name, "getPrice");
        assert_eq!(
            body[0].namespace.as_deref(),
            Some("http://example.com/price")
        );
        let symbol = body[0].child("symbol").unwrap();
        assert_eq!(symbol.text(), Some("ACME"));
    }

    #[test]
    fn test_reply_unmarshal() {
        let defs = price_definitions();
        let method = defs
            .service(None)
            .unwrap()
            .port(None)
            .unwrap()
            .method("getPrice")
            .unwrap();
        let xml = r#"<p:getPriceResponse xmlns:p="http://example.com/price">
            <p:price>12.5</p:price>
        </p:getPriceResponse>"#;
        let doc = crate::document::Document::from_string(xml).unwrap();
        let binding = DocumentLiteral;
        let value = binding
            .unmarshal(&defs.schema, method, vec![doc.root().unwrap()])
            .unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("price"), Some(&Value::Float(12.5)));
    }
}
