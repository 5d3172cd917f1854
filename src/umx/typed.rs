//! Schema-driven unmarshaller
//!
//! Resolves each XML node to its declaration, translates leaf text
//! through the declared type's primitive, and records the resolved type
//! in the object's metadata so a later marshal can round-trip it.

use tracing::{debug, warn};

use crate::document::Element;
use crate::error::Result;
use crate::namespaces::{NamespaceContext, QName};
use crate::sudsobject::SudsObject;
use crate::sudsobject::Value;
use crate::umx::core::{Content, Unmarshaller};
use crate::xsd::resolver::{Frame, NodeResolver};
use crate::xsd::schema::{NodeId, Schema};

/// An unmarshaller that consults a schema.
pub struct Typed<'s> {
    schema: &'s Schema,
    resolver: NodeResolver<'s>,
}

impl<'s> Typed<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            resolver: NodeResolver::new(schema),
        }
    }

    pub(crate) fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// The type named by an explicit `xsi:type` attribute, when present
    /// and known to the schema.
    pub(crate) fn xsi_type(&self, node: &Element) -> Option<NodeId> {
        let value = node.get_ns("type", crate::XSI_NAMESPACE)?;
        let (prefix, local) = crate::namespaces::split_prefix(value);
        let namespace = match prefix {
            Some(prefix) => {
                Some(node.resolve_prefix(prefix, &NamespaceContext::new())?)
            }
            None => None,
        };
        let qname = QName::new(namespace, local.to_string());
        let found = self.schema.xsd_type(&qname);
        if found.is_none() {
            debug!(%qname, "xsi:type names an unknown type");
        }
        found
    }
}

impl Unmarshaller for Typed<'_> {
    fn reset(&mut self) {
        self.resolver = NodeResolver::new(self.schema);
    }

    fn start(&mut self, content: &mut Content<'_>) -> Result<()> {
        let found = match content.type_id.or_else(|| self.xsi_type(content.node)) {
            Some(id) => {
                let resolved = self.resolver.real_type(id);
                self.resolver.push(Frame { node: id, resolved });
                id
            }
            None => self.resolver.find(content.node)?,
        };
        content.type_id = Some(found);
        content.real = self.resolver.top().map(|f| f.resolved);
        let declaration = self.schema.node(found);
        let class = declaration
            .name
            .clone()
            .unwrap_or_else(|| content.node.name.clone());
        let mut data = SudsObject::new(class);
        data.metadata.sxtype = content.real;
        data.metadata.type_qname =
            content.real.and_then(|id| self.schema.node(id).qname());
        content.data = data;
        Ok(())
    }

    fn end(&mut self, _content: &mut Content<'_>) -> Result<()> {
        self.resolver.pop();
        Ok(())
    }

    fn multi_occurrence(&mut self, content: &Content<'_>) -> bool {
        content
            .type_id
            .map(|id| self.schema.node(id).multi_occurrence())
            .unwrap_or(false)
    }

    fn append_attribute(&mut self, name: &str, value: &str, content: &mut Content<'_>) -> Result<()> {
        let translated = match self.resolver.findattr(name) {
            Some(attr) => self.schema.translate(attr, value),
            None => {
                warn!(attribute = name, "attribute type not found, passed through untranslated");
                Value::Text(value.to_string())
            }
        };
        content.data.set(format!("_{name}"), translated);
        Ok(())
    }

    fn translated(&mut self, content: &Content<'_>, text: &str) -> Result<Value> {
        match content.real {
            Some(id) => Ok(self.schema.translate(id, text)),
            None => Ok(Value::Text(text.to_string())),
        }
    }

    fn nillable(&mut self, content: &Content<'_>) -> bool {
        content
            .type_id
            .map(|id| self.schema.node(id).nillable)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::xsd::schema::tests::person_schema;

    #[test]
    fn test_typed_leaves() {
        let schema = person_schema();
        let xml = r#"<p:person xmlns:p="http://example.com/person">
            <p:name>ann</p:name>
            <p:age>41</p:age>
            <p:phone>555-1111</p:phone>
        </p:person>"#;
        let doc = Document::from_string(xml).unwrap();
        let value = Typed::new(&schema).process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.type_name(), "person");
        assert_eq!(object.get("age"), Some(&Value::Int(41)));
        // phone is maxOccurs="unbounded": a single occurrence is a list.
        match object.get("phone") {
            Some(Value::List(items)) => {
                assert_eq!(items, &vec![Value::Text("555-1111".to_string())])
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_attribute_translated() {
        let schema = person_schema();
        let xml = r#"<p:person xmlns:p="http://example.com/person" id="7">
            <p:name>ann</p:name>
        </p:person>"#;
        let doc = Document::from_string(xml).unwrap();
        let value = Typed::new(&schema).process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("_id"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_undeclared_attribute_passes_through_untranslated() {
        let schema = person_schema();
        let xml = r#"<p:person xmlns:p="http://example.com/person" badge="42">
            <p:name>ann</p:name>
        </p:person>"#;
        let doc = Document::from_string(xml).unwrap();
        let value = Typed::new(&schema).process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("_badge"), Some(&Value::Text("42".to_string())));
    }

    #[test]
    fn test_unknown_node_fails() {
        let schema = person_schema();
        let doc = Document::from_string("<mystery/>").unwrap();
        let err = Typed::new(&schema).process(doc.root().unwrap()).unwrap_err();
        assert!(matches!(err, crate::error::Error::TypeNotFound(_)));
    }
}
