//! Typed (literal) marshaller
//!
//! Consults the schema for every node: element namespaces follow the
//! declaration's form, absent non-nillable values are skipped, nillable
//! nulls render as `xsi:nil`, and values whose declared type is an XSD
//! `any` get an automatic `xsi:type` annotation.

use tracing::debug;

use crate::document::Element;
use crate::error::Result;
use crate::mx::core::{Content, Marshaller};
use crate::mx::typer::Typer;
use crate::namespaces::Namespace;
use crate::sudsobject::Value;
use crate::xsd::resolver::{Frame, NodeResolver};
use crate::xsd::schema::{NodeId, NodeVariant, Schema, SchemaNode};

/// A typed marshaller for literal (document and rpc) styles.
pub struct Literal<'s> {
    schema: &'s Schema,
    resolver: NodeResolver<'s>,
    /// Qualify xsi:type values by namespace
    pub xstq: bool,
}

impl<'s> Literal<'s> {
    /// Create a literal marshaller over a schema
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            resolver: NodeResolver::new(schema),
            xstq: true,
        }
    }

    /// The schema this marshaller consults
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Resolve the content's declaration, push its frame, and record the
    /// real type. Resolution order: an explicit declared type, the value's
    /// own metadata, then a name lookup in the active context.
    fn resolve(&mut self, content: &mut Content) -> Result<NodeId> {
        let found = match content.type_id {
            Some(id) => {
                let resolved = self.resolver.real_type(id);
                self.resolver.push(Frame { node: id, resolved });
                id
            }
            None => {
                let known = match &content.value {
                    Value::Object(object) => object.metadata.sxtype,
                    _ => None,
                };
                match known {
                    Some(id) => {
                        let resolved = self.resolver.real_type(id);
                        self.resolver.push(Frame { node: id, resolved });
                        id
                    }
                    None => match self.resolver.find_name(content.tag()) {
                        Ok(id) => id,
                        Err(err) => {
                            // Children of an any-typed node accept
                            // anything; resolve them to the any itself.
                            match self.resolver.top().copied() {
                                Some(frame)
                                    if self.schema.node(frame.resolved).any() =>
                                {
                                    self.resolver.push(frame);
                                    frame.resolved
                                }
                                _ => return Err(err),
                            }
                        }
                    },
                }
            }
        };
        content.type_id = Some(found);
        content.real = self.resolver.top().map(|f| f.resolved);
        Ok(found)
    }

    /// Build the bare element for the content, qualified per the
    /// declaration's form.
    pub(crate) fn make_node(&mut self, content: &Content) -> Result<Element> {
        let declaration = content.type_id.map(|id| self.schema.node(id));
        let node = match declaration {
            // Only element declarations qualify the node; a content typed
            // directly by a type (e.g. an rpc part) stays unqualified.
            Some(SchemaNode {
                variant: NodeVariant::Element,
                qualified: true,
                namespace: Some(uri),
                ..
            }) => {
                let ns = Namespace::default_ns(uri.clone());
                Element::with_ns(content.tag(), &ns)
            }
            _ => Element::new(content.tag()),
        };
        Ok(node)
    }
}

impl Marshaller for Literal<'_> {
    fn reset(&mut self) {
        // A fresh stack per process call; passes never share state.
        self.resolver = NodeResolver::new(self.schema);
    }

    fn start(&mut self, content: &mut Content) -> Result<bool> {
        let found = self.resolve(content)?;
        if content.value.is_null() && !self.schema.node(found).nillable {
            // Absent optional values are not rendered.
            debug!(tag = content.tag().to_string(), "skipping absent value");
            self.resolver.pop();
            return Ok(false);
        }
        Ok(true)
    }

    fn end(&mut self, _parent: &mut Element, _content: &mut Content) -> Result<()> {
        self.resolver.pop();
        Ok(())
    }

    fn node(&mut self, content: &Content) -> Result<Element> {
        let mut node = self.make_node(content)?;
        // A declared type that cannot represent the runtime value exactly
        // gets an automatic xsi:type annotation.
        if let Some(real) = content.real {
            if self.schema.node(real).any() && !content.value.is_null() {
                Typer::auto(&mut node, &content.value)?;
            }
        }
        Ok(node)
    }

    fn set_nil(&mut self, node: &mut Element, _content: &mut Content) {
        node.set_ns("xsi", "nil", crate::XSI_NAMESPACE, "true");
    }

    fn nillable(&mut self, content: &Content) -> bool {
        content
            .type_id
            .map(|id| self.schema.node(id).nillable)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudsobject::SudsObject;
    use crate::xsd::schema::tests::person_schema;

    fn person_value() -> Value {
        let mut person = SudsObject::new("Person");
        person.set("name", "ann");
        person.set("age", 41i64);
        person.set(
            "phone",
            Value::List(vec![Value::from("555-1111"), Value::from("555-2222")]),
        );
        Value::Object(person)
    }

    #[test]
    fn test_marshal_person() {
        let schema = person_schema();
        let mut m = Literal::new(&schema);
        let node = m.process(Content::new("person", person_value())).unwrap();
        assert_eq!(node.name, "person");
        // elementFormDefault="qualified" puts the element in the tns.
        assert_eq!(node.namespace.as_deref(), Some("http://example.com/person"));
        let names: Vec<&str> = node.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["name", "age", "phone", "phone"]);
        assert_eq!(node.children[1].text(), Some("41"));
    }

    #[test]
    fn test_unknown_field_fails() {
        let schema = person_schema();
        let mut person = SudsObject::new("Person");
        person.set("bogus", "x");
        let mut m = Literal::new(&schema);
        let err = m
            .process(Content::new("person", Value::Object(person)))
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::TypeNotFound(_)));
    }

    #[test]
    fn test_optional_absent_skipped() {
        let schema = person_schema();
        let mut person = SudsObject::new("Person");
        person.set("name", "ann");
        person.set("age", Value::Null);
        let mut m = Literal::new(&schema);
        let node = m.process(Content::new("person", Value::Object(person))).unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.children[0].name, "name");
    }

    #[test]
    fn test_attribute_field() {
        let schema = person_schema();
        let mut person = SudsObject::new("Person");
        person.set("_id", 7i64);
        person.set("name", "ann");
        let mut m = Literal::new(&schema);
        let node = m.process(Content::new("person", Value::Object(person))).unwrap();
        assert_eq!(node.get("id"), Some("7"));
        assert_eq!(node.children.len(), 1);
    }
}
