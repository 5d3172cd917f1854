//! Basic (untyped) marshaller
//!
//! Used by the document/literal "basic" path and anywhere a value graph
//! needs an XML rendering without schema metadata. Objects walk their own
//! field order; tags default to the value's class name.

use crate::document::Element;
use crate::error::Result;
use crate::mx::core::{Content, Marshaller};
use crate::sudsobject::Value;

/// A basic (untyped) marshaller.
#[derive(Debug, Default)]
pub struct Basic;

impl Basic {
    /// Create a basic marshaller
    pub fn new() -> Self {
        Self
    }

    /// Marshal a value with an optional tag; the default tag is the
    /// value's class name.
    pub fn process_value(&mut self, value: Value, tag: Option<&str>) -> Result<Element> {
        let content = match tag {
            Some(tag) => Content::new(tag, value),
            None => Content::untagged(value),
        };
        self.process(content)
    }
}

impl Marshaller for Basic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudsobject::SudsObject;

    #[test]
    fn test_object_fields_in_order() {
        let mut person = SudsObject::new("Person");
        person.set("name", "ann");
        person.set("age", 41i64);
        let mut m = Basic::new();
        let node = m.process_value(Value::Object(person), Some("person")).unwrap();
        assert_eq!(node.name, "person");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].name, "name");
        assert_eq!(node.children[0].text(), Some("ann"));
        assert_eq!(node.children[1].name, "age");
        assert_eq!(node.children[1].text(), Some("41"));
    }

    #[test]
    fn test_nested_objects() {
        let mut inner = SudsObject::new("Address");
        inner.set("city", "springfield");
        let mut outer = SudsObject::new("Person");
        outer.set("address", Value::Object(inner));
        let mut m = Basic::new();
        let node = m.process_value(Value::Object(outer), None).unwrap();
        assert_eq!(node.name, "Person");
        assert_eq!(node.children[0].children[0].text(), Some("springfield"));
    }

    #[test]
    fn test_list_field_repeats_element() {
        let mut o = SudsObject::new("Basket");
        o.set("item", Value::List(vec![Value::from("a"), Value::from("b")]));
        let mut m = Basic::new();
        let node = m.process_value(Value::Object(o), Some("basket")).unwrap();
        assert_eq!(node.children.len(), 2);
        assert!(node.children.iter().all(|c| c.name == "item"));
    }
}
