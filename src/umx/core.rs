//! Unmarshaller core: the shared tree walk
//!
//! One [`Content`] per XML node, visited in a fixed order: start,
//! attributes, children, text, end, postprocess. Hooks let the typed
//! unmarshallers resolve declarations and translate values without
//! re-implementing the walk.

use crate::document::Element;
use crate::error::Result;
use crate::namespaces::{Namespace, QName};
use crate::sudsobject::{SudsObject, Value};
use crate::xsd::schema::NodeId;

/// Unmarshaller content: one XML node in the tree walk.
#[derive(Debug)]
pub struct Content<'x> {
    /// The node being unmarshalled
    pub node: &'x Element,
    /// The object under construction
    pub data: SudsObject,
    /// Translated node text, when present
    pub text: Option<Value>,
    /// Declared schema type, when known
    pub type_id: Option<NodeId>,
    /// Resolved (real) schema type, filled in by typed unmarshallers
    pub real: Option<NodeId>,
    /// SOAP-encoded array item type, when the node carries `arrayType`
    pub aty: Option<QName>,
}

impl<'x> Content<'x> {
    pub fn new(node: &'x Element) -> Self {
        Self {
            node,
            data: SudsObject::new(node.name.as_str()),
            text: None,
            type_id: None,
            real: None,
            aty: None,
        }
    }
}

/// The unmarshaller state machine.
pub trait Unmarshaller {
    /// Reset per-process state
    fn reset(&mut self) {}

    /// Unmarshal an XML node into a value.
    fn process(&mut self, node: &Element) -> Result<Value> {
        self.reset();
        let mut content = Content::new(node);
        self.run(&mut content)
    }

    /// Unmarshal a node whose declared type is already known, e.g. from a
    /// WSDL message part.
    fn process_typed(&mut self, node: &Element, type_id: NodeId) -> Result<Value> {
        self.reset();
        let mut content = Content::new(node);
        content.type_id = Some(type_id);
        self.run(&mut content)
    }

    /// One full visit of a content node.
    fn run(&mut self, content: &mut Content<'_>) -> Result<Value> {
        self.start(content)?;
        self.append_attributes(content)?;
        self.append_children(content)?;
        self.append_text(content)?;
        self.end(content)?;
        self.postprocess(content)
    }

    /// The visit has started; resolve and prepare `content.data`.
    fn start(&mut self, _content: &mut Content<'_>) -> Result<()> {
        Ok(())
    }

    /// The visit has ended
    fn end(&mut self, _content: &mut Content<'_>) -> Result<()> {
        Ok(())
    }

    /// Append the node's attributes as `_`-prefixed object fields,
    /// skipping the envelope/schema infrastructure namespaces.
    fn append_attributes(&mut self, content: &mut Content<'_>) -> Result<()> {
        let node = content.node;
        for attr in &node.attributes {
            let reserved = attr
                .namespace
                .as_deref()
                .map(Namespace::is_reserved)
                .unwrap_or(false);
            if reserved {
                continue;
            }
            let name = attr.name.clone();
            let value = attr.value.clone();
            self.append_attribute(&name, &value, content)?;
        }
        Ok(())
    }

    /// Append one attribute
    fn append_attribute(&mut self, name: &str, value: &str, content: &mut Content<'_>) -> Result<()> {
        content
            .data
            .set(format!("_{name}"), Value::Text(value.to_string()));
        Ok(())
    }

    /// Append the node's children as object fields. A repeated tag, or a
    /// declaration that allows repetition, produces a list field.
    fn append_children(&mut self, content: &mut Content<'_>) -> Result<()> {
        let node = content.node;
        for child in &node.children {
            let (value, multi) = self.child(content, child)?;
            let key = child.name.clone();
            if content.data.get(&key).is_some() {
                content.data.append(&key, value);
            } else if multi {
                content.data.append_listed(&key, value);
            } else {
                content.data.set(key, value);
            }
        }
        Ok(())
    }

    /// Unmarshal one child node. Returns the value and whether the child's
    /// declaration is multi-occurrence.
    fn child(&mut self, _parent: &mut Content<'_>, node: &Element) -> Result<(Value, bool)> {
        let mut content = Content::new(node);
        let value = self.run(&mut content)?;
        let multi = self.multi_occurrence(&content);
        Ok((value, multi))
    }

    /// Whether the content's declaration allows more than one occurrence
    fn multi_occurrence(&mut self, _content: &Content<'_>) -> bool {
        false
    }

    /// Capture and translate the node's text
    fn append_text(&mut self, content: &mut Content<'_>) -> Result<()> {
        let text = match content.node.text() {
            Some(text) => text.to_string(),
            None => return Ok(()),
        };
        let value = self.translated(content, &text)?;
        content.text = Some(value);
        Ok(())
    }

    /// Translate leaf text into a value; untyped unmarshallers keep it as
    /// text.
    fn translated(&mut self, _content: &Content<'_>, text: &str) -> Result<Value> {
        Ok(Value::Text(text.to_string()))
    }

    /// Whether a missing value should unmarshal as null rather than an
    /// empty string
    fn nillable(&mut self, _content: &Content<'_>) -> bool {
        false
    }

    /// Reduce the visited content to its final value.
    fn postprocess(&mut self, content: &mut Content<'_>) -> Result<Value> {
        let node = content.node;
        let data = std::mem::replace(&mut content.data, SudsObject::new(""));
        if !node.children.is_empty() {
            return Ok(Value::Object(data));
        }
        if !data.is_empty() {
            // Attributes on a leaf: keep them, text goes to `value`.
            let mut data = data;
            if let Some(text) = content.text.take() {
                data.set("value", text);
            }
            return Ok(Value::Object(data));
        }
        if node.is_nil() {
            return Ok(Value::Null);
        }
        match content.text.take() {
            Some(text) => Ok(text),
            None => {
                if self.nillable(content) {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Text(String::new()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    struct Plain;
    impl Unmarshaller for Plain {}

    #[test]
    fn test_leaf_text() {
        let doc = Document::from_string("<name>ann</name>").unwrap();
        let value = Plain.process(doc.root().unwrap()).unwrap();
        assert_eq!(value, Value::Text("ann".to_string()));
    }

    #[test]
    fn test_repeated_tag_promotes_to_list() {
        let doc =
            Document::from_string("<r><n>1</n><n>2</n><n>3</n></r>").unwrap();
        let value = Plain.process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        match object.get("n") {
            Some(Value::List(items)) => assert_eq!(items.len(), 3),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_attributes_become_fields() {
        let doc = Document::from_string(r#"<p id="7"><name>ann</name></p>"#).unwrap();
        let value = Plain.process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.get("_id"), Some(&Value::Text("7".to_string())));
    }

    #[test]
    fn test_nil_node() {
        let doc = Document::from_string(
            r#"<x xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#,
        )
        .unwrap();
        let value = Plain.process(doc.root().unwrap()).unwrap();
        assert_eq!(value, Value::Null);
    }
}
