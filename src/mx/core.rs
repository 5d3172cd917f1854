//! Marshaller core: the shared tree walk
//!
//! The walk visits one [`Content`] per node in four states: start (decide
//! whether to proceed), append (create the element and recurse), suspend/
//! resume (around list expansion, so derived marshallers can defer a node
//! until its item count is known), and end (post-processing such as nil or
//! array-type attributes).

use tracing::debug;

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::sudsobject::Value;
use crate::xsd::schema::NodeId;

/// SOAP-encoded array marker attached to content during encoded-style
/// processing. Drives the `soapenc:arrayType` attribute on output.
#[derive(Debug, Clone)]
pub struct ArrayType {
    /// Tag of the array-valued content
    pub tag: String,
    /// Qualified item type referenced by `wsdl:arrayType`
    pub item: QName,
}

/// Marshaller content: one tagged value in the tree walk.
///
/// Created per walk step and owned by the walk. The field set is closed;
/// binding-specific state (`aty`) is a declared optional field rather than
/// a dynamically injected attribute.
#[derive(Debug, Clone)]
pub struct Content {
    /// The content tag; defaulted to the value's class name when unset
    pub tag: Option<String>,
    /// The value being marshalled
    pub value: Value,
    /// Declared schema type, when known
    pub type_id: Option<NodeId>,
    /// Resolved (real) schema type, filled in by typed marshallers
    pub real: Option<NodeId>,
    /// SOAP-encoded array marker
    pub aty: Option<ArrayType>,
}

impl Content {
    /// Untyped content
    pub fn new(tag: impl Into<String>, value: Value) -> Self {
        Self {
            tag: Some(tag.into()),
            value,
            type_id: None,
            real: None,
            aty: None,
        }
    }

    /// Content with a declared schema type
    pub fn typed(tag: impl Into<String>, value: Value, type_id: NodeId) -> Self {
        Self {
            type_id: Some(type_id),
            ..Self::new(tag, value)
        }
    }

    /// Content without an explicit tag; the value's class name applies
    pub fn untagged(value: Value) -> Self {
        Self {
            tag: None,
            value,
            type_id: None,
            real: None,
            aty: None,
        }
    }

    /// The effective tag. Never empty once a walk has started.
    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }

    fn ensure_tag(&mut self) {
        if self.tag.is_none() {
            self.tag = Some(self.value.class_name().to_string());
        }
    }
}

/// The marshaller state machine.
///
/// Implementors override the hooks; the provided `process`/`append`
/// drivers implement the walk itself.
pub trait Marshaller {
    /// Reset per-process state (e.g. the resolution stack)
    fn reset(&mut self) {}

    /// Appending this content has started. Return false to skip it.
    fn start(&mut self, _content: &mut Content) -> Result<bool> {
        Ok(true)
    }

    /// Node construction has been suspended (list expansion pending)
    fn suspend(&mut self, _content: &mut Content) -> Result<()> {
        Ok(())
    }

    /// Node construction has resumed
    fn resume(&mut self, _content: &mut Content) -> Result<()> {
        Ok(())
    }

    /// Appending this content has ended
    fn end(&mut self, _parent: &mut Element, _content: &mut Content) -> Result<()> {
        Ok(())
    }

    /// Create the XML node for the content
    fn node(&mut self, content: &Content) -> Result<Element> {
        Ok(Element::new(content.tag()))
    }

    /// Mark a node nil
    fn set_nil(&mut self, _node: &mut Element, _content: &mut Content) {}

    /// Whether a null value should be rendered as a nil node (true) or
    /// skipped (false)
    fn nillable(&mut self, _content: &Content) -> bool {
        false
    }

    /// The textual form of a scalar value
    fn text_of(&mut self, content: &Content) -> Result<Option<String>> {
        match &content.value {
            Value::Object(object) if crate::sudsobject::is_property(object) => {
                Ok(object.get("value").and_then(Value::to_text))
            }
            _ => Ok(content.value.to_text()),
        }
    }

    /// Content for one object field
    fn child_content(&mut self, _parent: &Content, name: &str, value: Value) -> Result<Content> {
        Ok(Content::new(name, value))
    }

    /// Render an object field named with a leading underscore as an XML
    /// attribute on the node.
    fn attribute(&mut self, node: &mut Element, name: &str, value: &Value) -> Result<()> {
        if let Some(text) = value.to_text() {
            node.set(name, text);
        }
        Ok(())
    }

    /// Content for one list item; items repeat the list's tag and type
    fn item_content(&mut self, parent: &Content, value: Value) -> Result<Content> {
        Ok(Content {
            tag: parent.tag.clone(),
            value,
            type_id: parent.type_id,
            real: None,
            aty: None,
        })
    }

    /// Process (marshal) a content tree into an XML element.
    fn process(&mut self, content: Content) -> Result<Element> {
        debug!(tag = content.tag().to_string(), "marshalling");
        self.reset();
        let mut content = content;
        content.ensure_tag();
        let mut root = Element::new("document");
        self.append(&mut root, content)?;
        root.children
            .into_iter()
            .next()
            .ok_or_else(|| Error::Type("content produced no element".to_string()))
    }

    /// Append the content to the parent node.
    fn append(&mut self, parent: &mut Element, mut content: Content) -> Result<()> {
        content.ensure_tag();
        if !self.start(&mut content)? {
            return Ok(());
        }
        self.append_value(parent, &mut content)?;
        self.end(parent, &mut content)
    }

    /// Dispatch on the value kind: the content appender.
    fn append_value(&mut self, parent: &mut Element, content: &mut Content) -> Result<()> {
        enum Kind {
            Null,
            List,
            Object,
            Scalar,
        }
        let kind = match &content.value {
            Value::Null => Kind::Null,
            // Property wrappers render as text-only nodes.
            Value::Object(object) if crate::sudsobject::is_property(object) => Kind::Scalar,
            Value::List(_) => Kind::List,
            Value::Object(_) => Kind::Object,
            _ => Kind::Scalar,
        };
        match kind {
            Kind::Null => {
                if self.nillable(content) {
                    let mut node = self.node(content)?;
                    self.set_nil(&mut node, content);
                    parent.append(node);
                }
                // Otherwise the value is simply not rendered.
                Ok(())
            }
            Kind::List => {
                self.suspend(content)?;
                let items = match std::mem::replace(&mut content.value, Value::Null) {
                    Value::List(items) => items,
                    _ => unreachable!(),
                };
                for item in items {
                    let child = self.item_content(content, item)?;
                    self.append(parent, child)?;
                }
                self.resume(content)
            }
            Kind::Object => {
                let mut node = self.node(content)?;
                let fields: Vec<(String, Value)> = match &content.value {
                    Value::Object(object) => object
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.clone()))
                        .collect(),
                    _ => unreachable!(),
                };
                for (name, value) in fields {
                    if let Some(attr) = name.strip_prefix('_') {
                        self.attribute(&mut node, attr, &value)?;
                        continue;
                    }
                    let child = self.child_content(content, &name, value)?;
                    self.append(&mut node, child)?;
                }
                parent.append(node);
                Ok(())
            }
            Kind::Scalar => {
                let mut node = self.node(content)?;
                if let Some(text) = self.text_of(content)? {
                    node.set_text(text);
                }
                parent.append(node);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Marshaller for Plain {}

    #[test]
    fn test_default_tag_is_class_name() {
        let mut m = Plain;
        let node = m.process(Content::untagged(Value::from(5i64))).unwrap();
        assert_eq!(node.name, "int");
        assert_eq!(node.text(), Some("5"));
    }

    #[test]
    fn test_null_skipped_by_default() {
        let mut m = Plain;
        let mut parent = Element::new("parent");
        m.append(&mut parent, Content::new("x", Value::Null)).unwrap();
        assert!(parent.children.is_empty());
    }

    #[test]
    fn test_list_repeats_tag() {
        let mut m = Plain;
        let mut parent = Element::new("parent");
        let list = Value::List(vec![Value::from(1i64), Value::from(2i64)]);
        m.append(&mut parent, Content::new("n", list)).unwrap();
        assert_eq!(parent.children.len(), 2);
        assert!(parent.children.iter().all(|c| c.name == "n"));
    }
}
