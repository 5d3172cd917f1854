//! Schema type resolution
//!
//! A [`NodeResolver`] locates the schema declaration matching an XML node
//! and chases `ref`/`type` indirection to the effective ("real") type. The
//! resolver carries an explicit frame stack scoped to one marshal or
//! unmarshal pass; independent passes never share stack state, so create a
//! resolver per call.

use std::collections::HashSet;

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::xsd::schema::{NodeId, NodeVariant, Schema};

/// One entry of the resolution stack: the node being resolved and its
/// already-resolved real type.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// The declaration (or declared type) under resolution
    pub node: NodeId,
    /// Its real (de-referenced, de-aliased) type
    pub resolved: NodeId,
}

/// Stack-based schema type resolver for one traversal.
pub struct NodeResolver<'s> {
    schema: &'s Schema,
    stack: Vec<Frame>,
}

impl<'s> NodeResolver<'s> {
    /// Create a resolver over a schema with an empty stack
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            stack: Vec::new(),
        }
    }

    /// Push a resolution frame
    pub fn push(&mut self, frame: Frame) {
        self.stack.push(frame);
    }

    /// Pop the innermost frame
    pub fn pop(&mut self) -> Option<Frame> {
        self.stack.pop()
    }

    /// The innermost frame
    pub fn top(&self) -> Option<&Frame> {
        self.stack.last()
    }

    /// Resolve a node to its real type, following `ref` and `type` chains
    /// until a node with no further indirection. A node reachable from
    /// itself through reference chains resolves to itself, terminating the
    /// chase rather than looping.
    pub fn real_type(&self, id: NodeId) -> NodeId {
        let mut seen = HashSet::new();
        let mut current = id;
        loop {
            if !seen.insert(current) {
                return current;
            }
            let node = self.schema.node(current);
            // ref="..." points at another declaration of the same kind.
            if let Some(reference) = &node.reference {
                let target = match node.variant {
                    NodeVariant::Element => self.schema.element(reference),
                    NodeVariant::Attribute => self.schema.attribute(reference),
                    NodeVariant::Group | NodeVariant::AttributeGroup => {
                        self.schema.group(reference)
                    }
                    _ => None,
                };
                if let Some(target) = target {
                    current = target;
                    continue;
                }
                return current;
            }
            match node.variant {
                NodeVariant::Element | NodeVariant::Attribute => {
                    // Explicit type reference wins; otherwise an inline
                    // (anonymous) type definition.
                    if let Some(type_ref) = &node.type_ref {
                        if let Some(target) = self.schema.xsd_type(type_ref) {
                            current = target;
                            continue;
                        }
                        return current;
                    }
                    let inline = node.children.iter().copied().find(|&c| {
                        matches!(
                            self.schema.node(c).variant,
                            NodeVariant::SimpleType | NodeVariant::ComplexType
                        )
                    });
                    match inline {
                        Some(t) => {
                            current = t;
                            continue;
                        }
                        None => return current,
                    }
                }
                _ => return current,
            }
        }
    }

    fn matches(&self, declaration: NodeId, qname: &QName) -> bool {
        // A ref'd declaration matches under its target name.
        let node = self.schema.node(declaration);
        if let Some(reference) = &node.reference {
            return reference == qname
                || reference.local_name == qname.local_name && qname.namespace.is_none();
        }
        match &node.name {
            Some(name) if *name == qname.local_name => {
                // Unqualified instance elements still match qualified
                // declarations; a URI mismatch does not.
                match (&node.namespace, &qname.namespace) {
                    (_, None) | (None, _) => true,
                    (Some(a), Some(b)) => a == b,
                }
            }
            _ => false,
        }
    }

    /// Locate the declaration matching an XML node within the active
    /// context, push its frame, and return it. The search order is the
    /// innermost resolved type's members, then global element
    /// declarations.
    pub fn find(&mut self, node: &Element) -> Result<NodeId> {
        let qname = QName::new(node.namespace.clone(), node.name.clone());
        let found = self
            .lookup(&qname)
            .ok_or_else(|| Error::TypeNotFound(qname.to_string()))?;
        let resolved = self.real_type(found);
        self.push(Frame {
            node: found,
            resolved,
        });
        Ok(found)
    }

    /// Locate a declaration by plain tag name within the active context
    /// and push its frame. Used by the typed marshaller, which walks value
    /// tags rather than XML nodes.
    pub fn find_name(&mut self, tag: &str) -> Result<NodeId> {
        let qname = QName::local(tag);
        let found = self
            .lookup(&qname)
            .ok_or_else(|| Error::TypeNotFound(tag.to_string()))?;
        let resolved = self.real_type(found);
        self.push(Frame {
            node: found,
            resolved,
        });
        Ok(found)
    }

    /// Advisory lookup: like [`find`](Self::find) but without failing or
    /// pushing, used when an expected type is already known.
    pub fn known(&self, node: &Element) -> Option<NodeId> {
        let qname = QName::new(node.namespace.clone(), node.name.clone());
        self.lookup(&qname).map(|id| self.real_type(id))
    }

    fn lookup(&self, qname: &QName) -> Option<NodeId> {
        if let Some(frame) = self.top() {
            for member in self.schema.type_elements(frame.resolved) {
                if self.matches(member, qname) {
                    return Some(member);
                }
            }
        }
        self.schema
            .element(qname)
            .or_else(|| match &qname.namespace {
                // Unqualified lookups fall back to any-namespace match.
                None => self
                    .schema
                    .elements
                    .iter()
                    .find(|((local, _), _)| *local == qname.local_name)
                    .map(|(_, &id)| id),
                Some(_) => None,
            })
    }

    /// Resolve an attribute declaration by name, scoped to the current
    /// complex-type context, falling back to global attributes.
    pub fn findattr(&self, name: &str) -> Option<NodeId> {
        if let Some(frame) = self.top() {
            for member in self.schema.type_attributes(frame.resolved) {
                let node = self.schema.node(member);
                if node.name.as_deref() == Some(name) {
                    return Some(member);
                }
                if let Some(reference) = &node.reference {
                    if reference.local_name == name {
                        return Some(member);
                    }
                }
            }
        }
        self.schema
            .attributes
            .iter()
            .find(|((local, _), _)| local == name)
            .map(|(_, &id)| id)
    }

    /// The schema this resolver reads from
    pub fn schema(&self) -> &'s Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::xsd::schema::tests::person_schema;
    use crate::xsd::schema::{NoLoader, XsdPrimitive};
    use crate::XSD_NAMESPACE;

    #[test]
    fn test_find_global_element() {
        let schema = person_schema();
        let mut resolver = NodeResolver::new(&schema);
        let doc = Document::from_string(
            r#"<p:person xmlns:p="http://example.com/person"/>"#,
        )
        .unwrap();
        let found = resolver.find(doc.root().unwrap()).unwrap();
        assert_eq!(schema.node(found).name.as_deref(), Some("person"));
        // The pushed frame's resolved type is the Person complex type.
        let top = resolver.top().unwrap();
        assert_eq!(
            schema.node(top.resolved).name.as_deref(),
            Some("Person")
        );
    }

    #[test]
    fn test_find_scoped_member() {
        let schema = person_schema();
        let mut resolver = NodeResolver::new(&schema);
        let doc = Document::from_string(
            r#"<p:person xmlns:p="http://example.com/person"><p:age>4</p:age></p:person>"#,
        )
        .unwrap();
        resolver.find(doc.root().unwrap()).unwrap();
        let age = &doc.root().unwrap().children[0];
        let found = resolver.find(age).unwrap();
        let resolved = resolver.top().unwrap().resolved;
        assert_eq!(schema.node(found).name.as_deref(), Some("age"));
        assert_eq!(
            schema.node(resolved).variant,
            crate::xsd::schema::NodeVariant::Builtin(XsdPrimitive::Int)
        );
    }

    #[test]
    fn test_find_unknown_fails() {
        let schema = person_schema();
        let mut resolver = NodeResolver::new(&schema);
        let doc = Document::from_string(r#"<unknown/>"#).unwrap();
        let err = resolver.find(doc.root().unwrap()).unwrap_err();
        assert!(matches!(err, Error::TypeNotFound(_)));
        assert!(resolver.top().is_none());
    }

    #[test]
    fn test_known_is_advisory() {
        let schema = person_schema();
        let resolver = NodeResolver::new(&schema);
        let doc = Document::from_string(r#"<unknown/>"#).unwrap();
        assert!(resolver.known(doc.root().unwrap()).is_none());
    }

    #[test]
    fn test_findattr_scoped() {
        let schema = person_schema();
        let mut resolver = NodeResolver::new(&schema);
        let doc = Document::from_string(
            r#"<p:person xmlns:p="http://example.com/person"/>"#,
        )
        .unwrap();
        resolver.find(doc.root().unwrap()).unwrap();
        let id_attr = resolver.findattr("id").unwrap();
        assert_eq!(schema.node(id_attr).name.as_deref(), Some("id"));
        assert!(resolver.findattr("bogus").is_none());
    }

    #[test]
    fn test_self_referential_type_terminates() {
        let xsd = r#"
            <schema xmlns="http://www.w3.org/2001/XMLSchema"
                    xmlns:tns="http://example.com/node"
                    targetNamespace="http://example.com/node"
                    elementFormDefault="qualified">
              <element name="node" type="tns:Node"/>
              <complexType name="Node">
                <sequence>
                  <element name="label" type="string"/>
                  <element name="child" type="tns:Node" minOccurs="0"/>
                </sequence>
              </complexType>
            </schema>"#;
        let doc = Document::from_string(xsd).unwrap();
        let mut schema = crate::xsd::schema::Schema::new();
        schema.add_schema(doc.root().unwrap(), &mut NoLoader).unwrap();

        let mut resolver = NodeResolver::new(&schema);
        // Resolve through several nesting levels without blowing up.
        let xml = r#"<n:node xmlns:n="http://example.com/node">
                       <n:child><n:child><n:child/></n:child></n:child>
                     </n:node>"#;
        let doc = Document::from_string(xml).unwrap();
        let mut node = doc.root().unwrap();
        loop {
            resolver.find(node).unwrap();
            let resolved = resolver.top().unwrap().resolved;
            assert_eq!(schema.node(resolved).name.as_deref(), Some("Node"));
            match node.children.first() {
                Some(child) => node = child,
                None => break,
            }
        }
    }

    #[test]
    fn test_real_type_of_builtin_is_identity() {
        let schema = person_schema();
        let resolver = NodeResolver::new(&schema);
        let string_type = schema
            .xsd_type(&QName::namespaced(XSD_NAMESPACE, "string"))
            .unwrap();
        assert_eq!(resolver.real_type(string_type), string_type);
    }
}
