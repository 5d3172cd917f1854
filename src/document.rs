//! XML tree model
//!
//! A namespace-aware element/attribute/text tree. The parser resolves
//! namespace prefixes while the element stack is live, so every element and
//! prefixed attribute carries a resolved namespace URI by the time the tree
//! reaches the marshaller or unmarshaller. Attribute and child order are
//! preserved exactly.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::namespaces::{split_prefix, Namespace, NamespaceContext};

/// An XML attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Prefix as written, `None` for unprefixed attributes
    pub prefix: Option<String>,
    /// Local name
    pub name: String,
    /// Resolved namespace URI; unprefixed attributes have none
    pub namespace: Option<String>,
    /// Attribute value
    pub value: String,
}

impl Attribute {
    /// The attribute name as written (`prefix:name` or `name`)
    pub fn qname(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }
}

/// XML element in the document tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Prefix as written, `None` for unprefixed elements
    pub prefix: Option<String>,
    /// Local name
    pub name: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
    /// Attributes in document order
    pub attributes: Vec<Attribute>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// Namespace declarations made on this element
    pub nsdecls: NamespaceContext,
    /// The effective namespace scope at this element (own declarations
    /// plus everything inherited), captured at parse time. Hand-built
    /// elements start with an empty scope.
    pub scope: NamespaceContext,
}

impl Element {
    /// Create an unqualified element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an element qualified by a namespace, declaring its prefix
    /// (or the default namespace) on the element itself.
    pub fn with_ns(name: impl Into<String>, ns: &Namespace) -> Self {
        let mut element = Self::new(name);
        element.namespace = Some(ns.uri.clone());
        match &ns.prefix {
            Some(p) => {
                element.prefix = Some(p.clone());
                element.nsdecls.add_prefix(p.clone(), ns.uri.clone());
            }
            None => element.nsdecls.set_default_namespace(ns.uri.clone()),
        }
        element
    }

    /// The element name as written (`prefix:name` or `name`)
    pub fn qname(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Declare a namespace prefix on this element
    pub fn add_prefix(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.nsdecls.add_prefix(prefix, uri);
    }

    /// Resolve a prefix against this element then an explicit ancestor
    /// scope, innermost ancestor first. Resolution scope is always threaded
    /// through the caller, never global.
    pub fn resolve_prefix(&self, prefix: &str, scope: &NamespaceContext) -> Option<String> {
        self.nsdecls
            .get_namespace(prefix)
            .or_else(|| self.scope.get_namespace(prefix))
            .or_else(|| scope.get_namespace(prefix))
            .map(|s| s.to_string())
    }

    /// Set an unqualified attribute, replacing an existing value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let (prefix, local) = split_prefix(&name);
        let prefix = prefix.map(|s| s.to_string());
        let local = local.to_string();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name == local && a.prefix == prefix)
        {
            existing.value = value;
            return;
        }
        self.attributes.push(Attribute {
            prefix,
            name: local,
            namespace: None,
            value,
        });
    }

    /// Set a namespace-qualified attribute
    pub fn set_ns(
        &mut self,
        prefix: impl Into<String>,
        name: impl Into<String>,
        uri: impl Into<String>,
        value: impl Into<String>,
    ) {
        let prefix = prefix.into();
        let uri = uri.into();
        self.nsdecls.add_prefix(prefix.clone(), uri.clone());
        self.attributes.push(Attribute {
            prefix: Some(prefix),
            name: name.into(),
            namespace: Some(uri),
            value: value.into(),
        });
    }

    /// Get an attribute value by local name, any namespace
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute value by local name and resolved namespace URI
    pub fn get_ns(&self, name: &str, uri: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == Some(uri))
            .map(|a| a.value.as_str())
    }

    /// Append a child element
    pub fn append(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// First child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|e| e.name == name)
    }

    /// First child with the given local name, mutably
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|e| e.name == name)
    }

    /// True when the element has no children and no text
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().map_or(true, |t| t.trim().is_empty())
    }

    /// True when the element carries `xsi:nil="true"`
    pub fn is_nil(&self) -> bool {
        self.get_ns("nil", crate::XSI_NAMESPACE)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.qname());
        if let Some(default_ns) = self.nsdecls.get_default_namespace() {
            out.push_str(&format!(" xmlns=\"{}\"", escape(default_ns)));
        }
        let mut decls: Vec<(&str, &str)> = self.nsdecls.iter().collect();
        decls.sort();
        for (p, u) in decls {
            out.push_str(&format!(" xmlns:{}=\"{}\"", p, escape(u)));
        }
        for attr in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", attr.qname(), escape(&attr.value)));
        }
        if self.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text.as_str()));
        }
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.qname());
        out.push('>');
    }

    /// Serialize the element subtree to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }
}

/// XML Document representation
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a document around a root element
    pub fn with_root(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut doc = Document::new();
        // Each stack entry pairs the element under construction with the
        // namespace scope inherited from its ancestors plus its own decls.
        let mut stack: Vec<(Element, NamespaceContext)> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let entry = Self::open_element(&e, stack.last().map(|(_, ctx)| ctx))?;
                    stack.push(entry);
                }
                Ok(Event::End(_)) => match stack.pop() {
                    Some((element, _)) => {
                        if let Some((parent, _)) = stack.last_mut() {
                            parent.append(element);
                        } else {
                            doc.root = Some(element);
                        }
                    }
                    None => return Err(Error::Xml("unexpected end tag".to_string())),
                },
                Ok(Event::Empty(e)) => {
                    let (element, _) = Self::open_element(&e, stack.last().map(|(_, ctx)| ctx))?;
                    if let Some((parent, _)) = stack.last_mut() {
                        parent.append(element);
                    } else {
                        doc.root = Some(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some((current, _)) = stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("failed to unescape text: {}", e)))?
                            .to_string();
                        if !text.trim().is_empty() {
                            match &mut current.text {
                                Some(existing) => existing.push_str(&text),
                                None => current.text = Some(text),
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // Ignore comments, processing instructions, etc.
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }
        Ok(doc)
    }

    /// Build an element (and its effective namespace scope) from a start tag
    fn open_element(
        start: &BytesStart,
        inherited: Option<&NamespaceContext>,
    ) -> Result<(Element, NamespaceContext)> {
        let raw_name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?
            .to_string();
        let (prefix, local) = split_prefix(&raw_name);

        let mut element = Element::new(local);
        element.prefix = prefix.map(|s| s.to_string());

        // Raw attributes, namespace declarations peeled off first.
        let mut pending: Vec<(Option<String>, String, String)> = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("failed to parse attribute: {}", e)))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?;
            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("failed to unescape attribute value: {}", e)))?
                .to_string();

            if attr_name == "xmlns" {
                element.nsdecls.set_default_namespace(attr_value);
            } else if let Some(p) = attr_name.strip_prefix("xmlns:") {
                element.nsdecls.add_prefix(p, attr_value);
            } else {
                let (p, n) = split_prefix(attr_name);
                pending.push((p.map(|s| s.to_string()), n.to_string(), attr_value));
            }
        }

        // Effective scope: own declarations shadowing the inherited ones.
        let mut scope = element.nsdecls.clone();
        if let Some(outer) = inherited {
            scope.inherit(outer);
        }

        element.namespace = match &element.prefix {
            Some(p) => Some(
                scope
                    .get_namespace(p)
                    .ok_or_else(|| Error::Namespace(format!("prefix ({}) not resolved", p)))?
                    .to_string(),
            ),
            None => scope.get_default_namespace().map(|s| s.to_string()),
        };

        element.scope = scope.clone();

        for (p, n, v) in pending {
            let namespace = match &p {
                Some(prefix) => Some(
                    scope
                        .get_namespace(prefix)
                        .ok_or_else(|| Error::Namespace(format!("prefix ({}) not resolved", prefix)))?
                        .to_string(),
                ),
                // Unprefixed attributes are in no namespace.
                None => None,
            };
            element.attributes.push(Attribute {
                prefix: p,
                name: n,
                namespace,
                value: v,
            });
        }

        Ok((element, scope))
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Get the root element mutably
    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.root.as_mut()
    }

    /// Serialize to XML text with declaration
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        if let Some(root) = &self.root {
            out.push_str(&root.to_xml());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_xml() {
        let xml = r#"<root><child>text</child></root>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].name, "child");
        assert_eq!(root.children[0].text(), Some("text"));
    }

    #[test]
    fn test_prefix_resolution_at_parse() {
        let xml = r#"<t:root xmlns:t="http://example.com/t"><t:child/></t:root>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.namespace.as_deref(), Some("http://example.com/t"));
        // Children inherit the scope even without their own declarations.
        assert_eq!(
            root.children[0].namespace.as_deref(),
            Some("http://example.com/t")
        );
    }

    #[test]
    fn test_default_namespace_inheritance() {
        let xml = r#"<root xmlns="http://example.com"><child/></root>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.namespace.as_deref(), Some("http://example.com"));
        assert_eq!(root.children[0].namespace.as_deref(), Some("http://example.com"));
    }

    #[test]
    fn test_qualified_attributes() {
        let xml = r#"<root xmlns:e="http://enc/" e:arrayType="xs:int[3]" plain="v"/>"#;
        let doc = Document::from_string(xml).unwrap();
        let root = doc.root().unwrap();
        assert_eq!(root.get_ns("arrayType", "http://enc/"), Some("xs:int[3]"));
        assert_eq!(root.get("plain"), Some("v"));
        // Unprefixed attributes carry no namespace.
        assert_eq!(root.get_ns("plain", "http://enc/"), None);
    }

    #[test]
    fn test_dangling_prefix_fails() {
        let xml = r#"<p:root/>"#;
        assert!(Document::from_string(xml).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut root = Element::with_ns("Envelope", &Namespace::new("SOAP-ENV", crate::SOAP_ENV_NAMESPACE));
        let mut body = Element::with_ns("Body", &Namespace::new("SOAP-ENV", crate::SOAP_ENV_NAMESPACE));
        let mut item = Element::new("name");
        item.set_text("grace & co");
        body.append(item);
        root.append(body);

        let xml = Document::with_root(root).to_xml();
        assert!(xml.contains("<SOAP-ENV:Envelope"));
        assert!(xml.contains("grace &amp; co"));

        let parsed = Document::from_string(&xml).unwrap();
        let reroot = parsed.root().unwrap();
        assert_eq!(reroot.namespace.as_deref(), Some(crate::SOAP_ENV_NAMESPACE));
        assert_eq!(
            reroot.children[0].children[0].text(),
            Some("grace & co")
        );
    }

    #[test]
    fn test_set_replaces_attribute() {
        let mut el = Element::new("e");
        el.set("a", "1");
        el.set("a", "2");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.get("a"), Some("2"));
    }

    #[test]
    fn test_resolve_prefix_scoped() {
        let el = Element::with_ns("e", &Namespace::new("t", "http://t/"));
        let mut scope = NamespaceContext::new();
        scope.add_prefix("o", "http://outer/");
        assert_eq!(el.resolve_prefix("t", &scope).as_deref(), Some("http://t/"));
        assert_eq!(el.resolve_prefix("o", &scope).as_deref(), Some("http://outer/"));
        assert_eq!(el.resolve_prefix("zz", &scope), None);
    }

    #[test]
    fn test_nil_detection() {
        let xml = r#"<e xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#;
        let doc = Document::from_string(xml).unwrap();
        assert!(doc.root().unwrap().is_nil());
    }
}
