//! XML Schema model and resolution
//!
//! Parses WSDL `<types>` fragments into a graph of schema nodes, resolves
//! cross-references, and orders component processing by dependency.

pub mod depsort;
pub mod resolver;
pub mod schema;

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::{split_prefix, QName};

/// Qualify a referenced schema type name by namespace.
///
/// A prefixed reference is resolved against the referencing element's
/// namespace scope; an unprefixed one falls back to the supplied default
/// (normally the schema's target namespace). The result always carries a
/// resolved URI, never a dangling prefix.
pub fn qualify(reference: &str, node: &Element, default_ns: Option<&str>) -> Result<QName> {
    match split_prefix(reference) {
        (Some(prefix), local) => {
            let uri = node
                .resolve_prefix(prefix, &Default::default())
                .ok_or_else(|| Error::Namespace(format!("prefix ({}) not resolved", prefix)))?;
            Ok(QName::namespaced(uri, local))
        }
        (None, local) => Ok(QName::new(default_ns, local)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn test_qualify_prefixed() {
        let doc = Document::from_string(
            r#"<e xmlns:tns="http://example.com/tns" type="tns:Person"/>"#,
        )
        .unwrap();
        let node = doc.root().unwrap();
        let qname = qualify(node.get("type").unwrap(), node, None).unwrap();
        assert_eq!(qname, QName::namespaced("http://example.com/tns", "Person"));
    }

    #[test]
    fn test_qualify_unprefixed_uses_default() {
        let doc = Document::from_string(r#"<e type="Person"/>"#).unwrap();
        let node = doc.root().unwrap();
        let qname = qualify("Person", node, Some("http://tns/")).unwrap();
        assert_eq!(qname, QName::namespaced("http://tns/", "Person"));
    }

    #[test]
    fn test_qualify_dangling_prefix() {
        let doc = Document::from_string(r#"<e/>"#).unwrap();
        let node = doc.root().unwrap();
        assert!(qualify("zz:Person", node, None).is_err());
    }
}
