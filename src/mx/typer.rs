//! xsi:type annotation
//!
//! Automatic typing maps a value's runtime class to a built-in XSD
//! primitive; manual typing takes an explicit type name and namespace,
//! generating a fresh collision-free prefix when one is needed.

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::{Namespace, NamespaceContext, QName};
use crate::sudsobject::Value;
use crate::XSD_NAMESPACE;

/// XML node typing, automatic or manual.
pub struct Typer;

impl Typer {
    /// The built-in Value class to xs type mapping
    fn builtin(value: &Value) -> &'static str {
        match value {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "dateTime",
            // Unmapped classes default to string.
            _ => "string",
        }
    }

    /// Automatically set the node's `xsi:type` from the value's runtime
    /// class: a metadata-embedded known type wins, else the built-in
    /// primitive mapping, defaulting to string.
    pub fn auto(node: &mut Element, value: &Value) -> Result<()> {
        if let Some(qname) = Self::known(value) {
            let ns = qname.namespace.as_ref().map(|uri| Namespace {
                prefix: None,
                uri: uri.clone(),
            });
            return Self::manual(node, &qname.local_name, ns.as_ref());
        }
        // An object with no known type stays untyped.
        if matches!(value, Value::Object(_)) {
            return Ok(());
        }
        let qname = Self::auto_qname(value);
        Self::manual(node, &qname.local_name, Some(&Namespace::xsd()))
    }

    /// Set the node's `xsi:type` to `tval`, qualified by `ns` when given.
    /// The XSI prefix and the type's namespace prefix are declared on the
    /// node.
    pub fn manual(node: &mut Element, tval: &str, ns: Option<&Namespace>) -> Result<()> {
        node.add_prefix("xsi", crate::XSI_NAMESPACE);
        match ns {
            None => node.set("xsi:type", tval),
            Some(ns) => {
                let prefix = Self::gen_prefix(node, &ns.uri)?;
                node.set("xsi:type", format!("{}:{}", prefix, tval));
                node.add_prefix(prefix, ns.uri.clone());
            }
        }
        Ok(())
    }

    /// Generate a prefix for `uri` that does not collide with any prefix
    /// already mapped on the node: `ns1`..`ns1023`, reusing a prefix
    /// already bound to the same URI. Exhaustion is fatal.
    pub fn gen_prefix(node: &Element, uri: &str) -> Result<String> {
        let empty = NamespaceContext::default();
        for n in 1..1024 {
            let prefix = format!("ns{}", n);
            match node.resolve_prefix(&prefix, &empty) {
                None => return Ok(prefix),
                Some(bound) if bound == uri => return Ok(prefix),
                Some(_) => continue,
            }
        }
        Err(Error::Namespace("auto prefix, exhausted".to_string()))
    }

    /// The known (metadata) type of a value, when present
    pub fn known(value: &Value) -> Option<&QName> {
        match value {
            Value::Object(object) => object.metadata.type_qname.as_ref(),
            _ => None,
        }
    }

    /// The xs primitive QName for a value's runtime class
    pub fn auto_qname(value: &Value) -> QName {
        QName::namespaced(XSD_NAMESPACE, Self::builtin(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sudsobject::SudsObject;

    #[test]
    fn test_auto_builtin_mapping() {
        let mut node = Element::new("e");
        Typer::auto(&mut node, &Value::from(5i64)).unwrap();
        let t = node.get("type").unwrap();
        assert!(t.ends_with(":int"));
        // The generated prefix is declared on the node.
        let prefix = t.split(':').next().unwrap();
        assert_eq!(
            node.nsdecls.get_namespace(prefix),
            Some(crate::XSD_NAMESPACE)
        );
        assert_eq!(
            node.nsdecls.get_namespace("xsi"),
            Some(crate::XSI_NAMESPACE)
        );
    }

    #[test]
    fn test_auto_unmapped_defaults_to_string() {
        let mut node = Element::new("e");
        Typer::auto(&mut node, &Value::List(vec![])).unwrap();
        assert!(node.get("type").unwrap().ends_with(":string"));
    }

    #[test]
    fn test_auto_known_metadata_type() {
        let mut object = SudsObject::new("Person");
        object.metadata.type_qname = Some(QName::namespaced("http://tns/", "Person"));
        let mut node = Element::new("e");
        Typer::auto(&mut node, &Value::Object(object)).unwrap();
        let t = node.get("type").unwrap();
        assert!(t.ends_with(":Person"));
    }

    #[test]
    fn test_gen_prefix_reuses_same_uri() {
        let mut node = Element::new("e");
        node.add_prefix("ns1", "http://one/");
        assert_eq!(Typer::gen_prefix(&node, "http://one/").unwrap(), "ns1");
    }

    #[test]
    fn test_gen_prefix_skips_colliding() {
        let mut node = Element::new("e");
        node.add_prefix("ns1", "http://one/");
        node.add_prefix("ns2", "http://two/");
        assert_eq!(Typer::gen_prefix(&node, "http://three/").unwrap(), "ns3");
    }

    #[test]
    fn test_gen_prefix_exhaustion() {
        let mut node = Element::new("e");
        for n in 1..1024 {
            node.add_prefix(format!("ns{}", n), format!("http://{}/", n));
        }
        let err = Typer::gen_prefix(&node, "http://fresh/").unwrap_err();
        assert!(matches!(err, Error::Namespace(_)));
    }
}
