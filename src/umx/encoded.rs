//! SOAP-encoded unmarshaller
//!
//! Adds SOAP section-5 array decoding to the typed unmarshaller: a node
//! carrying `soapenc:arrayType` unmarshals to a plain list, and its item
//! elements inherit the declared item type when they carry no `xsi:type`
//! of their own.

use crate::document::Element;
use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::sudsobject::Value;
use crate::umx::core::{Content, Unmarshaller};
use crate::umx::typed::Typed;
use crate::xsd::schema::{NodeId, Schema};
use crate::SOAP_ENC_NAMESPACE;

/// An unmarshaller for rpc/encoded replies.
pub struct Encoded<'s> {
    typed: Typed<'s>,
    /// Pending array item type per nesting level; `None` entries keep the
    /// stack aligned for non-array nodes.
    items: Vec<Option<NodeId>>,
}

impl<'s> Encoded<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            typed: Typed::new(schema),
            items: Vec::new(),
        }
    }

    fn schema(&self) -> &'s Schema {
        self.typed.schema()
    }

    /// Parse a `soapenc:arrayType` attribute into the item type's
    /// qualified name. Multi-dimensional and partially transmitted arrays
    /// are rejected.
    fn array_type_of(&self, node: &Element) -> Result<Option<QName>> {
        let value = match node.get_ns("arrayType", SOAP_ENC_NAMESPACE) {
            Some(value) => value,
            None => return Ok(None),
        };
        let mut parts = value.split('[');
        let reference = parts.next().unwrap_or("");
        let dims = parts.clone().count();
        let comma = parts.any(|p| p.contains(','));
        if dims > 1 || comma {
            return Err(Error::Unsupported(format!(
                "multi-dimensional SOAP array: {value}"
            )));
        }
        let (prefix, local) = crate::namespaces::split_prefix(reference);
        let namespace = match prefix {
            Some(prefix) => node.resolve_prefix(prefix, &NamespaceContext::new()),
            None => None,
        };
        Ok(Some(QName::new(namespace, local.to_string())))
    }
}

impl Unmarshaller for Encoded<'_> {
    fn reset(&mut self) {
        self.typed.reset();
        self.items.clear();
    }

    fn start(&mut self, content: &mut Content<'_>) -> Result<()> {
        let aty = self.array_type_of(content.node)?;
        let item = aty.as_ref().and_then(|qname| {
            self.schema()
                .xsd_type(qname)
                .or_else(|| self.schema().element(qname))
        });
        self.items.push(item);
        content.aty = aty;
        self.typed.start(content)
    }

    fn end(&mut self, content: &mut Content<'_>) -> Result<()> {
        self.items.pop();
        self.typed.end(content)
    }

    fn child(&mut self, parent: &mut Content<'_>, node: &Element) -> Result<(Value, bool)> {
        let mut content = Content::new(node);
        // Array items without an explicit xsi:type take the array's
        // declared item type.
        if let Some(Some(item)) = self.items.last() {
            if self.typed.xsi_type(node).is_none() {
                content.type_id = Some(*item);
            }
        }
        let value = self.run(&mut content)?;
        // Items of an array always collect into a list, even when there
        // is only one of them.
        let multi = parent.aty.is_some() || self.multi_occurrence(&content);
        Ok((value, multi))
    }

    fn multi_occurrence(&mut self, content: &Content<'_>) -> bool {
        self.typed.multi_occurrence(content)
    }

    fn append_attribute(&mut self, name: &str, value: &str, content: &mut Content<'_>) -> Result<()> {
        self.typed.append_attribute(name, value, content)
    }

    fn translated(&mut self, content: &Content<'_>, text: &str) -> Result<Value> {
        self.typed.translated(content, text)
    }

    fn nillable(&mut self, content: &Content<'_>) -> bool {
        self.typed.nillable(content)
    }

    fn postprocess(&mut self, content: &mut Content<'_>) -> Result<Value> {
        if content.aty.is_none() {
            return self.typed.postprocess(content);
        }
        // An array reduces to a plain list of its items.
        let items = content.data.take_first_list().unwrap_or_default();
        Ok(Value::List(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::xsd::schema::{NoLoader, Schema};

    const ARRAY_XSD: &str = r#"
        <schema xmlns="http://www.w3.org/2001/XMLSchema"
                xmlns:xs="http://www.w3.org/2001/XMLSchema"
                xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                xmlns:soapenc="http://schemas.xmlsoap.org/soap/encoding/"
                targetNamespace="http://example.com/arr">
          <complexType name="IntArray">
            <complexContent>
              <restriction base="soapenc:Array">
                <attribute ref="soapenc:arrayType" wsdl:arrayType="xs:int[]"/>
              </restriction>
            </complexContent>
          </complexType>
          <element name="numbers" type="IntArray"/>
        </schema>"#;

    fn array_schema() -> Schema {
        let doc = Document::from_string(ARRAY_XSD).unwrap();
        let mut schema = Schema::new();
        schema.add_schema(doc.root().unwrap(), &mut NoLoader).unwrap();
        schema
    }

    #[test]
    fn test_array_to_list() {
        let schema = array_schema();
        let xml = r#"<numbers
            xmlns:enc="http://schemas.xmlsoap.org/soap/encoding/"
            xmlns:xs="http://www.w3.org/2001/XMLSchema"
            enc:arrayType="xs:int[3]">
            <item>1</item><item>2</item><item>3</item>
        </numbers>"#;
        let doc = Document::from_string(xml).unwrap();
        let value = Encoded::new(&schema).process(doc.root().unwrap()).unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_two_dimensional_rejected() {
        let schema = array_schema();
        let xml = r#"<numbers
            xmlns:enc="http://schemas.xmlsoap.org/soap/encoding/"
            xmlns:xs="http://www.w3.org/2001/XMLSchema"
            enc:arrayType="xs:int[2,2]"/>"#;
        let doc = Document::from_string(xml).unwrap();
        let err = Encoded::new(&schema).process(doc.root().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn test_item_xsi_type_wins() {
        let schema = array_schema();
        let xml = r#"<numbers
            xmlns:enc="http://schemas.xmlsoap.org/soap/encoding/"
            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
            xmlns:xs="http://www.w3.org/2001/XMLSchema"
            enc:arrayType="xs:int[2]">
            <item>1</item><item xsi:type="xs:string">two</item>
        </numbers>"#;
        let doc = Document::from_string(xml).unwrap();
        let value = Encoded::new(&schema).process(doc.root().unwrap()).unwrap();
        assert_eq!(
            value,
            Value::List(vec![Value::Int(1), Value::Text("two".to_string())])
        );
    }
}
