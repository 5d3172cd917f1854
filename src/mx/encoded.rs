//! SOAP-encoded (rpc/encoded) marshaller
//!
//! Wraps the literal marshaller and layers SOAP section-5 encoding on top:
//! every element carries an explicit `xsi:type`, and list values whose
//! declared type is a SOAP `Array` restriction are rendered as `<item>`
//! children under a node stamped with `soapenc:arrayType`.

use crate::document::Element;
use crate::error::{Error, Result};
use crate::mx::core::{ArrayType, Content, Marshaller};
use crate::mx::literal::Literal;
use crate::mx::typer::Typer;
use crate::namespaces::Namespace;
use crate::sudsobject::{Factory, SudsObject, Value};
use crate::xsd::schema::Schema;
use crate::SOAP_ENC_NAMESPACE;

/// Conventional tag for SOAP-encoded array items.
const ITEM_TAG: &str = "item";

/// A typed marshaller for the rpc/encoded style.
pub struct Encoded<'s> {
    literal: Literal<'s>,
}

impl<'s> Encoded<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            literal: Literal::new(schema),
        }
    }

    fn schema(&self) -> &'s Schema {
        self.literal.schema()
    }

    /// The item type named by `wsdl:arrayType` on the resolved type's
    /// attributes, when the type is a SOAP array restriction.
    fn array_item(&self, content: &Content) -> Option<ArrayType> {
        let real = content.real?;
        let schema = self.schema();
        for attr in schema.type_attributes(real) {
            if let Some(item) = &schema.node(attr).array_type {
                return Some(ArrayType {
                    tag: content.tag().to_string(),
                    item: item.clone(),
                });
            }
        }
        None
    }

    /// Cast a list value into a SOAP array object: an object carrying an
    /// `item` list whose members are stamped with the array's item type.
    fn cast(&mut self, content: &mut Content) -> Result<()> {
        let aty = match &content.aty {
            Some(aty) => aty.clone(),
            None => return Ok(()),
        };
        let schema = self.schema();
        let item_id = schema
            .xsd_type(&aty.item)
            .or_else(|| schema.element(&aty.item))
            .ok_or_else(|| Error::TypeNotFound(aty.item.to_string()))?;
        let class = content
            .real
            .and_then(|id| schema.node(id).name.clone())
            .unwrap_or_else(|| "Array".to_string());
        let items = match std::mem::replace(&mut content.value, Value::Null) {
            Value::List(items) => items,
            other => vec![other],
        };
        let stamped: Vec<Value> = items
            .into_iter()
            .map(|item| match item {
                Value::Object(mut object) => {
                    object.metadata.sxtype = Some(item_id);
                    object.metadata.type_qname = Some(aty.item.clone());
                    Value::Object(object)
                }
                other => {
                    let mut property = Factory::property(ITEM_TAG, other);
                    property.metadata.sxtype = Some(item_id);
                    property.metadata.type_qname = Some(aty.item.clone());
                    Value::Object(property)
                }
            })
            .collect();
        let mut array = SudsObject::new(class);
        array.set(ITEM_TAG, Value::List(stamped));
        content.value = Value::Object(array);
        Ok(())
    }

    /// Stamp `soapenc:arrayType` on the array node just appended under the
    /// parent. The item count comes from the cast array's item list.
    fn set_array_type(&mut self, parent: &mut Element, content: &Content) -> Result<()> {
        let aty = match &content.aty {
            Some(aty) => aty,
            None => return Ok(()),
        };
        let count = match &content.value {
            Value::Object(array) => array.first_list().map(|l| l.len()).unwrap_or(0),
            _ => 0,
        };
        // The array node is the one the driver just appended.
        let node = match parent.children.last_mut() {
            Some(node) if node.name == aty.tag => node,
            _ => return Ok(()),
        };
        let item_ref = match &aty.item.namespace {
            Some(uri) => {
                let prefix = Typer::gen_prefix(node, uri)?;
                node.add_prefix(prefix.clone(), uri.clone());
                format!("{}:{}", prefix, aty.item.local_name)
            }
            None => aty.item.local_name.clone(),
        };
        let enc = Typer::gen_prefix(node, SOAP_ENC_NAMESPACE)?;
        node.set_ns(
            enc,
            "arrayType",
            SOAP_ENC_NAMESPACE,
            format!("{}[{}]", item_ref, count),
        );
        Ok(())
    }
}

impl Marshaller for Encoded<'_> {
    fn reset(&mut self) {
        self.literal.reset();
    }

    fn start(&mut self, content: &mut Content) -> Result<bool> {
        if !self.literal.start(content)? {
            return Ok(false);
        }
        if matches!(content.value, Value::List(_)) {
            content.aty = self.array_item(content);
            self.cast(content)?;
        }
        Ok(true)
    }

    fn end(&mut self, parent: &mut Element, content: &mut Content) -> Result<()> {
        self.literal.end(parent, content)?;
        self.set_array_type(parent, content)
    }

    fn node(&mut self, content: &Content) -> Result<Element> {
        let mut node = self.literal.make_node(content)?;
        if content.value.is_null() {
            return Ok(node);
        }
        let schema = self.schema();
        match content.real.map(|id| schema.node(id)) {
            Some(real) if real.any() => {
                Typer::auto(&mut node, &content.value)?;
            }
            Some(real) => {
                // Encoded style types every node explicitly.
                if let Some(name) = &real.name {
                    let ns = if self.literal.xstq {
                        real.namespace.clone().map(Namespace::default_ns)
                    } else {
                        None
                    };
                    Typer::manual(&mut node, name, ns.as_ref())?;
                }
            }
            None => {}
        }
        Ok(node)
    }

    fn set_nil(&mut self, node: &mut Element, content: &mut Content) {
        self.literal.set_nil(node, content);
    }

    fn nillable(&mut self, content: &Content) -> bool {
        self.literal.nillable(content)
    }

    fn child_content(&mut self, parent: &Content, name: &str, value: Value) -> Result<Content> {
        // Items of a cast array carry the array's item type.
        if let Some(aty) = &parent.aty {
            if name == ITEM_TAG {
                let schema = self.schema();
                let item_id = schema
                    .xsd_type(&aty.item)
                    .or_else(|| schema.element(&aty.item))
                    .ok_or_else(|| Error::TypeNotFound(aty.item.to_string()))?;
                return Ok(Content::typed(name, value, item_id));
            }
        }
        self.literal.child_content(parent, name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::xsd::schema::tests::person_schema;
    use crate::xsd::schema::NoLoader;

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
    fn test_encoded_array() {
        let schema = array_schema();
        let mut m = Encoded::new(&schema);
        let list = Value::List(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        let node = m.process(Content::new("numbers", list)).unwrap();
        assert_eq!(node.name, "numbers");
        assert_eq!(node.children.len(), 3);
        assert!(node.children.iter().all(|c| c.name == "item"));
        let aty = node.get("arrayType").unwrap();
        assert!(aty.ends_with(":int[3]"), "got {aty}");
    }

    #[test]
    fn test_sibling_arrays_stamped_independently() {
        let schema = array_schema();
        let mut m = Encoded::new(&schema);
        let mut body = Element::new("Body");
        let first = Value::List(vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]);
        let second = Value::List(vec![Value::from(4i64)]);
        m.append(&mut body, Content::new("numbers", first)).unwrap();
        m.append(&mut body, Content::new("numbers", second)).unwrap();

        assert_eq!(body.children.len(), 2);
        let first_aty = body.children[0].get("arrayType").unwrap();
        let second_aty = body.children[1].get("arrayType").unwrap();
        assert!(first_aty.ends_with(":int[3]"), "got {first_aty}");
        assert!(second_aty.ends_with(":int[1]"), "got {second_aty}");
    }

    #[test]
    fn test_scalar_gets_xsi_type() {
        let schema = person_schema();
        let mut person = SudsObject::new("Person");
        person.set("name", "ann");
        let mut m = Encoded::new(&schema);
        let node = m
            .process(Content::new("person", Value::Object(person)))
            .unwrap();
        let name = node.child("name").unwrap();
        assert!(name.get("type").is_some());
    }
}
