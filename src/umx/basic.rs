//! Untyped unmarshaller
//!
//! Builds plain object trees from XML with every leaf kept as text. Used
//! where no schema applies, such as fault detail blocks.

use crate::umx::core::Unmarshaller;

/// An unmarshaller that consults no schema.
#[derive(Debug, Default)]
pub struct Basic;

impl Unmarshaller for Basic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::sudsobject::Value;

    #[test]
    fn test_nested() {
        let doc = Document::from_string(
            "<person><name>ann</name><age>41</age></person>",
        )
        .unwrap();
        let value = Basic.process(doc.root().unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.type_name(), "person");
        // Untyped: numeric text stays text.
        assert_eq!(object.get("age"), Some(&Value::Text("41".to_string())));
    }
}
