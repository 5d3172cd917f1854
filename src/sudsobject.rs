//! Dynamic typed value graph
//!
//! The marshaller consumes and the unmarshaller produces [`Value`] graphs.
//! Complex-type instances are [`SudsObject`]s: ordered field maps stamped
//! with the resolved schema type they were built from. Field order follows
//! schema declaration order, which is semantic for sequence validation and
//! positional parameter binding.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use std::fmt;

use crate::xsd::schema::NodeId;

/// A dynamic in-memory value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / nil value
    Null,
    /// xs:boolean
    Bool(bool),
    /// xs:int and friends
    Int(i64),
    /// xs:float / xs:double
    Float(f64),
    /// xs:string and any untranslated text
    Text(String),
    /// xs:date
    Date(NaiveDate),
    /// xs:time
    Time(NaiveTime),
    /// xs:dateTime
    DateTime(NaiveDateTime),
    /// A sequence of values
    List(Vec<Value>),
    /// A complex-type instance
    Object(SudsObject),
}

impl Value {
    /// The runtime class name, used as the default content tag when no
    /// explicit tag has been assigned.
    pub fn class_name(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "dateTime",
            Value::List(_) => "list",
            Value::Object(o) => o.type_name(),
        }
    }

    /// True for `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The object payload, if this is an object
    pub fn as_object(&self) -> Option<&SudsObject> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The list payload, if this is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// The textual payload of a scalar value, rendered the way it appears
    /// in an XML document.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Some(t.format("%H:%M:%S").to_string()),
            Value::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::List(_) | Value::Object(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<SudsObject> for Value {
    fn from(o: SudsObject) -> Self {
        Value::Object(o)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// Hidden metadata attached to an object.
///
/// The schema-type edge is an arena index, never an owning reference, so a
/// result tree can outlive or drop independently of its schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// The resolved schema type this object was built from
    pub sxtype: Option<NodeId>,
    /// Qualified name of the resolved type, kept for xsi:type emission
    pub type_qname: Option<crate::namespaces::QName>,
}

/// An ordered mapping from field name to value, representing a
/// complex-type instance or a property-style scalar wrapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SudsObject {
    name: String,
    fields: IndexMap<String, Value>,
    /// Hidden metadata (resolved schema type)
    pub metadata: Metadata,
}

impl SudsObject {
    /// Create an empty object of a given type name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            metadata: Metadata::default(),
        }
    }

    /// The object's type name
    pub fn type_name(&self) -> &str {
        &self.name
    }

    /// Set a field, appending in declaration order on first assignment
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Append into a field: a first value is stored plainly, a repeated
    /// assignment promotes the field to a list. Used for multi-occurrence
    /// child elements.
    pub fn append(&mut self, name: &str, value: Value) {
        match self.fields.get_mut(name) {
            None => {
                self.fields.insert(name.to_string(), value);
            }
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::List(vec![first, value]);
            }
        }
    }

    /// Force a field to hold a list, even with a single occupant
    pub fn append_listed(&mut self, name: &str, value: Value) {
        match self.fields.get_mut(name) {
            None => {
                self.fields.insert(name.to_string(), Value::List(vec![value]));
            }
            Some(Value::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::List(vec![first, value]);
            }
        }
    }

    /// Iterate fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the object has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The first list-valued field, used for SOAP-encoded array promotion
    pub fn first_list(&self) -> Option<&Vec<Value>> {
        self.fields.values().find_map(|v| match v {
            Value::List(items) => Some(items),
            _ => None,
        })
    }

    /// Take the first list-valued field out of the object
    pub fn take_first_list(&mut self) -> Option<Vec<Value>> {
        let key = self
            .fields
            .iter()
            .find(|(_, v)| matches!(v, Value::List(_)))
            .map(|(k, _)| k.clone())?;
        match self.fields.swap_remove(&key) {
            Some(Value::List(items)) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for SudsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.name)?;
        for (k, v) in self.iter() {
            write!(f, " {}={:?}", k, v)?;
        }
        Ok(())
    }
}

/// Factory for objects and property wrappers, keyed by type name.
pub struct Factory;

impl Factory {
    /// Create an empty object of the given type name
    pub fn object(name: &str) -> SudsObject {
        SudsObject::new(name)
    }

    /// Create a property-style wrapper: a single `value` field holding a
    /// scalar. Property objects unmarshal back to their bare payload.
    pub fn property(name: &str, value: Value) -> SudsObject {
        let mut object = SudsObject::new(name);
        object.set("value", value);
        object
    }
}

/// True when the object is a property-style wrapper (single `value` field)
pub fn is_property(object: &SudsObject) -> bool {
    object.len() == 1 && object.get("value").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_preserved() {
        let mut o = SudsObject::new("Person");
        o.set("name", "ann");
        o.set("age", 41i64);
        o.set("email", "a@example.com");
        let keys: Vec<&str> = o.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "age", "email"]);
    }

    #[test]
    fn test_append_promotes_to_list() {
        let mut o = SudsObject::new("Basket");
        o.append("item", Value::from("a"));
        assert_eq!(o.get("item"), Some(&Value::from("a")));
        o.append("item", Value::from("b"));
        assert_eq!(
            o.get("item"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_property_wrapper() {
        let p = Factory::property("phone", Value::from("555-1234"));
        assert!(is_property(&p));
        assert_eq!(p.get("value"), Some(&Value::from("555-1234")));
        let mut o = Factory::object("Person");
        o.set("name", "ann");
        assert!(!is_property(&o));
    }

    #[test]
    fn test_first_list() {
        let mut o = SudsObject::new("Array");
        o.set("href", "x");
        o.set("item", Value::List(vec![Value::from(1i64)]));
        assert_eq!(o.first_list().map(|l| l.len()), Some(1));
        assert_eq!(o.take_first_list().map(|l| l.len()), Some(1));
        assert!(o.first_list().is_none());
    }

    #[test]
    fn test_value_text_rendering() {
        assert_eq!(Value::from(true).to_text().as_deref(), Some("true"));
        assert_eq!(Value::from(12i64).to_text().as_deref(), Some("12"));
        assert_eq!(Value::Null.to_text(), None);
        let d = NaiveDate::from_ymd_opt(2014, 6, 2).unwrap();
        assert_eq!(Value::Date(d).to_text().as_deref(), Some("2014-06-02"));
    }

    #[test]
    fn test_class_name_default_tag() {
        assert_eq!(Value::from(1i64).class_name(), "int");
        assert_eq!(Value::Object(SudsObject::new("Person")).class_name(), "Person");
    }
}
