//! Field type matching
//!
//! Answers "does this value satisfy this descriptor" without producing a
//! message. Composite descriptors carry their own evaluation through
//! [`TypeMatcher`]; the structure validator only turns a `false` into the
//! positional rejection message.

use crate::schema::{Descriptor, OneOfTypes, OneOfValues, PrimitiveType, Schema, Structure};
use crate::value::Value;

use super::validator::validate_structure;

/// Capability to decide whether a value satisfies a type description.
pub trait TypeMatcher {
    fn matches(&self, value: &Value) -> bool;
}

impl TypeMatcher for PrimitiveType {
    fn matches(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (PrimitiveType::String, Value::String(_))
                | (PrimitiveType::Integer, Value::Int(_))
                | (PrimitiveType::Long, Value::Long(_))
                | (PrimitiveType::Float, Value::Float(_))
                | (PrimitiveType::Boolean, Value::Bool(_))
                | (PrimitiveType::DateTime, Value::DateTime(_))
                | (PrimitiveType::Binary, Value::Binary(_))
                | (PrimitiveType::Identifier, Value::Identifier(_))
                | (PrimitiveType::Document, Value::Document(_))
                | (PrimitiveType::Null, Value::Null)
        )
    }
}

impl TypeMatcher for OneOfTypes {
    fn matches(&self, value: &Value) -> bool {
        self.members().iter().any(|member| member.matches(value))
    }
}

impl TypeMatcher for OneOfValues {
    fn matches(&self, value: &Value) -> bool {
        self.contains(value)
    }
}

impl TypeMatcher for Structure {
    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Document(doc) => validate_structure(doc, self).is_ok(),
            _ => false,
        }
    }
}

impl TypeMatcher for Schema {
    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::Document(doc) => self.validate(doc).is_ok(),
            _ => false,
        }
    }
}

impl TypeMatcher for Descriptor {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Descriptor::Primitive(tag) => tag.matches(value),
            Descriptor::List(member) => match value {
                Value::Array(items) => items.iter().all(|item| member.matches(item)),
                _ => false,
            },
            Descriptor::Structure(structure) => structure.matches(value),
            Descriptor::Or(members) => members.matches(value),
            Descriptor::Is(values) => values.matches(value),
            Descriptor::Embedded(schema) => schema.matches(value),
        }
    }
}

/// Returns whether `value` satisfies `expected`.
pub fn is_field_of_expected_type(value: &Value, expected: &Descriptor) -> bool {
    expected.matches(value)
}
