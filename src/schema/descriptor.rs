//! Expected-type descriptors
//!
//! A [`Descriptor`] describes the shape a value must have at one position of
//! a document. Descriptors nest: a [`Structure`] maps field names (or key
//! predicates) to descriptors, a list descriptor wraps the descriptor of its
//! members, and an embedded descriptor points at a whole reusable
//! [`Schema`](super::Schema).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use regex::Regex;
use uuid::Uuid;

use super::types::Schema;
use crate::value::{write_quoted, Value};

/// Primitive type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveType {
    String,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    Float,
    Boolean,
    DateTime,
    Binary,
    Identifier,
    /// Any document, contents unchecked
    Document,
    Null,
}

impl PrimitiveType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::Binary => "binary",
            PrimitiveType::Identifier => "identifier",
            PrimitiveType::Document => "document",
            PrimitiveType::Null => "null",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Integer | PrimitiveType::Long | PrimitiveType::Float
        )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A regular expression used as a key predicate.
///
/// Equality, ordering and hashing use the pattern source text.
#[derive(Debug, Clone)]
pub struct KeyPattern(Regex);

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, key: &str) -> bool {
        self.0.is_match(key)
    }
}

impl PartialEq for KeyPattern {
    fn eq(&self, rhs: &Self) -> bool {
        self.as_str() == rhs.as_str()
    }
}

impl Eq for KeyPattern {}

impl PartialOrd for KeyPattern {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl Ord for KeyPattern {
    fn cmp(&self, rhs: &Self) -> Ordering {
        self.as_str().cmp(rhs.as_str())
    }
}

impl Hash for KeyPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

/// Predicate over key names for type-keyed structure entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    /// Every key
    String,
    /// Keys that parse as a base-10 integer
    Integer,
    /// Keys that parse as a UUID
    Identifier,
    /// Keys matching a regular expression
    Matching(KeyPattern),
}

impl KeyType {
    pub fn matching(pattern: &str) -> Result<Self, regex::Error> {
        KeyPattern::new(pattern).map(KeyType::Matching)
    }

    /// Returns whether a key name is an instance of this key type.
    pub fn accepts(&self, key: &str) -> bool {
        match self {
            KeyType::String => true,
            KeyType::Integer => key.parse::<i64>().is_ok(),
            KeyType::Identifier => Uuid::parse_str(key).is_ok(),
            KeyType::Matching(pattern) => pattern.is_match(key),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::String => f.write_str("<string key>"),
            KeyType::Integer => f.write_str("<integer key>"),
            KeyType::Identifier => f.write_str("<identifier key>"),
            KeyType::Matching(pattern) => write!(f, "<key /{}/>", pattern.as_str()),
        }
    }
}

/// Returns whether `key` addresses an array position in an update path.
pub(crate) fn is_position(key: &str) -> bool {
    key == "$" || (!key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()))
}

/// The shape of a (sub)document: literal fields plus type-keyed entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    fields: BTreeMap<String, Descriptor>,
    typed: BTreeMap<KeyType, Descriptor>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a literal field.
    pub fn field(mut self, name: impl Into<String>, descriptor: impl Into<Descriptor>) -> Self {
        self.fields.insert(name.into(), descriptor.into());
        self
    }

    /// Declare a type-keyed entry: every key accepted by `key_type` must
    /// hold a value matching `descriptor`.
    pub fn typed_field(mut self, key_type: KeyType, descriptor: impl Into<Descriptor>) -> Self {
        self.typed.insert(key_type, descriptor.into());
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, Descriptor> {
        &self.fields
    }

    pub fn typed_fields(&self) -> &BTreeMap<KeyType, Descriptor> {
        &self.typed
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.typed.is_empty()
    }

    /// Returns whether `key` is matched by a literal or a type-keyed entry.
    pub fn accepts_key(&self, key: &str) -> bool {
        self.fields.contains_key(key) || self.typed.keys().any(|key_type| key_type.accepts(key))
    }

    /// Looks up the descriptor for a single key, literal entries first.
    pub fn lookup(&self, key: &str) -> Option<&Descriptor> {
        self.fields.get(key).or_else(|| {
            self.typed
                .iter()
                .find(|(key_type, _)| key_type.accepts(key))
                .map(|(_, descriptor)| descriptor)
        })
    }

    /// Resolves the descriptor at a dotted update path such as `a.0.b`.
    pub fn resolve(&self, path: &str) -> Option<&Descriptor> {
        let mut segments = path.split('.');
        let mut current = self.lookup(segments.next()?)?;
        for segment in segments {
            current = match current {
                Descriptor::List(inner) if is_position(segment) => inner.as_ref(),
                Descriptor::Structure(structure) => structure.lookup(segment)?,
                Descriptor::Embedded(schema) => schema.structure().lookup(segment)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Union with `other`; entries already present in `self` win.
    pub(crate) fn merge_missing(&mut self, other: &Structure) {
        for (name, descriptor) in &other.fields {
            self.fields
                .entry(name.clone())
                .or_insert_with(|| descriptor.clone());
        }
        for (key_type, descriptor) in &other.typed {
            self.typed
                .entry(key_type.clone())
                .or_insert_with(|| descriptor.clone());
        }
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        let mut first = true;
        for (key_type, descriptor) in &self.typed {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}: {}", key_type, descriptor)?;
        }
        for (name, descriptor) in &self.fields {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write_quoted(f, name)?;
            write!(f, ": {}", descriptor)?;
        }
        f.write_str("}")
    }
}

/// `OR` composite: the value must satisfy at least one member descriptor.
///
/// Members are kept deduplicated; equality ignores member order.
#[derive(Debug, Clone)]
pub struct OneOfTypes(Vec<Descriptor>);

impl OneOfTypes {
    pub fn new(members: impl IntoIterator<Item = Descriptor>) -> Self {
        let mut unique: Vec<Descriptor> = Vec::new();
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        Self(unique)
    }

    pub fn members(&self) -> &[Descriptor] {
        &self.0
    }
}

impl PartialEq for OneOfTypes {
    fn eq(&self, rhs: &Self) -> bool {
        self.0.len() == rhs.0.len() && self.0.iter().all(|member| rhs.0.contains(member))
    }
}

impl fmt::Display for OneOfTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        names.sort();
        write!(f, "<OR {}>", names.join(", "))
    }
}

/// `IS` composite: the value must be one of a fixed set of exact values.
///
/// Values are deduplicated by [`Value::identical`]; equality ignores order.
#[derive(Debug, Clone)]
pub struct OneOfValues(Vec<Value>);

impl OneOfValues {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for value in values {
            if !unique.iter().any(|v| v.identical(&value)) {
                unique.push(value);
            }
        }
        Self(unique)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|v| v.identical(value))
    }
}

impl PartialEq for OneOfValues {
    fn eq(&self, rhs: &Self) -> bool {
        self.0.len() == rhs.0.len() && self.0.iter().all(|value| rhs.contains(value))
    }
}

impl fmt::Display for OneOfValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        values.sort();
        write!(f, "<IS {}>", values.join(", "))
    }
}

/// Expected-type descriptor for one document position.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Primitive(PrimitiveType),
    /// Array whose members each match the inner descriptor
    List(Box<Descriptor>),
    /// Embedded subdocument with an inline structure
    Structure(Structure),
    Or(OneOfTypes),
    Is(OneOfValues),
    /// Embedded subdocument governed by a named, reusable schema
    Embedded(Arc<Schema>),
}

impl Descriptor {
    pub fn string() -> Self {
        Descriptor::Primitive(PrimitiveType::String)
    }

    pub fn integer() -> Self {
        Descriptor::Primitive(PrimitiveType::Integer)
    }

    pub fn long() -> Self {
        Descriptor::Primitive(PrimitiveType::Long)
    }

    pub fn float() -> Self {
        Descriptor::Primitive(PrimitiveType::Float)
    }

    pub fn boolean() -> Self {
        Descriptor::Primitive(PrimitiveType::Boolean)
    }

    pub fn datetime() -> Self {
        Descriptor::Primitive(PrimitiveType::DateTime)
    }

    pub fn binary() -> Self {
        Descriptor::Primitive(PrimitiveType::Binary)
    }

    pub fn identifier() -> Self {
        Descriptor::Primitive(PrimitiveType::Identifier)
    }

    pub fn document() -> Self {
        Descriptor::Primitive(PrimitiveType::Document)
    }

    pub fn null() -> Self {
        Descriptor::Primitive(PrimitiveType::Null)
    }

    pub fn list_of(member: impl Into<Descriptor>) -> Self {
        Descriptor::List(Box::new(member.into()))
    }

    pub fn any_of(members: impl IntoIterator<Item = Descriptor>) -> Self {
        Descriptor::Or(OneOfTypes::new(members))
    }

    pub fn one_of_values(values: impl IntoIterator<Item = Value>) -> Self {
        Descriptor::Is(OneOfValues::new(values))
    }

    pub fn embedded(schema: &Arc<Schema>) -> Self {
        Descriptor::Embedded(Arc::clone(schema))
    }

    /// True for the integer, long and float primitive tags.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Descriptor::Primitive(tag) if tag.is_numeric())
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, rhs: &Self) -> bool {
        match (self, rhs) {
            (Descriptor::Primitive(a), Descriptor::Primitive(b)) => a == b,
            (Descriptor::List(a), Descriptor::List(b)) => a == b,
            (Descriptor::Structure(a), Descriptor::Structure(b)) => a == b,
            (Descriptor::Or(a), Descriptor::Or(b)) => a == b,
            (Descriptor::Is(a), Descriptor::Is(b)) => a == b,
            (Descriptor::Embedded(a), Descriptor::Embedded(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Primitive(tag) => write!(f, "{}", tag),
            Descriptor::List(inner) => write!(f, "[{}]", inner),
            Descriptor::Structure(structure) => write!(f, "{}", structure),
            Descriptor::Or(members) => write!(f, "{}", members),
            Descriptor::Is(values) => write!(f, "{}", values),
            Descriptor::Embedded(schema) => write!(f, "<schema {}>", schema.name()),
        }
    }
}

impl From<PrimitiveType> for Descriptor {
    fn from(tag: PrimitiveType) -> Self {
        Descriptor::Primitive(tag)
    }
}

impl From<Structure> for Descriptor {
    fn from(structure: Structure) -> Self {
        Descriptor::Structure(structure)
    }
}

impl From<Arc<Schema>> for Descriptor {
    fn from(schema: Arc<Schema>) -> Self {
        Descriptor::Embedded(schema)
    }
}

impl From<&Arc<Schema>> for Descriptor {
    fn from(schema: &Arc<Schema>) -> Self {
        Descriptor::Embedded(Arc::clone(schema))
    }
}
