//! Schema type definitions
//!
//! A consolidated [`Schema`] carries:
//! - structure: the expected-type tree
//! - required_fields: top-level names every document must contain
//! - indexes: declared indexes, at most one of them the shard key
//! - default_values: literals or producers applied to absent fields
//!
//! Schemas are only built through [`SchemaBuilder`](super::SchemaBuilder)
//! and are immutable afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::descriptor::{Descriptor, Structure};
use super::errors::SchemaResult;
use crate::sharding::{self, QueryScope};
use crate::validation;
use crate::value::{Document, Value};

/// Index key direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

/// One key of an index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub direction: Direction,
}

impl IndexField {
    pub fn ascending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Descending,
        }
    }
}

impl From<&str> for IndexField {
    fn from(name: &str) -> Self {
        IndexField::ascending(name)
    }
}

impl From<(&str, Direction)> for IndexField {
    fn from((name, direction): (&str, Direction)) -> Self {
        Self {
            name: name.to_string(),
            direction,
        }
    }
}

/// Index declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Ordered index keys
    pub fields: Vec<IndexField>,
    /// Whether the index enforces uniqueness
    #[serde(default)]
    pub unique: bool,
    /// Whether this index is the collection's shard key
    #[serde(default)]
    pub shard_key: bool,
}

impl IndexSpec {
    pub fn new<F: Into<IndexField>>(fields: impl IntoIterator<Item = F>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            shard_key: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn shard_key(mut self) -> Self {
        self.shard_key = true;
        self
    }

    /// Returns the index key names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

/// Default for an absent field.
///
/// Producers run once per document instance, so mutable defaults such as
/// an empty list never alias between instances.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        DefaultValue::Literal(value.into())
    }

    pub fn producer(producer: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        DefaultValue::Producer(Arc::new(producer))
    }

    pub fn empty_array() -> Self {
        Self::producer(|| Value::Array(Vec::new()))
    }

    pub fn empty_document() -> Self {
        Self::producer(|| Value::Document(Document::new()))
    }

    /// A fresh random identifier per instance.
    pub fn new_identifier() -> Self {
        Self::producer(|| Value::Identifier(Uuid::new_v4()))
    }

    /// The current UTC time at instance construction.
    pub fn now() -> Self {
        Self::producer(|| Value::DateTime(Utc::now()))
    }

    /// Returns the value for one new instance.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Consolidated schema for one document type
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) name: String,
    pub(crate) abstract_schema: bool,
    pub(crate) structure: Structure,
    pub(crate) required_fields: BTreeSet<String>,
    pub(crate) indexes: Vec<IndexSpec>,
    pub(crate) default_values: BTreeMap<String, DefaultValue>,
    pub(crate) shard_index: Option<IndexSpec>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Abstract schemas exist only to be extended and are never registered.
    pub fn is_abstract(&self) -> bool {
        self.abstract_schema
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn required_fields(&self) -> &BTreeSet<String> {
        &self.required_fields
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn default_values(&self) -> &BTreeMap<String, DefaultValue> {
        &self.default_values
    }

    /// The single index marked as shard key, if any.
    pub fn shard_index(&self) -> Option<&IndexSpec> {
        self.shard_index.as_ref()
    }

    /// Shard key field names, empty for unsharded schemas.
    pub fn shard_key_fields(&self) -> Vec<&str> {
        self.shard_index
            .as_ref()
            .map(IndexSpec::field_names)
            .unwrap_or_default()
    }

    /// Validates a whole document: structure, then required fields.
    pub fn validate(&self, body: &Document) -> SchemaResult<()> {
        validation::validate_document(body, self)
    }

    /// Fails unless `spec` names every shard key field or `scope` is global.
    pub fn check_query_sharding(&self, spec: &Document, scope: QueryScope) -> SchemaResult<()> {
        sharding::check_sharding_scoped(spec, self.shard_index(), scope)
    }

    /// Fills absent fields with their defaults, recursing into embedded
    /// schemas that are already present in `body`.
    pub fn apply_defaults(&self, body: &mut Document) {
        for (field, default) in &self.default_values {
            body.entry(field.clone()).or_insert_with(|| default.produce());
        }
        for (field, value) in body.iter_mut() {
            if let Some(descriptor) = self.structure.lookup(field) {
                apply_nested_defaults(descriptor, value);
            }
        }
    }
}

fn apply_nested_defaults(descriptor: &Descriptor, value: &mut Value) {
    match (descriptor, value) {
        (Descriptor::Embedded(schema), Value::Document(doc)) => schema.apply_defaults(doc),
        (Descriptor::List(member), Value::Array(items)) => {
            for item in items {
                apply_nested_defaults(member, item);
            }
        }
        (Descriptor::Structure(structure), Value::Document(doc)) => {
            for (field, value) in doc.iter_mut() {
                if let Some(descriptor) = structure.lookup(field) {
                    apply_nested_defaults(descriptor, value);
                }
            }
        }
        _ => {}
    }
}

/// Schemas compare by declaration; default producers are not compared.
impl PartialEq for Schema {
    fn eq(&self, rhs: &Self) -> bool {
        self.name == rhs.name
            && self.structure == rhs.structure
            && self.required_fields == rhs.required_fields
            && self.indexes == rhs.indexes
    }
}
