//! Document instances
//!
//! A [`SchemaDocument`] is one document body bound to its schema. Schema
//! metadata is reached through [`SchemaDocument::schema`]; the body through
//! the field accessors, so a field named `indexes` never shadows metadata.

use std::sync::Arc;

use super::descriptor::Descriptor;
use super::errors::SchemaResult;
use super::types::Schema;
use crate::value::{Document, Value};

#[derive(Debug, Clone)]
pub struct SchemaDocument {
    schema: Arc<Schema>,
    body: Document,
}

impl SchemaDocument {
    /// New instance; absent fields receive the schema's defaults.
    pub fn new(schema: &Arc<Schema>, mut body: Document) -> Self {
        schema.apply_defaults(&mut body);
        Self {
            schema: Arc::clone(schema),
            body,
        }
    }

    /// Wraps a body read back from the store as-is.
    pub fn from_store(schema: &Arc<Schema>, body: Document) -> Self {
        Self {
            schema: Arc::clone(schema),
            body,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.body.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.body.remove(field)
    }

    pub fn body(&self) -> &Document {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Document {
        &mut self.body
    }

    pub fn into_body(self) -> Document {
        self.body
    }

    /// The document's `_id`, if it has one.
    pub fn id(&self) -> Option<&Value> {
        self.body.get("_id")
    }

    /// Validates the body against the schema.
    pub fn validate(&self) -> SchemaResult<()> {
        self.schema.validate(&self.body)
    }

    /// Shard key fields present in the body, in index order.
    pub fn shard_key(&self) -> Document {
        self.schema
            .shard_key_fields()
            .into_iter()
            .filter_map(|field| {
                self.body
                    .get(field)
                    .map(|value| (field.to_string(), value.clone()))
            })
            .collect()
    }

    /// View of a subdocument declared as an embedded schema.
    ///
    /// Returns `None` when the field is not declared as embedded or the
    /// body holds no document there.
    pub fn embedded(&self, field: &str) -> Option<EmbeddedDocument<'_>> {
        let schema = match self.schema.structure().lookup(field)? {
            Descriptor::Embedded(schema) => schema,
            _ => return None,
        };
        let body = self.body.get(field)?.as_document()?;
        Some(EmbeddedDocument { schema, body })
    }
}

impl PartialEq for SchemaDocument {
    fn eq(&self, rhs: &Self) -> bool {
        self.schema.name() == rhs.schema.name() && self.body == rhs.body
    }
}

/// Borrowed view of an embedded subdocument and its schema.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedDocument<'a> {
    schema: &'a Arc<Schema>,
    body: &'a Document,
}

impl<'a> EmbeddedDocument<'a> {
    pub fn schema(&self) -> &'a Arc<Schema> {
        self.schema
    }

    pub fn body(&self) -> &'a Document {
        self.body
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.body.get(field)
    }

    pub fn validate(&self) -> SchemaResult<()> {
        self.schema.validate(self.body)
    }
}
