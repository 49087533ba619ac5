//! Schema registry
//!
//! Holds the concrete schemas an application works with, by name.
//! Abstract schemas are never registered. A second schema under an
//! existing name replaces the first with a warning; every other schema
//! problem is an error at build time.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::types::Schema;
use crate::observability::{log_event_with_fields, Event};

/// Shared handle to a registered schema.
pub type SchemaHandle = Arc<Schema>;

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, SchemaHandle>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema.
    ///
    /// Returns the registered handle, or `None` for abstract schemas.
    pub fn register(&mut self, schema: &Arc<Schema>) -> Option<SchemaHandle> {
        if schema.is_abstract() {
            log_event_with_fields(Event::SchemaAbstractSkipped, &[("schema", schema.name())]);
            return None;
        }

        let handle = Arc::clone(schema);
        if self
            .schemas
            .insert(schema.name().to_string(), Arc::clone(&handle))
            .is_some()
        {
            log_event_with_fields(Event::SchemaNameDuplicate, &[("schema", schema.name())]);
        } else {
            let field_count = schema.structure().fields().len().to_string();
            log_event_with_fields(
                Event::SchemaRegistered,
                &[("schema", schema.name()), ("fields", field_count.as_str())],
            );
        }
        Some(handle)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaHandle> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered schemas in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaHandle> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
