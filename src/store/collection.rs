//! Collection dispatch
//!
//! [`Collection`] sits between application code and a [`DocumentStore`]:
//! targeted operations pass the sharding guard, updates and new documents
//! are validated before they reach the store, and results come back as
//! [`SchemaDocument`]s without re-validation.

use std::sync::Arc;

use super::errors::{DispatchError, DispatchResult, StoreResult};
use crate::config::ValidatorConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::{IndexSpec, Schema, SchemaDocument, SchemaError, SchemaResult};
use crate::sharding::{QueryScope, ShardGuard};
use crate::validation::UpdateValidator;
use crate::value::{Document, Value};

/// Client interface of the underlying document store.
///
/// Implementations own connection handling; docguard only forwards
/// already-checked requests.
pub trait DocumentStore {
    fn find_one(&self, collection: &str, spec: &Document) -> StoreResult<Option<Document>>;

    fn find(&self, collection: &str, spec: &Document) -> StoreResult<Vec<Document>>;

    /// Inserts `body` and returns its `_id`, assigning one if absent.
    fn insert(&self, collection: &str, body: &Document) -> StoreResult<Value>;

    /// Applies `update` to the first match, or every match with `multi`.
    /// Returns the number of documents updated.
    fn update(&self, collection: &str, spec: &Document, update: &Document, multi: bool)
        -> StoreResult<u64>;

    /// Returns the number of documents removed.
    fn remove(&self, collection: &str, spec: &Document) -> StoreResult<u64>;

    /// Atomically updates one match and returns it, pre- or post-update.
    fn find_and_modify(
        &self,
        collection: &str,
        spec: &Document,
        update: &Document,
        return_new: bool,
    ) -> StoreResult<Option<Document>>;

    fn ensure_index(&self, collection: &str, index: &IndexSpec) -> StoreResult<()>;
}

/// Schema-checked access to one collection.
pub struct Collection<S> {
    store: S,
    name: String,
    schema: Arc<Schema>,
    guard: ShardGuard,
    validator: UpdateValidator,
}

impl<S: DocumentStore> Collection<S> {
    /// Collection named after the schema.
    pub fn new(store: S, schema: &Arc<Schema>, config: ValidatorConfig) -> Self {
        let guard = ShardGuard::new(schema).with_logging(config.log_rejections);
        Self {
            store,
            name: schema.name().to_string(),
            schema: Arc::clone(schema),
            guard,
            validator: UpdateValidator::new(config),
        }
    }

    /// Use a collection name other than the schema name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ValidatorConfig {
        self.validator.config()
    }

    pub fn find_one(&self, spec: &Document, scope: QueryScope) -> DispatchResult<Option<SchemaDocument>> {
        self.check_sharding("find_one", spec, scope)?;
        let found = self.store.find_one(&self.name, spec)?;
        Ok(found.map(|body| SchemaDocument::from_store(&self.schema, body)))
    }

    pub fn find(&self, spec: &Document, scope: QueryScope) -> DispatchResult<Vec<SchemaDocument>> {
        self.check_sharding("find", spec, scope)?;
        let found = self.store.find(&self.name, spec)?;
        Ok(found
            .into_iter()
            .map(|body| SchemaDocument::from_store(&self.schema, body))
            .collect())
    }

    /// Update documents matching `spec` with a modifier or replacement spec.
    pub fn update(
        &self,
        spec: &Document,
        update: &Document,
        scope: QueryScope,
        multi: bool,
    ) -> DispatchResult<u64> {
        self.check_sharding("update", spec, scope)?;
        self.validate_update(update)?;
        Ok(self.store.update(&self.name, spec, update, multi)?)
    }

    pub fn remove(&self, spec: &Document, scope: QueryScope) -> DispatchResult<u64> {
        self.check_sharding("remove", spec, scope)?;
        Ok(self.store.remove(&self.name, spec)?)
    }

    /// Atomically update one document. Returns the pre-update document
    /// unless `return_new` is set.
    pub fn find_and_modify(
        &self,
        spec: &Document,
        update: &Document,
        scope: QueryScope,
        return_new: bool,
    ) -> DispatchResult<Option<SchemaDocument>> {
        self.check_sharding("find_and_modify", spec, scope)?;
        self.validate_update(update)?;
        let found = self
            .store
            .find_and_modify(&self.name, spec, update, return_new)?;
        Ok(found.map(|body| SchemaDocument::from_store(&self.schema, body)))
    }

    /// Insert a new document and record its assigned `_id`.
    pub fn save(&self, document: &mut SchemaDocument) -> DispatchResult<()> {
        if document.id().is_some() {
            return Err(DispatchError::UnsafeBehavior(
                "This document has already been saved once. Further alterations should use modify."
                    .to_string(),
            ));
        }

        if let Err(err) = document.validate() {
            self.log_rejection(Event::DocumentRejected, &err);
            return Err(err.into());
        }

        let id = self.store.insert(&self.name, document.body())?;
        document.insert("_id", id);
        Ok(())
    }

    /// Replace the body with the stored copy, addressed by shard key and
    /// `_id`. Returns `false` when no stored copy exists.
    pub fn reload(&self, document: &mut SchemaDocument) -> DispatchResult<bool> {
        let spec = self.targeted_spec(document, None)?;
        match self.find_one(&spec, QueryScope::Targeted)? {
            Some(stored) => {
                *document.body_mut() = stored.into_body();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Apply `update` to the stored copy of `document` and take over the
    /// result. `query` adds criteria the stored copy must also match.
    pub fn modify(
        &self,
        document: &mut SchemaDocument,
        update: &Document,
        query: Option<&Document>,
    ) -> DispatchResult<()> {
        let spec = self.targeted_spec(document, query)?;
        match self.find_and_modify(&spec, update, QueryScope::Targeted, true)? {
            Some(modified) => {
                *document.body_mut() = modified.into_body();
                Ok(())
            }
            None => {
                let criteria = Value::Document(query.cloned().unwrap_or_default());
                self.reload(document)?;
                let message = format!(
                    "Failed to update document. The document was not found based on the criteria {}. Document was {}.",
                    criteria,
                    Value::Document(document.body().clone())
                );
                log_event_with_fields(
                    Event::ModifyFailed,
                    &[("collection", self.name.as_str()), ("reason", message.as_str())],
                );
                Err(DispatchError::ModifyFailed(message))
            }
        }
    }

    /// Send every declared index to the store.
    pub fn ensure_indexes(&self) -> DispatchResult<()> {
        for index in self.schema.indexes() {
            self.store.ensure_index(&self.name, index)?;
            let fields = index.field_names().join(",");
            log_event_with_fields(
                Event::IndexEnsured,
                &[
                    ("collection", self.name.as_str()),
                    ("fields", fields.as_str()),
                    ("unique", if index.unique { "true" } else { "false" }),
                ],
            );
        }
        Ok(())
    }

    fn effective_scope(&self, scope: QueryScope) -> QueryScope {
        if self.config().allow_global_queries {
            QueryScope::Global
        } else {
            scope
        }
    }

    fn check_sharding(&self, operation: &str, spec: &Document, scope: QueryScope) -> SchemaResult<()> {
        self.guard.check(operation, spec, self.effective_scope(scope))
    }

    fn validate_update(&self, update: &Document) -> SchemaResult<()> {
        self.validator
            .validate_update(update, &self.schema)
            .map_err(|err| {
                self.log_rejection(Event::UpdateRejected, &err);
                err
            })
    }

    fn targeted_spec(
        &self,
        document: &SchemaDocument,
        query: Option<&Document>,
    ) -> DispatchResult<Document> {
        let spec = match query {
            Some(query) => self.guard.targeted_spec_with(document.body(), query),
            None => self.guard.targeted_spec(document.body()),
        };
        spec.ok_or_else(|| {
            DispatchError::UnsafeBehavior(
                "This document has not been saved yet; it has no _id to address it by.".to_string(),
            )
        })
    }

    fn log_rejection(&self, event: Event, err: &SchemaError) {
        if self.config().log_rejections {
            log_event_with_fields(
                event,
                &[
                    ("collection", self.name.as_str()),
                    ("code", err.code().code()),
                    ("reason", err.message()),
                ],
            );
        }
    }
}
