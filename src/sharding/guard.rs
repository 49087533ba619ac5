//! Shard key checks for targeted operations
//!
//! On a sharded collection a query that omits part of the shard key has to
//! be broadcast to every shard. Targeted operations therefore must name
//! every shard key field at the top level of their spec, unless the caller
//! explicitly scopes the operation as global.

use std::sync::Arc;

use crate::observability::{log_event_with_fields, Event};
use crate::schema::{IndexSpec, Schema, SchemaError, SchemaResult};
use crate::value::{Document, Value};

/// How far an operation may reach across shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScope {
    /// Must name the full shard key
    #[default]
    Targeted,
    /// May reach every shard
    Global,
}

impl QueryScope {
    pub fn is_global(&self) -> bool {
        *self == QueryScope::Global
    }
}

/// Fails unless every shard key field is a top-level key of `spec`.
///
/// Unsharded collections accept every spec. Missing names are reported in
/// sorted order.
pub fn check_sharding(spec: &Document, shard_index: Option<&IndexSpec>) -> SchemaResult<()> {
    let shard_index = match shard_index {
        Some(shard_index) => shard_index,
        None => return Ok(()),
    };

    let mut missing: Vec<&str> = shard_index
        .field_names()
        .into_iter()
        .filter(|field| !spec.contains_key(*field))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    missing.sort_unstable();
    missing.dedup();
    Err(SchemaError::global_query(&missing))
}

/// [`check_sharding`] unless `scope` is global.
pub fn check_sharding_scoped(
    spec: &Document,
    shard_index: Option<&IndexSpec>,
    scope: QueryScope,
) -> SchemaResult<()> {
    match scope {
        QueryScope::Global => Ok(()),
        QueryScope::Targeted => check_sharding(spec, shard_index),
    }
}

/// Sharding guard bound to one schema.
///
/// Logs its decisions and builds the targeted specs the dispatch layer
/// uses to reach one stored document.
#[derive(Debug, Clone)]
pub struct ShardGuard {
    schema: Arc<Schema>,
    log_rejections: bool,
}

impl ShardGuard {
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            log_rejections: true,
        }
    }

    pub fn with_logging(mut self, log_rejections: bool) -> Self {
        self.log_rejections = log_rejections;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Check `spec` for `operation` under `scope`.
    pub fn check(&self, operation: &str, spec: &Document, scope: QueryScope) -> SchemaResult<()> {
        if scope.is_global() {
            if self.schema.shard_index().is_some()
                && check_sharding(spec, self.schema.shard_index()).is_err()
            {
                log_event_with_fields(
                    Event::GlobalQueryAllowed,
                    &[("schema", self.schema.name()), ("operation", operation)],
                );
            }
            return Ok(());
        }

        check_sharding(spec, self.schema.shard_index()).map_err(|err| {
            if self.log_rejections {
                log_event_with_fields(
                    Event::GlobalQueryRejected,
                    &[
                        ("schema", self.schema.name()),
                        ("operation", operation),
                        ("reason", err.message()),
                    ],
                );
            }
            err
        })
    }

    /// Spec addressing exactly the stored copy of `body`: the shard key
    /// fields present in `body` plus its `_id`.
    pub fn targeted_spec(&self, body: &Document) -> Option<Document> {
        let id = body.get("_id")?;
        let mut spec: Document = self
            .schema
            .shard_key_fields()
            .into_iter()
            .filter_map(|field| body.get(field).map(|value| (field.to_string(), value.clone())))
            .collect();
        spec.insert("_id".to_string(), id.clone());
        Some(spec)
    }

    /// [`targeted_spec`](Self::targeted_spec) widened by `extra` criteria.
    /// The shard key and `_id` from `body` take precedence.
    pub fn targeted_spec_with(&self, body: &Document, extra: &Document) -> Option<Document> {
        let targeted = self.targeted_spec(body)?;
        let mut spec: Document = extra.clone();
        for (field, value) in targeted {
            spec.insert(field, value);
        }
        Some(spec)
    }
}

/// Convenience for building single-field specs in callers and tests.
pub fn spec_of<I, K, V>(pairs: I) -> Document
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Descriptor, SchemaBuilder};

    fn sharded() -> Arc<Schema> {
        SchemaBuilder::new("Account")
            .field("name", Descriptor::string())
            .field("age", Descriptor::integer())
            .field("email", Descriptor::string())
            .index(IndexSpec::new(["name", "age"]).shard_key())
            .build()
            .unwrap()
    }

    #[test]
    fn test_unsharded_accepts_everything() {
        assert!(check_sharding(&Document::new(), None).is_ok());
    }

    #[test]
    fn test_full_shard_key_accepted() {
        let schema = sharded();
        let spec = spec_of([("name", Value::from("a")), ("age", Value::Int(3))]);
        assert!(check_sharding(&spec, schema.shard_index()).is_ok());
    }

    #[test]
    fn test_missing_fields_sorted() {
        let schema = sharded();
        let spec = spec_of([("email", "a@b")]);
        let err = check_sharding(&spec, schema.shard_index()).unwrap_err();
        assert!(err.is_global_query());
        assert_eq!(
            err.message(),
            "Some or all of the shard key was not specified. Missing fields were age, name."
        );
    }

    #[test]
    fn test_partial_shard_key() {
        let schema = sharded();
        let spec = spec_of([("name", "a")]);
        let err = check_sharding(&spec, schema.shard_index()).unwrap_err();
        assert_eq!(
            err.message(),
            "Some or all of the shard key was not specified. Missing fields were age."
        );
    }

    #[test]
    fn test_global_scope_overrides() {
        let schema = sharded();
        assert!(check_sharding_scoped(&Document::new(), schema.shard_index(), QueryScope::Global).is_ok());
        assert!(schema
            .check_query_sharding(&Document::new(), QueryScope::Targeted)
            .is_err());

        let guard = ShardGuard::new(&schema);
        assert!(guard.check("find", &Document::new(), QueryScope::Global).is_ok());
        assert!(guard.check("find", &Document::new(), QueryScope::Targeted).is_err());
    }

    #[test]
    fn test_targeted_spec() {
        let guard = ShardGuard::new(&sharded());
        let body = spec_of([
            ("_id", Value::Int(9)),
            ("name", Value::from("a")),
            ("age", Value::Int(3)),
            ("email", Value::from("a@b")),
        ]);
        let spec = guard.targeted_spec(&body).unwrap();
        assert_eq!(
            spec,
            spec_of([
                ("_id", Value::Int(9)),
                ("name", Value::from("a")),
                ("age", Value::Int(3)),
            ])
        );
        assert!(check_sharding(&spec, guard.schema().shard_index()).is_ok());
        assert!(guard.targeted_spec(&spec_of([("name", "a")])).is_none());
    }

    #[test]
    fn test_targeted_spec_with_extra_criteria() {
        let guard = ShardGuard::new(&sharded());
        let body = spec_of([("_id", Value::Int(1)), ("name", Value::from("a"))]);
        let extra = spec_of([("email", Value::from("x")), ("name", Value::from("other"))]);
        let spec = guard.targeted_spec_with(&body, &extra).unwrap();
        assert_eq!(spec["name"], Value::from("a"));
        assert_eq!(spec["email"], Value::from("x"));
        assert_eq!(spec["_id"], Value::Int(1));
    }
}
