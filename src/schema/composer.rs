//! Schema composition
//!
//! A schema declaration names its own structure, required fields, indexes
//! and defaults plus an ordered list of base schemas. [`SchemaBuilder::build`]
//! folds every base into the declaration exactly once:
//!
//! - structure: union, entries declared closer to the new schema win
//! - indexes: own entries first, then each base's, identical entries once
//! - required_fields: union
//! - default_values: union, entries declared closer to the new schema win
//!
//! The merged index list is then checked for shard key and uniqueness
//! consistency. A violation is a definition error and no schema is produced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::descriptor::{Descriptor, KeyType, Structure};
use super::errors::{SchemaError, SchemaResult};
use super::types::{DefaultValue, IndexSpec, Schema};
use crate::observability::{log_event_with_fields, Event};

/// Declaration surface for a schema-bearing document type.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    name: String,
    abstract_schema: bool,
    structure: Structure,
    required_fields: BTreeSet<String>,
    indexes: Vec<IndexSpec>,
    default_values: BTreeMap<String, DefaultValue>,
    bases: Vec<Arc<Schema>>,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declare a literal field.
    pub fn field(mut self, name: impl Into<String>, descriptor: impl Into<Descriptor>) -> Self {
        self.structure = self.structure.field(name, descriptor);
        self
    }

    /// Declare a type-keyed entry.
    pub fn typed_field(mut self, key_type: KeyType, descriptor: impl Into<Descriptor>) -> Self {
        self.structure = self.structure.typed_field(key_type, descriptor);
        self
    }

    /// Replace the declared structure wholesale.
    pub fn structure(mut self, structure: Structure) -> Self {
        self.structure = structure;
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required_fields.insert(name.into());
        self
    }

    pub fn required_fields<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.required_fields.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, default: DefaultValue) -> Self {
        self.default_values.insert(name.into(), default);
        self
    }

    /// Add a base schema. Bases listed earlier take precedence over later ones.
    pub fn extends(mut self, base: &Arc<Schema>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Mark the schema as abstract: extendable, never registered.
    pub fn abstract_schema(mut self) -> Self {
        self.abstract_schema = true;
        self
    }

    /// Compose the declaration with its bases into an immutable schema.
    pub fn build(self) -> SchemaResult<Arc<Schema>> {
        let SchemaBuilder {
            name,
            abstract_schema,
            mut structure,
            mut required_fields,
            indexes: own_indexes,
            mut default_values,
            bases,
        } = self;

        let mut indexes = Vec::with_capacity(own_indexes.len());
        for index in own_indexes {
            push_distinct(&mut indexes, index);
        }

        for base in &bases {
            structure.merge_missing(&base.structure);
            required_fields.extend(base.required_fields.iter().cloned());
            for index in &base.indexes {
                push_distinct(&mut indexes, index.clone());
            }
            for (field, default) in &base.default_values {
                default_values
                    .entry(field.clone())
                    .or_insert_with(|| default.clone());
            }
        }

        let shard_index = match find_shard_index(&indexes) {
            Ok(shard_index) => shard_index,
            Err(err) => {
                let err = err.for_schema(name.as_str());
                log_event_with_fields(
                    Event::SchemaDefinitionRejected,
                    &[("schema", name.as_str()), ("reason", err.message())],
                );
                return Err(err);
            }
        };

        let base_names: Vec<&str> = bases.iter().map(|base| base.name()).collect();
        let base_names = base_names.join(",");
        let field_count = structure.fields().len().to_string();
        log_event_with_fields(
            Event::SchemaComposed,
            &[
                ("schema", name.as_str()),
                ("bases", base_names.as_str()),
                ("fields", field_count.as_str()),
                ("sharded", if shard_index.is_some() { "true" } else { "false" }),
            ],
        );

        Ok(Arc::new(Schema {
            name,
            abstract_schema,
            structure,
            required_fields,
            indexes,
            default_values,
            shard_index,
        }))
    }
}

fn push_distinct(indexes: &mut Vec<IndexSpec>, index: IndexSpec) {
    if !indexes.contains(&index) {
        indexes.push(index);
    }
}

/// Find the shard index and check index properties.
///
/// Uniqueness is only constrained on sharded schemas, where the shard key
/// is the one index that can be enforced as unique.
pub fn find_shard_index(indexes: &[IndexSpec]) -> SchemaResult<Option<IndexSpec>> {
    let shard_key_indexes: Vec<&IndexSpec> =
        indexes.iter().filter(|index| index.shard_key).collect();
    let shard_index = match shard_key_indexes.as_slice() {
        [] => return Ok(None),
        [only] => *only,
        _ => {
            return Err(SchemaError::definition(
                "",
                "There can only be one shard key per collection.",
            ))
        }
    };

    let unique_indexes: Vec<&IndexSpec> = indexes.iter().filter(|index| index.unique).collect();
    if unique_indexes.len() > 1 {
        return Err(SchemaError::definition(
            "",
            "A sharded collection may only have one unique index.",
        ));
    }
    if let [unique] = unique_indexes.as_slice() {
        if *unique != shard_index {
            return Err(SchemaError::definition(
                "",
                "Only the shard key may be used as a unique index on a sharded collection.",
            ));
        }
    }

    Ok(Some(shard_index.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn user_base() -> Arc<Schema> {
        SchemaBuilder::new("User")
            .field("username", Descriptor::string())
            .required("username")
            .index(IndexSpec::new(["username"]))
            .default_value("username", DefaultValue::literal("anonymous"))
            .abstract_schema()
            .build()
            .unwrap()
    }

    #[test]
    fn test_no_indexes_means_unsharded() {
        assert_eq!(find_shard_index(&[]).unwrap(), None);
    }

    #[test]
    fn test_two_shard_keys_rejected() {
        let indexes = vec![
            IndexSpec::new(["a"]).shard_key(),
            IndexSpec::new(["b"]).shard_key(),
        ];
        let err = find_shard_index(&indexes).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.message(), "There can only be one shard key per collection.");
    }

    #[test]
    fn test_unique_index_beside_shard_key_rejected() {
        let indexes = vec![
            IndexSpec::new(["a"]).shard_key().unique(),
            IndexSpec::new(["b"]).unique(),
        ];
        let err = find_shard_index(&indexes).unwrap_err();
        assert_eq!(
            err.message(),
            "A sharded collection may only have one unique index."
        );
    }

    #[test]
    fn test_unique_non_shard_index_rejected() {
        let indexes = vec![
            IndexSpec::new(["a"]).shard_key(),
            IndexSpec::new(["b"]).unique(),
        ];
        let err = find_shard_index(&indexes).unwrap_err();
        assert_eq!(
            err.message(),
            "Only the shard key may be used as a unique index on a sharded collection."
        );
    }

    #[test]
    fn test_unique_shard_key_accepted() {
        let shard = IndexSpec::new(["a", "b"]).shard_key().unique();
        let indexes = vec![IndexSpec::new(["c"]), shard.clone()];
        assert_eq!(find_shard_index(&indexes).unwrap(), Some(shard));
    }

    #[test]
    fn test_unsharded_may_have_several_unique_indexes() {
        let indexes = vec![IndexSpec::new(["a"]).unique(), IndexSpec::new(["b"]).unique()];
        assert_eq!(find_shard_index(&indexes).unwrap(), None);
    }

    #[test]
    fn test_build_reports_schema_name() {
        let err = SchemaBuilder::new("Broken")
            .index(IndexSpec::new(["a"]).shard_key())
            .index(IndexSpec::new(["b"]).shard_key())
            .build()
            .unwrap_err();
        assert_eq!(err.schema_name(), Some("Broken"));
    }

    #[test]
    fn test_merge_with_base() {
        let base = user_base();
        let paid = SchemaBuilder::new("PaidUser")
            .field("paid", Structure::new().field("amount", Descriptor::float()))
            .required("paid")
            .index(IndexSpec::new(["paid.amount"]))
            .extends(&base)
            .build()
            .unwrap();

        assert!(paid.structure().fields().contains_key("paid"));
        assert!(paid.structure().fields().contains_key("username"));
        assert_eq!(
            paid.indexes(),
            &[IndexSpec::new(["paid.amount"]), IndexSpec::new(["username"])]
        );
        assert!(paid.required_fields().contains("paid"));
        assert!(paid.required_fields().contains("username"));
        assert!(paid.default_values().contains_key("username"));
        assert!(!paid.is_abstract());
        assert!(base.is_abstract());
    }

    #[test]
    fn test_subclass_declaration_wins() {
        let base = user_base();
        let child = SchemaBuilder::new("Child")
            .field("username", Descriptor::integer())
            .default_value("username", DefaultValue::literal(7))
            .extends(&base)
            .build()
            .unwrap();

        assert_eq!(child.structure().fields()["username"], Descriptor::integer());
        assert_eq!(child.default_values()["username"].produce(), Value::Int(7));
    }

    #[test]
    fn test_earlier_base_wins() {
        let first = SchemaBuilder::new("First")
            .field("x", Descriptor::string())
            .build()
            .unwrap();
        let second = SchemaBuilder::new("Second")
            .field("x", Descriptor::integer())
            .build()
            .unwrap();
        let both = SchemaBuilder::new("Both")
            .extends(&first)
            .extends(&second)
            .build()
            .unwrap();
        assert_eq!(both.structure().fields()["x"], Descriptor::string());
    }

    #[test]
    fn test_diamond_inheritance_keeps_one_shard_index() {
        let root = SchemaBuilder::new("Root")
            .field("region", Descriptor::string())
            .index(IndexSpec::new(["region"]).shard_key())
            .build()
            .unwrap();
        let left = SchemaBuilder::new("Left").extends(&root).build().unwrap();
        let right = SchemaBuilder::new("Right").extends(&root).build().unwrap();
        let leaf = SchemaBuilder::new("Leaf")
            .extends(&left)
            .extends(&right)
            .build()
            .unwrap();

        assert_eq!(leaf.indexes().len(), 1);
        assert_eq!(leaf.shard_key_fields(), vec!["region"]);
    }

    #[test]
    fn test_inherited_shard_key_conflict_rejected() {
        let root = SchemaBuilder::new("Root")
            .index(IndexSpec::new(["region"]).shard_key())
            .build()
            .unwrap();
        let err = SchemaBuilder::new("Child")
            .index(IndexSpec::new(["tenant"]).shard_key())
            .extends(&root)
            .build()
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
