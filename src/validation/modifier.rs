//! Update modifier validation
//!
//! Checks a modifier spec against a structure before it is sent to the
//! store. Each operator has its own rule:
//!
//! | operator            | rule                                                  |
//! |---------------------|-------------------------------------------------------|
//! | `$set`              | expanded arguments validate as a partial document     |
//! | `$unset`            | accepted (optionally protected, see [`ValidatorConfig`]) |
//! | `$rename`           | old and new field declare the same descriptor         |
//! | `$inc`              | field declared numeric, amount numeric                |
//! | `$push` `$addToSet` | field declared as a list, value matches the member    |
//! | `$pushAll`          | array argument, every element as for `$push`          |
//! | `$pop` `$pull` `$pullAll` `$bit` | accepted                                 |
//!
//! Unknown operators are rejected.

use std::sync::Arc;

use super::matcher::is_field_of_expected_type;
use super::update::{classify_update, expand_dotted_paths, UpdateKind};
use super::validator::{validate_partial_structure, validate_structure};
use crate::config::ValidatorConfig;
use crate::schema::{Descriptor, Schema, SchemaDocument, SchemaError, SchemaResult, Structure};
use crate::value::{quoted, Document, Value};

/// Update operators known to the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateModifier {
    Set,
    Unset,
    Rename,
    Inc,
    Push,
    AddToSet,
    PushAll,
    Pop,
    Pull,
    PullAll,
    Bit,
}

impl UpdateModifier {
    /// Parse an operator name such as `$set`
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "$set" => Some(UpdateModifier::Set),
            "$unset" => Some(UpdateModifier::Unset),
            "$rename" => Some(UpdateModifier::Rename),
            "$inc" => Some(UpdateModifier::Inc),
            "$push" => Some(UpdateModifier::Push),
            "$addToSet" => Some(UpdateModifier::AddToSet),
            "$pushAll" => Some(UpdateModifier::PushAll),
            "$pop" => Some(UpdateModifier::Pop),
            "$pull" => Some(UpdateModifier::Pull),
            "$pullAll" => Some(UpdateModifier::PullAll),
            "$bit" => Some(UpdateModifier::Bit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateModifier::Set => "$set",
            UpdateModifier::Unset => "$unset",
            UpdateModifier::Rename => "$rename",
            UpdateModifier::Inc => "$inc",
            UpdateModifier::Push => "$push",
            UpdateModifier::AddToSet => "$addToSet",
            UpdateModifier::PushAll => "$pushAll",
            UpdateModifier::Pop => "$pop",
            UpdateModifier::Pull => "$pull",
            UpdateModifier::PullAll => "$pullAll",
            UpdateModifier::Bit => "$bit",
        }
    }
}

/// Configured update validator
#[derive(Debug, Clone, Default)]
pub struct UpdateValidator {
    config: ValidatorConfig,
}

impl UpdateValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate any update spec for `schema`.
    ///
    /// Replacement documents get the schema's defaults and are validated
    /// as whole documents.
    pub fn validate_update(&self, spec: &Document, schema: &Arc<Schema>) -> SchemaResult<()> {
        match classify_update(spec, self.config.mixed_update_policy)? {
            UpdateKind::Modifier => self.validate_modifier(spec, schema),
            UpdateKind::Replacement => {
                let replacement: Document = spec
                    .iter()
                    .filter(|(key, _)| !key.starts_with('$'))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                SchemaDocument::new(schema, replacement).validate()
            }
        }
    }

    /// Validate a modifier spec for `schema`.
    pub fn validate_modifier(&self, spec: &Document, schema: &Schema) -> SchemaResult<()> {
        for (name, args) in spec {
            if self.config.protect_unset && UpdateModifier::parse(name) == Some(UpdateModifier::Unset) {
                check_unset_allowed(modifier_args(name, args)?, schema)?;
                continue;
            }
            validate_single_modifier(name, args, schema.structure())?;
        }
        Ok(())
    }
}

/// Validate every operator of `spec` against `structure`.
pub fn validate_update_modifier(spec: &Document, structure: &Structure) -> SchemaResult<()> {
    for (name, args) in spec {
        validate_single_modifier(name, args, structure)?;
    }
    Ok(())
}

/// Validate one operator and its arguments.
pub fn validate_single_modifier(name: &str, args: &Value, structure: &Structure) -> SchemaResult<()> {
    let modifier = UpdateModifier::parse(name).ok_or_else(|| {
        SchemaError::validation(format!("Encountered unknown update modifier {}", quoted(name)))
    })?;
    let args = modifier_args(name, args)?;

    match modifier {
        UpdateModifier::Set => validate_partial_structure(&expand_dotted_paths(args)?, structure),
        UpdateModifier::Rename => validate_rename(args, structure),
        UpdateModifier::Inc => validate_inc(args, structure),
        UpdateModifier::Push | UpdateModifier::AddToSet => {
            let action = if modifier == UpdateModifier::Push {
                "push"
            } else {
                "$addToSet"
            };
            for (field, value) in args {
                let declared = declared_type(field, structure)?;
                validate_push(action, field, declared, value)?;
            }
            Ok(())
        }
        UpdateModifier::PushAll => {
            for (field, value) in args {
                let declared = declared_type(field, structure)?;
                match value {
                    Value::Array(items) => {
                        for item in items {
                            validate_array_addition("push", declared, item)?;
                        }
                    }
                    other => {
                        return Err(SchemaError::validation_at(
                            field.as_str(),
                            format!("Cannot use modifier $pushAll with non-array argument {}", other),
                        ))
                    }
                }
            }
            Ok(())
        }
        UpdateModifier::Unset
        | UpdateModifier::Pop
        | UpdateModifier::Pull
        | UpdateModifier::PullAll
        | UpdateModifier::Bit => Ok(()),
    }
}

fn modifier_args<'a>(name: &str, args: &'a Value) -> SchemaResult<&'a Document> {
    args.as_document().ok_or_else(|| {
        SchemaError::validation(format!(
            "Update modifier {} expects a document of fields, got {}",
            quoted(name),
            args
        ))
    })
}

/// Descriptor declared at a dotted update path; undeclared paths are
/// reported like unknown fields of a document.
fn declared_type<'s>(field: &str, structure: &'s Structure) -> SchemaResult<&'s Descriptor> {
    structure.resolve(field).ok_or_else(|| {
        SchemaError::validation_at(
            field,
            format!(
                "Encountered field(s) not present in structure: {}",
                quoted(field)
            ),
        )
    })
}

fn validate_rename(args: &Document, structure: &Structure) -> SchemaResult<()> {
    for (old_name, new_name) in args {
        let new_name = match new_name {
            Value::String(new_name) => new_name,
            other => {
                return Err(SchemaError::validation_at(
                    old_name.as_str(),
                    format!(
                        "Cannot rename field {} to non-string value {}",
                        quoted(old_name),
                        other
                    ),
                ))
            }
        };
        let old_type = declared_type(old_name, structure)?;
        let new_type = declared_type(new_name, structure)?;
        if old_type != new_type {
            return Err(SchemaError::validation_at(
                old_name.as_str(),
                format!(
                    "Cannot rename field of type {} to field of type {}",
                    old_type, new_type
                ),
            ));
        }
    }
    Ok(())
}

fn validate_inc(args: &Document, structure: &Structure) -> SchemaResult<()> {
    for (field, amount) in args {
        let declared = declared_type(field, structure)?;
        if !declared.is_numeric() {
            return Err(SchemaError::validation_at(
                field.as_str(),
                format!("Cannot increment non-numeric field declared as {}", declared),
            ));
        }
        if !amount.is_numeric() {
            return Err(SchemaError::validation_at(
                field.as_str(),
                format!(
                    "Cannot increment field {} by non-numeric value {}",
                    quoted(field),
                    amount
                ),
            ));
        }
    }
    Ok(())
}

/// `$push`/`$addToSet` take a single value or `{'$each': [...]}`.
fn validate_push(action: &str, field: &str, declared: &Descriptor, value: &Value) -> SchemaResult<()> {
    let each = value
        .as_document()
        .and_then(|doc| doc.get("$each"));
    match each {
        Some(Value::Array(items)) => {
            for item in items {
                validate_array_addition(action, declared, item)?;
            }
            Ok(())
        }
        Some(other) => Err(SchemaError::validation_at(
            field,
            format!("Cannot use $each with non-array argument {}", other),
        )),
        None => validate_array_addition(action, declared, value),
    }
}

fn validate_array_addition(action: &str, declared: &Descriptor, value: &Value) -> SchemaResult<()> {
    let member = match declared {
        Descriptor::List(member) => member.as_ref(),
        other => {
            return Err(SchemaError::validation(format!(
                "Cannot {} values onto non-array field of {}",
                action, other
            )))
        }
    };

    let nested = match (member, value) {
        (Descriptor::Structure(structure), Value::Document(doc)) => {
            Some(validate_structure(doc, structure))
        }
        (Descriptor::Embedded(schema), Value::Document(doc)) => Some(schema.validate(doc)),
        _ => None,
    };

    match nested {
        Some(Ok(())) => Ok(()),
        Some(Err(err)) => Err(SchemaError::validation(format!(
            "Cannot {} value {} onto array of {}: {}",
            action, value, member, err
        ))),
        None if is_field_of_expected_type(value, member) => Ok(()),
        None => Err(SchemaError::validation(format!(
            "Cannot {} value {} onto array of {}",
            action, value, member
        ))),
    }
}

/// `$unset` may not remove required or shard key fields.
fn check_unset_allowed(args: &Document, schema: &Schema) -> SchemaResult<()> {
    let shard_key = schema.shard_key_fields();
    for field in args.keys() {
        if schema.required_fields().contains(field) {
            return Err(SchemaError::validation_at(
                field.as_str(),
                format!("Cannot unset required field {}", quoted(field)),
            ));
        }
        if shard_key.contains(&field.as_str()) {
            return Err(SchemaError::validation_at(
                field.as_str(),
                format!("Cannot unset shard key field {}", quoted(field)),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MixedUpdatePolicy;
    use crate::schema::{IndexSpec, SchemaBuilder};
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        match Value::from(json) {
            Value::Document(doc) => doc,
            other => panic!("expected document, got {}", other),
        }
    }

    fn blog_post() -> Arc<Schema> {
        SchemaBuilder::new("BlogPost")
            .field("author", Descriptor::string())
            .field("title", Descriptor::string())
            .field("headline", Descriptor::string())
            .field("views", Descriptor::integer())
            .field("rating", Descriptor::float())
            .field("created", Descriptor::datetime())
            .field("tags", Descriptor::list_of(Descriptor::string()))
            .field("scores", Descriptor::list_of(Descriptor::float()))
            .field(
                "comments",
                Descriptor::list_of(
                    Structure::new()
                        .field("text", Descriptor::string())
                        .field("votes", Descriptor::integer()),
                ),
            )
            .required_fields(["author", "title"])
            .index(IndexSpec::new(["author"]).shard_key())
            .build()
            .unwrap()
    }

    fn check(spec: serde_json::Value) -> SchemaResult<()> {
        validate_update_modifier(&doc(spec), blog_post().structure())
    }

    #[test]
    fn test_unknown_modifier() {
        let err = check(json!({"$frobnicate": {"views": 1}})).unwrap_err();
        assert_eq!(err.message(), "Encountered unknown update modifier '$frobnicate'");
    }

    #[test]
    fn test_set() {
        assert!(check(json!({"$set": {"title": "x", "views": 3}})).is_ok());
        assert!(check(json!({"$set": {"comments.0.votes": 3}})).is_ok());
        assert!(check(json!({"$set": {"comments.$.text": "edited"}})).is_ok());

        let err = check(json!({"$set": {"views": "many"}})).unwrap_err();
        assert_eq!(
            err.message(),
            "Position 'views' was declared to be integer, but encountered value 'many'"
        );

        let err = check(json!({"$set": {"comments.0.votes": "x"}})).unwrap_err();
        assert_eq!(
            err.message(),
            "Position 'comments.0.votes' was declared to be integer, but encountered value 'x'"
        );

        let err = check(json!({"$set": {"comments.first.votes": 1}})).unwrap_err();
        assert!(err.message().contains("non-positional key 'first'"));
    }

    #[test]
    fn test_set_partial_does_not_need_required_fields() {
        assert!(check(json!({"$set": {"views": 1}})).is_ok());
    }

    #[test]
    fn test_inc_on_datetime() {
        let err = check(json!({"$inc": {"created": 1}})).unwrap_err();
        assert_eq!(
            err.message(),
            "Cannot increment non-numeric field declared as datetime"
        );
    }

    #[test]
    fn test_inc() {
        assert!(check(json!({"$inc": {"views": 1, "rating": -0.5}})).is_ok());
        assert!(check(json!({"$inc": {"comments.0.votes": 1}})).is_ok());
        let err = check(json!({"$inc": {"views": "1"}})).unwrap_err();
        assert_eq!(err.message(), "Cannot increment field 'views' by non-numeric value '1'");
    }

    #[test]
    fn test_inc_unknown_field() {
        let err = check(json!({"$inc": {"likes": 1}})).unwrap_err();
        assert_eq!(err.message(), "Encountered field(s) not present in structure: 'likes'");
    }

    #[test]
    fn test_push() {
        assert!(check(json!({"$push": {"tags": "rust"}})).is_ok());
        assert!(check(json!({"$push": {"scores": 1.5}})).is_ok());

        let err = check(json!({"$push": {"scores": 1}})).unwrap_err();
        assert_eq!(err.message(), "Cannot push value 1 onto array of float");

        let err = check(json!({"$addToSet": {"tags": 1}})).unwrap_err();
        assert_eq!(err.message(), "Cannot $addToSet value 1 onto array of string");

        let err = check(json!({"$push": {"title": "x"}})).unwrap_err();
        assert_eq!(err.message(), "Cannot push values onto non-array field of string");
    }

    #[test]
    fn test_push_subdocument() {
        assert!(check(json!({"$push": {"comments": {"text": "hi", "votes": 0}}})).is_ok());
        let err = check(json!({"$push": {"comments": {"text": 5}}})).unwrap_err();
        assert!(err
            .message()
            .starts_with("Cannot push value {'text': 5} onto array of {'text': string, 'votes': integer}: "));
        assert!(err.message().ends_with("Position 'text' was declared to be string, but encountered value 5"));
    }

    #[test]
    fn test_push_each() {
        assert!(check(json!({"$addToSet": {"tags": {"$each": ["a", "b"]}}})).is_ok());
        let err = check(json!({"$push": {"tags": {"$each": ["a", 2]}}})).unwrap_err();
        assert_eq!(err.message(), "Cannot push value 2 onto array of string");
    }

    #[test]
    fn test_push_all() {
        assert!(check(json!({"$pushAll": {"tags": ["a", "b"]}})).is_ok());
        let err = check(json!({"$pushAll": {"tags": "a"}})).unwrap_err();
        assert_eq!(err.message(), "Cannot use modifier $pushAll with non-array argument 'a'");
        let err = check(json!({"$pushAll": {"scores": [1.0, "x"]}})).unwrap_err();
        assert_eq!(err.message(), "Cannot push value 'x' onto array of float");
    }

    #[test]
    fn test_rename() {
        assert!(check(json!({"$rename": {"title": "headline"}})).is_ok());
        let err = check(json!({"$rename": {"title": "views"}})).unwrap_err();
        assert_eq!(
            err.message(),
            "Cannot rename field of type string to field of type integer"
        );
        let err = check(json!({"$rename": {"title": "subtitle"}})).unwrap_err();
        assert_eq!(err.message(), "Encountered field(s) not present in structure: 'subtitle'");
    }

    #[test]
    fn test_unchecked_modifiers() {
        assert!(check(json!({
            "$unset": {"title": 1},
            "$pop": {"tags": 1},
            "$pull": {"tags": "a"},
            "$pullAll": {"tags": ["a"]},
            "$bit": {"views": {"and": 5}}
        }))
        .is_ok());
    }

    #[test]
    fn test_non_document_arguments() {
        let err = check(json!({"$set": 5})).unwrap_err();
        assert_eq!(
            err.message(),
            "Update modifier '$set' expects a document of fields, got 5"
        );
    }

    #[test]
    fn test_protect_unset() {
        let schema = blog_post();
        let lenient = UpdateValidator::default();
        assert!(lenient
            .validate_update(&doc(json!({"$unset": {"title": 1}})), &schema)
            .is_ok());

        let strict = UpdateValidator::new(ValidatorConfig {
            protect_unset: true,
            ..ValidatorConfig::default()
        });
        let err = strict
            .validate_update(&doc(json!({"$unset": {"title": 1}})), &schema)
            .unwrap_err();
        assert_eq!(err.message(), "Cannot unset required field 'title'");
        assert!(strict
            .validate_update(&doc(json!({"$unset": {"views": 1}})), &schema)
            .is_ok());
    }

    #[test]
    fn test_protect_unset_shard_key() {
        let schema = SchemaBuilder::new("Event")
            .field("region", Descriptor::string())
            .index(IndexSpec::new(["region"]).shard_key())
            .build()
            .unwrap();
        let strict = UpdateValidator::new(ValidatorConfig {
            protect_unset: true,
            ..ValidatorConfig::default()
        });
        let err = strict
            .validate_update(&doc(json!({"$unset": {"region": 1}})), &schema)
            .unwrap_err();
        assert_eq!(err.message(), "Cannot unset shard key field 'region'");
    }

    #[test]
    fn test_replacement_update() {
        let schema = blog_post();
        let validator = UpdateValidator::default();
        assert!(validator
            .validate_update(&doc(json!({"author": "a", "title": "t"})), &schema)
            .is_ok());
        let err = validator
            .validate_update(&doc(json!({"author": "a"})), &schema)
            .unwrap_err();
        assert_eq!(err.message(), "Missing required field(s) 'title'");
    }

    #[test]
    fn test_mixed_update_policy() {
        let schema = blog_post();
        let mixed = doc(json!({"$set": {"views": 1}, "title": "t"}));
        assert!(UpdateValidator::default().validate_update(&mixed, &schema).is_err());

        let first_key = UpdateValidator::new(ValidatorConfig {
            mixed_update_policy: MixedUpdatePolicy::FirstKey,
            ..ValidatorConfig::default()
        });
        // classified as a modifier spec, so 'title' is an unknown operator
        let err = first_key.validate_update(&mixed, &schema).unwrap_err();
        assert_eq!(err.message(), "Encountered unknown update modifier 'title'");
    }
}
