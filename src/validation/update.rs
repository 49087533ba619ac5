//! Update document shapes
//!
//! An update spec is either a modifier spec (`{'$set': {...}, '$inc': {...}}`)
//! or a replacement document. Modifier arguments address fields by dotted
//! path; [`expand_dotted_paths`] turns them into nested documents so the
//! structure walker can check them.

use crate::config::MixedUpdatePolicy;
use crate::schema::{SchemaError, SchemaResult};
use crate::value::{quoted, Document, Value};

/// How an update spec is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Top-level keys are update operators
    Modifier,
    /// The update replaces the stored document wholesale
    Replacement,
}

/// Returns whether the first key of `spec` is an update operator.
pub fn is_update_modifier(spec: &Document) -> bool {
    spec.keys()
        .next()
        .map(|key| key.starts_with('$'))
        .unwrap_or(false)
}

/// Classify `spec`, applying `policy` when operator and plain keys mix.
pub fn classify_update(spec: &Document, policy: MixedUpdatePolicy) -> SchemaResult<UpdateKind> {
    let operators = spec.keys().filter(|key| key.starts_with('$')).count();

    if operators == 0 {
        return Ok(UpdateKind::Replacement);
    }
    if operators == spec.len() {
        return Ok(UpdateKind::Modifier);
    }

    match policy {
        MixedUpdatePolicy::FirstKey if is_update_modifier(spec) => Ok(UpdateKind::Modifier),
        MixedUpdatePolicy::FirstKey => Ok(UpdateKind::Replacement),
        MixedUpdatePolicy::Reject => {
            let plain: Vec<String> = spec
                .keys()
                .filter(|key| !key.starts_with('$'))
                .map(|key| quoted(key))
                .collect();
            Err(SchemaError::validation(format!(
                "Update mixes modifiers with plain field(s) {}",
                plain.join(", ")
            )))
        }
    }
}

/// Expand dotted keys into nested documents.
///
/// `{'a.b': 1, 'a.c': 2}` becomes `{'a': {'b': 1, 'c': 2}}`. Two paths that
/// would need one position to be both a value and a document conflict.
pub fn expand_dotted_paths(args: &Document) -> SchemaResult<Document> {
    let mut expanded = Document::new();
    for (key, value) in args {
        let segments: Vec<&str> = key.split('.').collect();
        insert_path(&mut expanded, &segments, value.clone(), key)?;
    }
    Ok(expanded)
}

fn insert_path(target: &mut Document, segments: &[&str], value: Value, full_path: &str) -> SchemaResult<()> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(()),
    };

    if rest.is_empty() {
        return match target.remove(*head) {
            None => {
                target.insert(head.to_string(), value);
                Ok(())
            }
            Some(Value::Document(mut existing)) => match value {
                Value::Document(incoming) => {
                    for (key, nested) in incoming {
                        insert_path(&mut existing, &[key.as_str()], nested, full_path)?;
                    }
                    target.insert(head.to_string(), Value::Document(existing));
                    Ok(())
                }
                _ => Err(conflict(full_path)),
            },
            Some(_) => Err(conflict(full_path)),
        };
    }

    let child = target
        .entry(head.to_string())
        .or_insert_with(|| Value::Document(Document::new()));
    match child {
        Value::Document(child) => insert_path(child, rest, value, full_path),
        _ => Err(conflict(full_path)),
    }
}

fn conflict(path: &str) -> SchemaError {
    SchemaError::validation_at(path, format!("Conflicting update paths at {}", quoted(path)))
}
