//! Rejection messages shared by the structure and update validators.

use std::collections::BTreeSet;
use std::fmt;

use crate::schema::SchemaError;
use crate::value::{quoted, Document, Value};

/// A value at `path` does not satisfy its declared descriptor.
pub(crate) fn type_mismatch(path: &str, declared: &dyn fmt::Display, value: &Value) -> SchemaError {
    SchemaError::validation_at(
        path,
        format!(
            "Position {} was declared to be {}, but encountered value {}",
            quoted(path),
            declared,
            value
        ),
    )
}

/// Fails when any of `required` is absent from `body`.
///
/// `path` names the subdocument being checked, `None` for a top-level body.
pub(crate) fn check_required(
    body: &Document,
    required: &BTreeSet<String>,
    path: Option<&str>,
) -> Result<(), SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|field| !body.contains_key(field.as_str()))
        .map(|field| quoted(field))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let names = missing.join(",");
    Err(match path {
        Some(path) => SchemaError::validation_at(
            path,
            format!("Missing required field(s) {} in subdocument at {}", names, path),
        ),
        None => SchemaError::validation(format!("Missing required field(s) {}", names)),
    })
}
