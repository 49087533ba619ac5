//! Structure walker
//!
//! Pairs a document's values with the expected-type tree and hands every
//! leaf position to a field validator callback. Containers are handled here:
//!
//! - list descriptor over an array: each element against the member type,
//!   path extended by the element index
//! - list descriptor over a document: the expanded form of positional update
//!   paths (`{'foo.0.bar': 1}` becomes `{'foo': {'0': {'bar': 1}}}`), so
//!   every key must be a non-negative integer or `$`
//! - structure or embedded schema: recurse with the nested structure
//!
//! Everything else is a leaf and goes to the callback.

use super::messages;
use crate::schema::{is_position, Descriptor, SchemaError, SchemaResult, Structure};
use crate::value::{quoted, Document, Value};

/// Whether a walk checks embedded required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Whole-document validation
    Document,
    /// Partial bodies such as `$set` arguments; no required checks
    Partial,
}

/// Recursive walker over a document and its structure.
pub struct StructureWalker<F> {
    field_validator: F,
    mode: WalkMode,
}

impl<F> StructureWalker<F>
where
    F: FnMut(&str, &Value, &Descriptor) -> SchemaResult<()>,
{
    /// Creates a walker for whole documents.
    pub fn new(field_validator: F) -> Self {
        Self::with_mode(WalkMode::Document, field_validator)
    }

    /// Creates a walker for partial bodies.
    pub fn partial(field_validator: F) -> Self {
        Self::with_mode(WalkMode::Partial, field_validator)
    }

    pub fn with_mode(mode: WalkMode, field_validator: F) -> Self {
        Self {
            field_validator,
            mode,
        }
    }

    pub fn mode(&self) -> WalkMode {
        self.mode
    }

    /// Walks `body` against `structure`.
    ///
    /// `path` is the dotted path of `body` itself, `None` at the root.
    /// Keys declared literally are checked against their own descriptor
    /// only; type-keyed entries cover the remaining keys they accept.
    pub fn walk_document(
        &mut self,
        body: &Document,
        structure: &Structure,
        path: Option<&str>,
    ) -> SchemaResult<()> {
        check_for_unknown_fields(body, structure, path)?;

        for (key_type, sub_structure) in structure.typed_fields() {
            for (key, value) in body {
                if structure.fields().contains_key(key) || !key_type.accepts(key) {
                    continue;
                }
                self.recurse_or_validate_field(value, sub_structure, &join(path, key))?;
            }
        }

        for (field, sub_structure) in structure.fields() {
            if let Some(value) = body.get(field) {
                self.recurse_or_validate_field(value, sub_structure, &join(path, field))?;
            }
        }

        Ok(())
    }

    fn recurse_or_validate_field(
        &mut self,
        value: &Value,
        descriptor: &Descriptor,
        path: &str,
    ) -> SchemaResult<()> {
        match descriptor {
            Descriptor::List(member) => match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        self.recurse_or_validate_field(item, member, &join(Some(path), &i.to_string()))?;
                    }
                    Ok(())
                }
                Value::Document(positions) => {
                    for (key, item) in positions {
                        if !is_position(key) {
                            return Err(SchemaError::validation_at(
                                path,
                                format!(
                                    "Position {} was declared to be {}, but encountered non-positional key {}",
                                    quoted(path),
                                    descriptor,
                                    quoted(key)
                                ),
                            ));
                        }
                        self.recurse_or_validate_field(item, member, &join(Some(path), key))?;
                    }
                    Ok(())
                }
                _ => Err(messages::type_mismatch(path, descriptor, value)),
            },
            Descriptor::Structure(structure) => match value {
                Value::Document(doc) => self.walk_document(doc, structure, Some(path)),
                _ => Err(messages::type_mismatch(path, descriptor, value)),
            },
            Descriptor::Embedded(schema) => match value {
                Value::Document(doc) => {
                    self.walk_document(doc, schema.structure(), Some(path))?;
                    if self.mode == WalkMode::Document {
                        messages::check_required(doc, schema.required_fields(), Some(path))?;
                    }
                    Ok(())
                }
                _ => Err(messages::type_mismatch(path, descriptor, value)),
            },
            _ => (self.field_validator)(path, value, descriptor),
        }
    }
}

/// Check `body` for keys matched by neither a literal nor a typed entry.
///
/// Only the first level of keys is checked here; nested documents are
/// checked as the walk reaches them.
fn check_for_unknown_fields(
    body: &Document,
    structure: &Structure,
    path: Option<&str>,
) -> SchemaResult<()> {
    let unknown: Vec<String> = body
        .keys()
        .filter(|key| !structure.accepts_key(key))
        .map(|key| quoted(key))
        .collect();

    if unknown.is_empty() {
        return Ok(());
    }

    let names = unknown.join(", ");
    Err(match path {
        Some(path) => SchemaError::validation_at(
            path,
            format!(
                "Encountered field(s), in subdocument at {}, not present in structure: {}",
                path, names
            ),
        ),
        None => SchemaError::validation(format!(
            "Encountered field(s) not present in structure: {}",
            names
        )),
    })
}

/// Join `head` and `tail` with a dot; without a head only `tail` is used.
pub(crate) fn join(head: Option<&str>, tail: &str) -> String {
    match head {
        Some(head) => format!("{}.{}", head, tail),
        None => tail.to_string(),
    }
}
