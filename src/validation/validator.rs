//! Structure validation
//!
//! Binds the walker to the type matcher: every leaf the walker reaches must
//! satisfy its descriptor, otherwise the walk stops with a positional
//! message naming the dotted path, the declared descriptor and the value.

use std::collections::BTreeSet;

use super::matcher::is_field_of_expected_type;
use super::messages;
use super::walker::StructureWalker;
use crate::schema::{Descriptor, Schema, SchemaResult, Structure};
use crate::value::{Document, Value};

/// Validates a whole (sub)document against `structure`.
///
/// Required fields of embedded schemas are checked; the top-level required
/// set is not (see [`validate_document`]).
pub fn validate_structure(body: &Document, structure: &Structure) -> SchemaResult<()> {
    StructureWalker::new(validate_single_field).walk_document(body, structure, None)
}

/// Validates a partial body such as `$set` arguments.
pub fn validate_partial_structure(body: &Document, structure: &Structure) -> SchemaResult<()> {
    StructureWalker::partial(validate_single_field).walk_document(body, structure, None)
}

/// Leaf check used by the walker.
pub fn validate_single_field(path: &str, value: &Value, expected: &Descriptor) -> SchemaResult<()> {
    if is_field_of_expected_type(value, expected) {
        Ok(())
    } else {
        Err(messages::type_mismatch(path, expected, value))
    }
}

/// Fails when any of `required` is absent from `body`.
pub fn validate_required_fields(body: &Document, required: &BTreeSet<String>) -> SchemaResult<()> {
    messages::check_required(body, required, None)
}

/// Validates `body` as a complete document of `schema`.
pub fn validate_document(body: &Document, schema: &Schema) -> SchemaResult<()> {
    validate_structure(body, schema.structure())?;
    validate_required_fields(body, schema.required_fields())
}
