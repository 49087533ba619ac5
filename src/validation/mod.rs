//! Document and update validation
//!
//! - [`walker`]: pairs document values with the expected-type tree
//! - [`matcher`]: decides whether one value satisfies one descriptor
//! - [`validator`]: whole-document and partial-body validation
//! - [`update`]: modifier/replacement classification, dotted path expansion
//! - [`modifier`]: per-operator rules for update specs
//!
//! Validation never mutates its input and stops at the first violation.

pub mod matcher;
mod messages;
pub mod modifier;
pub mod update;
pub mod validator;
pub mod walker;

pub use matcher::{is_field_of_expected_type, TypeMatcher};
pub use modifier::{
    validate_single_modifier, validate_update_modifier, UpdateModifier, UpdateValidator,
};
pub use update::{classify_update, expand_dotted_paths, is_update_modifier, UpdateKind};
pub use validator::{
    validate_document, validate_partial_structure, validate_required_fields,
    validate_single_field, validate_structure,
};
pub use walker::{StructureWalker, WalkMode};
