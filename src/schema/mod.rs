//! Schema subsystem
//!
//! A schema declares the expected shape of every document of one type:
//! the structure (field names to [`Descriptor`]s), required fields,
//! indexes with at most one shard key, and default values.
//!
//! # Design Principles
//!
//! - Schemas are composed once by [`SchemaBuilder::build`] and immutable after
//! - Inheritance is explicit: bases are listed, merged, and checked together
//! - Index inconsistencies fail composition, never a later write
//! - Document bodies and schema metadata live in separate namespaces

mod composer;
mod descriptor;
mod document;
mod errors;
mod registry;
mod types;

pub use composer::{find_shard_index, SchemaBuilder};
pub(crate) use descriptor::is_position;
pub use descriptor::{
    Descriptor, KeyPattern, KeyType, OneOfTypes, OneOfValues, PrimitiveType, Structure,
};
pub use document::{EmbeddedDocument, SchemaDocument};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult, Severity};
pub use registry::{SchemaHandle, SchemaRegistry};
pub use types::{DefaultValue, Direction, IndexField, IndexSpec, Schema};
