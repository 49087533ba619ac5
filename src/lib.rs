//! docguard - schema validation and structural checks for document data
//!
//! Declared schemas are checked before anything reaches the document store:
//! new documents, replacement documents and update modifiers are validated
//! against the schema's structure, and targeted operations on sharded
//! collections must name the full shard key.

pub mod config;
pub mod observability;
pub mod schema;
pub mod sharding;
pub mod store;
pub mod validation;
pub mod value;
