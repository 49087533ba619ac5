//! Document value model
//!
//! Documents handled by docguard are ordered maps of string field names to
//! [`Value`]s. The model is closed: every primitive type tag a schema can
//! declare has exactly one variant here.
//!
//! Values cross the boundary with the document store as extended JSON
//! (see [`json`]), so types JSON lacks are carried as single-key marker
//! objects such as `{"$date": "2024-01-01T00:00:00Z"}`.

mod json;
mod types;

pub use json::{from_json, to_json};
pub use types::{Document, Value};
pub(crate) use types::{quoted, write_quoted};
