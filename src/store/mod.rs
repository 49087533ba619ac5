//! Document store dispatch
//!
//! docguard does not talk to a database itself. [`DocumentStore`] is the
//! interface a client implements; [`Collection`] wraps one and enforces
//! schemas and shard key targeting on the way in.
//!
//! [`MemoryStore`] is a complete in-process implementation.

mod collection;
mod errors;
mod memory;

pub use collection::{Collection, DocumentStore};
pub use errors::{DispatchError, DispatchResult, StoreError, StoreResult};
pub use memory::MemoryStore;
