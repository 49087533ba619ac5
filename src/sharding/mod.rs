//! Sharding guard
//!
//! Refuses targeted operations whose query spec would have to be broadcast
//! to every shard because it omits part of the collection's shard key.

mod guard;

pub use guard::{check_sharding, check_sharding_scoped, spec_of, QueryScope, ShardGuard};
