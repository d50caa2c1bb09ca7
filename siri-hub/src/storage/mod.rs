//! Storage layer.
//!
//! All shared hub state goes through [`KeyedTtlStore`], so the engine can run on the
//! bundled in-process backend or on a clustered cache with the same code.

pub(crate) mod keyed_ttl_store;
pub(crate) mod memory_store;

pub use keyed_ttl_store::{Compute, ExpiryMaintenance, KeyedTtlStore, StoreProvider};
pub use memory_store::{InMemoryStoreProvider, InMemoryTtlStore};
