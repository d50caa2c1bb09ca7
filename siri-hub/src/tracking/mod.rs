//! Change-tracking layer.
//!
//! Owns the ingestion-side dirty buffer and the per-consumer change sets served to pollers.

pub(crate) mod change_tracker;
pub(crate) mod dirty_buffer;

pub use change_tracker::{ChangeTracker, ConsumerChangeSet, ReadRequest, ReadResult};
pub use dirty_buffer::DirtyBuffer;
