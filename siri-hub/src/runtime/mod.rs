//! Runtime integration layer.
//!
//! Keeps background scheduling in one place so the stores, trackers and dispatchers stay
//! free of timers.

pub(crate) mod periodic;

pub use periodic::spawn_periodic;
