//! Hub facade.
//!
//! [`KindEngine`] binds one profile to its store, tracker and the shared dispatcher;
//! [`SiriHub`] owns one engine per kind plus the background loops.

pub(crate) mod kind_engine;
pub(crate) mod siri_hub;

pub use kind_engine::KindEngine;
pub use siri_hub::{SiriHub, SiriHubBuilder};
