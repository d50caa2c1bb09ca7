//! Observability layer.
//!
//! Event names and field keys shared by every structured log line.

pub mod events;
pub mod fields;
