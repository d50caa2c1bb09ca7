//! Entity layer.
//!
//! Per-kind profiles plug key derivation, fingerprints and expiration into the one
//! generic [`EntityStore`].

pub(crate) mod checksum;
pub(crate) mod entity_store;
pub(crate) mod expiration;
pub(crate) mod profile;
pub(crate) mod profiles;

pub use checksum::{fingerprint, ChecksumError};
pub use entity_store::{EntityStore, Envelope, UpsertResult, UpsertSummary};
pub use expiration::{Expiration, ExpirationPolicy};
pub use profile::EntityProfile;
pub use profiles::{
    EstimatedJourneyProfile, FacilityConditionProfile, InfoMessageProfile, SituationProfile,
    StopVisitProfile, VehicleActivityProfile,
};
