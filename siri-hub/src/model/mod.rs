//! Domain model: record identity, kinds, filters and the SIRI entities.

pub(crate) mod estimated_journey;
pub(crate) mod facility_condition;
pub(crate) mod filter;
pub(crate) mod general_message;
pub(crate) mod kind;
pub(crate) mod record_key;
pub(crate) mod situation;
pub(crate) mod stop_visit;
pub(crate) mod vehicle_activity;

pub use estimated_journey::{EstimatedVehicleJourney, JourneyCall};
pub use facility_condition::FacilityCondition;
pub use filter::EntityFilter;
pub use general_message::InfoMessage;
pub use kind::{FilterDimension, SiriDataKind};
pub use record_key::RecordKey;
pub use situation::{PtSituationElement, ValidityPeriod};
pub use stop_visit::MonitoredStopVisit;
pub use vehicle_activity::{Location, VehicleActivity};
