//! Push-delivery layer.
//!
//! Owns subscription descriptors, failure tracking and the worker pool that posts
//! change batches to subscribers.

pub(crate) mod dispatcher;
pub(crate) mod fail_tracker;
pub(crate) mod heartbeat;
pub(crate) mod payload;
pub(crate) mod push_pool;
pub(crate) mod push_transport;
pub(crate) mod subscription;
pub(crate) mod subscription_directory;
pub(crate) mod subscription_registry;

pub use dispatcher::{DeliveryDispatcher, DispatcherSettings, FailureOutcome};
pub use fail_tracker::{grace_period, FailTracker};
pub use heartbeat::HeartbeatScheduler;
pub use payload::{
    DeliveryContent, JsonServiceDeliveryBuilder, PayloadError, PushPayload,
    ServiceDeliveryBuilder, JSON_CONTENT_TYPE, SUBSCRIPTION_ID_HEADER,
};
pub use push_pool::{PushJob, PushWorkerPool};
pub use push_transport::{PushError, PushTransport};
pub use subscription::{
    OutboundSubscriptionSetup, SubscribeRejection, SubscribeResponse, SubscriptionRequest,
    SubscriptionState, SubscriptionStatus,
};
pub use subscription_registry::SubscriptionRegistry;
