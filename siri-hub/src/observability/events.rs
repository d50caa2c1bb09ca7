//! Canonical structured event names used across `siri-hub`.

// Ingestion and storage events.
pub const INGEST_BATCH: &str = "ingest_batch";
pub const INGEST_METRICS: &str = "ingest_metrics";
pub const INGEST_ITEM_UNDECODABLE: &str = "ingest_item_undecodable";
pub const CHECKSUM_FAILED: &str = "checksum_failed";
pub const DATASET_CLEARED: &str = "dataset_cleared";
pub const STORE_PURGE: &str = "store_purge";

// Change-tracker events.
pub const TRACKER_COMMIT_OK: &str = "tracker_commit_ok";
pub const TRACKER_FLUSH: &str = "tracker_flush";
pub const TRACKER_READ: &str = "tracker_read";

// Subscription lifecycle events.
pub const SUBSCRIPTION_ADDED: &str = "subscription_added";
pub const SUBSCRIPTION_REJECTED: &str = "subscription_rejected";
pub const SUBSCRIPTION_TERMINATED: &str = "subscription_terminated";
pub const SUBSCRIPTION_EXPIRED: &str = "subscription_expired";
pub const SUBSCRIPTION_AUTO_CANCELLED: &str = "subscription_auto_cancelled";
pub const SUBSCRIPTION_RECOVERED: &str = "subscription_recovered";
pub const SUBSCRIPTION_LOOKUP_EMPTY: &str = "subscription_lookup_empty";
pub const SUBSCRIPTION_SNAPSHOT_REBUILD_OK: &str = "subscription_snapshot_rebuild_ok";
pub const INITIAL_SNAPSHOT_SCHEDULED: &str = "initial_snapshot_scheduled";

// Delivery and push worker events.
pub const DELIVERY_BATCH: &str = "delivery_batch";
pub const PAYLOAD_BUILD_FAILED: &str = "payload_build_failed";
pub const PUSH_SEND_ATTEMPT: &str = "push_send_attempt";
pub const PUSH_SEND_FAILED: &str = "push_send_failed";
pub const PUSH_QUEUE_FULL: &str = "push_queue_full";
pub const PUSH_POOL_CLOSED: &str = "push_pool_closed";
pub const PUSH_JOB_PANICKED: &str = "push_job_panicked";
pub const PUSH_WORKER_STOPPED: &str = "push_worker_stopped";
pub const PUSH_WORKER_JOIN_FAILED: &str = "push_worker_join_failed";
pub const HEARTBEAT_SCAN: &str = "heartbeat_scan";

// Runtime and hub lifecycle events.
pub const PERIODIC_TASK_START: &str = "periodic_task_start";
pub const PERIODIC_TASK_STOPPED: &str = "periodic_task_stopped";
pub const PERIODIC_TICK_PANICKED: &str = "periodic_tick_panicked";
pub const DISPATCH_TASK_FAILED: &str = "dispatch_task_failed";
pub const HUB_STARTED: &str = "hub_started";
pub const HUB_SHUTDOWN: &str = "hub_shutdown";
