//! Canonical structured event names used across `dynamic-router`.

// Routing state machine events.
pub const ROUTE_RECEIVED: &str = "route_received";
pub const ROUTE_CHANNEL_RESOLVED: &str = "route_channel_resolved";
pub const ROUTE_SUBSCRIPTION_MATCHED: &str = "route_subscription_matched";
pub const ROUTE_FORWARDED: &str = "route_forwarded";
pub const ROUTE_UNROUTABLE_DROPPED: &str = "route_unroutable_dropped";
pub const ROUTE_UNROUTABLE_FAILED: &str = "route_unroutable_failed";
pub const PREDICATE_EVALUATION_FAILED: &str = "predicate_evaluation_failed";
pub const PREDICATE_EVALUATION_PANICKED: &str = "predicate_evaluation_panicked";

// Synchronous delivery events.
pub const DELIVERY_SEND_OK: &str = "delivery_send_ok";
pub const DELIVERY_SEND_FAILED: &str = "delivery_send_failed";
pub const DELIVERY_SEND_TIMEOUT: &str = "delivery_send_timeout";

// Egress worker and pool events.
pub const EGRESS_ENQUEUE_FAILED: &str = "egress_enqueue_failed";
pub const EGRESS_SEND_ATTEMPT: &str = "egress_send_attempt";
pub const EGRESS_SEND_OK: &str = "egress_send_ok";
pub const EGRESS_SEND_FAILED: &str = "egress_send_failed";
pub const EGRESS_RECV_CLOSED: &str = "egress_recv_closed";
pub const EGRESS_WORKER_CREATE: &str = "egress_worker_create";
pub const ASYNC_DELIVERY_FAILED: &str = "async_delivery_failed";

// Control-plane lifecycle events.
pub const CONTROL_COMMAND_RECEIVED: &str = "control_command_received";
pub const CONTROL_COMMAND_REJECTED: &str = "control_command_rejected";
pub const SUBSCRIPTION_ADDED: &str = "subscription_added";
pub const SUBSCRIPTION_REPLACED: &str = "subscription_replaced";
pub const SUBSCRIPTION_REMOVED: &str = "subscription_removed";
pub const SUBSCRIPTION_REMOVE_MISSING: &str = "subscription_remove_missing";
pub const SUBSCRIPTION_EVICTED_IDLE: &str = "subscription_evicted_idle";

// Runtime events.
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
