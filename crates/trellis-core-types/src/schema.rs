//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_TRACE_ID: &str = "trace_id";

// Inventory identifiers
pub const FIELD_PATH: &str = "path";
pub const FIELD_TENANT_ID: &str = "tenant_id";
pub const FIELD_ENTITY_KIND: &str = "entity_kind";
pub const FIELD_RELATIONSHIP: &str = "relationship";
pub const FIELD_TX_ID: &str = "tx_id";

// Mutation bookkeeping
pub const FIELD_ACTION: &str = "action";
pub const FIELD_ATTEMPT: &str = "attempt";
pub const FIELD_NOTIFICATIONS: &str = "notifications";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
