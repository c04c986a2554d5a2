//! Structured logging field name constants for chanfind.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, request rejected |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, reconciliation details |
//! | TRACE | Per-channel iteration, high-volume data |

/// Correlation ID propagated across a request. Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "service"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "create", "update", "add_single", "remove"
pub const OPERATION: &str = "op";

/// Channel name being operated on.
pub const CHANNEL_NAME: &str = "channel";

/// Property name being operated on.
pub const PROPERTY_NAME: &str = "property";

/// Tag name being operated on.
pub const TAG_NAME: &str = "tag";

/// Principal (user) name issuing the request.
pub const PRINCIPAL: &str = "principal";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of channel documents written by a reconciliation pass.
pub const CHANNEL_COUNT: &str = "channel_count";

/// Number of tombstone patches issued by a reconciliation pass.
pub const TOMBSTONE_COUNT: &str = "tombstone_count";

/// Number of results returned by a list or query.
pub const RESULT_COUNT: &str = "result_count";

/// Database table or entity affected.
pub const DB_TABLE: &str = "db_table";

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
