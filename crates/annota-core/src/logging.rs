//! Structured logging field name constants for annota.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation rolled back on a storage or invariant failure |
//! | WARN  | Write rejected by validation |
//! | INFO  | Lifecycle events, completed mutations, undo summaries |
//! | DEBUG | Decision points: validation outcome, filters applied |
//! | TRACE | Per-note iteration inside bulk operations |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "db", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "notes", "versioning", "undo", "search", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "revert", "copy", "undo_all_by_actor"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Post (image) UUID a note belongs to.
pub const POST_ID: &str = "post_id";

/// Acting actor UUID.
pub const ACTOR_ID: &str = "actor_id";

/// Note version counter after a write.
pub const VERSION: &str = "version";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Number of filters applied to a search.
pub const FILTER_COUNT: &str = "filter_count";

/// Number of version rows deleted.
pub const VERSIONS_DELETED: &str = "versions_deleted";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
