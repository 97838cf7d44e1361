//! Offline action queue.
//!
//! Mutations made without connectivity are captured as queue items and
//! replayed in submission order when the client reconnects. Items retry
//! transient failures up to a ceiling, then freeze as `failed` for the user
//! to deal with; completed items are kept for a retention window so recent
//! sync history stays auditable, then garbage-collected.

pub mod backoff;
pub mod errors;
pub mod models;
pub mod queue;

pub use backoff::RetryPolicy;
pub use errors::{SyncError, SyncResult};
pub use models::{
    OfflineQueueItem, QueueAction, QueueItemId, QueueItemStatus, SubmitScorePayload, SyncOutcome,
    SyncReport, SyncStatus, UpdateScorePayload,
};
pub use queue::{COMPLETED_RETENTION_HOURS, MAX_RETRIES, SyncQueue};
