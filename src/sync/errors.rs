//! Sync queue error types.

use super::models::{QueueAction, QueueItemId, QueueItemStatus};
use crate::db::repository::StoreError;
use crate::scoring::errors::ScoringError;
use thiserror::Error;

/// Sync queue errors
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Queue item not found: {0}")]
    ItemNotFound(QueueItemId),

    /// Completed and failed items are terminal; only pending items process
    #[error("Queue item {id} is {status:?} and cannot be processed")]
    ItemNotPending {
        id: QueueItemId,
        status: QueueItemStatus,
    },

    /// Malformed payload, rejected at enqueue time and never queued
    #[error("Invalid payload for {action:?}: {reason}")]
    InvalidPayload {
        action: QueueAction,
        reason: String,
    },

    /// A merged resolution was requested but no merge is computable
    #[error("Merged resolution is not available for this conflict")]
    MergeUnavailable,

    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
