//! Offline queue data models.

use crate::conflict::ConflictRecord;
use crate::scoring::models::{PenaltySet, ScoreId, ScoreString};
use crate::tournament::{ShooterId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue item ID type. Generated client-side while offline, so it is a
/// UUID rather than a server sequence.
pub type QueueItemId = Uuid;

/// Kinds of mutation intents the queue carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAction {
    SubmitScore,
    UpdateScore,
    CreateRegistration,
    UpdateProfile,
}

impl QueueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::SubmitScore => "submit_score",
            QueueAction::UpdateScore => "update_score",
            QueueAction::CreateRegistration => "create_registration",
            QueueAction::UpdateProfile => "update_profile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submit_score" => Some(QueueAction::SubmitScore),
            "update_score" => Some(QueueAction::UpdateScore),
            "create_registration" => Some(QueueAction::CreateRegistration),
            "update_profile" => Some(QueueAction::UpdateProfile),
            _ => None,
        }
    }
}

/// Queue item state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueItemStatus {
    /// Waiting for the next sync pass
    Pending,
    /// Currently being replayed
    Processing,
    /// Applied; garbage-collected after the retention window
    Completed,
    /// Terminal; never retried automatically
    Failed,
}

impl QueueItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueItemStatus::Pending => "pending",
            QueueItemStatus::Processing => "processing",
            QueueItemStatus::Completed => "completed",
            QueueItemStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueItemStatus::Pending),
            "processing" => Some(QueueItemStatus::Processing),
            "completed" => Some(QueueItemStatus::Completed),
            "failed" => Some(QueueItemStatus::Failed),
            _ => None,
        }
    }
}

/// One queued mutation intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    pub id: QueueItemId,
    pub user_id: UserId,
    pub action: QueueAction,
    /// Action payload; shape-validated at enqueue time
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub retries: u32,
    pub status: QueueItemStatus,
    pub last_error: Option<String>,
}

/// Payload of a `submit_score` action.
///
/// `base_version` is the server `scored_at` the client last saw for this
/// (stage, shooter); a server copy modified after it triggers conflict
/// resolution rather than a blind overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitScorePayload {
    pub stage_id: StageId,
    pub shooter_id: ShooterId,
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    #[serde(default)]
    pub dnf: bool,
    #[serde(default)]
    pub dq: bool,
    pub scored_by: UserId,
    #[serde(default)]
    pub base_version: Option<DateTime<Utc>>,
}

/// Payload of an `update_score` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateScorePayload {
    pub score_id: ScoreId,
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    #[serde(default)]
    pub dnf: bool,
    #[serde(default)]
    pub dq: bool,
    pub scored_by: UserId,
    #[serde(default)]
    pub base_version: Option<DateTime<Utc>>,
}

/// Queue counters for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// What happened to one item during a sync pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The mutation was applied
    Applied,
    /// The target already matched; nothing to do (idempotent replay)
    AlreadyApplied,
    /// A score conflict needs a human; the item froze as `failed`
    Conflict(Box<ConflictRecord>),
    /// Transient failure; the item went back to `pending`
    Retrying { attempt: u32, error: String },
    /// Terminal failure
    Failed { error: String },
}

/// Aggregate outcome of draining a user's queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub processed: u32,
    pub applied: u32,
    pub already_applied: u32,
    pub retrying: u32,
    pub failed: u32,
    /// Conflicts surfaced for manual resolution
    pub conflicts: Vec<ConflictRecord>,
}

impl SyncReport {
    pub(crate) fn record(&mut self, outcome: &SyncOutcome) {
        self.processed += 1;
        match outcome {
            SyncOutcome::Applied => self.applied += 1,
            SyncOutcome::AlreadyApplied => self.already_applied += 1,
            SyncOutcome::Retrying { .. } => self.retrying += 1,
            SyncOutcome::Failed { .. } => self.failed += 1,
            SyncOutcome::Conflict(record) => {
                self.failed += 1;
                self.conflicts.push(record.as_ref().clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [
            QueueAction::SubmitScore,
            QueueAction::UpdateScore,
            QueueAction::CreateRegistration,
            QueueAction::UpdateProfile,
        ] {
            assert_eq!(QueueAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_submit_payload_defaults() {
        let payload: SubmitScorePayload = serde_json::from_value(serde_json::json!({
            "stage_id": 10,
            "shooter_id": 100,
            "strings": [],
            "penalties": {
                "procedural": 0, "non_threat": 0, "failure_to_neutralize": 0,
                "flagrant": 0, "ftdr": 0
            },
            "scored_by": 7
        }))
        .unwrap();
        assert!(!payload.dnf);
        assert!(!payload.dq);
        assert!(payload.base_version.is_none());
    }

    #[test]
    fn test_report_tally() {
        let mut report = SyncReport::default();
        report.record(&SyncOutcome::Applied);
        report.record(&SyncOutcome::AlreadyApplied);
        report.record(&SyncOutcome::Retrying {
            attempt: 1,
            error: "offline".to_string(),
        });
        assert_eq!(report.processed, 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.already_applied, 1);
        assert_eq!(report.retrying, 1);
    }
}
