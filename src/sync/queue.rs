//! Offline sync queue worker.
//!
//! One logical worker per user session: draining is serialized through a
//! per-user guard, and items replay strictly in submission order, each fully
//! processed before the next begins. Create-type actions check their natural
//! key before creating, so a replayed item never produces a duplicate row.

use super::backoff::RetryPolicy;
use super::errors::{SyncError, SyncResult};
use super::models::{
    OfflineQueueItem, QueueAction, QueueItemId, QueueItemStatus, SubmitScorePayload, SyncOutcome,
    SyncReport, SyncStatus, UpdateScorePayload,
};
use crate::conflict::{ConflictRecord, ManualChoice, Resolution, ScoreVersion, resolver};
use crate::db::repository::{MatchStore, StoreError};
use crate::scoring::calculator::validate_shape;
use crate::scoring::errors::ScoringError;
use crate::scoring::manager::ScoreManager;
use crate::scoring::models::{ScoreSubmission, ScoreUpdate, StageScore};
use crate::squads::errors::RegistrationError;
use crate::squads::manager::SquadCapacityManager;
use crate::squads::models::RegistrationRequest;
use crate::tournament::UserId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Processing failures beyond this count freeze the item as `failed`.
pub const MAX_RETRIES: u32 = 3;

/// Completed items are kept this long for sync-history audit, then
/// garbage-collected.
pub const COMPLETED_RETENTION_HOURS: i64 = 24;

/// Per-user drain guards; two drains for the same user never interleave.
#[derive(Clone, Default)]
struct DrainLocks {
    inner: Arc<StdMutex<HashMap<UserId, Arc<Mutex<()>>>>>,
}

impl DrainLocks {
    fn for_user(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .clone()
    }
}

/// How one application attempt failed, for retry classification.
enum ApplyError {
    /// Will not succeed on retry; reported, not retried
    Business(String),
    /// Worth retrying
    Transient(String),
}

impl From<StoreError> for ApplyError {
    fn from(e: StoreError) -> Self {
        if e.is_transient() {
            ApplyError::Transient(e.to_string())
        } else {
            ApplyError::Business(e.to_string())
        }
    }
}

impl From<ScoringError> for ApplyError {
    fn from(e: ScoringError) -> Self {
        match e {
            ScoringError::Store(inner) => inner.into(),
            other => ApplyError::Business(other.to_string()),
        }
    }
}

impl From<RegistrationError> for ApplyError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::Store(inner) => inner.into(),
            other => ApplyError::Business(other.to_string()),
        }
    }
}

/// Offline sync queue
#[derive(Clone)]
pub struct SyncQueue {
    store: Arc<dyn MatchStore>,
    scores: ScoreManager,
    squads: SquadCapacityManager,
    drains: DrainLocks,
    retry: RetryPolicy,
}

impl SyncQueue {
    /// Create a queue over a store and the managers that apply its actions
    pub fn new(store: Arc<dyn MatchStore>, scores: ScoreManager, squads: SquadCapacityManager) -> Self {
        Self {
            store,
            scores,
            squads,
            drains: DrainLocks::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the in-attempt retry pacing
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Queue a mutation intent. The payload is shape-validated here:
    /// malformed input is rejected synchronously and never queued.
    pub async fn enqueue(
        &self,
        user_id: UserId,
        action: QueueAction,
        payload: serde_json::Value,
    ) -> SyncResult<OfflineQueueItem> {
        validate_payload(action, &payload)?;

        let item = OfflineQueueItem {
            id: Uuid::new_v4(),
            user_id,
            action,
            payload,
            created_at: Utc::now(),
            retries: 0,
            status: QueueItemStatus::Pending,
            last_error: None,
        };
        self.store.insert_queue_item(&item).await?;
        log::debug!("Queued {:?} item {} for user {}", action, item.id, user_id);
        Ok(item)
    }

    /// Pending items for a user in submission order.
    pub async fn list_pending(&self, user_id: UserId) -> SyncResult<Vec<OfflineQueueItem>> {
        Ok(self.store.pending_items(user_id).await?)
    }

    /// Queue counters for a user.
    pub async fn sync_status(&self, user_id: UserId) -> SyncResult<SyncStatus> {
        Ok(self.store.status_counts(user_id).await?)
    }

    /// Replay every pending item for a user, in order, each one fully
    /// processed before the next begins. Reentrant drains for the same user
    /// queue up behind the first.
    pub async fn drain(&self, user_id: UserId) -> SyncResult<SyncReport> {
        let lock = self.drains.for_user(user_id);
        let _guard = lock.lock().await;

        let items = self.store.pending_items(user_id).await?;
        let mut report = SyncReport::default();
        for item in items {
            let outcome = self.process_loaded(item).await?;
            report.record(&outcome);
        }

        log::info!(
            "Drained queue for user {}: {} processed, {} applied, {} failed",
            user_id,
            report.processed,
            report.applied,
            report.failed
        );
        Ok(report)
    }

    /// Process a single item. Idempotent: a completed item reports
    /// `AlreadyApplied` without touching anything.
    pub async fn process_item(&self, item_id: QueueItemId) -> SyncResult<SyncOutcome> {
        let item = self
            .store
            .queue_item(item_id)
            .await?
            .ok_or(SyncError::ItemNotFound(item_id))?;

        let lock = self.drains.for_user(item.user_id);
        let _guard = lock.lock().await;

        // Reload under the guard; a concurrent drain may have got there first.
        let item = self
            .store
            .queue_item(item_id)
            .await?
            .ok_or(SyncError::ItemNotFound(item_id))?;
        self.process_loaded(item).await
    }

    /// Delete completed items older than the retention window. `now` is a
    /// parameter so maintenance jobs and tests control the clock.
    pub async fn collect_garbage(&self, now: DateTime<Utc>) -> SyncResult<u64> {
        let cutoff = now - Duration::hours(COMPLETED_RETENTION_HOURS);
        let purged = self.store.purge_completed_before(cutoff).await?;
        if purged > 0 {
            log::info!("Garbage-collected {purged} completed queue items");
        }
        Ok(purged)
    }

    /// Apply a human's decision for a conflict surfaced by processing. The
    /// final version goes through the normal score write path.
    pub async fn resolve_manually(
        &self,
        record: &ConflictRecord,
        choice: ManualChoice,
    ) -> SyncResult<StageScore> {
        let version =
            resolver::chosen_version(record, choice).ok_or(SyncError::MergeUnavailable)?;
        let score = self
            .scores
            .apply_version(record.stage_id, record.shooter_id, &version)
            .await?;
        log::info!(
            "Manually resolved score conflict for stage {} shooter {} as {:?}",
            record.stage_id,
            record.shooter_id,
            choice
        );
        Ok(score)
    }

    /// Process an already-loaded item. Caller holds the user's drain guard.
    async fn process_loaded(&self, mut item: OfflineQueueItem) -> SyncResult<SyncOutcome> {
        match item.status {
            QueueItemStatus::Pending => {}
            QueueItemStatus::Completed => return Ok(SyncOutcome::AlreadyApplied),
            status => {
                return Err(SyncError::ItemNotPending {
                    id: item.id,
                    status,
                });
            }
        }

        item.status = QueueItemStatus::Processing;
        self.store.update_queue_item(&item).await?;

        // Transient failures within this attempt retry with backoff, one
        // call at a time; the queue-level retry accounting only sees the
        // final result.
        let mut attempt = 0u32;
        let result = loop {
            match self.apply(&item).await {
                Err(ApplyError::Transient(error)) if attempt + 1 < self.retry.max_attempts() => {
                    attempt += 1;
                    log::debug!(
                        "Item {} attempt {} hit a transient error: {}",
                        item.id,
                        attempt,
                        error
                    );
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                }
                other => break other,
            }
        };

        match result {
            Ok(SyncOutcome::Conflict(record)) => {
                // Unresolvable automatically; freeze for manual action. Both
                // versions survive inside the returned record.
                item.status = QueueItemStatus::Failed;
                item.last_error = Some("score conflict requires manual resolution".to_string());
                self.store.update_queue_item(&item).await?;
                log::warn!(
                    "Item {} raised a score conflict for stage {} shooter {}",
                    item.id,
                    record.stage_id,
                    record.shooter_id
                );
                Ok(SyncOutcome::Conflict(record))
            }
            Ok(outcome) => {
                item.status = QueueItemStatus::Completed;
                item.last_error = None;
                self.store.update_queue_item(&item).await?;
                Ok(outcome)
            }
            Err(ApplyError::Business(error)) => {
                // Retrying cannot fix a rule violation.
                item.status = QueueItemStatus::Failed;
                item.last_error = Some(error.clone());
                self.store.update_queue_item(&item).await?;
                log::warn!("Item {} failed permanently: {}", item.id, error);
                Ok(SyncOutcome::Failed { error })
            }
            Err(ApplyError::Transient(error)) => {
                item.retries += 1;
                item.last_error = Some(error.clone());
                if item.retries >= MAX_RETRIES {
                    item.status = QueueItemStatus::Failed;
                    self.store.update_queue_item(&item).await?;
                    log::warn!(
                        "Item {} exhausted {} retries: {}",
                        item.id,
                        MAX_RETRIES,
                        error
                    );
                    Ok(SyncOutcome::Failed { error })
                } else {
                    item.status = QueueItemStatus::Pending;
                    self.store.update_queue_item(&item).await?;
                    Ok(SyncOutcome::Retrying {
                        attempt: item.retries,
                        error,
                    })
                }
            }
        }
    }

    async fn apply(&self, item: &OfflineQueueItem) -> Result<SyncOutcome, ApplyError> {
        match item.action {
            QueueAction::SubmitScore => {
                let payload: SubmitScorePayload = decode(&item.payload)?;
                self.apply_score(item, payload).await
            }
            QueueAction::UpdateScore => {
                let payload: UpdateScorePayload = decode(&item.payload)?;
                let Some(score) = self
                    .store
                    .score(payload.score_id)
                    .await
                    .map_err(ApplyError::from)?
                else {
                    return Err(ApplyError::Business(format!(
                        "score {} does not exist",
                        payload.score_id
                    )));
                };
                self.apply_score(
                    item,
                    SubmitScorePayload {
                        stage_id: score.stage_id,
                        shooter_id: score.shooter_id,
                        strings: payload.strings,
                        penalties: payload.penalties,
                        dnf: payload.dnf,
                        dq: payload.dq,
                        scored_by: payload.scored_by,
                        base_version: payload.base_version,
                    },
                )
                .await
            }
            QueueAction::CreateRegistration => {
                let payload: RegistrationRequest = decode(&item.payload)?;
                // Natural-key idempotency: a replayed item must not create a
                // second registration.
                let existing = self
                    .store
                    .find_active_by_shooter(payload.tournament_id, payload.shooter_id)
                    .await
                    .map_err(ApplyError::from)?;
                if existing.is_some() {
                    return Ok(SyncOutcome::AlreadyApplied);
                }
                self.squads.register(payload).await?;
                Ok(SyncOutcome::Applied)
            }
            QueueAction::UpdateProfile => {
                self.store
                    .upsert_profile(item.user_id, item.payload.clone())
                    .await
                    .map_err(ApplyError::from)?;
                Ok(SyncOutcome::Applied)
            }
        }
    }

    /// Replay score content against the server's current copy: create when
    /// absent, skip when identical, resolve when the server moved past the
    /// client's base version, otherwise overwrite through the write path.
    async fn apply_score(
        &self,
        item: &OfflineQueueItem,
        payload: SubmitScorePayload,
    ) -> Result<SyncOutcome, ApplyError> {
        let existing = self
            .store
            .find_score_by_stage_and_shooter(payload.stage_id, payload.shooter_id)
            .await
            .map_err(ApplyError::from)?;

        let Some(server) = existing else {
            self.scores
                .submit_score(ScoreSubmission {
                    stage_id: payload.stage_id,
                    shooter_id: payload.shooter_id,
                    strings: payload.strings,
                    penalties: payload.penalties,
                    dnf: payload.dnf,
                    dq: payload.dq,
                    scored_by: payload.scored_by,
                })
                .await?;
            return Ok(SyncOutcome::Applied);
        };

        // The local edit happened no later than when it was queued.
        let local = ScoreVersion {
            strings: payload.strings.clone(),
            penalties: payload.penalties.clone(),
            dnf: payload.dnf,
            dq: payload.dq,
            modified_at: item.created_at,
            modified_by: payload.scored_by,
        };
        let Some(record) = ConflictRecord::detect(
            payload.stage_id,
            payload.shooter_id,
            local,
            ScoreVersion::of_score(&server),
        ) else {
            // Same content already on the server: idempotent replay.
            return Ok(SyncOutcome::AlreadyApplied);
        };

        let server_moved_on = payload
            .base_version
            .is_some_and(|base| server.scored_at > base);
        if !server_moved_on {
            // Ordinary re-score; overwrite through the write path.
            self.scores
                .update_score(
                    server.id,
                    ScoreUpdate {
                        strings: payload.strings,
                        penalties: payload.penalties,
                        dnf: payload.dnf,
                        dq: payload.dq,
                        scored_by: payload.scored_by,
                    },
                )
                .await?;
            return Ok(SyncOutcome::Applied);
        }

        match resolver::resolve(&record) {
            Resolution::UseLocal => {
                self.scores
                    .apply_version(record.stage_id, record.shooter_id, &record.local)
                    .await?;
                Ok(SyncOutcome::Applied)
            }
            // The server already holds the winning version.
            Resolution::UseServer => Ok(SyncOutcome::Applied),
            Resolution::UseMerged(merged) => {
                self.scores
                    .apply_version(record.stage_id, record.shooter_id, &merged)
                    .await?;
                Ok(SyncOutcome::Applied)
            }
            Resolution::Manual => Ok(SyncOutcome::Conflict(Box::new(record))),
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &serde_json::Value) -> Result<T, ApplyError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| ApplyError::Business(format!("malformed payload: {e}")))
}

/// Shape-validate a payload before it enters the queue.
fn validate_payload(action: QueueAction, payload: &serde_json::Value) -> SyncResult<()> {
    let invalid = |reason: String| SyncError::InvalidPayload { action, reason };

    match action {
        QueueAction::SubmitScore => {
            let p: SubmitScorePayload =
                serde_json::from_value(payload.clone()).map_err(|e| invalid(e.to_string()))?;
            validate_shape(&p.strings, &p.penalties).map_err(|e| invalid(e.to_string()))
        }
        QueueAction::UpdateScore => {
            let p: UpdateScorePayload =
                serde_json::from_value(payload.clone()).map_err(|e| invalid(e.to_string()))?;
            validate_shape(&p.strings, &p.penalties).map_err(|e| invalid(e.to_string()))
        }
        QueueAction::CreateRegistration => {
            serde_json::from_value::<RegistrationRequest>(payload.clone())
                .map(|_| ())
                .map_err(|e| invalid(e.to_string()))
        }
        QueueAction::UpdateProfile => {
            if payload.is_object() {
                Ok(())
            } else {
                Err(invalid("profile payload must be an object".to_string()))
            }
        }
    }
}
