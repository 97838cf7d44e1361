//! Repository trait definitions for testability and dependency injection.
//!
//! Managers operate against these traits rather than a concrete backend.
//! Lookups that the engine performs on hot paths are expressed as indexed
//! finders (`find_by_squad_and_status`, `find_active_by_shooter`, ...), not
//! whole-table scans filtered by the caller.

use crate::scoring::models::{ScoreId, StageScore};
use crate::squads::models::{Registration, RegistrationId, RegistrationStatus, Squad, SquadId};
use crate::sync::models::{OfflineQueueItem, QueueItemId, SyncStatus};
use crate::tournament::{ShooterId, StageId, Tournament, TournamentId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend temporarily unreachable; safe to retry
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A natural-key or uniqueness constraint was violated
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Stored document failed to (de)serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether a retry might succeed. Drives the offline queue's retry
    /// classification.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Unavailable(_))
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Tournament context reads (tournaments are administered elsewhere; the
/// engine needs them seeded and readable)
#[async_trait]
pub trait TournamentStore: Send + Sync {
    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Resolve the tournament containing a stage
    async fn tournament_by_stage(&self, stage_id: StageId) -> StoreResult<Option<Tournament>>;

    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<TournamentId>;

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()>;
}

/// Squad rows and the guarded capacity counter
#[async_trait]
pub trait SquadStore: Send + Sync {
    async fn squad(&self, id: SquadId) -> StoreResult<Option<Squad>>;

    async fn squads_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Squad>>;

    /// Squads a safety officer is assigned to run
    async fn squads_by_officer(&self, officer_id: UserId) -> StoreResult<Vec<Squad>>;

    async fn insert_squad(&self, squad: &Squad) -> StoreResult<SquadId>;

    async fn update_squad(&self, squad: &Squad) -> StoreResult<()>;

    /// Atomically claim one slot: increments `current_shooters` and
    /// recomputes `status` only while the squad is below capacity and not
    /// closed. Returns `false` without mutating when no slot is available.
    async fn try_reserve_slot(&self, squad_id: SquadId) -> StoreResult<bool>;

    /// Release one slot: decrements `current_shooters` (never below zero)
    /// and reopens the squad unless it was manually closed.
    async fn release_slot(&self, squad_id: SquadId) -> StoreResult<()>;
}

/// Registration rows
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn registration(&self, id: RegistrationId) -> StoreResult<Option<Registration>>;

    /// Insert, enforcing one active registration per (shooter, tournament);
    /// violations return `StoreError::AlreadyExists`.
    async fn insert_registration(&self, registration: &Registration)
        -> StoreResult<RegistrationId>;

    async fn update_registration(&self, registration: &Registration) -> StoreResult<()>;

    /// The shooter's active (non-cancelled) registration, if any
    async fn find_active_by_shooter(
        &self,
        tournament_id: TournamentId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<Registration>>;

    async fn find_by_squad_and_status(
        &self,
        squad_id: SquadId,
        status: RegistrationStatus,
    ) -> StoreResult<Vec<Registration>>;

    async fn find_by_tournament(&self, tournament_id: TournamentId)
        -> StoreResult<Vec<Registration>>;
}

/// Stage score rows
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn score(&self, id: ScoreId) -> StoreResult<Option<StageScore>>;

    async fn find_score_by_stage_and_shooter(
        &self,
        stage_id: StageId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<StageScore>>;

    /// Write a score, keyed by (stage, shooter): a row already present for
    /// that pair is replaced in place and keeps its id.
    async fn upsert_score(&self, score: &StageScore) -> StoreResult<ScoreId>;

    async fn find_scores_by_stages(&self, stage_ids: &[StageId]) -> StoreResult<Vec<StageScore>>;
}

/// Offline queue rows
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn insert_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()>;

    async fn queue_item(&self, id: QueueItemId) -> StoreResult<Option<OfflineQueueItem>>;

    async fn update_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()>;

    /// Pending items for a user in submission order (`created_at`, ties by
    /// id)
    async fn pending_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>>;

    async fn user_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>>;

    /// Delete completed items older than the cutoff; returns how many were
    /// removed
    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    async fn status_counts(&self, user_id: UserId) -> StoreResult<SyncStatus>;
}

/// Opaque profile documents replayed through the queue
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert_profile(&self, user_id: UserId, profile: serde_json::Value) -> StoreResult<()>;

    async fn profile(&self, user_id: UserId) -> StoreResult<Option<serde_json::Value>>;
}

/// Everything the engine needs from a backend.
pub trait MatchStore:
    TournamentStore + SquadStore + RegistrationStore + ScoreStore + QueueStore + ProfileStore
{
}

impl<T> MatchStore for T where
    T: TournamentStore + SquadStore + RegistrationStore + ScoreStore + QueueStore + ProfileStore
{
}
