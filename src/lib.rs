//! # Match Director
//!
//! An IDPA tournament engine: squad capacity management under concurrent
//! registration, time-plus stage scoring, whole-tournament ranking, and a
//! resilient offline action queue with conflict resolution.
//!
//! ## Architecture
//!
//! The engine is built around five collaborators:
//!
//! - **Score calculator**: a pure function from recorded strings and
//!   penalties to the scoring breakdown (raw time, points down, penalty
//!   time, final time). Derived fields are always recomputed, never trusted
//!   as input.
//! - **Ranking engine**: recomputes match results for a whole tournament on
//!   read, producing overall, per-division, per-classification, and custom
//!   category rankings with deterministic tie-breaks.
//! - **Squad capacity manager**: the state machine for register, cancel,
//!   transfer, check-in, close/open, and capacity changes. Each squad's
//!   capacity check-and-increment runs in a per-squad critical section
//!   backed by a guarded counter in the store, and freed slots promote the
//!   waitlist in FIFO order.
//! - **Offline sync queue**: a per-user FIFO of mutation intents recorded
//!   while disconnected, replayed sequentially on reconnect with bounded
//!   retries and idempotent creates.
//! - **Conflict resolver**: deterministic reconciliation when an offline
//!   score meets a newer server copy, falling back to manual choice.
//!
//! Presentation, authentication, and notification delivery live outside
//! this crate; it exposes managers, not endpoints.
//!
//! ## Example
//!
//! ```
//! use match_director::db::MemoryStore;
//! use match_director::{RankingEngine, ScoreManager, SquadCapacityManager, SyncQueue};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let squads = SquadCapacityManager::new(store.clone());
//! let scores = ScoreManager::new(store.clone());
//! let rankings = RankingEngine::new(store.clone());
//! let queue = SyncQueue::new(store, scores.clone(), squads.clone());
//! ```

/// Tournament context models.
pub mod tournament;
pub use tournament::{
    Classification, CustomCategory, Division, Stage, Tournament, TournamentStatus,
};

/// Stage scoring: models, the pure calculator, and the score write path.
pub mod scoring;
pub use scoring::{
    HitCounts, OtherPenalty, PenaltySet, ScoreBreakdown, ScoreManager, ScoreString,
    ScoreSubmission, ScoreUpdate, ScoringError, StageScore, calculate_breakdown,
};

/// Match results, leaderboards, and rank computation.
pub mod ranking;
pub use ranking::{LeaderboardFilter, MatchResult, RankEntry, RankingEngine, Rankings};

/// Squad capacity management and registration lifecycle.
pub mod squads;
pub use squads::{
    Registration, RegistrationError, RegistrationRequest, RegistrationStatus, Squad,
    SquadCapacityManager, SquadStatus,
};

/// Offline action queue with ordered replay and bounded retry.
pub mod sync;
pub use sync::{
    QueueAction, QueueItemStatus, RetryPolicy, SyncError, SyncOutcome, SyncQueue, SyncReport,
    SyncStatus,
};

/// Score conflict detection and resolution.
pub mod conflict;
pub use conflict::{ConflictRecord, ManualChoice, Resolution, ScoreVersion};

/// Storage: repository traits and the PostgreSQL / in-memory backends.
pub mod db;
pub use db::{Database, DatabaseConfig, MatchStore, MemoryStore, PgMatchStore, StoreError};
