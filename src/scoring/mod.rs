//! IDPA stage scoring: raw hit/time capture, the pure scoring breakdown,
//! and the score write path.
//!
//! All derived fields on a [`StageScore`] (`raw_time`, `points_down`,
//! `penalty_time`, `final_time`) are recomputed from the recorded strings and
//! penalties on every write; they are never trusted as client input.

pub mod calculator;
pub mod errors;
pub mod manager;
pub mod models;

pub use calculator::calculate_breakdown;
pub use errors::{ScoringError, ScoringResult};
pub use manager::ScoreManager;
pub use models::{
    HitCounts, OtherPenalty, PenaltySet, ScoreBreakdown, ScoreId, ScoreString, ScoreSubmission,
    ScoreUpdate, StageScore,
};
