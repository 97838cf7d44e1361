//! Scoring error types.

use crate::db::repository::StoreError;
use crate::tournament::{ShooterId, StageId, TournamentId};
use thiserror::Error;

/// Scoring errors
#[derive(Debug, Error)]
pub enum ScoringError {
    /// Input failed validation and was rejected, never stored
    #[error("Invalid score input: {reason}")]
    InvalidScoreInput { reason: String },

    /// Stage not found in any tournament
    #[error("Stage not found: {0}")]
    StageNotFound(StageId),

    /// Score not found
    #[error("Score not found: {0}")]
    ScoreNotFound(super::ScoreId),

    /// The shooter has no active registration for the tournament
    #[error("Shooter {shooter_id} has no active registration for tournament {tournament_id}")]
    ShooterNotRegistered {
        shooter_id: ShooterId,
        tournament_id: TournamentId,
    },

    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ScoringError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ScoringError::InvalidScoreInput {
            reason: reason.into(),
        }
    }
}

/// Result type for scoring operations
pub type ScoringResult<T> = Result<T, ScoringError>;
