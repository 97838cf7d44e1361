//! Registration and capacity error types.

use super::models::{RegistrationId, RegistrationStatus, SquadId};
use crate::db::repository::StoreError;
use crate::tournament::{Division, ShooterId, TournamentId, TournamentStatus, UserId};
use thiserror::Error;

/// Registration errors
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Squad not found: {0}")]
    SquadNotFound(SquadId),

    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    /// Outside the registration window, or the tournament is not published
    #[error("Tournament {0} is not accepting registrations")]
    TournamentClosed(TournamentId),

    /// The match has started or finished; registrations can no longer change
    #[error("Tournament is locked: {0:?}")]
    TournamentLocked(TournamentStatus),

    #[error("Division {0} is not offered by this tournament")]
    DivisionNotAllowed(Division),

    #[error("Unknown custom category: {0}")]
    InvalidCategory(String),

    #[error("Shooter {shooter_id} already has an active registration for tournament {tournament_id}")]
    AlreadyRegistered {
        shooter_id: ShooterId,
        tournament_id: TournamentId,
    },

    #[error("Squad {0} is closed")]
    SquadClosed(SquadId),

    #[error("Target squad {0} is full")]
    TargetFull(SquadId),

    #[error("Target squad {0} is closed")]
    TargetClosed(SquadId),

    #[error("User {user_id} does not own registration {registration_id}")]
    NotOwner {
        registration_id: RegistrationId,
        user_id: UserId,
    },

    #[error("Registration {0} is already checked in")]
    AlreadyCheckedIn(RegistrationId),

    #[error("Registration is not in the required state: expected {expected:?}, got {actual:?}")]
    InvalidRegistrationStatus {
        expected: RegistrationStatus,
        actual: RegistrationStatus,
    },

    #[error("Cannot reduce capacity to {requested}: squad already seats {current}")]
    CapacityBelowCurrent { requested: u32, current: u32 },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for registration operations
pub type RegistrationResult<T> = Result<T, RegistrationError>;
