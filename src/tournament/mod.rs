//! Tournament context: divisions, classifications, stages, and the
//! registration window.
//!
//! The engine does not create or administer tournaments (that is plain CRUD
//! owned by the surrounding application); it consumes them as context for
//! registration checks and score validation.

pub mod models;

pub use models::{
    Classification, CustomCategory, Division, ShooterId, Stage, StageId, Tournament, TournamentId,
    TournamentStatus, UserId,
};
