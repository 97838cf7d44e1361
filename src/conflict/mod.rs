//! Score conflict detection and resolution.
//!
//! When an offline-entered score reaches the server after the server's copy
//! has moved on, this module decides which version survives. Detection and
//! resolution are pure; applying a resolution goes back through the score
//! write path so derived fields are recomputed.

pub mod models;
pub mod resolver;

pub use models::{ConflictRecord, ManualChoice, Resolution, ScoreVersion};
pub use resolver::{merge_penalties, resolve};
