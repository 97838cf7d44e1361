//! Match result aggregation and ranking.
//!
//! Rankings are recomputed for the whole tournament on every read rather
//! than patched incrementally; rank numbers can never drift from partially
//! applied updates. The computation never blocks score writers.

pub mod engine;
pub mod models;

pub use engine::{RankingEngine, RankingError, RankingResult};
pub use models::{LeaderboardFilter, MatchResult, RankEntry, Rankings};
