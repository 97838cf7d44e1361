//! Ranking data models.

use crate::tournament::{Classification, Division, ShooterId, TournamentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rank positions for one shooter across the parallel rankings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rankings {
    /// Position across all divisions
    pub overall: u32,
    /// Position within the shooter's division
    pub division: u32,
    /// Position within the shooter's classification, inside their division
    pub classification: u32,
    /// Position within each custom category the shooter registered for
    #[serde(default)]
    pub categories: HashMap<String, u32>,
}

/// Per-shooter aggregate across all stages of a tournament. Recomputed
/// wholesale whenever the ranking engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub tournament_id: TournamentId,
    pub shooter_id: ShooterId,
    pub division: Division,
    pub classification: Classification,
    /// Sum of stage final times, seconds
    pub total_time: f64,
    pub total_points_down: u32,
    /// Seconds added by penalties across all stages
    pub total_penalty_time: f64,
    /// Sum of stage placement points; informational
    pub total_stage_points: f64,
    pub completed_stages: u32,
    pub total_stages: u32,
    /// Any stage DNF
    pub dnf: bool,
    /// Any stage DQ
    pub dq: bool,
    /// Ranking score; equals `total_time` for finishers
    pub final_score: f64,
    pub rankings: Rankings,
}

impl MatchResult {
    /// Progress through the match, for displays; never affects ordering.
    pub fn completion_percent(&self) -> f64 {
        if self.total_stages == 0 {
            0.0
        } else {
            f64::from(self.completed_stages) / f64::from(self.total_stages) * 100.0
        }
    }

    /// DNF and DQ shooters rank after every finisher.
    pub fn excluded_from_time(&self) -> bool {
        self.dnf || self.dq
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Position within the requested view
    pub rank: u32,
    pub shooter_id: ShooterId,
    pub division: Division,
    pub classification: Classification,
    pub final_score: f64,
    pub total_points_down: u32,
    pub completed_stages: u32,
    pub total_stages: u32,
    pub dnf: bool,
    pub dq: bool,
}

/// Leaderboard scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardFilter {
    pub division: Option<Division>,
    pub classification: Option<Classification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_percent() {
        let mut result = MatchResult {
            tournament_id: 1,
            shooter_id: 100,
            division: Division::Ssp,
            classification: Classification::Marksman,
            total_time: 80.0,
            total_points_down: 12,
            total_penalty_time: 3.0,
            total_stage_points: 0.0,
            completed_stages: 3,
            total_stages: 4,
            dnf: false,
            dq: false,
            final_score: 80.0,
            rankings: Rankings::default(),
        };
        assert_eq!(result.completion_percent(), 75.0);
        result.total_stages = 0;
        assert_eq!(result.completion_percent(), 0.0);
    }
}
