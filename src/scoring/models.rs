//! Score data models.

use crate::tournament::{Classification, Division, ShooterId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Score ID type
pub type ScoreId = i64;

/// Squad ID type (re-declared here to avoid a dependency cycle; the
/// canonical alias lives in `squads::models`)
type SquadId = i64;

/// Target hits recorded for one string of fire.
///
/// Zone names follow the IDPA target: `down0` is the center zone, `down1`
/// and `down3` the outer zones, `miss` a clean miss, `non_threat` a hit on
/// a no-shoot target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitCounts {
    pub down0: u32,
    pub down1: u32,
    pub down3: u32,
    pub miss: u32,
    pub non_threat: u32,
}

impl HitCounts {
    /// Total recorded hits, used to validate against the stage round count.
    pub fn total(&self) -> u32 {
        self.down0 + self.down1 + self.down3 + self.miss + self.non_threat
    }

    /// Points down contributed by these hits. `down0` contributes nothing.
    pub fn points_down(&self) -> u32 {
        self.down1 + self.down3 * 3 + self.miss * 5 + self.non_threat * 5
    }
}

/// One timed string of fire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreString {
    /// Elapsed time in seconds
    pub time: f64,
    /// Hits recorded for this string
    pub hits: HitCounts,
}

/// A free-form penalty outside the five standard categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherPenalty {
    pub label: String,
    pub count: u32,
    /// Seconds added per occurrence
    pub seconds: f64,
}

/// Penalties assessed on a stage. Counts per standard category plus any
/// free-form entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltySet {
    pub procedural: u32,
    pub non_threat: u32,
    pub failure_to_neutralize: u32,
    pub flagrant: u32,
    /// Failure to Do Right
    pub ftdr: u32,
    #[serde(default)]
    pub other: Vec<OtherPenalty>,
}

impl PenaltySet {
    pub fn is_empty(&self) -> bool {
        self.procedural == 0
            && self.non_threat == 0
            && self.failure_to_neutralize == 0
            && self.flagrant == 0
            && self.ftdr == 0
            && self.other.is_empty()
    }
}

/// Derived scoring fields, always produced together by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Sum of string times, seconds
    pub raw_time: f64,
    /// Points down from hit placement
    pub points_down: u32,
    /// Seconds added by penalties
    pub penalty_time: f64,
    /// `raw_time + points_down + penalty_time`
    pub final_time: f64,
}

/// A shooter's recorded score for one stage.
///
/// At most one score exists per (stage, shooter); re-scoring overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageScore {
    pub id: ScoreId,
    pub stage_id: StageId,
    pub shooter_id: ShooterId,
    pub squad_id: SquadId,
    pub division: Division,
    pub classification: Classification,
    /// Safety officer who entered the score
    pub scored_by: UserId,
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    pub raw_time: f64,
    pub points_down: u32,
    pub penalty_time: f64,
    pub final_time: f64,
    /// Stage placement points, assigned during ranking recomputation;
    /// informational only and never part of the ordering
    pub stage_points: f64,
    pub dnf: bool,
    pub dq: bool,
    pub scored_at: DateTime<Utc>,
}

impl StageScore {
    /// DNF and DQ scores are excluded from time-based ranking.
    pub fn excluded_from_time(&self) -> bool {
        self.dnf || self.dq
    }

    /// Final time as used for ordering: infinite for DNF/DQ so those
    /// scores sort after every finisher.
    pub fn sort_time(&self) -> f64 {
        if self.excluded_from_time() {
            f64::INFINITY
        } else {
            self.final_time
        }
    }
}

/// Request to record a new score for a (stage, shooter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub stage_id: StageId,
    pub shooter_id: ShooterId,
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    #[serde(default)]
    pub dnf: bool,
    #[serde(default)]
    pub dq: bool,
    pub scored_by: UserId,
}

/// Request to replace the content of an existing score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    #[serde(default)]
    pub dnf: bool,
    #[serde(default)]
    pub dq: bool,
    pub scored_by: UserId,
}
