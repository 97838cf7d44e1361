//! Conflict data models.

use crate::scoring::models::{PenaltySet, ScoreString, StageScore};
use crate::tournament::{ShooterId, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One version of a score's client-authored content, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreVersion {
    pub strings: Vec<ScoreString>,
    pub penalties: PenaltySet,
    pub dnf: bool,
    pub dq: bool,
    /// When this version was last edited
    pub modified_at: DateTime<Utc>,
    /// Who edited it
    pub modified_by: UserId,
}

impl ScoreVersion {
    /// Build a version from a stored score.
    pub fn of_score(score: &StageScore) -> Self {
        Self {
            strings: score.strings.clone(),
            penalties: score.penalties.clone(),
            dnf: score.dnf,
            dq: score.dq,
            modified_at: score.scored_at,
            modified_by: score.scored_by,
        }
    }

    /// Whether the authored content (strings, penalties, flags) matches.
    /// Provenance fields are not content.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.strings_eq(other) && self.penalties == other.penalties && self.flags_eq(other)
    }

    /// Strings identical in both hits and times.
    pub fn strings_eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }

    /// Same hit counts per string, times aside.
    pub fn hits_eq(&self, other: &Self) -> bool {
        self.strings.len() == other.strings.len()
            && self
                .strings
                .iter()
                .zip(&other.strings)
                .all(|(a, b)| a.hits == b.hits)
    }

    pub fn flags_eq(&self, other: &Self) -> bool {
        self.dnf == other.dnf && self.dq == other.dq
    }

    /// DNF and DQ both end the stage for the shooter.
    pub fn is_terminal(&self) -> bool {
        self.dnf || self.dq
    }
}

/// A detected divergence between a locally-edited score and the server's
/// current score for the same (stage, shooter). Transient: never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub stage_id: StageId,
    pub shooter_id: ShooterId,
    pub local: ScoreVersion,
    pub server: ScoreVersion,
}

impl ConflictRecord {
    /// Pair two versions into a conflict, or `None` when the content is
    /// identical (a server write that round-trips the same values is not a
    /// conflict).
    pub fn detect(
        stage_id: StageId,
        shooter_id: ShooterId,
        local: ScoreVersion,
        server: ScoreVersion,
    ) -> Option<Self> {
        if local.content_eq(&server) {
            None
        } else {
            Some(Self {
                stage_id,
                shooter_id,
                local,
                server,
            })
        }
    }

    /// A penalty-only merge is computable when strings and flags agree.
    pub fn mergeable(&self) -> bool {
        self.local.strings_eq(&self.server) && self.local.flags_eq(&self.server)
    }
}

/// Outcome of running the auto-resolution rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Keep the locally-edited version
    UseLocal,
    /// Keep the server's version
    UseServer,
    /// Write the merged version (penalty union)
    UseMerged(ScoreVersion),
    /// No rule applied; a human must choose
    Manual,
}

/// A human's answer to an unresolvable conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualChoice {
    Local,
    Server,
    Merged,
}
