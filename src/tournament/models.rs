//! Tournament data models shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Stage ID type
pub type StageId = i64;

/// Shooter ID type
pub type ShooterId = i64;

/// User ID type (officers, scorekeepers, sync clients)
pub type UserId = i64;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Not yet visible to shooters
    Draft,
    /// Published and accepting registrations within the window
    Published,
    /// Match in progress
    Active,
    /// Match finished
    Completed,
    /// Tournament cancelled
    Cancelled,
}

impl TournamentStatus {
    /// Registrations can no longer be cancelled or transferred once the
    /// match has started.
    pub fn is_locked(&self) -> bool {
        matches!(self, TournamentStatus::Active | TournamentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Published => "published",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(TournamentStatus::Draft),
            "published" => Some(TournamentStatus::Published),
            "active" => Some(TournamentStatus::Active),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }
}

/// IDPA division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Division {
    /// Stock Service Pistol
    Ssp,
    /// Enhanced Service Pistol
    Esp,
    /// Custom Defensive Pistol
    Cdp,
    /// Compact Carry Pistol
    Ccp,
    /// Revolver
    Rev,
    /// Back-Up Gun
    Bug,
    /// Pistol Caliber Carbine
    Pcc,
    /// Carry Optics
    Co,
}

impl Division {
    pub fn as_str(&self) -> &'static str {
        match self {
            Division::Ssp => "SSP",
            Division::Esp => "ESP",
            Division::Cdp => "CDP",
            Division::Ccp => "CCP",
            Division::Rev => "REV",
            Division::Bug => "BUG",
            Division::Pcc => "PCC",
            Division::Co => "CO",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SSP" => Some(Division::Ssp),
            "ESP" => Some(Division::Esp),
            "CDP" => Some(Division::Cdp),
            "CCP" => Some(Division::Ccp),
            "REV" => Some(Division::Rev),
            "BUG" => Some(Division::Bug),
            "PCC" => Some(Division::Pcc),
            "CO" => Some(Division::Co),
            _ => None,
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IDPA classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "DM")]
    DistinguishedMaster,
    #[serde(rename = "MA")]
    Master,
    #[serde(rename = "EX")]
    Expert,
    #[serde(rename = "SS")]
    Sharpshooter,
    #[serde(rename = "MM")]
    Marksman,
    #[serde(rename = "NV")]
    Novice,
    #[serde(rename = "UN")]
    Unclassified,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::DistinguishedMaster => "DM",
            Classification::Master => "MA",
            Classification::Expert => "EX",
            Classification::Sharpshooter => "SS",
            Classification::Marksman => "MM",
            Classification::Novice => "NV",
            Classification::Unclassified => "UN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DM" => Some(Classification::DistinguishedMaster),
            "MA" => Some(Classification::Master),
            "EX" => Some(Classification::Expert),
            "SS" => Some(Classification::Sharpshooter),
            "MM" => Some(Classification::Marksman),
            "NV" => Some(Classification::Novice),
            "UN" => Some(Classification::Unclassified),
            _ => None,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom award category (e.g. "Lady", "Senior", "Law Enforcement")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCategory {
    /// Category ID referenced by registrations
    pub id: String,
    /// Display name
    pub name: String,
}

/// One course of fire within a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage ID
    pub id: StageId,
    /// Stage name
    pub name: String,
    /// Rounds fired on this stage; bounds the recordable hit count
    pub round_count: u32,
}

/// Tournament context consumed by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament name
    pub name: String,
    /// Lifecycle state
    pub status: TournamentStatus,
    /// Divisions shooters may register into
    pub divisions: Vec<Division>,
    /// Custom award categories offered by this match
    pub custom_categories: Vec<CustomCategory>,
    /// Registration window start
    pub registration_opens_at: DateTime<Utc>,
    /// Registration window end
    pub registration_closes_at: DateTime<Utc>,
    /// Stages of the match, in shooting order
    pub stages: Vec<Stage>,
}

impl Tournament {
    /// A tournament accepts registrations only while published and inside
    /// its registration window.
    pub fn is_registration_open(&self, now: DateTime<Utc>) -> bool {
        self.status == TournamentStatus::Published
            && now >= self.registration_opens_at
            && now <= self.registration_closes_at
    }

    /// Whether shooters may register into the given division.
    pub fn allows(&self, division: Division) -> bool {
        self.divisions.contains(&division)
    }

    /// Whether the given custom category id is offered by this match.
    pub fn has_category(&self, category_id: &str) -> bool {
        self.custom_categories.iter().any(|c| c.id == category_id)
    }

    /// Look up a stage by id.
    pub fn stage(&self, stage_id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id).collect()
    }

    pub fn stage_count(&self) -> u32 {
        self.stages.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tournament() -> Tournament {
        let now = Utc::now();
        Tournament {
            id: 1,
            name: "Club Match".to_string(),
            status: TournamentStatus::Published,
            divisions: vec![Division::Ssp, Division::Esp, Division::Co],
            custom_categories: vec![CustomCategory {
                id: "senior".to_string(),
                name: "Senior".to_string(),
            }],
            registration_opens_at: now - Duration::days(7),
            registration_closes_at: now + Duration::days(7),
            stages: vec![
                Stage {
                    id: 10,
                    name: "Stage 1".to_string(),
                    round_count: 12,
                },
                Stage {
                    id: 11,
                    name: "Stage 2".to_string(),
                    round_count: 18,
                },
            ],
        }
    }

    #[test]
    fn test_registration_window() {
        let t = tournament();
        assert!(t.is_registration_open(Utc::now()));
        assert!(!t.is_registration_open(Utc::now() + Duration::days(30)));
        assert!(!t.is_registration_open(Utc::now() - Duration::days(30)));
    }

    #[test]
    fn test_draft_tournament_is_closed() {
        let mut t = tournament();
        t.status = TournamentStatus::Draft;
        assert!(!t.is_registration_open(Utc::now()));
    }

    #[test]
    fn test_division_and_category_lookups() {
        let t = tournament();
        assert!(t.allows(Division::Ssp));
        assert!(!t.allows(Division::Rev));
        assert!(t.has_category("senior"));
        assert!(!t.has_category("junior"));
    }

    #[test]
    fn test_stage_lookup() {
        let t = tournament();
        assert_eq!(t.stage(10).map(|s| s.round_count), Some(12));
        assert!(t.stage(99).is_none());
        assert_eq!(t.stage_ids(), vec![10, 11]);
        assert_eq!(t.stage_count(), 2);
    }

    #[test]
    fn test_locked_states() {
        assert!(TournamentStatus::Active.is_locked());
        assert!(TournamentStatus::Completed.is_locked());
        assert!(!TournamentStatus::Published.is_locked());
    }

    #[test]
    fn test_division_round_trip() {
        for d in [
            Division::Ssp,
            Division::Esp,
            Division::Cdp,
            Division::Ccp,
            Division::Rev,
            Division::Bug,
            Division::Pcc,
            Division::Co,
        ] {
            assert_eq!(Division::parse(d.as_str()), Some(d));
        }
        assert_eq!(Division::parse("XYZ"), None);
    }

    #[test]
    fn test_classification_serde_names() {
        let json = serde_json::to_string(&Classification::DistinguishedMaster).unwrap();
        assert_eq!(json, "\"DM\"");
        let back: Classification = serde_json::from_str("\"SS\"").unwrap();
        assert_eq!(back, Classification::Sharpshooter);
    }
}
