//! Squad and registration data models.

use crate::tournament::{Classification, Division, ShooterId, TournamentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Squad ID type
pub type SquadId = i64;

/// Registration ID type
pub type RegistrationId = i64;

/// Squad state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SquadStatus {
    /// Accepting shooters
    Open,
    /// At capacity; new registrations go to the waitlist
    Full,
    /// Manually closed; rejects registrations and never promotes
    Closed,
}

impl SquadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SquadStatus::Open => "open",
            SquadStatus::Full => "full",
            SquadStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(SquadStatus::Open),
            "full" => Some(SquadStatus::Full),
            "closed" => Some(SquadStatus::Closed),
            _ => None,
        }
    }
}

/// Payment state of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "paid" => Some(PaymentStatus::Paid),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// Registration lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Holds a squad slot
    Registered,
    /// Waiting for a slot to free up
    Waitlist,
    /// Arrived and verified at the match
    CheckedIn,
    /// Finished the match
    Completed,
    /// Withdrawn; no longer active
    Cancelled,
}

impl RegistrationStatus {
    /// States that occupy one of the squad's `max_shooters` slots.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            RegistrationStatus::Registered
                | RegistrationStatus::CheckedIn
                | RegistrationStatus::Completed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Waitlist => "waitlist",
            RegistrationStatus::CheckedIn => "checked_in",
            RegistrationStatus::Completed => "completed",
            RegistrationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(RegistrationStatus::Registered),
            "waitlist" => Some(RegistrationStatus::Waitlist),
            "checked_in" => Some(RegistrationStatus::CheckedIn),
            "completed" => Some(RegistrationStatus::Completed),
            "cancelled" => Some(RegistrationStatus::Cancelled),
            _ => None,
        }
    }
}

/// A fixed-capacity, time-slotted group of shooters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Squad {
    pub id: SquadId,
    pub tournament_id: TournamentId,
    pub name: String,
    /// Display label for the squad's slot, e.g. "Saturday 09:00"
    pub time_slot: String,
    pub max_shooters: u32,
    /// Count of slot-holding registrations; mutated only through the
    /// capacity manager
    pub current_shooters: u32,
    pub status: SquadStatus,
    /// Safety officer assigned to run this squad
    pub assigned_officer: Option<UserId>,
}

impl Squad {
    pub fn has_capacity(&self) -> bool {
        self.current_shooters < self.max_shooters
    }

    /// Recompute `status` from the counters. A manual close sticks until
    /// explicitly reopened.
    pub fn recompute_status(&mut self) {
        if self.status == SquadStatus::Closed {
            return;
        }
        self.status = if self.current_shooters >= self.max_shooters {
            SquadStatus::Full
        } else {
            SquadStatus::Open
        };
    }
}

/// A shooter's entry in one tournament. At most one active (non-cancelled)
/// registration exists per (shooter, tournament).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub shooter_id: ShooterId,
    pub squad_id: SquadId,
    pub division: Division,
    pub classification: Classification,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    /// Custom award category ids requested at registration
    #[serde(default)]
    pub custom_categories: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        self.status != RegistrationStatus::Cancelled
    }
}

/// Request to register a shooter into a squad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub tournament_id: TournamentId,
    pub shooter_id: ShooterId,
    pub squad_id: SquadId,
    pub division: Division,
    pub classification: Classification,
    #[serde(default)]
    pub custom_categories: Vec<String>,
}
