//! Auto-resolution rules, applied in order, first match wins.
//!
//! 1. Local marks DNF/DQ, server does not: the on-range scorer made the
//!    call, keep local.
//! 2. Server marks DNF/DQ, local does not: keep server.
//! 3. Identical hits, only string times differ: keep the later edit.
//! 4. Identical strings and flags, only penalties differ: merge, taking the
//!    maximum of each standard category and the union of "other" entries.
//!    A recorded penalty is never silently dropped.
//! 5. Anything else goes to a human.

use super::models::{ConflictRecord, ManualChoice, Resolution, ScoreVersion};
use crate::scoring::models::PenaltySet;

/// Run the auto-resolution rules against a detected conflict.
pub fn resolve(record: &ConflictRecord) -> Resolution {
    let local = &record.local;
    let server = &record.server;

    // Rules 1 and 2: a terminal call on either side wins over its absence.
    if local.is_terminal() && !server.is_terminal() {
        return Resolution::UseLocal;
    }
    if server.is_terminal() && !local.is_terminal() {
        return Resolution::UseServer;
    }

    // Rule 3: same hits, same penalties, same flags, times differ.
    if local.hits_eq(server)
        && local.flags_eq(server)
        && local.penalties == server.penalties
        && !local.strings_eq(server)
    {
        return if local.modified_at > server.modified_at {
            Resolution::UseLocal
        } else {
            Resolution::UseServer
        };
    }

    // Rule 4: identical shooting, divergent paperwork.
    if record.mergeable() && local.penalties != server.penalties {
        return Resolution::UseMerged(merged_version(record));
    }

    Resolution::Manual
}

/// Materialize a manual choice into the version to write.
///
/// Returns `None` for `ManualChoice::Merged` when no penalty merge is
/// computable for this record.
pub fn chosen_version(record: &ConflictRecord, choice: ManualChoice) -> Option<ScoreVersion> {
    match choice {
        ManualChoice::Local => Some(record.local.clone()),
        ManualChoice::Server => Some(record.server.clone()),
        ManualChoice::Merged => record.mergeable().then(|| merged_version(record)),
    }
}

/// Conservative penalty merge: per-category maximum plus the union of
/// free-form entries, exact duplicates collapsed.
pub fn merge_penalties(a: &PenaltySet, b: &PenaltySet) -> PenaltySet {
    let mut other = a.other.clone();
    for penalty in &b.other {
        if !other.contains(penalty) {
            other.push(penalty.clone());
        }
    }
    PenaltySet {
        procedural: a.procedural.max(b.procedural),
        non_threat: a.non_threat.max(b.non_threat),
        failure_to_neutralize: a.failure_to_neutralize.max(b.failure_to_neutralize),
        flagrant: a.flagrant.max(b.flagrant),
        ftdr: a.ftdr.max(b.ftdr),
        other,
    }
}

fn merged_version(record: &ConflictRecord) -> ScoreVersion {
    let later = record.local.modified_at.max(record.server.modified_at);
    ScoreVersion {
        strings: record.local.strings.clone(),
        penalties: merge_penalties(&record.local.penalties, &record.server.penalties),
        dnf: record.local.dnf,
        dq: record.local.dq,
        modified_at: later,
        modified_by: record.local.modified_by,
    }
}
