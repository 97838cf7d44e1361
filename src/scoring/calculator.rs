//! Pure IDPA scoring breakdown.
//!
//! Deterministic and side-effect free: the same strings and penalties always
//! produce the same breakdown. Validation failures are reported, never
//! silently clamped.

use super::errors::{ScoringError, ScoringResult};
use super::models::{PenaltySet, ScoreBreakdown, ScoreString};

/// Seconds per procedural error
pub const PROCEDURAL_SECONDS: f64 = 3.0;
/// Seconds per hit on a non-threat
pub const NON_THREAT_SECONDS: f64 = 5.0;
/// Seconds per failure to neutralize
pub const FAILURE_TO_NEUTRALIZE_SECONDS: f64 = 5.0;
/// Seconds per flagrant penalty
pub const FLAGRANT_SECONDS: f64 = 10.0;
/// Seconds per Failure to Do Right
pub const FTDR_SECONDS: f64 = 20.0;

/// Compute the scoring breakdown for one stage.
///
/// `round_count` is the stage's configured round count; the total recorded
/// hits across all strings may not exceed it.
///
/// # Errors
///
/// * `ScoringError::InvalidScoreInput` - negative or non-finite string time,
///   negative or non-finite penalty seconds, or more hits than the stage
///   fires rounds
pub fn calculate_breakdown(
    strings: &[ScoreString],
    penalties: &PenaltySet,
    round_count: u32,
) -> ScoringResult<ScoreBreakdown> {
    validate(strings, penalties, round_count)?;

    let raw_time: f64 = strings.iter().map(|s| s.time).sum();
    let points_down: u32 = strings.iter().map(|s| s.hits.points_down()).sum();
    let penalty_time = penalty_seconds(penalties);
    let final_time = raw_time + f64::from(points_down) + penalty_time;

    Ok(ScoreBreakdown {
        raw_time,
        points_down,
        penalty_time,
        final_time,
    })
}

/// Seconds added by a penalty set.
pub fn penalty_seconds(penalties: &PenaltySet) -> f64 {
    f64::from(penalties.procedural) * PROCEDURAL_SECONDS
        + f64::from(penalties.non_threat) * NON_THREAT_SECONDS
        + f64::from(penalties.failure_to_neutralize) * FAILURE_TO_NEUTRALIZE_SECONDS
        + f64::from(penalties.flagrant) * FLAGRANT_SECONDS
        + f64::from(penalties.ftdr) * FTDR_SECONDS
        + penalties
            .other
            .iter()
            .map(|p| f64::from(p.count) * p.seconds)
            .sum::<f64>()
}

/// Shape validation that needs no stage context. Used by the offline queue
/// to reject malformed payloads synchronously, before anything is queued.
pub fn validate_shape(strings: &[ScoreString], penalties: &PenaltySet) -> ScoringResult<()> {
    for (i, string) in strings.iter().enumerate() {
        if !string.time.is_finite() || string.time < 0.0 {
            return Err(ScoringError::invalid(format!(
                "string {} has an invalid time {}",
                i + 1,
                string.time
            )));
        }
    }
    for penalty in &penalties.other {
        if !penalty.seconds.is_finite() || penalty.seconds < 0.0 {
            return Err(ScoringError::invalid(format!(
                "penalty '{}' has invalid seconds {}",
                penalty.label, penalty.seconds
            )));
        }
    }
    Ok(())
}

fn validate(strings: &[ScoreString], penalties: &PenaltySet, round_count: u32) -> ScoringResult<()> {
    validate_shape(strings, penalties)?;

    let total_hits: u32 = strings.iter().map(|s| s.hits.total()).sum();
    if total_hits > round_count {
        return Err(ScoringError::invalid(format!(
            "recorded {total_hits} hits but the stage fires {round_count} rounds"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::models::{HitCounts, OtherPenalty};

    fn string(time: f64, hits: HitCounts) -> ScoreString {
        ScoreString { time, hits }
    }

    #[test]
    fn test_clean_string() {
        let strings = vec![string(
            10.0,
            HitCounts {
                down0: 10,
                ..Default::default()
            },
        )];
        let b = calculate_breakdown(&strings, &PenaltySet::default(), 10).unwrap();
        assert_eq!(b.raw_time, 10.0);
        assert_eq!(b.points_down, 0);
        assert_eq!(b.penalty_time, 0.0);
        assert_eq!(b.final_time, 10.0);
    }

    #[test]
    fn test_points_down_added_as_seconds() {
        // 8 down-zero and 2 down-one on a 10 second string: final = 12
        let strings = vec![string(
            10.0,
            HitCounts {
                down0: 8,
                down1: 2,
                ..Default::default()
            },
        )];
        let b = calculate_breakdown(&strings, &PenaltySet::default(), 10).unwrap();
        assert_eq!(b.raw_time, 10.0);
        assert_eq!(b.points_down, 2);
        assert_eq!(b.penalty_time, 0.0);
        assert_eq!(b.final_time, 12.0);
    }

    #[test]
    fn test_multi_string_sums() {
        let strings = vec![
            string(
                6.5,
                HitCounts {
                    down0: 5,
                    down3: 1,
                    ..Default::default()
                },
            ),
            string(
                4.25,
                HitCounts {
                    down0: 4,
                    miss: 2,
                    ..Default::default()
                },
            ),
        ];
        let b = calculate_breakdown(&strings, &PenaltySet::default(), 12).unwrap();
        assert_eq!(b.raw_time, 10.75);
        assert_eq!(b.points_down, 13);
        assert_eq!(b.final_time, 23.75);
    }

    #[test]
    fn test_standard_penalty_seconds() {
        let penalties = PenaltySet {
            procedural: 2,
            non_threat: 1,
            failure_to_neutralize: 1,
            flagrant: 1,
            ftdr: 1,
            other: vec![],
        };
        // 2*3 + 5 + 5 + 10 + 20
        assert_eq!(penalty_seconds(&penalties), 46.0);
    }

    #[test]
    fn test_other_penalties_counted() {
        let penalties = PenaltySet {
            other: vec![
                OtherPenalty {
                    label: "cover violation".to_string(),
                    count: 2,
                    seconds: 3.0,
                },
                OtherPenalty {
                    label: "finger".to_string(),
                    count: 1,
                    seconds: 3.0,
                },
            ],
            ..Default::default()
        };
        assert_eq!(penalty_seconds(&penalties), 9.0);
    }

    #[test]
    fn test_negative_time_rejected() {
        let strings = vec![string(-1.0, HitCounts::default())];
        let err = calculate_breakdown(&strings, &PenaltySet::default(), 10).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidScoreInput { .. }));
    }

    #[test]
    fn test_nan_time_rejected() {
        let strings = vec![string(f64::NAN, HitCounts::default())];
        assert!(calculate_breakdown(&strings, &PenaltySet::default(), 10).is_err());
    }

    #[test]
    fn test_too_many_hits_rejected() {
        let strings = vec![string(
            8.0,
            HitCounts {
                down0: 11,
                ..Default::default()
            },
        )];
        let err = calculate_breakdown(&strings, &PenaltySet::default(), 10).unwrap_err();
        assert!(err.to_string().contains("11 hits"));
    }

    #[test]
    fn test_negative_other_penalty_rejected() {
        let penalties = PenaltySet {
            other: vec![OtherPenalty {
                label: "bad".to_string(),
                count: 1,
                seconds: -5.0,
            }],
            ..Default::default()
        };
        assert!(calculate_breakdown(&[], &penalties, 10).is_err());
    }

    #[test]
    fn test_deterministic() {
        let strings = vec![string(
            9.87,
            HitCounts {
                down0: 7,
                down1: 2,
                down3: 1,
                ..Default::default()
            },
        )];
        let penalties = PenaltySet {
            procedural: 1,
            ..Default::default()
        };
        let a = calculate_breakdown(&strings, &penalties, 10).unwrap();
        let b = calculate_breakdown(&strings, &penalties, 10).unwrap();
        assert_eq!(a, b);
    }
}
