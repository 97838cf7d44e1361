//! Property-based tests for the pure scoring breakdown.

use match_director::scoring::{
    HitCounts, OtherPenalty, PenaltySet, ScoreString, calculate_breakdown,
};
use proptest::prelude::*;

fn hits_strategy() -> impl Strategy<Value = HitCounts> {
    (0u32..8, 0u32..4, 0u32..4, 0u32..3, 0u32..3).prop_map(
        |(down0, down1, down3, miss, non_threat)| HitCounts {
            down0,
            down1,
            down3,
            miss,
            non_threat,
        },
    )
}

fn string_strategy() -> impl Strategy<Value = ScoreString> {
    (0.0f64..120.0, hits_strategy()).prop_map(|(time, hits)| ScoreString { time, hits })
}

fn strings_strategy() -> impl Strategy<Value = Vec<ScoreString>> {
    prop::collection::vec(string_strategy(), 1..4)
}

fn penalties_strategy() -> impl Strategy<Value = PenaltySet> {
    (
        0u32..3,
        0u32..3,
        0u32..2,
        0u32..2,
        0u32..2,
        prop::collection::vec((0u32..3, 0.0f64..30.0), 0..3),
    )
        .prop_map(
            |(procedural, non_threat, failure_to_neutralize, flagrant, ftdr, other)| PenaltySet {
                procedural,
                non_threat,
                failure_to_neutralize,
                flagrant,
                ftdr,
                other: other
                    .into_iter()
                    .map(|(count, seconds)| OtherPenalty {
                        label: "range call".to_string(),
                        count,
                        seconds,
                    })
                    .collect(),
            },
        )
}

/// Round count generous enough that any generated strings validate.
const ROUND_COUNT: u32 = 200;

proptest! {
    #[test]
    fn test_breakdown_is_deterministic(
        strings in strings_strategy(),
        penalties in penalties_strategy(),
    ) {
        let first = calculate_breakdown(&strings, &penalties, ROUND_COUNT).unwrap();
        let second = calculate_breakdown(&strings, &penalties, ROUND_COUNT).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_final_time_is_the_sum_of_its_parts(
        strings in strings_strategy(),
        penalties in penalties_strategy(),
    ) {
        let b = calculate_breakdown(&strings, &penalties, ROUND_COUNT).unwrap();
        prop_assert_eq!(b.final_time, b.raw_time + f64::from(b.points_down) + b.penalty_time);
        prop_assert!(b.raw_time >= 0.0);
        prop_assert!(b.penalty_time >= 0.0);
    }

    #[test]
    fn test_points_down_ignores_center_hits(
        strings in strings_strategy(),
    ) {
        let b = calculate_breakdown(&strings, &PenaltySet::default(), ROUND_COUNT).unwrap();
        let expected: u32 = strings
            .iter()
            .map(|s| s.hits.down1 + s.hits.down3 * 3 + (s.hits.miss + s.hits.non_threat) * 5)
            .sum();
        prop_assert_eq!(b.points_down, expected);
    }

    #[test]
    fn test_adding_a_penalty_never_improves_the_score(
        strings in strings_strategy(),
        penalties in penalties_strategy(),
    ) {
        let base = calculate_breakdown(&strings, &PenaltySet::default(), ROUND_COUNT).unwrap();
        let with_penalties = calculate_breakdown(&strings, &penalties, ROUND_COUNT).unwrap();
        prop_assert!(with_penalties.final_time >= base.final_time);
    }

    #[test]
    fn test_hit_budget_violations_always_reject(
        strings in strings_strategy(),
    ) {
        let total_hits: u32 = strings.iter().map(|s| s.hits.total()).sum();
        prop_assume!(total_hits > 0);
        let result = calculate_breakdown(&strings, &PenaltySet::default(), total_hits - 1);
        prop_assert!(result.is_err());
    }
}
