//! Ranking engine.

use super::models::{LeaderboardFilter, MatchResult, RankEntry, Rankings};
use crate::db::repository::{MatchStore, StoreError};
use crate::scoring::models::StageScore;
use crate::squads::models::Registration;
use crate::tournament::{Classification, Division, Tournament, TournamentId};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Ranking errors
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for ranking operations
pub type RankingResult<T> = Result<T, RankingError>;

/// Ranking engine
#[derive(Clone)]
pub struct RankingEngine {
    store: Arc<dyn MatchStore>,
}

impl RankingEngine {
    /// Create a new ranking engine over a store
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// Recompute match results for a whole tournament, sorted in overall
    /// rank order.
    pub async fn compute_match_results(
        &self,
        tournament_id: TournamentId,
    ) -> RankingResult<Vec<MatchResult>> {
        let tournament = self
            .store
            .tournament(tournament_id)
            .await?
            .ok_or(RankingError::TournamentNotFound(tournament_id))?;

        let registrations: Vec<Registration> = self
            .store
            .find_by_tournament(tournament_id)
            .await?
            .into_iter()
            .filter(Registration::is_active)
            .collect();

        let mut scores = self
            .store
            .find_scores_by_stages(&tournament.stage_ids())
            .await?;
        assign_stage_points(&mut scores);

        let mut results = build_results(&tournament, &registrations, &scores);
        assign_ranks(&mut results);
        Ok(results)
    }

    /// Render a leaderboard view. The rank column comes from the matching
    /// parallel ranking: overall with no filter, division rank with a
    /// division filter, classification rank with both.
    pub async fn leaderboard(
        &self,
        tournament_id: TournamentId,
        filter: LeaderboardFilter,
    ) -> RankingResult<Vec<RankEntry>> {
        let results = self.compute_match_results(tournament_id).await?;

        let entries = results
            .into_iter()
            .filter(|r| filter.division.is_none_or(|d| r.division == d))
            .filter(|r| filter.classification.is_none_or(|c| r.classification == c))
            .collect::<Vec<_>>();

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                let rank = match (filter.division, filter.classification) {
                    (None, None) => r.rankings.overall,
                    (Some(_), None) => r.rankings.division,
                    (Some(_), Some(_)) => r.rankings.classification,
                    // Classification across divisions has no stored parallel
                    // ranking; number the filtered view positionally.
                    (None, Some(_)) => i as u32 + 1,
                };
                RankEntry {
                    rank,
                    shooter_id: r.shooter_id,
                    division: r.division,
                    classification: r.classification,
                    final_score: r.final_score,
                    total_points_down: r.total_points_down,
                    completed_stages: r.completed_stages,
                    total_stages: r.total_stages,
                    dnf: r.dnf,
                    dq: r.dq,
                }
            })
            .collect())
    }
}

/// Assign stage placement points relative to the stage winner:
/// `100 * best_final / final`, zero for DNF/DQ. Informational only.
fn assign_stage_points(scores: &mut [StageScore]) {
    let mut best_by_stage: HashMap<i64, f64> = HashMap::new();
    for score in scores.iter() {
        if score.excluded_from_time() {
            continue;
        }
        let best = best_by_stage.entry(score.stage_id).or_insert(f64::INFINITY);
        if score.final_time < *best {
            *best = score.final_time;
        }
    }
    for score in scores.iter_mut() {
        score.stage_points = match best_by_stage.get(&score.stage_id) {
            _ if score.excluded_from_time() => 0.0,
            Some(&best) if score.final_time > 0.0 => 100.0 * best / score.final_time,
            Some(_) => 100.0,
            None => 0.0,
        };
    }
}

fn build_results(
    tournament: &Tournament,
    registrations: &[Registration],
    scores: &[StageScore],
) -> Vec<MatchResult> {
    let total_stages = tournament.stage_count();

    let mut by_shooter: HashMap<i64, Vec<&StageScore>> = HashMap::new();
    for score in scores {
        by_shooter.entry(score.shooter_id).or_default().push(score);
    }

    registrations
        .iter()
        .map(|registration| {
            let shooter_scores = by_shooter
                .get(&registration.shooter_id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let dq = shooter_scores.iter().any(|s| s.dq);
            let dnf = !dq && shooter_scores.iter().any(|s| s.dnf);
            let total_time: f64 = shooter_scores
                .iter()
                .filter(|s| !s.excluded_from_time())
                .map(|s| s.final_time)
                .sum();
            let total_points_down = shooter_scores.iter().map(|s| s.points_down).sum();
            let total_penalty_time = shooter_scores.iter().map(|s| s.penalty_time).sum();
            let total_stage_points = shooter_scores.iter().map(|s| s.stage_points).sum();

            // Seed each requested category at rank 0; assign_ranks counts
            // shooters per category in overall order.
            let mut rankings = Rankings::default();
            for category in &registration.custom_categories {
                rankings.categories.insert(category.clone(), 0);
            }

            MatchResult {
                tournament_id: tournament.id,
                shooter_id: registration.shooter_id,
                division: registration.division,
                classification: registration.classification,
                total_time,
                total_points_down,
                total_penalty_time,
                total_stage_points,
                completed_stages: shooter_scores.len() as u32,
                total_stages,
                dnf,
                dq,
                final_score: total_time,
                rankings,
            }
        })
        .collect()
}

/// DNF/DQ shooters sort after every finisher regardless of their numeric
/// score; ties broken by shooter id so the ordering is total.
fn compare(a: &MatchResult, b: &MatchResult) -> Ordering {
    match (a.excluded_from_time(), b.excluded_from_time()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => a.shooter_id.cmp(&b.shooter_id),
        (false, false) => a
            .final_score
            .partial_cmp(&b.final_score)
            .unwrap_or(Ordering::Equal)
            .then(a.shooter_id.cmp(&b.shooter_id)),
    }
}

fn assign_ranks(results: &mut [MatchResult]) {
    results.sort_by(compare);

    let mut division_counters: HashMap<Division, u32> = HashMap::new();
    let mut classification_counters: HashMap<(Division, Classification), u32> = HashMap::new();
    let mut category_counters: HashMap<String, u32> = HashMap::new();
    for (index, result) in results.iter_mut().enumerate() {
        result.rankings.overall = index as u32 + 1;

        let division_rank = division_counters.entry(result.division).or_insert(0);
        *division_rank += 1;
        result.rankings.division = *division_rank;

        let classification_rank = classification_counters
            .entry((result.division, result.classification))
            .or_insert(0);
        *classification_rank += 1;
        result.rankings.classification = *classification_rank;

        for category in result.rankings.categories.keys().cloned().collect::<Vec<_>>() {
            let rank = category_counters.entry(category.clone()).or_insert(0);
            *rank += 1;
            result.rankings.categories.insert(category, *rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::models::{HitCounts, PenaltySet, ScoreString};
    use crate::squads::models::{PaymentStatus, RegistrationStatus};
    use crate::tournament::{CustomCategory, Stage, TournamentStatus};
    use chrono::Utc;

    fn tournament() -> Tournament {
        Tournament {
            id: 1,
            name: "State Match".to_string(),
            status: TournamentStatus::Active,
            divisions: vec![Division::Ssp, Division::Co],
            custom_categories: vec![CustomCategory {
                id: "senior".to_string(),
                name: "Senior".to_string(),
            }],
            registration_opens_at: Utc::now(),
            registration_closes_at: Utc::now(),
            stages: vec![
                Stage {
                    id: 10,
                    name: "Stage 1".to_string(),
                    round_count: 12,
                },
                Stage {
                    id: 11,
                    name: "Stage 2".to_string(),
                    round_count: 12,
                },
            ],
        }
    }

    fn registration(shooter_id: i64, division: Division) -> Registration {
        Registration {
            id: shooter_id,
            tournament_id: 1,
            shooter_id,
            squad_id: 1,
            division,
            classification: Classification::Marksman,
            status: RegistrationStatus::Registered,
            payment_status: PaymentStatus::Paid,
            custom_categories: vec![],
            registered_at: Utc::now(),
            checked_in_at: None,
        }
    }

    fn score(shooter_id: i64, stage_id: i64, final_time: f64) -> StageScore {
        StageScore {
            id: shooter_id * 100 + stage_id,
            stage_id,
            shooter_id,
            squad_id: 1,
            division: Division::Ssp,
            classification: Classification::Marksman,
            scored_by: 7,
            strings: vec![ScoreString {
                time: final_time,
                hits: HitCounts::default(),
            }],
            penalties: PenaltySet::default(),
            raw_time: final_time,
            points_down: 0,
            penalty_time: 0.0,
            final_time,
            stage_points: 0.0,
            dnf: false,
            dq: false,
            scored_at: Utc::now(),
        }
    }

    #[test]
    fn test_finishers_order_ascending_by_time() {
        let t = tournament();
        let registrations = vec![
            registration(1, Division::Ssp),
            registration(2, Division::Ssp),
            registration(3, Division::Ssp),
        ];
        let scores = vec![
            score(1, 10, 30.0),
            score(1, 11, 30.0),
            score(2, 10, 25.0),
            score(2, 11, 25.0),
            score(3, 10, 40.0),
            score(3, 11, 40.0),
        ];
        let mut results = build_results(&t, &registrations, &scores);
        assign_ranks(&mut results);

        let order: Vec<i64> = results.iter().map(|r| r.shooter_id).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(results[0].rankings.overall, 1);
        assert_eq!(results[0].final_score, 50.0);
    }

    #[test]
    fn test_dnf_and_dq_sort_after_finishers() {
        let t = tournament();
        let registrations = vec![
            registration(1, Division::Ssp),
            registration(2, Division::Ssp),
            registration(3, Division::Ssp),
        ];
        let mut fast_but_dq = score(1, 10, 5.0);
        fast_but_dq.dq = true;
        let mut fast_but_dnf = score(2, 10, 6.0);
        fast_but_dnf.dnf = true;
        let scores = vec![fast_but_dq, fast_but_dnf, score(3, 10, 99.0)];

        let mut results = build_results(&t, &registrations, &scores);
        assign_ranks(&mut results);

        let order: Vec<i64> = results.iter().map(|r| r.shooter_id).collect();
        // The slow finisher beats both excluded shooters; excluded shooters
        // order deterministically by id.
        assert_eq!(order, vec![3, 1, 2]);
        assert!(results[1].dq);
        assert!(results[2].dnf);
    }

    #[test]
    fn test_division_and_classification_ranks_are_parallel() {
        let t = tournament();
        let registrations = vec![
            registration(1, Division::Ssp),
            registration(2, Division::Co),
            registration(3, Division::Ssp),
        ];
        let scores = vec![score(1, 10, 20.0), score(2, 10, 10.0), score(3, 10, 30.0)];

        let mut results = build_results(&t, &registrations, &scores);
        assign_ranks(&mut results);

        // Overall: 2, 1, 3. Within SSP: 1 then 3.
        assert_eq!(results[0].shooter_id, 2);
        assert_eq!(results[0].rankings.division, 1);
        assert_eq!(results[1].shooter_id, 1);
        assert_eq!(results[1].rankings.division, 1);
        assert_eq!(results[2].shooter_id, 3);
        assert_eq!(results[2].rankings.division, 2);
        assert_eq!(results[2].rankings.classification, 2);
    }

    #[test]
    fn test_stage_points_relative_to_stage_winner() {
        let mut scores = vec![score(1, 10, 10.0), score(2, 10, 20.0)];
        assign_stage_points(&mut scores);
        assert_eq!(scores[0].stage_points, 100.0);
        assert_eq!(scores[1].stage_points, 50.0);
    }

    #[test]
    fn test_stage_points_zero_for_excluded() {
        let mut dq = score(1, 10, 10.0);
        dq.dq = true;
        let mut scores = vec![dq, score(2, 10, 20.0)];
        assign_stage_points(&mut scores);
        assert_eq!(scores[0].stage_points, 0.0);
        assert_eq!(scores[1].stage_points, 100.0);
    }

    #[test]
    fn test_cancelled_registrations_are_ignored() {
        let t = tournament();
        let mut cancelled = registration(1, Division::Ssp);
        cancelled.status = RegistrationStatus::Cancelled;
        let registrations = vec![cancelled, registration(2, Division::Ssp)];
        let active: Vec<Registration> = registrations
            .into_iter()
            .filter(Registration::is_active)
            .collect();
        let results = build_results(&t, &active, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].shooter_id, 2);
    }

    #[test]
    fn test_category_ranks_cover_only_members() {
        let t = tournament();
        let mut senior_fast = registration(1, Division::Ssp);
        senior_fast.custom_categories = vec!["senior".to_string()];
        let mut senior_slow = registration(3, Division::Ssp);
        senior_slow.custom_categories = vec!["senior".to_string()];
        let registrations = vec![senior_fast, registration(2, Division::Ssp), senior_slow];
        let scores = vec![score(1, 10, 20.0), score(2, 10, 10.0), score(3, 10, 30.0)];

        let mut results = build_results(&t, &registrations, &scores);
        assign_ranks(&mut results);

        // Shooter 2 wins overall but is not a senior; shooter 1 leads the
        // senior category.
        assert_eq!(results[0].shooter_id, 2);
        assert!(results[0].rankings.categories.is_empty());
        assert_eq!(results[1].rankings.categories.get("senior"), Some(&1));
        assert_eq!(results[2].rankings.categories.get("senior"), Some(&2));
    }

    #[test]
    fn test_completion_tracking() {
        let t = tournament();
        let registrations = vec![registration(1, Division::Ssp)];
        let scores = vec![score(1, 10, 20.0)];
        let results = build_results(&t, &registrations, &scores);
        assert_eq!(results[0].completed_stages, 1);
        assert_eq!(results[0].total_stages, 2);
        assert_eq!(results[0].completion_percent(), 50.0);
    }
}
