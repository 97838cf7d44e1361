//! Integration tests for the score write path and ranking reads.

use chrono::{Duration, Utc};
use match_director::db::{MemoryStore, ScoreStore, SquadStore, TournamentStore};
use match_director::ranking::{LeaderboardFilter, RankingEngine};
use match_director::scoring::{
    HitCounts, PenaltySet, ScoreManager, ScoreString, ScoreSubmission, ScoreUpdate, ScoringError,
};
use match_director::squads::{RegistrationRequest, SquadCapacityManager, SquadStatus};
use match_director::tournament::{
    Classification, Division, Stage, Tournament, TournamentStatus,
};
use match_director::Squad;
use std::sync::Arc;

struct Harness {
    store: Arc<MemoryStore>,
    squads: SquadCapacityManager,
    scores: ScoreManager,
    rankings: RankingEngine,
}

async fn setup() -> Harness {
    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store
        .insert_tournament(&Tournament {
            id: 1,
            name: "Regional Championship".to_string(),
            status: TournamentStatus::Published,
            divisions: vec![Division::Ssp, Division::Esp, Division::Co],
            custom_categories: vec![],
            registration_opens_at: now - Duration::days(1),
            registration_closes_at: now + Duration::days(7),
            stages: vec![
                Stage {
                    id: 10,
                    name: "Standards".to_string(),
                    round_count: 12,
                },
                Stage {
                    id: 11,
                    name: "House Call".to_string(),
                    round_count: 18,
                },
            ],
        })
        .await
        .unwrap();
    store
        .insert_squad(&Squad {
            id: 1,
            tournament_id: 1,
            name: "Squad 1".to_string(),
            time_slot: "Saturday 09:00".to_string(),
            max_shooters: 20,
            current_shooters: 0,
            status: SquadStatus::Open,
            assigned_officer: Some(7),
        })
        .await
        .unwrap();

    let store_dyn: Arc<MemoryStore> = store.clone();
    Harness {
        squads: SquadCapacityManager::new(store_dyn.clone()),
        scores: ScoreManager::new(store_dyn.clone()),
        rankings: RankingEngine::new(store_dyn),
        store,
    }
}

impl Harness {
    async fn register(
        &self,
        shooter_id: i64,
        division: Division,
        classification: Classification,
    ) {
        self.squads
            .register(RegistrationRequest {
                tournament_id: 1,
                shooter_id,
                squad_id: 1,
                division,
                classification,
                custom_categories: vec![],
            })
            .await
            .unwrap();
    }

    async fn score(&self, shooter_id: i64, stage_id: i64, time: f64, dnf: bool) -> i64 {
        self.scores
            .submit_score(ScoreSubmission {
                stage_id,
                shooter_id,
                strings: vec![ScoreString {
                    time,
                    hits: HitCounts {
                        down0: 12,
                        ..Default::default()
                    },
                }],
                penalties: PenaltySet::default(),
                dnf,
                dq: false,
                scored_by: 7,
            })
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_submitted_score_carries_recomputed_breakdown() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;

    // One 10 second string, eight down-zero and two down-one.
    let id = h
        .scores
        .submit_score(ScoreSubmission {
            stage_id: 10,
            shooter_id: 100,
            strings: vec![ScoreString {
                time: 10.0,
                hits: HitCounts {
                    down0: 8,
                    down1: 2,
                    ..Default::default()
                },
            }],
            penalties: PenaltySet::default(),
            dnf: false,
            dq: false,
            scored_by: 7,
        })
        .await
        .unwrap();

    let score = h.store.score(id).await.unwrap().unwrap();
    assert_eq!(score.raw_time, 10.0);
    assert_eq!(score.points_down, 2);
    assert_eq!(score.penalty_time, 0.0);
    assert_eq!(score.final_time, 12.0);
    assert_eq!(score.division, Division::Ssp);
    assert_eq!(score.squad_id, 1);
}

#[tokio::test]
async fn test_rescoring_overwrites_the_single_row() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;

    let first = h.score(100, 10, 15.0, false).await;
    let second = h.score(100, 10, 14.0, false).await;
    assert_eq!(first, second);

    let scores = h.store.find_scores_by_stages(&[10]).await.unwrap();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].final_time, 14.0);
}

#[tokio::test]
async fn test_submit_requires_active_registration() {
    let h = setup().await;
    let err = h
        .scores
        .submit_score(ScoreSubmission {
            stage_id: 10,
            shooter_id: 999,
            strings: vec![],
            penalties: PenaltySet::default(),
            dnf: false,
            dq: false,
            scored_by: 7,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::ShooterNotRegistered { .. }));
}

#[tokio::test]
async fn test_unknown_stage_is_rejected() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    let err = h
        .scores
        .submit_score(ScoreSubmission {
            stage_id: 99,
            shooter_id: 100,
            strings: vec![],
            penalties: PenaltySet::default(),
            dnf: false,
            dq: false,
            scored_by: 7,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::StageNotFound(99)));
}

#[tokio::test]
async fn test_hits_beyond_stage_round_count_are_rejected() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;

    let err = h
        .scores
        .submit_score(ScoreSubmission {
            stage_id: 10,
            shooter_id: 100,
            strings: vec![ScoreString {
                time: 9.0,
                hits: HitCounts {
                    down0: 13,
                    ..Default::default()
                },
            }],
            penalties: PenaltySet::default(),
            dnf: false,
            dq: false,
            scored_by: 7,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::InvalidScoreInput { .. }));

    // Nothing was stored.
    assert!(h.store.find_scores_by_stages(&[10]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_score_recomputes_derived_fields() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    let id = h.score(100, 10, 15.0, false).await;

    let updated = h
        .scores
        .update_score(
            id,
            ScoreUpdate {
                strings: vec![ScoreString {
                    time: 11.0,
                    hits: HitCounts {
                        down0: 10,
                        down3: 1,
                        miss: 1,
                        ..Default::default()
                    },
                }],
                penalties: PenaltySet {
                    procedural: 1,
                    ..Default::default()
                },
                dnf: false,
                dq: false,
                scored_by: 8,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.raw_time, 11.0);
    assert_eq!(updated.points_down, 8);
    assert_eq!(updated.penalty_time, 3.0);
    assert_eq!(updated.final_time, 22.0);
    assert_eq!(updated.scored_by, 8);
}

#[tokio::test]
async fn test_leaderboard_orders_finishers_and_buries_dnf() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    h.register(101, Division::Ssp, Classification::Expert).await;
    h.register(102, Division::Co, Classification::Marksman).await;
    h.register(103, Division::Ssp, Classification::Marksman).await;

    h.score(100, 10, 20.0, false).await;
    h.score(101, 10, 30.0, false).await;
    h.score(102, 10, 25.0, false).await;
    // Fastest raw time but DNF: ranks after everyone.
    h.score(103, 10, 5.0, true).await;

    let overall = h
        .rankings
        .leaderboard(1, LeaderboardFilter::default())
        .await
        .unwrap();
    let order: Vec<i64> = overall.iter().map(|e| e.shooter_id).collect();
    assert_eq!(order, vec![100, 102, 101, 103]);
    assert_eq!(overall[0].rank, 1);
    assert!(overall[3].dnf);
    assert_eq!(overall[3].rank, 4);

    let ssp_only = h
        .rankings
        .leaderboard(
            1,
            LeaderboardFilter {
                division: Some(Division::Ssp),
                classification: None,
            },
        )
        .await
        .unwrap();
    let ssp_order: Vec<i64> = ssp_only.iter().map(|e| e.shooter_id).collect();
    assert_eq!(ssp_order, vec![100, 101, 103]);
    // Division ranks, not overall positions.
    assert_eq!(ssp_only[0].rank, 1);
    assert_eq!(ssp_only[1].rank, 2);
    assert_eq!(ssp_only[2].rank, 3);
}

#[tokio::test]
async fn test_leaderboard_classification_within_division() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    h.register(101, Division::Ssp, Classification::Marksman).await;
    h.register(102, Division::Ssp, Classification::Expert).await;

    h.score(100, 10, 22.0, false).await;
    h.score(101, 10, 18.0, false).await;
    h.score(102, 10, 20.0, false).await;

    let marksmen = h
        .rankings
        .leaderboard(
            1,
            LeaderboardFilter {
                division: Some(Division::Ssp),
                classification: Some(Classification::Marksman),
            },
        )
        .await
        .unwrap();
    assert_eq!(marksmen.len(), 2);
    assert_eq!(marksmen[0].shooter_id, 101);
    assert_eq!(marksmen[0].rank, 1);
    assert_eq!(marksmen[1].shooter_id, 100);
    assert_eq!(marksmen[1].rank, 2);
}

#[tokio::test]
async fn test_match_results_track_completion() -> anyhow::Result<()> {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    h.score(100, 10, 20.0, false).await;

    let results = h.rankings.compute_match_results(1).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].completed_stages, 1);
    assert_eq!(results[0].total_stages, 2);
    assert_eq!(results[0].completion_percent(), 50.0);

    h.score(100, 11, 21.0, false).await;
    let results = h.rankings.compute_match_results(1).await?;
    assert_eq!(results[0].completed_stages, 2);
    assert_eq!(results[0].completion_percent(), 100.0);
    assert_eq!(results[0].final_score, 41.0);
    Ok(())
}

#[tokio::test]
async fn test_ranking_recompute_reflects_rescore() {
    let h = setup().await;
    h.register(100, Division::Ssp, Classification::Marksman).await;
    h.register(101, Division::Ssp, Classification::Marksman).await;
    h.score(100, 10, 20.0, false).await;
    h.score(101, 10, 25.0, false).await;

    let before = h
        .rankings
        .leaderboard(1, LeaderboardFilter::default())
        .await
        .unwrap();
    assert_eq!(before[0].shooter_id, 100);

    // A correction flips the order; the next read reflects it wholesale.
    h.score(101, 10, 15.0, false).await;
    let after = h
        .rankings
        .leaderboard(1, LeaderboardFilter::default())
        .await
        .unwrap();
    assert_eq!(after[0].shooter_id, 101);
    assert_eq!(after[1].shooter_id, 100);
}
