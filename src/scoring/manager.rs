//! Score write path.
//!
//! Every write recomputes derived fields through the calculator, so a stored
//! score is always consistent with its strings and penalties. Conflict
//! resolution and offline replay go through the same methods.

use super::calculator::calculate_breakdown;
use super::errors::{ScoringError, ScoringResult};
use super::models::{ScoreId, ScoreSubmission, ScoreUpdate, StageScore};
use crate::conflict::ScoreVersion;
use crate::db::repository::MatchStore;
use crate::tournament::{ShooterId, StageId};
use chrono::Utc;
use std::sync::Arc;

/// Score manager
#[derive(Clone)]
pub struct ScoreManager {
    store: Arc<dyn MatchStore>,
}

impl ScoreManager {
    /// Create a new score manager
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self { store }
    }

    /// Record a score for a (stage, shooter). If a score already exists it
    /// is overwritten in place, keeping its id.
    ///
    /// # Errors
    ///
    /// * `ScoringError::StageNotFound` - no tournament contains the stage
    /// * `ScoringError::ShooterNotRegistered` - no active registration
    /// * `ScoringError::InvalidScoreInput` - validation failure
    pub async fn submit_score(&self, submission: ScoreSubmission) -> ScoringResult<ScoreId> {
        let tournament = self
            .store
            .tournament_by_stage(submission.stage_id)
            .await?
            .ok_or(ScoringError::StageNotFound(submission.stage_id))?;
        let stage = tournament
            .stage(submission.stage_id)
            .ok_or(ScoringError::StageNotFound(submission.stage_id))?;

        let registration = self
            .store
            .find_active_by_shooter(tournament.id, submission.shooter_id)
            .await?
            .ok_or(ScoringError::ShooterNotRegistered {
                shooter_id: submission.shooter_id,
                tournament_id: tournament.id,
            })?;

        let breakdown =
            calculate_breakdown(&submission.strings, &submission.penalties, stage.round_count)?;

        let existing = self
            .store
            .find_score_by_stage_and_shooter(submission.stage_id, submission.shooter_id)
            .await?;

        let score = StageScore {
            id: existing.as_ref().map(|s| s.id).unwrap_or(0),
            stage_id: submission.stage_id,
            shooter_id: submission.shooter_id,
            squad_id: registration.squad_id,
            division: registration.division,
            classification: registration.classification,
            scored_by: submission.scored_by,
            strings: submission.strings,
            penalties: submission.penalties,
            raw_time: breakdown.raw_time,
            points_down: breakdown.points_down,
            penalty_time: breakdown.penalty_time,
            final_time: breakdown.final_time,
            stage_points: 0.0,
            dnf: submission.dnf,
            dq: submission.dq,
            scored_at: Utc::now(),
        };

        let id = self.store.upsert_score(&score).await?;
        log::info!(
            "Scored stage {} for shooter {}: final time {:.2}",
            score.stage_id,
            score.shooter_id,
            score.final_time
        );
        Ok(id)
    }

    /// Replace the content of an existing score, recomputing derived fields.
    pub async fn update_score(
        &self,
        score_id: ScoreId,
        update: ScoreUpdate,
    ) -> ScoringResult<StageScore> {
        let mut score = self
            .store
            .score(score_id)
            .await?
            .ok_or(ScoringError::ScoreNotFound(score_id))?;

        let tournament = self
            .store
            .tournament_by_stage(score.stage_id)
            .await?
            .ok_or(ScoringError::StageNotFound(score.stage_id))?;
        let stage = tournament
            .stage(score.stage_id)
            .ok_or(ScoringError::StageNotFound(score.stage_id))?;

        let breakdown = calculate_breakdown(&update.strings, &update.penalties, stage.round_count)?;

        score.strings = update.strings;
        score.penalties = update.penalties;
        score.raw_time = breakdown.raw_time;
        score.points_down = breakdown.points_down;
        score.penalty_time = breakdown.penalty_time;
        score.final_time = breakdown.final_time;
        score.dnf = update.dnf;
        score.dq = update.dq;
        score.scored_by = update.scored_by;
        score.scored_at = Utc::now();

        self.store.upsert_score(&score).await?;
        log::info!(
            "Re-scored stage {} for shooter {}: final time {:.2}",
            score.stage_id,
            score.shooter_id,
            score.final_time
        );
        Ok(score)
    }

    /// Fetch a score by id.
    pub async fn score(&self, score_id: ScoreId) -> ScoringResult<Option<StageScore>> {
        Ok(self.store.score(score_id).await?)
    }

    /// Fetch the score for a (stage, shooter), if any.
    pub async fn find_by_stage_and_shooter(
        &self,
        stage_id: StageId,
        shooter_id: ShooterId,
    ) -> ScoringResult<Option<StageScore>> {
        Ok(self
            .store
            .find_score_by_stage_and_shooter(stage_id, shooter_id)
            .await?)
    }

    /// Write a resolved score version for a (stage, shooter) through the
    /// normal write path. Used by conflict resolution so the calculator
    /// recomputes derived fields; resolvers never store those directly.
    pub async fn apply_version(
        &self,
        stage_id: StageId,
        shooter_id: ShooterId,
        version: &ScoreVersion,
    ) -> ScoringResult<StageScore> {
        match self
            .store
            .find_score_by_stage_and_shooter(stage_id, shooter_id)
            .await?
        {
            Some(existing) => {
                self.update_score(
                    existing.id,
                    ScoreUpdate {
                        strings: version.strings.clone(),
                        penalties: version.penalties.clone(),
                        dnf: version.dnf,
                        dq: version.dq,
                        scored_by: version.modified_by,
                    },
                )
                .await
            }
            None => {
                let id = self
                    .submit_score(ScoreSubmission {
                        stage_id,
                        shooter_id,
                        strings: version.strings.clone(),
                        penalties: version.penalties.clone(),
                        dnf: version.dnf,
                        dq: version.dq,
                        scored_by: version.modified_by,
                    })
                    .await?;
                self.store
                    .score(id)
                    .await?
                    .ok_or(ScoringError::ScoreNotFound(id))
            }
        }
    }
}
