//! PostgreSQL store backend.
//!
//! Expects the schema shipped with the deployment (tables `tournaments`,
//! `squads`, `registrations`, `stage_scores`, `sync_queue`, `profiles`).
//! Composite documents (stages, score strings, penalties, queue payloads)
//! live in JSONB columns; the contended squad counter is a plain integer
//! mutated only through single-statement conditional UPDATEs, and the
//! one-active-registration rule is backed by a partial unique index on
//! `(tournament_id, shooter_id) WHERE status != 'cancelled'`.

use super::repository::{
    ProfileStore, QueueStore, RegistrationStore, ScoreStore, SquadStore, StoreError, StoreResult,
    TournamentStore,
};
use crate::scoring::models::{PenaltySet, ScoreId, ScoreString, StageScore};
use crate::squads::models::{
    PaymentStatus, Registration, RegistrationId, RegistrationStatus, Squad, SquadId, SquadStatus,
};
use crate::sync::models::{OfflineQueueItem, QueueAction, QueueItemId, QueueItemStatus, SyncStatus};
use crate::tournament::{
    Classification, Division, ShooterId, StageId, Tournament, TournamentId, TournamentStatus,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// PostgreSQL match store
#[derive(Clone)]
pub struct PgMatchStore {
    pool: Arc<PgPool>,
}

impl PgMatchStore {
    /// Create a new store over a connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn map_unique(e: sqlx::Error, what: impl Into<String>) -> StoreError {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::AlreadyExists(what.into())
            }
            _ => StoreError::Database(e),
        }
    }
}

fn tournament_from_row(row: &PgRow) -> StoreResult<Tournament> {
    let divisions: Vec<Division> = serde_json::from_value(row.get("divisions"))?;
    let custom_categories = serde_json::from_value(row.get("custom_categories"))?;
    let stages = serde_json::from_value(row.get("stages"))?;
    let status: String = row.get("status");
    Ok(Tournament {
        id: row.get("id"),
        name: row.get("name"),
        status: TournamentStatus::parse(&status).unwrap_or(TournamentStatus::Draft),
        divisions,
        custom_categories,
        registration_opens_at: row
            .get::<chrono::NaiveDateTime, _>("registration_opens_at")
            .and_utc(),
        registration_closes_at: row
            .get::<chrono::NaiveDateTime, _>("registration_closes_at")
            .and_utc(),
        stages,
    })
}

fn squad_from_row(row: &PgRow) -> Squad {
    let status: String = row.get("status");
    Squad {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        name: row.get("name"),
        time_slot: row.get("time_slot"),
        max_shooters: row.get::<i32, _>("max_shooters") as u32,
        current_shooters: row.get::<i32, _>("current_shooters") as u32,
        status: SquadStatus::parse(&status).unwrap_or(SquadStatus::Open),
        assigned_officer: row.get("assigned_officer"),
    }
}

fn registration_from_row(row: &PgRow) -> StoreResult<Registration> {
    let division: String = row.get("division");
    let classification: String = row.get("classification");
    let status: String = row.get("status");
    let payment_status: String = row.get("payment_status");
    Ok(Registration {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        shooter_id: row.get("shooter_id"),
        squad_id: row.get("squad_id"),
        division: Division::parse(&division).unwrap_or(Division::Ssp),
        classification: Classification::parse(&classification)
            .unwrap_or(Classification::Unclassified),
        status: RegistrationStatus::parse(&status).unwrap_or(RegistrationStatus::Registered),
        payment_status: PaymentStatus::parse(&payment_status).unwrap_or(PaymentStatus::Unpaid),
        custom_categories: serde_json::from_value(row.get("custom_categories"))?,
        registered_at: row
            .get::<chrono::NaiveDateTime, _>("registered_at")
            .and_utc(),
        checked_in_at: row
            .get::<Option<chrono::NaiveDateTime>, _>("checked_in_at")
            .map(|dt| dt.and_utc()),
    })
}

fn score_from_row(row: &PgRow) -> StoreResult<StageScore> {
    let division: String = row.get("division");
    let classification: String = row.get("classification");
    let strings: Vec<ScoreString> = serde_json::from_value(row.get("strings"))?;
    let penalties: PenaltySet = serde_json::from_value(row.get("penalties"))?;
    Ok(StageScore {
        id: row.get("id"),
        stage_id: row.get("stage_id"),
        shooter_id: row.get("shooter_id"),
        squad_id: row.get("squad_id"),
        division: Division::parse(&division).unwrap_or(Division::Ssp),
        classification: Classification::parse(&classification)
            .unwrap_or(Classification::Unclassified),
        scored_by: row.get("scored_by"),
        strings,
        penalties,
        raw_time: row.get("raw_time"),
        points_down: row.get::<i32, _>("points_down") as u32,
        penalty_time: row.get("penalty_time"),
        final_time: row.get("final_time"),
        stage_points: row.get("stage_points"),
        dnf: row.get("dnf"),
        dq: row.get("dq"),
        scored_at: row.get::<chrono::NaiveDateTime, _>("scored_at").and_utc(),
    })
}

fn queue_item_from_row(row: &PgRow) -> OfflineQueueItem {
    let action: String = row.get("action");
    let status: String = row.get("status");
    OfflineQueueItem {
        id: row.get("id"),
        user_id: row.get("user_id"),
        action: QueueAction::parse(&action).unwrap_or(QueueAction::UpdateProfile),
        payload: row.get("payload"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        retries: row.get::<i32, _>("retries") as u32,
        status: QueueItemStatus::parse(&status).unwrap_or(QueueItemStatus::Pending),
        last_error: row.get("last_error"),
    }
}

#[async_trait]
impl TournamentStore for PgMatchStore {
    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, status, divisions, custom_categories, stages,
                   registration_opens_at, registration_closes_at
            FROM tournaments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| tournament_from_row(&r)).transpose()
    }

    async fn tournament_by_stage(&self, stage_id: StageId) -> StoreResult<Option<Tournament>> {
        // Stages are embedded in the tournament document; the containment
        // probe runs against the JSONB index.
        let row = sqlx::query(
            r#"
            SELECT id, name, status, divisions, custom_categories, stages,
                   registration_opens_at, registration_closes_at
            FROM tournaments
            WHERE stages @> jsonb_build_array(jsonb_build_object('id', $1::bigint))
            "#,
        )
        .bind(stage_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| tournament_from_row(&r)).transpose()
    }

    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<TournamentId> {
        let row = sqlx::query(
            r#"
            INSERT INTO tournaments
                (name, status, divisions, custom_categories, stages,
                 registration_opens_at, registration_closes_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&tournament.name)
        .bind(tournament.status.as_str())
        .bind(serde_json::to_value(&tournament.divisions)?)
        .bind(serde_json::to_value(&tournament.custom_categories)?)
        .bind(serde_json::to_value(&tournament.stages)?)
        .bind(tournament.registration_opens_at.naive_utc())
        .bind(tournament.registration_closes_at.naive_utc())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("id"))
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tournaments
            SET name = $1, status = $2, divisions = $3, custom_categories = $4,
                stages = $5, registration_opens_at = $6, registration_closes_at = $7
            WHERE id = $8
            "#,
        )
        .bind(&tournament.name)
        .bind(tournament.status.as_str())
        .bind(serde_json::to_value(&tournament.divisions)?)
        .bind(serde_json::to_value(&tournament.custom_categories)?)
        .bind(serde_json::to_value(&tournament.stages)?)
        .bind(tournament.registration_opens_at.naive_utc())
        .bind(tournament.registration_closes_at.naive_utc())
        .bind(tournament.id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SquadStore for PgMatchStore {
    async fn squad(&self, id: SquadId) -> StoreResult<Option<Squad>> {
        let row = sqlx::query(
            r#"
            SELECT id, tournament_id, name, time_slot, max_shooters,
                   current_shooters, status, assigned_officer
            FROM squads
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| squad_from_row(&r)))
    }

    async fn squads_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Squad>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, name, time_slot, max_shooters,
                   current_shooters, status, assigned_officer
            FROM squads
            WHERE tournament_id = $1
            ORDER BY id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(squad_from_row).collect())
    }

    async fn squads_by_officer(&self, officer_id: UserId) -> StoreResult<Vec<Squad>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, name, time_slot, max_shooters,
                   current_shooters, status, assigned_officer
            FROM squads
            WHERE assigned_officer = $1
            ORDER BY id
            "#,
        )
        .bind(officer_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(squad_from_row).collect())
    }

    async fn insert_squad(&self, squad: &Squad) -> StoreResult<SquadId> {
        let row = sqlx::query(
            r#"
            INSERT INTO squads
                (tournament_id, name, time_slot, max_shooters, current_shooters,
                 status, assigned_officer)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(squad.tournament_id)
        .bind(&squad.name)
        .bind(&squad.time_slot)
        .bind(squad.max_shooters as i32)
        .bind(squad.current_shooters as i32)
        .bind(squad.status.as_str())
        .bind(squad.assigned_officer)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("id"))
    }

    async fn update_squad(&self, squad: &Squad) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE squads
            SET name = $1, time_slot = $2, max_shooters = $3,
                current_shooters = $4, status = $5, assigned_officer = $6
            WHERE id = $7
            "#,
        )
        .bind(&squad.name)
        .bind(&squad.time_slot)
        .bind(squad.max_shooters as i32)
        .bind(squad.current_shooters as i32)
        .bind(squad.status.as_str())
        .bind(squad.assigned_officer)
        .bind(squad.id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn try_reserve_slot(&self, squad_id: SquadId) -> StoreResult<bool> {
        // Check-and-increment in one statement; two concurrent reservations
        // can never both observe the same spare slot.
        let row = sqlx::query(
            r#"
            UPDATE squads
            SET current_shooters = current_shooters + 1,
                status = CASE
                    WHEN current_shooters + 1 >= max_shooters THEN 'full'
                    ELSE status
                END
            WHERE id = $1
              AND status != 'closed'
              AND current_shooters < max_shooters
            RETURNING current_shooters
            "#,
        )
        .bind(squad_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.is_some())
    }

    async fn release_slot(&self, squad_id: SquadId) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE squads
            SET current_shooters = GREATEST(current_shooters - 1, 0),
                status = CASE WHEN status = 'closed' THEN 'closed' ELSE 'open' END
            WHERE id = $1
            "#,
        )
        .bind(squad_id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for PgMatchStore {
    async fn registration(&self, id: RegistrationId) -> StoreResult<Option<Registration>> {
        let row = sqlx::query(
            r#"
            SELECT id, tournament_id, shooter_id, squad_id, division, classification,
                   status, payment_status, custom_categories, registered_at, checked_in_at
            FROM registrations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| registration_from_row(&r)).transpose()
    }

    async fn insert_registration(
        &self,
        registration: &Registration,
    ) -> StoreResult<RegistrationId> {
        let row = sqlx::query(
            r#"
            INSERT INTO registrations
                (tournament_id, shooter_id, squad_id, division, classification,
                 status, payment_status, custom_categories, registered_at, checked_in_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(registration.tournament_id)
        .bind(registration.shooter_id)
        .bind(registration.squad_id)
        .bind(registration.division.as_str())
        .bind(registration.classification.as_str())
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(serde_json::to_value(&registration.custom_categories)?)
        .bind(registration.registered_at.naive_utc())
        .bind(registration.checked_in_at.map(|dt| dt.naive_utc()))
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| {
            Self::map_unique(
                e,
                format!(
                    "active registration for shooter {} in tournament {}",
                    registration.shooter_id, registration.tournament_id
                ),
            )
        })?;

        Ok(row.get("id"))
    }

    async fn update_registration(&self, registration: &Registration) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE registrations
            SET squad_id = $1, division = $2, classification = $3, status = $4,
                payment_status = $5, custom_categories = $6, checked_in_at = $7
            WHERE id = $8
            "#,
        )
        .bind(registration.squad_id)
        .bind(registration.division.as_str())
        .bind(registration.classification.as_str())
        .bind(registration.status.as_str())
        .bind(registration.payment_status.as_str())
        .bind(serde_json::to_value(&registration.custom_categories)?)
        .bind(registration.checked_in_at.map(|dt| dt.naive_utc()))
        .bind(registration.id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn find_active_by_shooter(
        &self,
        tournament_id: TournamentId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<Registration>> {
        let row = sqlx::query(
            r#"
            SELECT id, tournament_id, shooter_id, squad_id, division, classification,
                   status, payment_status, custom_categories, registered_at, checked_in_at
            FROM registrations
            WHERE tournament_id = $1 AND shooter_id = $2 AND status != 'cancelled'
            "#,
        )
        .bind(tournament_id)
        .bind(shooter_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| registration_from_row(&r)).transpose()
    }

    async fn find_by_squad_and_status(
        &self,
        squad_id: SquadId,
        status: RegistrationStatus,
    ) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, shooter_id, squad_id, division, classification,
                   status, payment_status, custom_categories, registered_at, checked_in_at
            FROM registrations
            WHERE squad_id = $1 AND status = $2
            ORDER BY registered_at, id
            "#,
        )
        .bind(squad_id)
        .bind(status.as_str())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(registration_from_row).collect()
    }

    async fn find_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, shooter_id, squad_id, division, classification,
                   status, payment_status, custom_categories, registered_at, checked_in_at
            FROM registrations
            WHERE tournament_id = $1
            ORDER BY id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(registration_from_row).collect()
    }
}

#[async_trait]
impl ScoreStore for PgMatchStore {
    async fn score(&self, id: ScoreId) -> StoreResult<Option<StageScore>> {
        let row = sqlx::query(
            r#"
            SELECT id, stage_id, shooter_id, squad_id, division, classification,
                   scored_by, strings, penalties, raw_time, points_down, penalty_time,
                   final_time, stage_points, dnf, dq, scored_at
            FROM stage_scores
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| score_from_row(&r)).transpose()
    }

    async fn find_score_by_stage_and_shooter(
        &self,
        stage_id: StageId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<StageScore>> {
        let row = sqlx::query(
            r#"
            SELECT id, stage_id, shooter_id, squad_id, division, classification,
                   scored_by, strings, penalties, raw_time, points_down, penalty_time,
                   final_time, stage_points, dnf, dq, scored_at
            FROM stage_scores
            WHERE stage_id = $1 AND shooter_id = $2
            "#,
        )
        .bind(stage_id)
        .bind(shooter_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| score_from_row(&r)).transpose()
    }

    async fn upsert_score(&self, score: &StageScore) -> StoreResult<ScoreId> {
        let row = sqlx::query(
            r#"
            INSERT INTO stage_scores
                (stage_id, shooter_id, squad_id, division, classification, scored_by,
                 strings, penalties, raw_time, points_down, penalty_time, final_time,
                 stage_points, dnf, dq, scored_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (stage_id, shooter_id)
            DO UPDATE SET
                squad_id = EXCLUDED.squad_id,
                division = EXCLUDED.division,
                classification = EXCLUDED.classification,
                scored_by = EXCLUDED.scored_by,
                strings = EXCLUDED.strings,
                penalties = EXCLUDED.penalties,
                raw_time = EXCLUDED.raw_time,
                points_down = EXCLUDED.points_down,
                penalty_time = EXCLUDED.penalty_time,
                final_time = EXCLUDED.final_time,
                stage_points = EXCLUDED.stage_points,
                dnf = EXCLUDED.dnf,
                dq = EXCLUDED.dq,
                scored_at = EXCLUDED.scored_at
            RETURNING id
            "#,
        )
        .bind(score.stage_id)
        .bind(score.shooter_id)
        .bind(score.squad_id)
        .bind(score.division.as_str())
        .bind(score.classification.as_str())
        .bind(score.scored_by)
        .bind(serde_json::to_value(&score.strings)?)
        .bind(serde_json::to_value(&score.penalties)?)
        .bind(score.raw_time)
        .bind(score.points_down as i32)
        .bind(score.penalty_time)
        .bind(score.final_time)
        .bind(score.stage_points)
        .bind(score.dnf)
        .bind(score.dq)
        .bind(score.scored_at.naive_utc())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.get("id"))
    }

    async fn find_scores_by_stages(&self, stage_ids: &[StageId]) -> StoreResult<Vec<StageScore>> {
        let rows = sqlx::query(
            r#"
            SELECT id, stage_id, shooter_id, squad_id, division, classification,
                   scored_by, strings, penalties, raw_time, points_down, penalty_time,
                   final_time, stage_points, dnf, dq, scored_at
            FROM stage_scores
            WHERE stage_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(stage_ids.to_vec())
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter().map(score_from_row).collect()
    }
}

#[async_trait]
impl QueueStore for PgMatchStore {
    async fn insert_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_queue
                (id, user_id, action, payload, created_at, retries, status, last_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id)
        .bind(item.user_id)
        .bind(item.action.as_str())
        .bind(&item.payload)
        .bind(item.created_at.naive_utc())
        .bind(item.retries as i32)
        .bind(item.status.as_str())
        .bind(&item.last_error)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| Self::map_unique(e, format!("queue item {}", item.id)))?;
        Ok(())
    }

    async fn queue_item(&self, id: QueueItemId) -> StoreResult<Option<OfflineQueueItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, action, payload, created_at, retries, status, last_error
            FROM sync_queue
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(|r| queue_item_from_row(&r)))
    }

    async fn update_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET retries = $1, status = $2, last_error = $3
            WHERE id = $4
            "#,
        )
        .bind(item.retries as i32)
        .bind(item.status.as_str())
        .bind(&item.last_error)
        .bind(item.id)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn pending_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action, payload, created_at, retries, status, last_error
            FROM sync_queue
            WHERE user_id = $1 AND status = 'pending'
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(queue_item_from_row).collect())
    }

    async fn user_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, action, payload, created_at, retries, status, last_error
            FROM sync_queue
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(queue_item_from_row).collect())
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sync_queue WHERE status = 'completed' AND created_at < $1",
        )
        .bind(cutoff.naive_utc())
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected())
    }

    async fn status_counts(&self, user_id: UserId) -> StoreResult<SyncStatus> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM sync_queue
            WHERE user_id = $1
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut counts = SyncStatus::default();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            match QueueItemStatus::parse(&status) {
                Some(QueueItemStatus::Pending) => counts.pending = count as u64,
                Some(QueueItemStatus::Processing) => counts.processing = count as u64,
                Some(QueueItemStatus::Completed) => counts.completed = count as u64,
                Some(QueueItemStatus::Failed) => counts.failed = count as u64,
                None => {}
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ProfileStore for PgMatchStore {
    async fn upsert_profile(&self, user_id: UserId, profile: serde_json::Value) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, document, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(profile)
        .execute(self.pool.as_ref())
        .await?;
        Ok(())
    }

    async fn profile(&self, user_id: UserId) -> StoreResult<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT document FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        Ok(row.map(|r| r.get("document")))
    }
}
