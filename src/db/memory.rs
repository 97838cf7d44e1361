//! In-memory store backend.
//!
//! A lock-protected implementation of the repository traits for tests and
//! single-process deployments. Unlike a mock this is a complete backend: the
//! guarded counter operations uphold the same invariants as the SQL backend,
//! and every compound write happens under one lock so partially-applied
//! state is never observable.
//!
//! The instance is explicitly constructed and passed by reference to
//! whatever owns it; there is no global.

use super::repository::{
    ProfileStore, QueueStore, RegistrationStore, ScoreStore, SquadStore, StoreError, StoreResult,
    TournamentStore,
};
use crate::scoring::models::{ScoreId, StageScore};
use crate::squads::models::{
    Registration, RegistrationId, RegistrationStatus, Squad, SquadId, SquadStatus,
};
use crate::sync::models::{OfflineQueueItem, QueueItemId, QueueItemStatus, SyncStatus};
use crate::tournament::{ShooterId, StageId, Tournament, TournamentId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
struct State {
    tournaments: HashMap<TournamentId, Tournament>,
    squads: HashMap<SquadId, Squad>,
    registrations: HashMap<RegistrationId, Registration>,
    scores: HashMap<ScoreId, StageScore>,
    queue: HashMap<QueueItemId, OfflineQueueItem>,
    profiles: HashMap<UserId, serde_json::Value>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory match store
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicU32,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1,
                ..Default::default()
            }),
            fail_writes: AtomicU32::new(0),
        }
    }

    /// Make the next `n` domain write operations fail with
    /// `StoreError::Unavailable`. Lets tests exercise the offline queue's
    /// transient-error and retry-ceiling paths without a network. Queue
    /// bookkeeping writes are exempt: the queue is the durable local side,
    /// while injected faults model the unreachable backend.
    pub fn fail_next_writes(&self, n: u32) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    fn write_fault(&self) -> StoreResult<()> {
        let took = self
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took {
            Err(StoreError::Unavailable("injected write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TournamentStore for MemoryStore {
    async fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.state.lock().unwrap().tournaments.get(&id).cloned())
    }

    async fn tournament_by_stage(&self, stage_id: StageId) -> StoreResult<Option<Tournament>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tournaments
            .values()
            .find(|t| t.stage(stage_id).is_some())
            .cloned())
    }

    async fn insert_tournament(&self, tournament: &Tournament) -> StoreResult<TournamentId> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        let id = if tournament.id > 0 {
            tournament.id
        } else {
            state.next_id()
        };
        let mut tournament = tournament.clone();
        tournament.id = id;
        state.tournaments.insert(id, tournament);
        Ok(id)
    }

    async fn update_tournament(&self, tournament: &Tournament) -> StoreResult<()> {
        self.write_fault()?;
        self.state
            .lock()
            .unwrap()
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(())
    }
}

#[async_trait]
impl SquadStore for MemoryStore {
    async fn squad(&self, id: SquadId) -> StoreResult<Option<Squad>> {
        Ok(self.state.lock().unwrap().squads.get(&id).cloned())
    }

    async fn squads_by_tournament(&self, tournament_id: TournamentId) -> StoreResult<Vec<Squad>> {
        let state = self.state.lock().unwrap();
        let mut squads: Vec<Squad> = state
            .squads
            .values()
            .filter(|s| s.tournament_id == tournament_id)
            .cloned()
            .collect();
        squads.sort_by_key(|s| s.id);
        Ok(squads)
    }

    async fn squads_by_officer(&self, officer_id: UserId) -> StoreResult<Vec<Squad>> {
        let state = self.state.lock().unwrap();
        let mut squads: Vec<Squad> = state
            .squads
            .values()
            .filter(|s| s.assigned_officer == Some(officer_id))
            .cloned()
            .collect();
        squads.sort_by_key(|s| s.id);
        Ok(squads)
    }

    async fn insert_squad(&self, squad: &Squad) -> StoreResult<SquadId> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        let id = if squad.id > 0 { squad.id } else { state.next_id() };
        let mut squad = squad.clone();
        squad.id = id;
        state.squads.insert(id, squad);
        Ok(id)
    }

    async fn update_squad(&self, squad: &Squad) -> StoreResult<()> {
        self.write_fault()?;
        self.state
            .lock()
            .unwrap()
            .squads
            .insert(squad.id, squad.clone());
        Ok(())
    }

    async fn try_reserve_slot(&self, squad_id: SquadId) -> StoreResult<bool> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        let Some(squad) = state.squads.get_mut(&squad_id) else {
            return Ok(false);
        };
        if squad.status == SquadStatus::Closed || !squad.has_capacity() {
            return Ok(false);
        }
        squad.current_shooters += 1;
        squad.recompute_status();
        Ok(true)
    }

    async fn release_slot(&self, squad_id: SquadId) -> StoreResult<()> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        if let Some(squad) = state.squads.get_mut(&squad_id) {
            squad.current_shooters = squad.current_shooters.saturating_sub(1);
            squad.recompute_status();
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn registration(&self, id: RegistrationId) -> StoreResult<Option<Registration>> {
        Ok(self.state.lock().unwrap().registrations.get(&id).cloned())
    }

    async fn insert_registration(
        &self,
        registration: &Registration,
    ) -> StoreResult<RegistrationId> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        let duplicate = state.registrations.values().any(|r| {
            r.tournament_id == registration.tournament_id
                && r.shooter_id == registration.shooter_id
                && r.is_active()
        });
        if duplicate {
            return Err(StoreError::AlreadyExists(format!(
                "active registration for shooter {} in tournament {}",
                registration.shooter_id, registration.tournament_id
            )));
        }
        let id = if registration.id > 0 {
            registration.id
        } else {
            state.next_id()
        };
        let mut registration = registration.clone();
        registration.id = id;
        state.registrations.insert(id, registration);
        Ok(id)
    }

    async fn update_registration(&self, registration: &Registration) -> StoreResult<()> {
        self.write_fault()?;
        self.state
            .lock()
            .unwrap()
            .registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn find_active_by_shooter(
        &self,
        tournament_id: TournamentId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<Registration>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .registrations
            .values()
            .find(|r| {
                r.tournament_id == tournament_id && r.shooter_id == shooter_id && r.is_active()
            })
            .cloned())
    }

    async fn find_by_squad_and_status(
        &self,
        squad_id: SquadId,
        status: RegistrationStatus,
    ) -> StoreResult<Vec<Registration>> {
        let state = self.state.lock().unwrap();
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.squad_id == squad_id && r.status == status)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.id);
        Ok(registrations)
    }

    async fn find_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StoreResult<Vec<Registration>> {
        let state = self.state.lock().unwrap();
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| r.id);
        Ok(registrations)
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn score(&self, id: ScoreId) -> StoreResult<Option<StageScore>> {
        Ok(self.state.lock().unwrap().scores.get(&id).cloned())
    }

    async fn find_score_by_stage_and_shooter(
        &self,
        stage_id: StageId,
        shooter_id: ShooterId,
    ) -> StoreResult<Option<StageScore>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .scores
            .values()
            .find(|s| s.stage_id == stage_id && s.shooter_id == shooter_id)
            .cloned())
    }

    async fn upsert_score(&self, score: &StageScore) -> StoreResult<ScoreId> {
        self.write_fault()?;
        let mut state = self.state.lock().unwrap();
        let existing_id = state
            .scores
            .values()
            .find(|s| s.stage_id == score.stage_id && s.shooter_id == score.shooter_id)
            .map(|s| s.id);
        let id = existing_id.unwrap_or_else(|| state.next_id());
        let mut score = score.clone();
        score.id = id;
        state.scores.insert(id, score);
        Ok(id)
    }

    async fn find_scores_by_stages(&self, stage_ids: &[StageId]) -> StoreResult<Vec<StageScore>> {
        let state = self.state.lock().unwrap();
        let mut scores: Vec<StageScore> = state
            .scores
            .values()
            .filter(|s| stage_ids.contains(&s.stage_id))
            .cloned()
            .collect();
        scores.sort_by_key(|s| s.id);
        Ok(scores)
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    async fn insert_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        self.state
            .lock()
            .unwrap()
            .queue
            .insert(item.id, item.clone());
        Ok(())
    }

    async fn queue_item(&self, id: QueueItemId) -> StoreResult<Option<OfflineQueueItem>> {
        Ok(self.state.lock().unwrap().queue.get(&id).cloned())
    }

    async fn update_queue_item(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        self.state
            .lock()
            .unwrap()
            .queue
            .insert(item.id, item.clone());
        Ok(())
    }

    async fn pending_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<OfflineQueueItem> = state
            .queue
            .values()
            .filter(|i| i.user_id == user_id && i.status == QueueItemStatus::Pending)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn user_items(&self, user_id: UserId) -> StoreResult<Vec<OfflineQueueItem>> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<OfflineQueueItem> = state
            .queue
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.queue.len();
        state
            .queue
            .retain(|_, i| !(i.status == QueueItemStatus::Completed && i.created_at < cutoff));
        Ok((before - state.queue.len()) as u64)
    }

    async fn status_counts(&self, user_id: UserId) -> StoreResult<SyncStatus> {
        let state = self.state.lock().unwrap();
        let mut counts = SyncStatus::default();
        for item in state.queue.values().filter(|i| i.user_id == user_id) {
            match item.status {
                QueueItemStatus::Pending => counts.pending += 1,
                QueueItemStatus::Processing => counts.processing += 1,
                QueueItemStatus::Completed => counts.completed += 1,
                QueueItemStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn upsert_profile(&self, user_id: UserId, profile: serde_json::Value) -> StoreResult<()> {
        self.write_fault()?;
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(user_id, profile);
        Ok(())
    }

    async fn profile(&self, user_id: UserId) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.state.lock().unwrap().profiles.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squads::models::{PaymentStatus, SquadStatus};
    use crate::tournament::{Classification, Division, TournamentStatus};

    fn squad(id: SquadId, max: u32) -> Squad {
        Squad {
            id,
            tournament_id: 1,
            name: format!("Squad {id}"),
            time_slot: "09:00".to_string(),
            max_shooters: max,
            current_shooters: 0,
            status: SquadStatus::Open,
            assigned_officer: None,
        }
    }

    fn registration(id: RegistrationId, shooter_id: ShooterId) -> Registration {
        Registration {
            id,
            tournament_id: 1,
            shooter_id,
            squad_id: 1,
            division: Division::Ssp,
            classification: Classification::Marksman,
            status: RegistrationStatus::Registered,
            payment_status: PaymentStatus::Unpaid,
            custom_categories: vec![],
            registered_at: Utc::now(),
            checked_in_at: None,
        }
    }

    #[tokio::test]
    async fn test_reserve_stops_at_capacity() {
        let store = MemoryStore::new();
        store.insert_squad(&squad(1, 2)).await.unwrap();

        assert!(store.try_reserve_slot(1).await.unwrap());
        assert!(store.try_reserve_slot(1).await.unwrap());
        assert!(!store.try_reserve_slot(1).await.unwrap());

        let squad = store.squad(1).await.unwrap().unwrap();
        assert_eq!(squad.current_shooters, 2);
        assert_eq!(squad.status, SquadStatus::Full);
    }

    #[tokio::test]
    async fn test_release_reopens() {
        let store = MemoryStore::new();
        store.insert_squad(&squad(1, 1)).await.unwrap();
        assert!(store.try_reserve_slot(1).await.unwrap());
        store.release_slot(1).await.unwrap();

        let squad = store.squad(1).await.unwrap().unwrap();
        assert_eq!(squad.current_shooters, 0);
        assert_eq!(squad.status, SquadStatus::Open);
    }

    #[tokio::test]
    async fn test_closed_squad_never_reserves() {
        let store = MemoryStore::new();
        let mut s = squad(1, 5);
        s.status = SquadStatus::Closed;
        store.insert_squad(&s).await.unwrap();
        assert!(!store.try_reserve_slot(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_active_registration_rejected() {
        let store = MemoryStore::new();
        store.insert_registration(&registration(0, 100)).await.unwrap();
        let err = store
            .insert_registration(&registration(0, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_cancelled_registration_frees_natural_key() {
        let store = MemoryStore::new();
        let id = store.insert_registration(&registration(0, 100)).await.unwrap();
        let mut first = store.registration(id).await.unwrap().unwrap();
        first.status = RegistrationStatus::Cancelled;
        store.update_registration(&first).await.unwrap();

        assert!(store.insert_registration(&registration(0, 100)).await.is_ok());
    }

    #[tokio::test]
    async fn test_fail_next_writes_is_transient() {
        let store = MemoryStore::new();
        store.fail_next_writes(1);
        let err = store.insert_squad(&squad(1, 2)).await.unwrap_err();
        assert!(err.is_transient());
        // Budget consumed; the next write goes through.
        assert!(store.insert_squad(&squad(1, 2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_tournament_by_stage() {
        let store = MemoryStore::new();
        let tournament = Tournament {
            id: 1,
            name: "T".to_string(),
            status: TournamentStatus::Published,
            divisions: vec![Division::Ssp],
            custom_categories: vec![],
            registration_opens_at: Utc::now(),
            registration_closes_at: Utc::now(),
            stages: vec![crate::tournament::Stage {
                id: 42,
                name: "S".to_string(),
                round_count: 10,
            }],
        };
        store.insert_tournament(&tournament).await.unwrap();
        assert!(store.tournament_by_stage(42).await.unwrap().is_some());
        assert!(store.tournament_by_stage(43).await.unwrap().is_none());
    }
}
