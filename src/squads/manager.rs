//! Squad capacity manager.
//!
//! All squad and registration mutations go through this manager. Each squad
//! has a critical section (an async lock held for the duration of the
//! mutation), and the store's `try_reserve_slot` only increments while spare
//! capacity exists, so the capacity invariant holds even across manager
//! instances sharing one store. Compound operations acquire squad locks in
//! ascending id order.

use super::errors::{RegistrationError, RegistrationResult};
use super::models::{
    PaymentStatus, Registration, RegistrationId, RegistrationRequest, RegistrationStatus, Squad,
    SquadId, SquadStatus,
};
use crate::db::repository::{MatchStore, StoreError};
use crate::tournament::{Classification, Division, UserId};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Per-squad critical sections. The registry itself is shared between
/// clones of the manager so every caller contends on the same locks.
#[derive(Clone, Default)]
struct SquadLocks {
    inner: Arc<StdMutex<HashMap<SquadId, Arc<Mutex<()>>>>>,
}

impl SquadLocks {
    fn for_squad(&self, squad_id: SquadId) -> Arc<Mutex<()>> {
        self.inner
            .lock()
            .unwrap()
            .entry(squad_id)
            .or_default()
            .clone()
    }
}

/// Squad capacity manager
#[derive(Clone)]
pub struct SquadCapacityManager {
    store: Arc<dyn MatchStore>,
    locks: SquadLocks,
}

impl SquadCapacityManager {
    /// Create a new capacity manager over a store
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            locks: SquadLocks::default(),
        }
    }

    /// Register a shooter into a squad.
    ///
    /// If the squad has spare capacity the registration is created as
    /// `registered` and the squad counter is incremented atomically with the
    /// capacity check; otherwise it is created as `waitlist` with no
    /// capacity change.
    ///
    /// # Errors
    ///
    /// * `TournamentClosed` - outside the window or not published
    /// * `DivisionNotAllowed` - division not offered
    /// * `InvalidCategory` - unknown custom category id
    /// * `AlreadyRegistered` - an active registration exists
    /// * `SquadClosed` - squad manually closed
    pub async fn register(&self, request: RegistrationRequest) -> RegistrationResult<Registration> {
        let tournament = self
            .store
            .tournament(request.tournament_id)
            .await?
            .ok_or(RegistrationError::TournamentNotFound(request.tournament_id))?;

        let now = Utc::now();
        if !tournament.is_registration_open(now) {
            return Err(RegistrationError::TournamentClosed(tournament.id));
        }
        if !tournament.allows(request.division) {
            return Err(RegistrationError::DivisionNotAllowed(request.division));
        }
        for category in &request.custom_categories {
            if !tournament.has_category(category) {
                return Err(RegistrationError::InvalidCategory(category.clone()));
            }
        }

        let lock = self.locks.for_squad(request.squad_id);
        let _guard = lock.lock().await;

        let squad = self
            .store
            .squad(request.squad_id)
            .await?
            .filter(|s| s.tournament_id == request.tournament_id)
            .ok_or(RegistrationError::SquadNotFound(request.squad_id))?;
        if squad.status == SquadStatus::Closed {
            return Err(RegistrationError::SquadClosed(squad.id));
        }

        if self
            .store
            .find_active_by_shooter(tournament.id, request.shooter_id)
            .await?
            .is_some()
        {
            return Err(RegistrationError::AlreadyRegistered {
                shooter_id: request.shooter_id,
                tournament_id: tournament.id,
            });
        }

        let seated = self.store.try_reserve_slot(squad.id).await?;
        let status = if seated {
            RegistrationStatus::Registered
        } else {
            RegistrationStatus::Waitlist
        };

        let mut registration = Registration {
            id: 0,
            tournament_id: tournament.id,
            shooter_id: request.shooter_id,
            squad_id: squad.id,
            division: request.division,
            classification: request.classification,
            status,
            payment_status: PaymentStatus::Unpaid,
            custom_categories: request.custom_categories,
            registered_at: now,
            checked_in_at: None,
        };

        registration.id = match self.store.insert_registration(&registration).await {
            Ok(id) => id,
            Err(e) => {
                // Undo the reservation so a failed insert cannot leak a slot.
                if seated {
                    self.store.release_slot(squad.id).await?;
                }
                return Err(match e {
                    StoreError::AlreadyExists(_) => RegistrationError::AlreadyRegistered {
                        shooter_id: request.shooter_id,
                        tournament_id: tournament.id,
                    },
                    other => other.into(),
                });
            }
        };

        log::info!(
            "Registered shooter {} on squad {} as {:?}",
            registration.shooter_id,
            registration.squad_id,
            registration.status
        );
        Ok(registration)
    }

    /// Cancel a registration. Cancelling a slot-holding registration frees
    /// the slot and promotes from the waitlist.
    ///
    /// # Errors
    ///
    /// * `NotOwner` - requester is not the registrant
    /// * `TournamentLocked` - match already started or finished
    pub async fn cancel(
        &self,
        registration_id: RegistrationId,
        requested_by: UserId,
    ) -> RegistrationResult<Registration> {
        let registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        if registration.shooter_id != requested_by {
            return Err(RegistrationError::NotOwner {
                registration_id,
                user_id: requested_by,
            });
        }

        let tournament = self
            .store
            .tournament(registration.tournament_id)
            .await?
            .ok_or(RegistrationError::TournamentNotFound(
                registration.tournament_id,
            ))?;
        if tournament.status.is_locked() {
            return Err(RegistrationError::TournamentLocked(tournament.status));
        }

        let lock = self.locks.for_squad(registration.squad_id);
        let _guard = lock.lock().await;

        // Reload inside the critical section; a concurrent promotion may
        // have flipped a waitlisted registration to registered.
        let mut registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        if matches!(
            registration.status,
            RegistrationStatus::Cancelled | RegistrationStatus::Completed
        ) {
            return Err(RegistrationError::InvalidRegistrationStatus {
                expected: RegistrationStatus::Registered,
                actual: registration.status,
            });
        }

        let held_slot = registration.status.holds_slot();
        registration.status = RegistrationStatus::Cancelled;
        self.store.update_registration(&registration).await?;

        if held_slot {
            self.store.release_slot(registration.squad_id).await?;
            self.promote_locked(registration.squad_id).await?;
        }

        log::info!(
            "Cancelled registration {} (shooter {})",
            registration.id,
            registration.shooter_id
        );
        Ok(registration)
    }

    /// Move a `registered` registration to another squad of the same
    /// tournament. The target slot is reserved before the source slot is
    /// released, so the operation is all-or-nothing; the freed source slot
    /// then promotes from its waitlist.
    ///
    /// # Errors
    ///
    /// * `TargetFull` / `TargetClosed` - no room in the target squad
    /// * `InvalidRegistrationStatus` - only `registered` entries transfer
    pub async fn transfer(
        &self,
        registration_id: RegistrationId,
        new_squad_id: SquadId,
        requested_by: UserId,
    ) -> RegistrationResult<Registration> {
        let registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        if registration.shooter_id != requested_by {
            return Err(RegistrationError::NotOwner {
                registration_id,
                user_id: requested_by,
            });
        }
        if registration.squad_id == new_squad_id {
            return Ok(registration);
        }

        let tournament = self
            .store
            .tournament(registration.tournament_id)
            .await?
            .ok_or(RegistrationError::TournamentNotFound(
                registration.tournament_id,
            ))?;
        if tournament.status.is_locked() {
            return Err(RegistrationError::TournamentLocked(tournament.status));
        }

        // Ascending-id lock order prevents deadlock between two transfers
        // crossing in opposite directions.
        let old_squad_id = registration.squad_id;
        let (first, second) = if old_squad_id < new_squad_id {
            (old_squad_id, new_squad_id)
        } else {
            (new_squad_id, old_squad_id)
        };
        let first_lock = self.locks.for_squad(first);
        let _first_guard = first_lock.lock().await;
        let second_lock = self.locks.for_squad(second);
        let _second_guard = second_lock.lock().await;

        let mut registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        if registration.status != RegistrationStatus::Registered {
            return Err(RegistrationError::InvalidRegistrationStatus {
                expected: RegistrationStatus::Registered,
                actual: registration.status,
            });
        }

        let target = self
            .store
            .squad(new_squad_id)
            .await?
            .filter(|s| s.tournament_id == registration.tournament_id)
            .ok_or(RegistrationError::SquadNotFound(new_squad_id))?;
        if target.status == SquadStatus::Closed {
            return Err(RegistrationError::TargetClosed(target.id));
        }
        if !self.store.try_reserve_slot(target.id).await? {
            return Err(RegistrationError::TargetFull(target.id));
        }

        registration.squad_id = new_squad_id;
        if let Err(e) = self.store.update_registration(&registration).await {
            // Give back the reserved target slot before surfacing the error.
            self.store.release_slot(new_squad_id).await?;
            return Err(e.into());
        }

        self.store.release_slot(old_squad_id).await?;
        self.promote_locked(old_squad_id).await?;

        log::info!(
            "Transferred registration {} from squad {} to squad {}",
            registration.id,
            old_squad_id,
            new_squad_id
        );
        Ok(registration)
    }

    /// Check a shooter in at the match, optionally correcting division or
    /// classification against what the operator verified at the door.
    pub async fn check_in(
        &self,
        registration_id: RegistrationId,
        verify_division: Option<Division>,
        verify_classification: Option<Classification>,
    ) -> RegistrationResult<Registration> {
        let registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;

        let lock = self.locks.for_squad(registration.squad_id);
        let _guard = lock.lock().await;

        let mut registration = self
            .store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))?;
        match registration.status {
            RegistrationStatus::Registered => {}
            RegistrationStatus::CheckedIn => {
                return Err(RegistrationError::AlreadyCheckedIn(registration_id));
            }
            actual => {
                return Err(RegistrationError::InvalidRegistrationStatus {
                    expected: RegistrationStatus::Registered,
                    actual,
                });
            }
        }

        if let Some(division) = verify_division {
            let tournament = self
                .store
                .tournament(registration.tournament_id)
                .await?
                .ok_or(RegistrationError::TournamentNotFound(
                    registration.tournament_id,
                ))?;
            if !tournament.allows(division) {
                return Err(RegistrationError::DivisionNotAllowed(division));
            }
            registration.division = division;
        }
        if let Some(classification) = verify_classification {
            registration.classification = classification;
        }

        registration.status = RegistrationStatus::CheckedIn;
        registration.checked_in_at = Some(Utc::now());
        self.store.update_registration(&registration).await?;

        log::info!(
            "Checked in registration {} (shooter {})",
            registration.id,
            registration.shooter_id
        );
        Ok(registration)
    }

    /// Manually close a squad. Existing registrations keep their slots; new
    /// registrations are rejected and the waitlist stops promoting.
    pub async fn close_squad(&self, squad_id: SquadId) -> RegistrationResult<Squad> {
        let lock = self.locks.for_squad(squad_id);
        let _guard = lock.lock().await;

        let mut squad = self
            .store
            .squad(squad_id)
            .await?
            .ok_or(RegistrationError::SquadNotFound(squad_id))?;
        squad.status = SquadStatus::Closed;
        self.store.update_squad(&squad).await?;
        log::info!("Closed squad {squad_id}");
        Ok(squad)
    }

    /// Reopen a manually closed squad and re-evaluate the waitlist.
    pub async fn open_squad(&self, squad_id: SquadId) -> RegistrationResult<Squad> {
        let lock = self.locks.for_squad(squad_id);
        let _guard = lock.lock().await;

        let mut squad = self
            .store
            .squad(squad_id)
            .await?
            .ok_or(RegistrationError::SquadNotFound(squad_id))?;
        squad.status = SquadStatus::Open;
        squad.recompute_status();
        self.store.update_squad(&squad).await?;
        self.promote_locked(squad_id).await?;

        log::info!("Reopened squad {squad_id}");
        self.squad(squad_id).await
    }

    /// Change a squad's capacity. Growing it re-evaluates the waitlist;
    /// shrinking below the seated count is rejected.
    ///
    /// # Errors
    ///
    /// * `CapacityBelowCurrent` - `max_shooters` would drop below the
    ///   seated count
    pub async fn set_capacity(
        &self,
        squad_id: SquadId,
        max_shooters: u32,
    ) -> RegistrationResult<Squad> {
        let lock = self.locks.for_squad(squad_id);
        let _guard = lock.lock().await;

        let mut squad = self
            .store
            .squad(squad_id)
            .await?
            .ok_or(RegistrationError::SquadNotFound(squad_id))?;
        if max_shooters < squad.current_shooters {
            return Err(RegistrationError::CapacityBelowCurrent {
                requested: max_shooters,
                current: squad.current_shooters,
            });
        }

        squad.max_shooters = max_shooters;
        squad.recompute_status();
        self.store.update_squad(&squad).await?;
        self.promote_locked(squad_id).await?;

        log::info!("Squad {squad_id} capacity set to {max_shooters}");
        self.squad(squad_id).await
    }

    /// Rebuild a squad's counter from its slot-holding registrations.
    ///
    /// Recovery path: after a crash between a counter write and its
    /// registration write, the registrations are the source of truth and the
    /// counter is re-derived from them. Ends with a waitlist re-evaluation.
    pub async fn reconcile_squad(&self, squad_id: SquadId) -> RegistrationResult<Squad> {
        let lock = self.locks.for_squad(squad_id);
        let _guard = lock.lock().await;

        let mut squad = self
            .store
            .squad(squad_id)
            .await?
            .ok_or(RegistrationError::SquadNotFound(squad_id))?;

        let mut seated = 0u32;
        for status in [
            RegistrationStatus::Registered,
            RegistrationStatus::CheckedIn,
            RegistrationStatus::Completed,
        ] {
            seated += self
                .store
                .find_by_squad_and_status(squad_id, status)
                .await?
                .len() as u32;
        }

        if seated != squad.current_shooters {
            log::warn!(
                "Squad {} counter was {}, reconciled to {}",
                squad_id,
                squad.current_shooters,
                seated
            );
        }
        squad.current_shooters = seated;
        squad.recompute_status();
        self.store.update_squad(&squad).await?;
        self.promote_locked(squad_id).await?;

        self.squad(squad_id).await
    }

    /// Fetch a squad.
    pub async fn squad(&self, squad_id: SquadId) -> RegistrationResult<Squad> {
        self.store
            .squad(squad_id)
            .await?
            .ok_or(RegistrationError::SquadNotFound(squad_id))
    }

    /// Fetch a registration.
    pub async fn registration(
        &self,
        registration_id: RegistrationId,
    ) -> RegistrationResult<Registration> {
        self.store
            .registration(registration_id)
            .await?
            .ok_or(RegistrationError::RegistrationNotFound(registration_id))
    }

    /// Promote waitlisted shooters while spare capacity remains, earliest
    /// `registered_at` first, ties by registration id. Must be called with
    /// the squad's lock held.
    async fn promote_locked(&self, squad_id: SquadId) -> RegistrationResult<u32> {
        let mut promoted = 0;
        loop {
            let squad = self
                .store
                .squad(squad_id)
                .await?
                .ok_or(RegistrationError::SquadNotFound(squad_id))?;
            if squad.status == SquadStatus::Closed || !squad.has_capacity() {
                break;
            }

            let mut waiting = self
                .store
                .find_by_squad_and_status(squad_id, RegistrationStatus::Waitlist)
                .await?;
            if waiting.is_empty() {
                break;
            }
            waiting.sort_by(|a, b| {
                a.registered_at
                    .cmp(&b.registered_at)
                    .then(a.id.cmp(&b.id))
            });
            let mut next = waiting.remove(0);

            if !self.store.try_reserve_slot(squad_id).await? {
                break;
            }
            next.status = RegistrationStatus::Registered;
            if let Err(e) = self.store.update_registration(&next).await {
                self.store.release_slot(squad_id).await?;
                return Err(e.into());
            }

            log::info!(
                "Promoted registration {} (shooter {}) from the squad {} waitlist",
                next.id,
                next.shooter_id,
                squad_id
            );
            promoted += 1;
        }
        Ok(promoted)
    }
}
