//! In-memory actor registry.
//!
//! Each actor owns one [`ActorSlot`]: a read-mostly profile (position, tags,
//! liveness) and a mutex-guarded [`ActorState`] holding its status and effect
//! list. Admission, ticks and dispels for one actor serialize on that mutex;
//! different actors never contend.
//!
//! Condition evaluation only reads profiles, so it never touches the state
//! mutex and may run while another actor's state is locked.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use effect_core::{
    ActorId, ActorProfile, ActorStatus, EffectList, OracleError, Position, WorldOracle,
};

/// Mutable effect state of one actor.
#[derive(Debug)]
pub struct ActorState {
    pub status: ActorStatus,
    pub effects: EffectList,
    /// Set once the actor has been torn down; admissions racing the removal
    /// observe it and back off.
    pub removed: bool,
}

/// Registry entry for one actor.
#[derive(Debug)]
pub struct ActorSlot {
    profile: RwLock<ActorProfile>,
    state: Mutex<ActorState>,
}

impl ActorSlot {
    fn new(profile: ActorProfile) -> Self {
        let id = profile.id;
        Self {
            profile: RwLock::new(profile),
            state: Mutex::new(ActorState {
                status: ActorStatus::new(),
                effects: EffectList::new(id),
                removed: false,
            }),
        }
    }

    /// Snapshot of the current profile.
    pub fn profile(&self) -> ActorProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_profile(&self, update: impl FnOnce(&mut ActorProfile)) {
        let mut profile = self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut profile);
    }

    /// Locks the actor's effect state.
    ///
    /// A poisoned lock is recovered: hooks run under `catch_unwind`, so a
    /// panic cannot leave the list half-updated.
    pub fn lock(&self) -> MutexGuard<'_, ActorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Thread-safe actor registry implementing [`WorldOracle`].
#[derive(Debug)]
pub struct ActorRegistry {
    slots: RwLock<HashMap<ActorId, Arc<ActorSlot>>>,
    spatial_ready: AtomicBool,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            spatial_ready: AtomicBool::new(true),
        }
    }

    /// Registers an actor. Spawning an id that is already registered only
    /// replaces its profile; its active effects are kept.
    pub fn spawn(&self, profile: ActorProfile) -> Arc<ActorSlot> {
        if let Some(slot) = self.slot(profile.id) {
            slot.update_profile(|current| *current = profile);
            return slot;
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(profile.id)
                .or_insert_with(|| Arc::new(ActorSlot::new(profile))),
        )
    }

    /// Unregisters an actor and hands back its slot for teardown.
    pub fn remove(&self, id: ActorId) -> Option<Arc<ActorSlot>> {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn slot(&self, id: ActorId) -> Option<Arc<ActorSlot>> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.slot(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies `update` to a registered actor's profile. Returns false if the
    /// actor is unknown.
    pub fn update_profile(&self, id: ActorId, update: impl FnOnce(&mut ActorProfile)) -> bool {
        match self.slot(id) {
            Some(slot) => {
                slot.update_profile(update);
                true
            }
            None => false,
        }
    }

    /// Marks spatial data (un)available; radius queries fail while unavailable.
    pub fn set_spatial_ready(&self, ready: bool) {
        self.spatial_ready.store(ready, Ordering::Release);
    }
}

impl Default for ActorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldOracle for ActorRegistry {
    fn actor(&self, id: ActorId) -> Option<ActorProfile> {
        self.slot(id).map(|slot| slot.profile())
    }

    fn actors_in_radius(
        &self,
        center: Position,
        radius: u32,
    ) -> Result<Vec<ActorProfile>, OracleError> {
        if !self.spatial_ready.load(Ordering::Acquire) {
            return Err(OracleError::SpatialIndexNotReady);
        }
        let slots: Vec<Arc<ActorSlot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        Ok(slots
            .iter()
            .map(|slot| slot.profile())
            .filter(|profile| center.within(&profile.position, radius))
            .collect())
    }
}
