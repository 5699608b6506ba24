//! Actor views consumed and mutated by the effect engine.
//!
//! The engine splits an actor in two:
//!
//! - [`ActorProfile`]: read-only descriptor owned by the world registry
//!   (category tags, position, aggro, reputation). Conditions read it.
//! - [`ActorStatus`]: the effect-driven state (paralysis, visuals, stat
//!   bonuses, transformation). Only effect hooks write it, always while the
//!   owning actor's effect list is locked.
use bitflags::bitflags;

use crate::stats::{BonusStack, StatBonus, StatKind};
use crate::types::{ActorId, EffectId, Position};

bitflags! {
    /// Capability tags used for "is-a" checks instead of type casts.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct ActorTags: u16 {
        const PLAYER     = 1 << 0;
        const NPC        = 1 << 1;
        const MONSTER    = 1 << 2;
        const ATTACKABLE = 1 << 3;
        const RAID       = 1 << 4;
        const SUMMON     = 1 << 5;
        const PET        = 1 << 6;
        const GUARD      = 1 << 7;
    }
}

bitflags! {
    /// Visual markers broadcast to clients while an effect is active.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct VisualEffects: u32 {
        const PARALYZE   = 1 << 0;
        const LIFT_HOLD  = 1 << 1;
        const STUN       = 1 << 2;
        const ROOT       = 1 << 3;
        const SLEEP      = 1 << 4;
        const POISON     = 1 << 5;
        const BLEED      = 1 << 6;
        const FLAME      = 1 << 7;
        const SILENCE    = 1 << 8;
        const INVINCIBLE = 1 << 9;
        const STEALTH    = 1 << 10;
        const MAGIC_CIRCLE = 1 << 11;
    }
}

/// Read-only descriptor of an actor, as published by the world registry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActorProfile {
    pub id: ActorId,
    pub tags: ActorTags,
    /// Template id for NPCs, 0 for everything else.
    pub npc_id: u32,
    pub level: u32,
    pub position: Position,
    pub alive: bool,
    /// Whether a monster attacks on sight.
    pub aggressive: bool,
    /// Player reputation; negative means the player is flagged as a criminal.
    pub reputation: i32,
    /// Owning player for pets and summons.
    pub owner: Option<ActorId>,
}

impl ActorProfile {
    pub fn new(id: ActorId, tags: ActorTags) -> Self {
        Self {
            id,
            tags,
            npc_id: 0,
            level: 1,
            position: Position::ORIGIN,
            alive: true,
            aggressive: false,
            reputation: 0,
            owner: None,
        }
    }

    /// Shorthand for a player character.
    pub fn player(id: ActorId) -> Self {
        Self::new(id, ActorTags::PLAYER)
    }

    /// Shorthand for an attackable monster spawned from an NPC template.
    pub fn monster(id: ActorId, npc_id: u32) -> Self {
        Self::new(id, ActorTags::NPC | ActorTags::MONSTER | ActorTags::ATTACKABLE)
            .with_npc_id(npc_id)
    }

    pub fn with_npc_id(mut self, npc_id: u32) -> Self {
        self.npc_id = npc_id;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_tags(mut self, tags: ActorTags) -> Self {
        self.tags |= tags;
        self
    }

    pub fn aggressive(mut self, aggressive: bool) -> Self {
        self.aggressive = aggressive;
        self
    }

    pub fn with_reputation(mut self, reputation: i32) -> Self {
        self.reputation = reputation;
        self
    }

    pub fn owned_by(mut self, owner: ActorId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn dead(mut self) -> Self {
        self.alive = false;
        self
    }

    #[inline]
    pub fn is(&self, tags: ActorTags) -> bool {
        self.tags.contains(tags)
    }
}

/// Effect-driven mutable state of an actor.
///
/// Every contribution is keyed by the effect that made it, so two overlapping
/// immobilizing effects never release each other and releasing twice is a
/// no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorStatus {
    paralyzed_by: Vec<EffectId>,
    visuals: Vec<(EffectId, VisualEffects)>,
    bonuses: Vec<(EffectId, StatBonus)>,
    transform: Option<(EffectId, u32)>,
}

impl ActorStatus {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== crowd control =====

    pub fn start_paralyze(&mut self, owner: EffectId) {
        if !self.paralyzed_by.contains(&owner) {
            self.paralyzed_by.push(owner);
        }
    }

    pub fn stop_paralyze(&mut self, owner: EffectId) {
        self.paralyzed_by.retain(|id| *id != owner);
    }

    pub fn is_paralyzed(&self) -> bool {
        !self.paralyzed_by.is_empty()
    }

    /// Immobilized actors cannot move; paralysis is currently the only source.
    pub fn is_immobilized(&self) -> bool {
        self.is_paralyzed()
    }

    // ===== visuals =====

    pub fn start_visual(&mut self, owner: EffectId, visual: VisualEffects) {
        if !visual.is_empty() {
            self.visuals.push((owner, visual));
        }
    }

    /// Removes every visual registered by `owner`.
    pub fn stop_visual(&mut self, owner: EffectId) {
        self.visuals.retain(|(id, _)| *id != owner);
    }

    /// Union of all visuals currently shown on the actor.
    pub fn visuals(&self) -> VisualEffects {
        self.visuals
            .iter()
            .fold(VisualEffects::empty(), |acc, (_, v)| acc | *v)
    }

    // ===== stat bonuses =====

    pub fn apply_bonuses(&mut self, owner: EffectId, bonuses: &[StatBonus]) {
        self.bonuses
            .extend(bonuses.iter().map(|bonus| (owner, *bonus)));
    }

    /// Withdraws the bonuses registered by `owner`, returning how many were removed.
    pub fn revert_bonuses(&mut self, owner: EffectId) -> usize {
        let before = self.bonuses.len();
        self.bonuses.retain(|(id, _)| *id != owner);
        before - self.bonuses.len()
    }

    /// Collects the bonuses currently applied to `stat`.
    pub fn bonus_stack(&self, stat: StatKind) -> BonusStack {
        self.bonuses
            .iter()
            .filter(|(_, b)| b.stat == stat)
            .map(|(_, b)| b.bonus)
            .collect()
    }

    /// Final value of `stat` given its base value and bounds.
    pub fn effective(&self, stat: StatKind, base: i32, min: i32, max: i32) -> i32 {
        self.bonus_stack(stat).apply(base, min, max)
    }

    pub fn bonus_count(&self) -> usize {
        self.bonuses.len()
    }

    // ===== transformation =====

    pub fn transform(&self) -> Option<u32> {
        self.transform.map(|(_, id)| id)
    }

    pub fn start_transform(&mut self, owner: EffectId, transform_id: u32) {
        self.transform = Some((owner, transform_id));
    }

    /// Clears the transformation if `owner` is the effect that applied it.
    pub fn stop_transform(&mut self, owner: EffectId) {
        if matches!(self.transform, Some((id, _)) if id == owner) {
            self.transform = None;
        }
    }

    /// True when no effect left any trace on this actor.
    pub fn is_clear(&self) -> bool {
        self.paralyzed_by.is_empty()
            && self.visuals.is_empty()
            && self.bonuses.is_empty()
            && self.transform.is_none()
    }
}
