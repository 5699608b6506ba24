//! Gating predicates evaluated against an [`Env`].
//!
//! A [`Condition`] is an expression tree of leaf predicates combined with
//! `And`/`Or`/`Not`. [`Condition::evaluate`] is the single interpreter: it
//! never mutates the context and never fails. Missing inputs (no target, zero
//! radius, spatial index unavailable) make a leaf evaluate to `false`.

use tracing::trace;

use crate::actor::{ActorProfile, ActorTags};
use crate::env::Env;

/// Condition gating an effect's admission.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Condition {
    /// Monster targets: aggressive flag equals `aggressive`.
    /// Player targets: reputation is negative. Anything else: false.
    TargetAggro { aggressive: bool },

    /// An NPC spawned from `npc_id` is known within `radius` of the caster.
    RangeFromNpc { npc_id: u32, radius: u32 },

    /// The target stands within `radius` of the caster.
    TargetInRange { radius: u32 },

    /// Caster carries all of the given tags.
    CasterHasTags(ActorTags),

    /// Target carries all of the given tags.
    TargetHasTags(ActorTags),

    /// Target alive state equals the flag.
    TargetAlive(bool),

    /// Caster alive state equals the flag.
    CasterAlive(bool),

    /// Target level is at most the given level.
    TargetLevelAtMost(u32),

    /// Casting skill is enchanted to at least the given level.
    EnchantLevelAtLeast(u32),

    /// Accumulated value is at least the threshold.
    ValueAtLeast(f64),

    /// All conditions must be true.
    And(Vec<Condition>),

    /// Any condition must be true.
    Or(Vec<Condition>),

    /// Condition must be false.
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::And(conditions.into_iter().collect())
    }

    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::Or(conditions.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Evaluates the tree. `And` stops at the first false child, `Or` at the
    /// first true one.
    pub fn evaluate(&self, env: &Env<'_>) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.evaluate(env)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(env)),
            Self::Not(inner) => !inner.evaluate(env),

            Self::TargetAggro { aggressive } => env
                .target()
                .is_some_and(|target| target_aggro(target, *aggressive)),

            Self::RangeFromNpc { npc_id, radius } => range_from_npc(env, *npc_id, *radius),

            Self::TargetInRange { radius } => {
                *radius > 0
                    && match (env.caster(), env.target()) {
                        (Some(caster), Some(target)) => {
                            caster.position.within(&target.position, *radius)
                        }
                        _ => false,
                    }
            }

            Self::CasterHasTags(tags) => env.caster().is_some_and(|c| c.is(*tags)),
            Self::TargetHasTags(tags) => env.target().is_some_and(|t| t.is(*tags)),
            Self::TargetAlive(alive) => env.target().is_some_and(|t| t.alive == *alive),
            Self::CasterAlive(alive) => env.caster().is_some_and(|c| c.alive == *alive),
            Self::TargetLevelAtMost(level) => env.target().is_some_and(|t| t.level <= *level),

            Self::EnchantLevelAtLeast(level) => env
                .skill()
                .is_some_and(|skill| skill.enchant_level >= *level),

            Self::ValueAtLeast(threshold) => env.value() >= *threshold,
        }
    }
}

fn target_aggro(target: &ActorProfile, aggressive: bool) -> bool {
    if target.is(ActorTags::MONSTER) {
        target.aggressive == aggressive
    } else if target.is(ActorTags::PLAYER) {
        target.reputation < 0
    } else {
        false
    }
}

fn range_from_npc(env: &Env<'_>, npc_id: u32, radius: u32) -> bool {
    if npc_id == 0 || radius == 0 {
        return false;
    }
    let Some(caster) = env.caster() else {
        return false;
    };
    let Ok(world) = env.world() else {
        return false;
    };

    match world.actors_in_radius(caster.position, radius) {
        Ok(known) => known
            .iter()
            .any(|actor| actor.id != caster.id && actor.is(ActorTags::NPC) && actor.npc_id == npc_id),
        Err(error) => {
            trace!(
                target: "effect::condition",
                caster = %caster.id,
                %error,
                "range lookup unavailable, failing closed"
            );
            false
        }
    }
}
