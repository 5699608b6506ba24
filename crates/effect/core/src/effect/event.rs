//! Outbound lifecycle notifications.

use crate::env::SkillRef;
use crate::template::AbnormalType;
use crate::types::{ActorId, EffectId, TemplateId};

/// Why an effect left the [`Active`](super::EffectState::Active) state.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EndReason {
    /// Remaining ticks exhausted, or the effect completed on its own.
    Expired,
    Dispelled,
    /// Replaced by a winning effect of the same abnormal type.
    Superseded,
    /// The owning actor left the world.
    ActorRemoved,
    /// `on_start` refused activation; no state was applied.
    Vetoed,
    /// A hook failed or panicked.
    Faulted,
}

/// Snapshot of an effect at the moment an event was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectSummary {
    pub id: EffectId,
    pub template: TemplateId,
    pub caster: ActorId,
    pub skill: Option<SkillRef>,
    pub abnormal_type: AbnormalType,
    /// Periodic ticks left. The list does not count down timed effects; the
    /// runtime fills in the expiry units left from their pending timer.
    pub remaining_ticks: u32,
    pub ticks_fired: u32,
    pub enchant_level: u32,
    pub icon: u32,
}

/// Event emitted to the stat-recalculation and broadcast layers.
///
/// Events for a single actor are produced in lifecycle order; no ordering is
/// promised across actors.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectEvent {
    Started {
        actor: ActorId,
        effect: EffectSummary,
    },
    Refreshed {
        actor: ActorId,
        effect: EffectSummary,
    },
    Ticked {
        actor: ActorId,
        effect: EffectSummary,
        magnitude: i32,
    },
    Ended {
        actor: ActorId,
        effect: EffectSummary,
        reason: EndReason,
    },
}

impl EffectEvent {
    pub fn actor(&self) -> ActorId {
        match self {
            Self::Started { actor, .. }
            | Self::Refreshed { actor, .. }
            | Self::Ticked { actor, .. }
            | Self::Ended { actor, .. } => *actor,
        }
    }

    pub fn effect(&self) -> &EffectSummary {
        match self {
            Self::Started { effect, .. }
            | Self::Refreshed { effect, .. }
            | Self::Ticked { effect, .. }
            | Self::Ended { effect, .. } => effect,
        }
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self {
            Self::Ended { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn is_tick(&self) -> bool {
        matches!(self, Self::Ticked { .. })
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Refreshed { .. } => "refreshed",
            Self::Ticked { .. } => "ticked",
            Self::Ended { .. } => "ended",
        }
    }
}
