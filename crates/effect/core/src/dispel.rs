//! Dispel selection and eligibility rules.

use crate::config::EngineConfig;
use crate::effect::Effect;
use crate::template::{AbnormalType, EffectFlags, EffectKind, EffectTemplate};
use crate::types::{ActorId, EffectId, SkillId};

/// Which active effects a dispel request targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispelSelector {
    Skill(SkillId),
    Abnormal(AbnormalType),
    Caster(ActorId),
    Effect(EffectId),
    AllBuffs,
    AllDebuffs,
    All,
}

impl DispelSelector {
    pub fn matches(&self, effect: &Effect) -> bool {
        let template = effect.template();
        match *self {
            Self::Skill(skill) => template.skill_id == skill,
            Self::Abnormal(abnormal) => effect.abnormal_type() == abnormal,
            Self::Caster(caster) => effect.caster() == caster,
            Self::Effect(id) => effect.id() == id,
            Self::AllBuffs => !template.is_debuff(),
            Self::AllDebuffs => template.is_debuff(),
            Self::All => true,
        }
    }
}

/// Who asked for the dispel; decides which flags protect an effect.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum DispelCause {
    /// Cleanse skills, item use, quest scripts.
    #[default]
    Cleanse,
    /// The owning actor died.
    Death,
    /// A player cancels one of their own buffs.
    Voluntary,
}

impl DispelCause {
    /// Whether an effect built from `template` may be removed for this cause.
    pub fn permits(self, template: &EffectTemplate, config: &EngineConfig) -> bool {
        if template.has_flag(EffectFlags::CANNOT_BE_DISPELLED) {
            return false;
        }
        let stays_after_death = template.has_flag(EffectFlags::STAYS_AFTER_DEATH);

        match self {
            Self::Cleanse => true,
            Self::Death => !stays_after_death,
            Self::Voluntary => {
                if stays_after_death || template.is_debuff() {
                    return false;
                }
                if template.kind == EffectKind::Transform
                    && !template.has_flag(EffectFlags::SELF_CANCELABLE)
                {
                    return false;
                }
                !template.abnormal_type.is_dance() || config.dance_cancel_buff
            }
        }
    }
}
