//! Immutable effect definitions.
//!
//! Templates are loaded once at startup into a [`TemplateRegistry`] and shared
//! by every [`Effect`](crate::Effect) instantiated from them.
mod registry;

pub use registry::{RegistryError, TemplateOracle, TemplateRegistry};

use bitflags::bitflags;

use crate::actor::VisualEffects;
use crate::condition::Condition;
use crate::env::SkillRef;
use crate::stats::StatBonus;
use crate::types::{SkillId, TemplateId};

/// Stacking group of an effect.
///
/// Two non-stackable effects with the same abnormal type never apply their
/// state to an actor at the same time.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AbnormalType {
    #[default]
    None,
    Buff,
    Debuff,
    Paralyze,
    AerialYoke,
    Stun,
    Root,
    Sleep,
    Silence,
    Poison,
    Bleed,
    Transform,
    Dance,
    Song,
    Recovery,
    SpeedUp,
    SpeedDown,
}

impl AbnormalType {
    /// Harmful groups, regardless of the template's explicit debuff flag.
    pub const fn is_debuff(self) -> bool {
        matches!(
            self,
            Self::Debuff
                | Self::Paralyze
                | Self::AerialYoke
                | Self::Stun
                | Self::Root
                | Self::Sleep
                | Self::Silence
                | Self::Poison
                | Self::Bleed
                | Self::SpeedDown
        )
    }

    pub const fn is_dance(self) -> bool {
        matches!(self, Self::Dance | Self::Song)
    }
}

/// Behavior selected for an effect; maps to a strategy in
/// [`effect::behavior`](crate::effect::behavior).
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EffectKind {
    /// Applies stat bonuses for its duration.
    Buff,
    /// Applies harmful stat bonuses for its duration.
    Debuff,
    /// Immobilizes the effected actor.
    Paralyze,
    /// Lifts and holds the target in the air.
    LiftHold,
    /// Instant recovery on players; completes on its first tick.
    Recovery,
    /// Damage or heal over time.
    Periodic,
    /// Replaces the actor's appearance.
    Transform,
    /// Visual marker only.
    #[default]
    Marker,
}

bitflags! {
    /// Dispel and lifetime policy flags declared on a template.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct EffectFlags: u8 {
        /// Ignored by every dispel selector; ends only by expiry, supersession or removal.
        const CANNOT_BE_DISPELLED = 1 << 0;
        /// Survives the owner's death.
        const STAYS_AFTER_DEATH   = 1 << 1;
        /// Treated as harmful even when its abnormal type is neutral.
        const DEBUFF              = 1 << 2;
        /// A transformation the player may cancel on their own.
        const SELF_CANCELABLE     = 1 << 3;
    }
}

/// How a non-stackable incoming effect competes with the active effect of the
/// same abnormal type. The incoming template's rule decides.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TieBreak {
    /// Incoming wins when its priority is greater than or equal to the incumbent's.
    #[default]
    HigherPriority,
    /// Incoming wins on enchant level, then priority.
    HigherEnchant,
    /// Incoming always wins.
    MostRecent,
    /// Incumbent always wins.
    KeepExisting,
}

/// Parameter override selected by enchant route and level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnchantVariant {
    pub route: u32,
    pub min_level: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration_ticks: Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub power: Option<i32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: Option<u32>,
}

/// Parameters of one application after enchant resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedParams {
    /// Duration in ticks; 0 means permanent.
    pub duration_ticks: u32,
    pub power: i32,
    pub priority: u32,
    pub enchant_level: u32,
}

/// Immutable definition of an effect.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectTemplate {
    pub id: TemplateId,
    pub name: String,
    /// Skill whose cast applies this template.
    pub skill_id: SkillId,
    pub kind: EffectKind,
    pub abnormal_type: AbnormalType,
    /// Number of ticks before natural expiry; 0 means permanent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub base_duration_ticks: u32,
    /// Interval between periodic ticks. 0 disables periodic behavior and the
    /// duration is measured in expiry units instead.
    #[cfg_attr(feature = "serde", serde(default))]
    pub tick_interval_ms: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stackable: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stacks_with_self: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tie_break: TieBreak,
    #[cfg_attr(feature = "serde", serde(default))]
    pub priority: u32,
    /// Magnitude for periodic effects (negative damages, positive heals).
    #[cfg_attr(feature = "serde", serde(default))]
    pub power: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub visual: VisualEffects,
    #[cfg_attr(feature = "serde", serde(default))]
    pub icon: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub flags: EffectFlags,
    #[cfg_attr(feature = "serde", serde(default))]
    pub condition: Option<Condition>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub bonuses: Vec<StatBonus>,
    /// Appearance applied by [`EffectKind::Transform`].
    #[cfg_attr(feature = "serde", serde(default))]
    pub transform_id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub enchant_variants: Vec<EnchantVariant>,
}

impl EffectTemplate {
    pub fn new(
        id: TemplateId,
        name: impl Into<String>,
        skill_id: SkillId,
        kind: EffectKind,
        abnormal_type: AbnormalType,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            skill_id,
            kind,
            abnormal_type,
            base_duration_ticks: 0,
            tick_interval_ms: 0,
            stackable: false,
            stacks_with_self: false,
            tie_break: TieBreak::default(),
            priority: 0,
            power: 0,
            visual: VisualEffects::empty(),
            icon: 0,
            flags: EffectFlags::empty(),
            condition: None,
            bonuses: Vec::new(),
            transform_id: 0,
            enchant_variants: Vec::new(),
        }
    }

    pub fn with_duration(mut self, ticks: u32, tick_interval_ms: u64) -> Self {
        self.base_duration_ticks = ticks;
        self.tick_interval_ms = tick_interval_ms;
        self
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    pub fn stacks_with_self(mut self) -> Self {
        self.stacks_with_self = true;
        self
    }

    pub fn with_priority(mut self, priority: u32, tie_break: TieBreak) -> Self {
        self.priority = priority;
        self.tie_break = tie_break;
        self
    }

    pub fn with_power(mut self, power: i32) -> Self {
        self.power = power;
        self
    }

    pub fn with_visual(mut self, visual: VisualEffects) -> Self {
        self.visual = visual;
        self
    }

    pub fn with_flags(mut self, flags: EffectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_bonuses(mut self, bonuses: impl IntoIterator<Item = StatBonus>) -> Self {
        self.bonuses.extend(bonuses);
        self
    }

    pub fn with_transform(mut self, transform_id: u32) -> Self {
        self.transform_id = transform_id;
        self
    }

    pub fn with_variant(mut self, variant: EnchantVariant) -> Self {
        self.enchant_variants.push(variant);
        self
    }

    /// Resolves duration, power and priority for a cast.
    ///
    /// An enchanted skill selects the variant on its route with the highest
    /// `min_level` not above its enchant level; fields the variant leaves
    /// unset keep the base value.
    pub fn resolve(&self, skill: Option<SkillRef>) -> ResolvedParams {
        let mut params = ResolvedParams {
            duration_ticks: self.base_duration_ticks,
            power: self.power,
            priority: self.priority,
            enchant_level: 0,
        };

        let Some(skill) = skill.filter(SkillRef::is_enchanted) else {
            return params;
        };
        params.enchant_level = skill.enchant_level;

        let variant = self
            .enchant_variants
            .iter()
            .filter(|v| v.route == skill.enchant_route && v.min_level <= skill.enchant_level)
            .max_by_key(|v| v.min_level);

        if let Some(variant) = variant {
            params.duration_ticks = variant.duration_ticks.unwrap_or(params.duration_ticks);
            params.power = variant.power.unwrap_or(params.power);
            params.priority = variant.priority.unwrap_or(params.priority);
        }
        params
    }

    pub fn is_debuff(&self) -> bool {
        self.kind == EffectKind::Debuff
            || self.flags.contains(EffectFlags::DEBUFF)
            || self.abnormal_type.is_debuff()
    }

    pub fn is_periodic(&self) -> bool {
        self.tick_interval_ms > 0
    }

    pub fn is_permanent(&self) -> bool {
        self.base_duration_ticks == 0
    }

    pub fn has_flag(&self, flag: EffectFlags) -> bool {
        self.flags.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shield() -> EffectTemplate {
        EffectTemplate::new(
            TemplateId(1),
            "Shield",
            SkillId(1040),
            EffectKind::Buff,
            AbnormalType::Buff,
        )
        .with_duration(1200, 0)
        .with_priority(3, TieBreak::HigherPriority)
        .with_variant(EnchantVariant {
            route: 1,
            min_level: 1,
            duration_ticks: Some(1300),
            power: None,
            priority: None,
        })
        .with_variant(EnchantVariant {
            route: 1,
            min_level: 15,
            duration_ticks: Some(1800),
            power: None,
            priority: Some(5),
        })
        .with_variant(EnchantVariant {
            route: 2,
            min_level: 1,
            duration_ticks: None,
            power: Some(40),
            priority: None,
        })
    }

    #[test]
    fn unenchanted_cast_uses_base_values() {
        let params = shield().resolve(Some(SkillRef::new(SkillId(1040), 3)));
        assert_eq!(params.duration_ticks, 1200);
        assert_eq!(params.priority, 3);
        assert_eq!(params.enchant_level, 0);
    }

    #[test]
    fn highest_reachable_variant_on_route_wins() {
        let skill = SkillRef::from_combined(SkillId(1040), 3, 1020);
        let params = shield().resolve(Some(skill));
        assert_eq!(params.duration_ticks, 1800);
        assert_eq!(params.priority, 5);
        assert_eq!(params.enchant_level, 20);

        let low = SkillRef::from_combined(SkillId(1040), 3, 1010);
        assert_eq!(shield().resolve(Some(low)).duration_ticks, 1300);
    }

    #[test]
    fn variant_on_other_route_only_overrides_its_fields() {
        let skill = SkillRef::from_combined(SkillId(1040), 3, 2005);
        let params = shield().resolve(Some(skill));
        assert_eq!(params.duration_ticks, 1200);
        assert_eq!(params.power, 40);
    }

    #[test]
    fn harmful_groups_count_as_debuffs() {
        let stun = EffectTemplate::new(
            TemplateId(2),
            "Stun",
            SkillId(100),
            EffectKind::Paralyze,
            AbnormalType::Stun,
        );
        assert!(stun.is_debuff());
        assert!(!shield().is_debuff());
        assert!(shield().with_flags(EffectFlags::DEBUFF).is_debuff());
    }

    #[test]
    fn abnormal_type_parses_from_snake_case() {
        assert_eq!(
            "aerial_yoke".parse::<AbnormalType>().unwrap(),
            AbnormalType::AerialYoke
        );
        assert!(AbnormalType::Song.is_dance());
    }
}
