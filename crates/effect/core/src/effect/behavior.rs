//! Per-kind lifecycle hooks.
//!
//! Each [`EffectKind`] maps to one static [`Behavior`]: a set of plain
//! function pointers selected once when the effect is instantiated. Hooks
//! only touch the effected actor's [`ActorStatus`](crate::ActorStatus) through
//! [`HookCtx`], and every contribution they make is keyed by the effect id so
//! `on_exit` can withdraw exactly what this effect applied.

use crate::actor::{ActorTags, VisualEffects};
use crate::effect::{Effect, HookCtx, HookError};
use crate::template::EffectKind;

pub type StartHook = fn(&Effect, &mut HookCtx<'_>) -> Result<bool, HookError>;
pub type ActionHook = fn(&Effect, &mut HookCtx<'_>) -> Result<bool, HookError>;
pub type ExitHook = fn(&Effect, &mut HookCtx<'_>) -> Result<(), HookError>;

/// Strategy for one effect kind.
///
/// - `on_start` returns `false` to veto activation (nothing may be applied
///   before vetoing).
/// - `on_action_time` returns `false` when the effect completed on its own.
/// - `on_exit` reverts everything applied by the other two hooks.
#[derive(Clone, Copy)]
pub struct Behavior {
    pub on_start: StartHook,
    pub on_action_time: ActionHook,
    pub on_exit: ExitHook,
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior").finish_non_exhaustive()
    }
}

const STAT_MODIFIER: Behavior = Behavior {
    on_start: start_stat_modifier,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

const PARALYZE: Behavior = Behavior {
    on_start: start_paralyze,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

const LIFT_HOLD: Behavior = Behavior {
    on_start: start_lift_hold,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

const RECOVERY: Behavior = Behavior {
    on_start: start_recovery,
    on_action_time: complete,
    on_exit: revert_all,
};

const PERIODIC: Behavior = Behavior {
    on_start: start_visual_only,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

const TRANSFORM: Behavior = Behavior {
    on_start: start_transform,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

const MARKER: Behavior = Behavior {
    on_start: start_visual_only,
    on_action_time: keep_ticking,
    on_exit: revert_all,
};

impl EffectKind {
    /// Returns the hook set for this kind.
    pub fn behavior(self) -> &'static Behavior {
        match self {
            Self::Buff | Self::Debuff => &STAT_MODIFIER,
            Self::Paralyze => &PARALYZE,
            Self::LiftHold => &LIFT_HOLD,
            Self::Recovery => &RECOVERY,
            Self::Periodic => &PERIODIC,
            Self::Transform => &TRANSFORM,
            Self::Marker => &MARKER,
        }
    }
}

// ===== start hooks =====

fn start_visual_only(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    ctx.status.start_visual(effect.id(), effect.template().visual);
    Ok(true)
}

fn start_stat_modifier(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    ctx.status
        .apply_bonuses(effect.id(), &effect.template().bonuses);
    start_visual_only(effect, ctx)
}

fn start_paralyze(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    let visual = effect.template().visual | VisualEffects::PARALYZE;
    ctx.status.start_paralyze(effect.id());
    ctx.status.start_visual(effect.id(), visual);
    Ok(true)
}

/// Raid bosses cannot be lifted, and an attackable target already held in
/// place by another effect is left alone.
fn start_lift_hold(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    if ctx.profile.is(ActorTags::RAID) {
        return Ok(false);
    }
    if ctx.profile.is(ActorTags::ATTACKABLE) && ctx.status.is_immobilized() {
        return Ok(false);
    }

    let visual = effect.template().visual | VisualEffects::LIFT_HOLD;
    ctx.status.start_paralyze(effect.id());
    ctx.status.start_visual(effect.id(), visual);
    Ok(true)
}

fn start_recovery(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    if !ctx.profile.is(ActorTags::PLAYER) {
        return Ok(false);
    }
    start_visual_only(effect, ctx)
}

fn start_transform(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
    if ctx.status.transform().is_some() {
        return Ok(false);
    }
    let transform_id = effect.template().transform_id;
    if transform_id == 0 {
        return Err(HookError::Failed("transform template has no transform id"));
    }

    ctx.status.start_transform(effect.id(), transform_id);
    start_visual_only(effect, ctx)
}

// ===== action hooks =====

fn keep_ticking(_: &Effect, _: &mut HookCtx<'_>) -> Result<bool, HookError> {
    Ok(true)
}

fn complete(_: &Effect, _: &mut HookCtx<'_>) -> Result<bool, HookError> {
    Ok(false)
}

// ===== exit hook =====

/// Withdraws every contribution keyed by this effect. Safe to run after a
/// partially applied start.
fn revert_all(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<(), HookError> {
    let id = effect.id();
    ctx.status.stop_paralyze(id);
    ctx.status.stop_visual(id);
    ctx.status.revert_bonuses(id);
    ctx.status.stop_transform(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::actor::{ActorProfile, ActorStatus};
    use crate::stats::{Bonus, StatBonus, StatKind};
    use crate::template::{AbnormalType, EffectTemplate};
    use crate::types::{ActorId, EffectId, SkillId, TemplateId};

    fn effect(id: u64, kind: EffectKind, abnormal: AbnormalType) -> Effect {
        let template = EffectTemplate::new(TemplateId(1), "test", SkillId(1), kind, abnormal)
            .with_duration(5, 1000)
            .with_bonuses([StatBonus::new(StatKind::RunSpeed, Bonus::Less(30))])
            .with_transform(if kind == EffectKind::Transform { 301 } else { 0 });
        Effect::new(EffectId(id), Arc::new(template), ActorId(1), ActorId(2), None)
    }

    fn start(effect: &Effect, profile: &ActorProfile, status: &mut ActorStatus) -> bool {
        let mut ctx = HookCtx::new(profile, status);
        (effect.behavior().on_start)(effect, &mut ctx).unwrap()
    }

    fn exit(effect: &Effect, profile: &ActorProfile, status: &mut ActorStatus) {
        let mut ctx = HookCtx::new(profile, status);
        (effect.behavior().on_exit)(effect, &mut ctx).unwrap();
    }

    #[test]
    fn lift_hold_vetoes_immobilized_attackable_target() {
        let monster = ActorProfile::monster(ActorId(2), 20_100);
        let mut status = ActorStatus::new();
        status.start_paralyze(EffectId(99));

        let lift = effect(1, EffectKind::LiftHold, AbnormalType::AerialYoke);
        assert!(!start(&lift, &monster, &mut status));
        assert_eq!(status.visuals(), VisualEffects::empty());
    }

    #[test]
    fn lift_hold_vetoes_raid_bosses() {
        let boss = ActorProfile::monster(ActorId(2), 25_001).with_tags(ActorTags::RAID);
        let mut status = ActorStatus::new();
        let lift = effect(1, EffectKind::LiftHold, AbnormalType::AerialYoke);
        assert!(!start(&lift, &boss, &mut status));
        assert!(status.is_clear());
    }

    #[test]
    fn lift_hold_paralyzes_and_exit_clears_everything() {
        let monster = ActorProfile::monster(ActorId(2), 20_100);
        let mut status = ActorStatus::new();
        let lift = effect(1, EffectKind::LiftHold, AbnormalType::AerialYoke);

        assert!(start(&lift, &monster, &mut status));
        assert!(status.is_immobilized());
        assert!(status.visuals().contains(VisualEffects::LIFT_HOLD));

        exit(&lift, &monster, &mut status);
        assert!(status.is_clear());
    }

    #[test]
    fn recovery_only_starts_on_players() {
        let recovery = effect(1, EffectKind::Recovery, AbnormalType::Recovery);
        let mut status = ActorStatus::new();
        assert!(!start(&recovery, &ActorProfile::monster(ActorId(2), 1), &mut status));
        assert!(start(&recovery, &ActorProfile::player(ActorId(2)), &mut status));
    }

    #[test]
    fn transform_refuses_second_transformation() {
        let player = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let first = effect(1, EffectKind::Transform, AbnormalType::Transform);
        let second = effect(2, EffectKind::Transform, AbnormalType::Transform);

        assert!(start(&first, &player, &mut status));
        assert!(!start(&second, &player, &mut status));
        assert_eq!(status.transform(), Some(301));

        exit(&second, &player, &mut status);
        assert_eq!(status.transform(), Some(301));
    }

    #[test]
    fn stat_modifier_reverts_only_its_own_bonuses() {
        let player = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let slow_a = effect(1, EffectKind::Debuff, AbnormalType::SpeedDown);
        let slow_b = effect(2, EffectKind::Debuff, AbnormalType::SpeedDown);

        start(&slow_a, &player, &mut status);
        start(&slow_b, &player, &mut status);
        assert_eq!(status.effective(StatKind::RunSpeed, 100, 0, 500), 49);

        exit(&slow_a, &player, &mut status);
        assert_eq!(status.effective(StatKind::RunSpeed, 100, 0, 500), 70);
    }
}
