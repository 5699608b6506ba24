//! Per-actor effect list and stacking resolver.
//!
//! The list only ever holds `Active` effects. Every removal path goes through
//! [`Effect::exit`], so `on_exit` runs exactly once per started effect and a
//! matching `Ended` event is produced.
//!
//! Stacking rules applied by [`EffectList::admit`]:
//!
//! 1. Same template from the same caster refreshes the existing instance,
//!    unless the template stacks with itself.
//! 2. A non-stackable effect competes with the non-stackable effect already
//!    active in its abnormal type, using the incoming template's [`TieBreak`].
//!    The loser of that comparison is fully exited before the winner starts.
//! 3. Stackable effects, and effects of [`AbnormalType::None`], never compete.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::dispel::{DispelCause, DispelSelector};
use crate::effect::{
    AdmissionError, Effect, EffectEvent, EffectSummary, EndReason, HookCtx, Registration,
};
use crate::template::{AbnormalType, TieBreak};
use crate::types::{ActorId, EffectId};

/// Outcome of a successful admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// A new instance became active.
    Started {
        id: EffectId,
        timer: Option<Registration>,
    },
    /// An existing instance was refreshed; its previous timers are stale.
    Refreshed {
        id: EffectId,
        timer: Option<Registration>,
    },
}

impl Admission {
    pub fn id(&self) -> EffectId {
        match self {
            Self::Started { id, .. } | Self::Refreshed { id, .. } => *id,
        }
    }

    pub fn timer(&self) -> Option<Registration> {
        match self {
            Self::Started { timer, .. } | Self::Refreshed { timer, .. } => *timer,
        }
    }
}

/// Outcome of firing a timer against the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickResult {
    /// The timer no longer refers to an active effect in this generation.
    Stale,
    /// The effect keeps ticking; schedule the next timer.
    Rescheduled(Registration),
    /// The effect left the list.
    Ended(EndReason),
}

/// Active effects of one actor, grouped by abnormal type.
#[derive(Debug)]
pub struct EffectList {
    owner: ActorId,
    groups: HashMap<AbnormalType, Vec<Effect>>,
    next_order: u64,
}

impl EffectList {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            groups: HashMap::new(),
            next_order: 0,
        }
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    // ===== queries =====

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    pub fn get(&self, id: EffectId) -> Option<&Effect> {
        self.groups.values().flatten().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.get(id).is_some()
    }

    /// All active effects in application order.
    pub fn iter(&self) -> impl Iterator<Item = &Effect> + '_ {
        let mut effects: Vec<&Effect> = self.groups.values().flatten().collect();
        effects.sort_by_key(|e| e.stack_order());
        effects.into_iter()
    }

    /// Active effects of one abnormal type, in application order.
    pub fn active_of(&self, abnormal: AbnormalType) -> impl Iterator<Item = &Effect> + '_ {
        self.groups.get(&abnormal).into_iter().flatten()
    }

    pub fn summaries(&self) -> Vec<EffectSummary> {
        self.iter().map(Effect::summary).collect()
    }

    // ===== admission =====

    /// Resolves stacking for `incoming` and starts it.
    ///
    /// Events for every transition (refresh, superseded incumbents, start or
    /// veto) are appended to `events` in the order they happened.
    pub fn admit(
        &mut self,
        mut incoming: Effect,
        ctx: &mut HookCtx<'_>,
        config: &EngineConfig,
        events: &mut Vec<EffectEvent>,
    ) -> Result<Admission, AdmissionError> {
        let owner = self.owner;
        let template = Arc::clone(incoming.template());
        let group = incoming.abnormal_type();

        if !template.stacks_with_self
            && let Some(existing) = self.groups.get_mut(&group).and_then(|effects| {
                effects.iter_mut().find(|e| {
                    e.template().id == template.id && e.caster() == incoming.caster()
                })
            })
        {
            existing.refresh(*incoming.params(), config.refresh_resets_enchant);
            debug!(
                target: "effect::list",
                actor = %owner,
                effect = %existing.id(),
                template = %template.id,
                remaining = existing.remaining_ticks(),
                "effect refreshed"
            );
            events.push(EffectEvent::Refreshed {
                actor: owner,
                effect: existing.summary(),
            });
            return Ok(Admission::Refreshed {
                id: existing.id(),
                timer: existing.registration(config.expiry_unit_ms),
            });
        }

        let conflicts: Vec<EffectId> = if template.stackable || group == AbnormalType::None {
            Vec::new()
        } else {
            self.active_of(group)
                .filter(|e| !e.template().stackable)
                .map(Effect::id)
                .collect()
        };

        for id in &conflicts {
            if let Some(incumbent) = self.get(*id)
                && !outranks(&incoming, incumbent)
            {
                debug!(
                    target: "effect::list",
                    actor = %owner,
                    template = %template.id,
                    incumbent = %incumbent.id(),
                    "admission outranked"
                );
                return Err(AdmissionError::Outranked {
                    incoming: template.id,
                    incumbent: *id,
                });
            }
        }

        if self.len() - conflicts.len() >= config.max_effects_per_actor {
            return Err(AdmissionError::ActorIneligible {
                actor: owner,
                reason: "effect limit reached",
            });
        }

        for id in conflicts {
            if let Some(loser) = self.take(id) {
                retire(owner, loser, EndReason::Superseded, ctx, events);
            }
        }

        incoming.set_stack_order(self.next_order);
        self.next_order += 1;

        match incoming.start(ctx) {
            Ok(true) => {
                let id = incoming.id();
                let timer = incoming.registration(config.expiry_unit_ms);
                debug!(
                    target: "effect::list",
                    actor = %owner,
                    effect = %id,
                    template = %template.id,
                    abnormal = %group,
                    "effect started"
                );
                events.push(EffectEvent::Started {
                    actor: owner,
                    effect: incoming.summary(),
                });
                self.groups.entry(group).or_default().push(incoming);
                Ok(Admission::Started { id, timer })
            }
            Ok(false) => {
                debug!(
                    target: "effect::list",
                    actor = %owner,
                    template = %template.id,
                    "effect vetoed its start"
                );
                events.push(EffectEvent::Ended {
                    actor: owner,
                    effect: incoming.summary(),
                    reason: EndReason::Vetoed,
                });
                Err(AdmissionError::Vetoed(template.id))
            }
            Err(source) => {
                error!(
                    target: "effect::list",
                    actor = %owner,
                    effect = %incoming.id(),
                    template = %template.id,
                    %source,
                    "start hook failed"
                );
                events.push(EffectEvent::Ended {
                    actor: owner,
                    effect: incoming.summary(),
                    reason: EndReason::Faulted,
                });
                Err(AdmissionError::StartFailed {
                    template: template.id,
                    source,
                })
            }
        }
    }

    // ===== timers =====

    /// Fires a periodic tick for `id` if `generation` is still current.
    pub fn tick(
        &mut self,
        id: EffectId,
        generation: u32,
        ctx: &mut HookCtx<'_>,
        config: &EngineConfig,
        events: &mut Vec<EffectEvent>,
    ) -> TickResult {
        let owner = self.owner;
        let Some(effect) = self.get_mut(id) else {
            return TickResult::Stale;
        };
        if effect.generation() != generation
            || !effect.is_active()
            || !effect.template().is_periodic()
        {
            return TickResult::Stale;
        }

        let reason = match effect.action_time(ctx) {
            Ok(keep_ticking) => {
                let exhausted = effect.consume_tick();
                events.push(EffectEvent::Ticked {
                    actor: owner,
                    effect: effect.summary(),
                    magnitude: effect.params().power,
                });
                match effect.registration(config.expiry_unit_ms) {
                    Some(next) if keep_ticking && !exhausted => {
                        return TickResult::Rescheduled(next);
                    }
                    _ => EndReason::Expired,
                }
            }
            Err(source) => {
                error!(
                    target: "effect::list",
                    actor = %owner,
                    effect = %id,
                    template = %effect.template().id,
                    %source,
                    "tick hook failed"
                );
                EndReason::Faulted
            }
        };

        match self.take(id) {
            Some(effect) => TickResult::Ended(retire(owner, effect, reason, ctx, events)),
            None => TickResult::Stale,
        }
    }

    /// Ends a non-periodic effect whose duration timer fired. Returns false for
    /// stale timers.
    pub fn expire(
        &mut self,
        id: EffectId,
        generation: u32,
        ctx: &mut HookCtx<'_>,
        events: &mut Vec<EffectEvent>,
    ) -> bool {
        let current = self
            .get(id)
            .is_some_and(|e| e.generation() == generation && e.is_active());
        if !current {
            return false;
        }
        match self.take(id) {
            Some(effect) => {
                retire(self.owner, effect, EndReason::Expired, ctx, events);
                true
            }
            None => false,
        }
    }

    // ===== removal =====

    /// Exits every effect matching `selector` that `cause` permits removing.
    /// Returns how many were removed; dispelling nothing is not an error.
    pub fn dispel(
        &mut self,
        selector: DispelSelector,
        cause: DispelCause,
        config: &EngineConfig,
        ctx: &mut HookCtx<'_>,
        events: &mut Vec<EffectEvent>,
    ) -> usize {
        let targets: Vec<EffectId> = self
            .iter()
            .filter(|e| selector.matches(e) && cause.permits(e.template(), config))
            .map(Effect::id)
            .collect();

        let mut removed = 0;
        for id in targets {
            if let Some(effect) = self.take(id) {
                retire(self.owner, effect, EndReason::Dispelled, ctx, events);
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(
                target: "effect::list",
                actor = %self.owner,
                ?selector,
                %cause,
                removed,
                "effects dispelled"
            );
        }
        removed
    }

    /// Exits every effect regardless of flags or remaining duration.
    pub fn remove_all(
        &mut self,
        reason: EndReason,
        ctx: &mut HookCtx<'_>,
        events: &mut Vec<EffectEvent>,
    ) -> usize {
        let mut effects: Vec<Effect> = self.groups.drain().flat_map(|(_, v)| v).collect();
        effects.sort_by_key(Effect::stack_order);

        let removed = effects.len();
        for effect in effects {
            retire(self.owner, effect, reason, ctx, events);
        }
        removed
    }

    fn get_mut(&mut self, id: EffectId) -> Option<&mut Effect> {
        self.groups
            .values_mut()
            .flat_map(|v| v.iter_mut())
            .find(|e| e.id() == id)
    }

    fn take(&mut self, id: EffectId) -> Option<Effect> {
        let (group, index) = self.groups.iter().find_map(|(group, effects)| {
            effects
                .iter()
                .position(|e| e.id() == id)
                .map(|index| (*group, index))
        })?;

        let effects = self.groups.get_mut(&group)?;
        let effect = effects.remove(index);
        if effects.is_empty() {
            self.groups.remove(&group);
        }
        Some(effect)
    }
}

/// Whether `incoming` displaces the active `incumbent` of its abnormal type.
fn outranks(incoming: &Effect, incumbent: &Effect) -> bool {
    let (new, old) = (incoming.params(), incumbent.params());
    match incoming.template().tie_break {
        TieBreak::HigherPriority => new.priority >= old.priority,
        TieBreak::HigherEnchant => {
            (new.enchant_level, new.priority) >= (old.enchant_level, old.priority)
        }
        TieBreak::MostRecent => true,
        TieBreak::KeepExisting => false,
    }
}

/// Exits a removed effect and reports how it ended. A failing exit hook turns
/// the reason into [`EndReason::Faulted`].
fn retire(
    owner: ActorId,
    mut effect: Effect,
    reason: EndReason,
    ctx: &mut HookCtx<'_>,
    events: &mut Vec<EffectEvent>,
) -> EndReason {
    let reason = match effect.exit(ctx) {
        Ok(_) => reason,
        Err(source) => {
            error!(
                target: "effect::list",
                actor = %owner,
                effect = %effect.id(),
                template = %effect.template().id,
                %source,
                "exit hook failed"
            );
            EndReason::Faulted
        }
    };
    debug!(
        target: "effect::list",
        actor = %owner,
        effect = %effect.id(),
        %reason,
        "effect ended"
    );
    events.push(EffectEvent::Ended {
        actor: owner,
        effect: effect.summary(),
        reason,
    });
    reason
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::actor::{ActorProfile, ActorStatus};
    use crate::effect::{Behavior, HookError, TimerKind};
    use crate::env::SkillRef;
    use crate::stats::{Bonus, StatBonus, StatKind};
    use crate::template::{EffectKind, EffectTemplate};
    use crate::types::{SkillId, TemplateId};

    struct Harness {
        profile: ActorProfile,
        status: ActorStatus,
        list: EffectList,
        config: EngineConfig,
        events: Vec<EffectEvent>,
        next_id: u64,
    }

    impl Harness {
        fn new(profile: ActorProfile) -> Self {
            Self {
                list: EffectList::new(profile.id),
                profile,
                status: ActorStatus::new(),
                config: EngineConfig::default(),
                events: Vec::new(),
                next_id: 1,
            }
        }

        fn apply(
            &mut self,
            template: &Arc<EffectTemplate>,
            caster: u32,
        ) -> Result<Admission, AdmissionError> {
            self.cast(template, caster, None)
        }

        fn cast(
            &mut self,
            template: &Arc<EffectTemplate>,
            caster: u32,
            skill: Option<SkillRef>,
        ) -> Result<Admission, AdmissionError> {
            let effect = self.instance(template, caster, skill);
            self.admit(effect)
        }

        fn instance(
            &mut self,
            template: &Arc<EffectTemplate>,
            caster: u32,
            skill: Option<SkillRef>,
        ) -> Effect {
            let effect = Effect::new(
                EffectId(self.next_id),
                Arc::clone(template),
                ActorId(caster),
                self.profile.id,
                skill,
            );
            self.next_id += 1;
            effect
        }

        fn admit(&mut self, effect: Effect) -> Result<Admission, AdmissionError> {
            let mut ctx = HookCtx::new(&self.profile, &mut self.status);
            self.list.admit(effect, &mut ctx, &self.config, &mut self.events)
        }

        fn tick(&mut self, id: EffectId, generation: u32) -> TickResult {
            let mut ctx = HookCtx::new(&self.profile, &mut self.status);
            self.list
                .tick(id, generation, &mut ctx, &self.config, &mut self.events)
        }

        fn expire(&mut self, id: EffectId, generation: u32) -> bool {
            let mut ctx = HookCtx::new(&self.profile, &mut self.status);
            self.list.expire(id, generation, &mut ctx, &mut self.events)
        }

        fn dispel(&mut self, selector: DispelSelector, cause: DispelCause) -> usize {
            let mut ctx = HookCtx::new(&self.profile, &mut self.status);
            self.list
                .dispel(selector, cause, &self.config, &mut ctx, &mut self.events)
        }

        fn remove_all(&mut self) -> usize {
            let mut ctx = HookCtx::new(&self.profile, &mut self.status);
            self.list
                .remove_all(EndReason::ActorRemoved, &mut ctx, &mut self.events)
        }

        fn ended(&self, reason: EndReason) -> Vec<EffectId> {
            self.events
                .iter()
                .filter(|e| e.end_reason() == Some(reason))
                .map(|e| e.effect().id)
                .collect()
        }
    }

    fn paralyze(id: u32, priority: u32) -> Arc<EffectTemplate> {
        Arc::new(
            EffectTemplate::new(
                TemplateId(id),
                "Hold",
                SkillId(100 + id),
                EffectKind::Paralyze,
                AbnormalType::Paralyze,
            )
            .with_duration(5, 1000)
            .with_priority(priority, TieBreak::HigherPriority),
        )
    }

    fn debuff(id: u32) -> Arc<EffectTemplate> {
        Arc::new(
            EffectTemplate::new(
                TemplateId(id),
                "Weaken",
                SkillId(200 + id),
                EffectKind::Debuff,
                AbnormalType::Debuff,
            )
            .with_duration(30, 0)
            .stackable()
            .with_bonuses([StatBonus::new(StatKind::PhysicalAttack, Bonus::Less(10))]),
        )
    }

    fn buff(id: u32) -> Arc<EffectTemplate> {
        Arc::new(
            EffectTemplate::new(
                TemplateId(id),
                "Might",
                SkillId(300 + id),
                EffectKind::Buff,
                AbnormalType::Buff,
            )
            .with_duration(1200, 0)
            .with_bonuses([StatBonus::new(StatKind::PhysicalAttack, Bonus::Increased(15))]),
        )
    }

    fn lift_hold(id: u32) -> Arc<EffectTemplate> {
        Arc::new(
            EffectTemplate::new(
                TemplateId(id),
                "Lift",
                SkillId(400 + id),
                EffectKind::LiftHold,
                AbnormalType::AerialYoke,
            )
            .with_duration(3, 1000),
        )
    }

    #[test]
    fn higher_priority_paralyze_supersedes_before_starting() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let a = h.apply(&paralyze(1, 1), 10).unwrap().id();
        let b = h.apply(&paralyze(2, 5), 11).unwrap().id();

        let kinds: Vec<_> = h
            .events
            .iter()
            .map(|e| (e.kind(), e.effect().id))
            .collect();
        assert_eq!(
            kinds,
            vec![("started", a), ("ended", a), ("started", b)],
            "loser must exit before the winner starts"
        );
        assert_eq!(h.ended(EndReason::Superseded), vec![a]);
        assert_eq!(h.list.active_of(AbnormalType::Paralyze).count(), 1);
        assert!(h.status.is_paralyzed());
    }

    #[test]
    fn lower_priority_paralyze_is_outranked() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let strong = h.apply(&paralyze(1, 5), 10).unwrap().id();
        let err = h.apply(&paralyze(2, 1), 11).unwrap_err();

        assert_eq!(
            err,
            AdmissionError::Outranked {
                incoming: TemplateId(2),
                incumbent: strong,
            }
        );
        assert_eq!(h.list.len(), 1);
        assert_eq!(h.events.len(), 1);
    }

    #[test]
    fn keep_existing_and_most_recent_tie_breaks() {
        let mut h = Harness::new(ActorProfile::player(ActorId(1)));
        let keep = Arc::new(
            EffectTemplate::clone(&buff(1)).with_priority(9, TieBreak::KeepExisting),
        );
        let recent = Arc::new(EffectTemplate {
            id: TemplateId(2),
            ..EffectTemplate::clone(&buff(1)).with_priority(0, TieBreak::MostRecent)
        });

        h.apply(&buff(3), 10).unwrap();
        assert!(matches!(
            h.apply(&keep, 11),
            Err(AdmissionError::Outranked { .. })
        ));
        let winner = h.apply(&recent, 12).unwrap().id();
        assert_eq!(h.list.iter().map(Effect::id).collect::<Vec<_>>(), vec![winner]);
    }

    #[test]
    fn self_reapplication_refreshes_instead_of_duplicating() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let hold = paralyze(1, 1);
        let first = h.apply(&hold, 10).unwrap();
        let id = first.id();
        let generation = first.timer().unwrap().generation;

        assert_eq!(
            h.tick(id, generation),
            TickResult::Rescheduled(first.timer().unwrap())
        );
        assert_eq!(h.list.get(id).unwrap().remaining_ticks(), 4);

        let refreshed = h.apply(&hold, 10).unwrap();
        assert!(matches!(refreshed, Admission::Refreshed { .. }));
        assert_eq!(refreshed.id(), id);
        assert_eq!(h.list.len(), 1);
        assert_eq!(h.list.get(id).unwrap().remaining_ticks(), 5);

        // The pre-refresh timer is stale now.
        assert_eq!(h.tick(id, generation), TickResult::Stale);
    }

    #[test]
    fn higher_enchant_tie_break_prefers_the_enchanted_cast() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let hold = Arc::new(
            EffectTemplate::clone(&paralyze(1, 3)).with_priority(3, TieBreak::HigherEnchant),
        );
        let enchanted = SkillRef::from_combined(hold.skill_id, 1, 1015);

        let plain = h.apply(&hold, 10).unwrap().id();
        let strong = h.cast(&hold, 11, Some(enchanted)).unwrap().id();
        assert_eq!(h.ended(EndReason::Superseded), vec![plain]);

        assert_eq!(
            h.apply(&hold, 12),
            Err(AdmissionError::Outranked {
                incoming: TemplateId(1),
                incumbent: strong,
            })
        );
        let active: Vec<_> = h.list.iter().map(|e| (e.id(), e.params().enchant_level)).collect();
        assert_eq!(active, vec![(strong, 15)]);
    }

    #[test]
    fn refresh_can_keep_the_original_enchant() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        h.config.refresh_resets_enchant = false;
        let hold = paralyze(1, 1);
        let enchanted = SkillRef::from_combined(hold.skill_id, 1, 1020);

        let first = h.cast(&hold, 10, Some(enchanted)).unwrap();
        let timer = first.timer().unwrap();
        h.tick(timer.effect, timer.generation);
        h.tick(timer.effect, timer.generation);
        assert_eq!(h.list.get(first.id()).unwrap().remaining_ticks(), 3);

        let refreshed = h.apply(&hold, 10).unwrap();
        assert!(matches!(refreshed, Admission::Refreshed { .. }));
        let effect = h.list.get(first.id()).unwrap();
        assert_eq!(effect.params().enchant_level, 20);
        assert_eq!(effect.remaining_ticks(), 5);

        h.config.refresh_resets_enchant = true;
        h.apply(&hold, 10).unwrap();
        assert_eq!(h.list.get(first.id()).unwrap().params().enchant_level, 0);
    }

    fn hold_with(behavior: &'static Behavior, h: &mut Harness) -> Effect {
        h.instance(&paralyze(1, 1), 10, None).with_behavior(behavior)
    }

    static FAILS_TO_START: Behavior = Behavior {
        on_start: |effect, ctx| {
            ctx.status.start_paralyze(effect.id());
            Err(HookError::Failed("start"))
        },
        on_action_time: |_, _| Ok(true),
        on_exit: |effect, ctx| {
            ctx.status.stop_paralyze(effect.id());
            Ok(())
        },
    };

    static FAILS_TO_TICK: Behavior = Behavior {
        on_start: |effect, ctx| {
            ctx.status.start_paralyze(effect.id());
            Ok(true)
        },
        on_action_time: |_, _| Err(HookError::Failed("tick")),
        on_exit: |effect, ctx| {
            ctx.status.stop_paralyze(effect.id());
            Ok(())
        },
    };

    static PANICS_ON_EXIT: Behavior = Behavior {
        on_start: |_, _| Ok(true),
        on_action_time: |_, _| Ok(true),
        on_exit: |_, _| panic!("exit exploded"),
    };

    #[test]
    fn failed_start_is_reverted_and_reported() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let effect = hold_with(&FAILS_TO_START, &mut h);
        let id = effect.id();

        let err = h.admit(effect).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::StartFailed {
                template: TemplateId(1),
                source: HookError::Failed("start"),
            }
        );
        assert!(h.list.is_empty());
        assert!(h.status.is_clear());
        assert_eq!(h.ended(EndReason::Faulted), vec![id]);
        assert!(!h.events.iter().any(|e| e.kind() == "started"));
    }

    #[test]
    fn failing_tick_ends_the_effect_as_faulted() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let effect = hold_with(&FAILS_TO_TICK, &mut h);
        let timer = h.admit(effect).unwrap().timer().unwrap();
        assert!(h.status.is_paralyzed());

        assert_eq!(
            h.tick(timer.effect, timer.generation),
            TickResult::Ended(EndReason::Faulted)
        );
        assert!(h.list.is_empty());
        assert!(h.status.is_clear());
        assert_eq!(h.ended(EndReason::Faulted), vec![timer.effect]);
        assert_eq!(h.tick(timer.effect, timer.generation), TickResult::Stale);
    }

    #[test]
    fn panicking_exit_still_ends_once() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let effect = hold_with(&PANICS_ON_EXIT, &mut h);
        let id = h.admit(effect).unwrap().id();

        assert_eq!(h.dispel(DispelSelector::Effect(id), DispelCause::Cleanse), 1);
        assert_eq!(h.dispel(DispelSelector::Effect(id), DispelCause::Cleanse), 0);
        assert!(h.list.is_empty());

        let ended: Vec<_> = h
            .events
            .iter()
            .filter_map(|e| e.end_reason().map(|reason| (e.effect().id, reason)))
            .collect();
        assert_eq!(ended, vec![(id, EndReason::Faulted)]);
    }

    #[test]
    fn stacks_with_self_creates_second_instance() {
        let mut h = Harness::new(ActorProfile::player(ActorId(1)));
        let bleed = Arc::new(
            EffectTemplate::new(
                TemplateId(7),
                "Bleed",
                SkillId(7),
                EffectKind::Periodic,
                AbnormalType::Bleed,
            )
            .with_duration(4, 1000)
            .with_power(-35)
            .stackable()
            .stacks_with_self(),
        );
        h.apply(&bleed, 10).unwrap();
        h.apply(&bleed, 10).unwrap();
        assert_eq!(h.list.active_of(AbnormalType::Bleed).count(), 2);
    }

    #[test]
    fn periodic_effect_ticks_until_exhausted() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        let admission = h.apply(&paralyze(1, 1), 10).unwrap();
        let mut timer = admission.timer().unwrap();

        let mut fired = 0;
        loop {
            fired += 1;
            match h.tick(timer.effect, timer.generation) {
                TickResult::Rescheduled(next) => timer = next,
                TickResult::Ended(reason) => {
                    assert_eq!(reason, EndReason::Expired);
                    break;
                }
                TickResult::Stale => panic!("timer went stale"),
            }
        }
        assert_eq!(fired, 5);
        assert_eq!(h.events.iter().filter(|e| e.is_tick()).count(), 5);
        assert!(h.list.is_empty());
        assert!(h.status.is_clear());
    }

    #[test]
    fn debuff_dispel_leaves_buff() {
        let mut h = Harness::new(ActorProfile::player(ActorId(1)));
        h.apply(&debuff(1), 10).unwrap();
        h.apply(&debuff(2), 11).unwrap();
        let kept = h.apply(&buff(3), 1).unwrap().id();

        let removed = h.dispel(
            DispelSelector::Abnormal(AbnormalType::Debuff),
            DispelCause::Cleanse,
        );
        assert_eq!(removed, 2);
        assert_eq!(h.list.iter().map(Effect::id).collect::<Vec<_>>(), vec![kept]);
        assert_eq!(h.status.effective(StatKind::PhysicalAttack, 100, 0, 1000), 115);
    }

    #[test]
    fn dispel_is_idempotent() {
        let mut h = Harness::new(ActorProfile::player(ActorId(1)));
        let id = h.apply(&buff(3), 1).unwrap().id();
        assert_eq!(h.dispel(DispelSelector::Effect(id), DispelCause::Cleanse), 1);
        assert_eq!(h.dispel(DispelSelector::Effect(id), DispelCause::Cleanse), 0);
        assert_eq!(
            h.dispel(DispelSelector::Effect(EffectId(999)), DispelCause::Cleanse),
            0
        );
        assert_eq!(h.ended(EndReason::Dispelled), vec![id]);
    }

    #[test]
    fn remove_all_exits_everything() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        h.apply(&paralyze(1, 1), 10).unwrap();
        h.apply(&debuff(2), 10).unwrap();
        h.apply(&buff(3), 10).unwrap();

        assert_eq!(h.remove_all(), 3);
        assert_eq!(h.ended(EndReason::ActorRemoved).len(), 3);
        assert!(h.list.is_empty());
        assert!(h.status.is_clear());
    }

    #[test]
    fn vetoed_lift_leaves_no_trace() {
        let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
        h.apply(&paralyze(1, 1), 10).unwrap();
        let err = h.apply(&lift_hold(2), 10).unwrap_err();

        assert_eq!(err, AdmissionError::Vetoed(TemplateId(2)));
        assert_eq!(h.list.len(), 1);
        assert_eq!(h.ended(EndReason::Vetoed).len(), 1);
        assert!(h.status.visuals().contains(crate::VisualEffects::PARALYZE));
        assert!(!h.status.visuals().contains(crate::VisualEffects::LIFT_HOLD));
    }

    #[test]
    fn effect_limit_rejects_new_admissions() {
        let mut h = Harness::new(ActorProfile::player(ActorId(1)));
        h.config = EngineConfig::default().with_max_effects(2);
        h.apply(&debuff(1), 10).unwrap();
        h.apply(&debuff(2), 10).unwrap();
        assert!(matches!(
            h.apply(&debuff(3), 10),
            Err(AdmissionError::ActorIneligible { .. })
        ));
    }

    /// Random admit/tick/dispel sequences never leave two non-stackable
    /// effects of one abnormal type active, and every started effect ends
    /// exactly once.
    #[test]
    fn random_sequences_keep_stacking_invariants() {
        let templates = [
            paralyze(1, 1),
            paralyze(2, 3),
            paralyze(3, 3),
            lift_hold(4),
            debuff(5),
            debuff(6),
            buff(7),
            buff(8),
        ];
        let selectors = [
            DispelSelector::AllDebuffs,
            DispelSelector::AllBuffs,
            DispelSelector::Abnormal(AbnormalType::Paralyze),
            DispelSelector::Caster(ActorId(10)),
            DispelSelector::All,
        ];

        for seed in 0..32u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut h = Harness::new(ActorProfile::monster(ActorId(50), 20_001));
            let mut timers: Vec<Registration> = Vec::new();

            for _ in 0..200 {
                match rng.random_range(0..10) {
                    0..=5 => {
                        let template = &templates[rng.random_range(0..templates.len())];
                        let caster = rng.random_range(10..13);
                        if let Ok(admission) = h.apply(template, caster) {
                            timers.extend(admission.timer());
                        }
                    }
                    6..=8 if !timers.is_empty() => {
                        let timer = timers.swap_remove(rng.random_range(0..timers.len()));
                        match timer.kind {
                            TimerKind::Tick => {
                                if let TickResult::Rescheduled(next) =
                                    h.tick(timer.effect, timer.generation)
                                {
                                    timers.push(next);
                                }
                            }
                            TimerKind::Expire => {
                                h.expire(timer.effect, timer.generation);
                            }
                        }
                    }
                    _ => {
                        let selector = selectors[rng.random_range(0..selectors.len())];
                        h.dispel(selector, DispelCause::Cleanse);
                    }
                }

                for abnormal in [AbnormalType::Paralyze, AbnormalType::AerialYoke, AbnormalType::Buff]
                {
                    let exclusive = h
                        .list
                        .active_of(abnormal)
                        .filter(|e| !e.template().stackable)
                        .count();
                    assert!(exclusive <= 1, "seed {seed}: {abnormal} has {exclusive} active");
                }
                assert!(h.list.iter().all(Effect::is_active));
            }

            h.remove_all();
            assert!(h.status.is_clear(), "seed {seed}: status not reverted");

            let mut started = HashSet::new();
            let mut ended = HashSet::new();
            for event in &h.events {
                match event {
                    EffectEvent::Started { effect, .. } => assert!(started.insert(effect.id)),
                    EffectEvent::Ended { effect, reason, .. } if *reason != EndReason::Vetoed => {
                        assert!(ended.insert(effect.id), "seed {seed}: {} ended twice", effect.id);
                    }
                    EffectEvent::Ended { effect, .. } => {
                        assert!(!started.contains(&effect.id), "vetoed effect had started");
                    }
                    _ => {}
                }
            }
            assert_eq!(started, ended, "seed {seed}");
        }
    }
}
