//! Effect engine service.
//!
//! [`EffectEngine`] ties the pure effect model to shared infrastructure: it
//! looks up templates, evaluates conditions against the [`ActorRegistry`],
//! locks the target actor, runs admission or removal on its effect list, then
//! publishes the resulting events and queues timers.
//!
//! Lock order is always actor state → timer queue. The queue lock is never
//! held while an actor is being locked.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use effect_core::{
    ActorId, ActorProfile, ActorStatus, Admission, AdmissionError, DispelCause, DispelSelector,
    Effect, EffectEvent, EffectId, EffectList, EffectSummary, EffectTemplate, EndReason,
    EngineConfig, Env, HookCtx, Registration, SkillId, SkillRef, TemplateId, TemplateOracle,
    TickResult, TimerKind, WorldOracle,
};
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::events::EventBus;
use crate::scheduler::{SchedulerMetrics, TickQueue, TimerEntry};
use crate::world::{ActorRegistry, ActorSlot, ActorState};

/// Request to apply one template.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApplyRequest {
    pub template: TemplateId,
    pub caster: ActorId,
    pub target: ActorId,
    pub skill: Option<SkillRef>,
    /// Free numeric input exposed to conditions (e.g. damage dealt).
    pub value: f64,
}

impl ApplyRequest {
    pub fn new(template: TemplateId, caster: ActorId, target: ActorId) -> Self {
        Self {
            template,
            caster,
            target,
            skill: None,
            value: 0.0,
        }
    }

    pub fn with_skill(mut self, skill: SkillRef) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }
}

/// Result of a successful application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectHandle {
    pub actor: ActorId,
    pub effect: EffectId,
    /// True when an existing instance was refreshed instead of a new one starting.
    pub refreshed: bool,
}

/// Thread-safe effect service shared by the runtime handle and workers.
pub struct EffectEngine {
    config: EngineConfig,
    templates: Arc<dyn TemplateOracle>,
    world: Arc<ActorRegistry>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    queue: TickQueue,
    metrics: SchedulerMetrics,
    next_effect: AtomicU64,
}

impl EffectEngine {
    pub fn new(
        config: EngineConfig,
        templates: Arc<dyn TemplateOracle>,
        world: Arc<ActorRegistry>,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            templates,
            world,
            clock,
            events,
            queue: TickQueue::new(),
            metrics: SchedulerMetrics::new(),
            next_effect: AtomicU64::new(1),
        }
    }

    // ===== accessors =====

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<ActorRegistry> {
        &self.world
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(crate) fn queue(&self) -> &TickQueue {
        &self.queue
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.queue.next_due()
    }

    pub fn pending_timers(&self) -> usize {
        self.queue.len()
    }

    // ===== actors =====

    pub fn spawn_actor(&self, profile: ActorProfile) {
        debug!(target: "runtime::engine", actor = %profile.id, "actor spawned");
        self.world.spawn(profile);
    }

    /// Active effects of `actor` in application order.
    ///
    /// Periodic effects report the ticks they have left. Timed effects without
    /// periodic ticks report the expiry units left until their timer fires.
    pub fn effects(&self, actor: ActorId) -> Vec<EffectSummary> {
        let Some(slot) = self.world.slot(actor) else {
            return Vec::new();
        };
        let state = slot.lock();
        let now = self.clock.now_ms();
        let unit = self.config.expiry_unit_ms.max(1);

        let mut summaries = state.effects.summaries();
        for summary in &mut summaries {
            if let Some(due) = self.queue.expiry_of(actor, summary.id) {
                let left = due.saturating_sub(now).div_ceil(unit);
                summary.remaining_ticks = u32::try_from(left).unwrap_or(u32::MAX);
            }
        }
        summaries
    }

    /// Effect-driven status of `actor`.
    pub fn status(&self, actor: ActorId) -> Option<ActorStatus> {
        self.world.slot(actor).map(|slot| slot.lock().status.clone())
    }

    // ===== application =====

    /// Applies one template to `request.target`.
    ///
    /// # Errors
    ///
    /// Returns an [`AdmissionError`] when the template or target is unknown,
    /// the target is dead, the condition gate fails, a stronger effect holds
    /// the abnormal type, or the effect refuses or fails to start. Nothing is
    /// left applied on error.
    pub fn apply_effect(&self, request: ApplyRequest) -> Result<EffectHandle, AdmissionError> {
        let Some(template) = self.templates.template(request.template) else {
            warn!(
                target: "runtime::engine",
                template = %request.template,
                caster = %request.caster,
                target_actor = %request.target,
                "template not found"
            );
            return Err(AdmissionError::TemplateNotFound(request.template));
        };
        self.admit(template, request)
    }

    /// Applies every template registered for `skill.id`.
    pub fn apply_skill(
        &self,
        caster: ActorId,
        target: ActorId,
        skill: SkillRef,
    ) -> Vec<(TemplateId, Result<EffectHandle, AdmissionError>)> {
        let templates = self.templates.templates_for_skill(skill.id);
        if templates.is_empty() {
            warn!(target: "runtime::engine", skill = %skill.id, "skill has no effect templates");
        }
        templates
            .into_iter()
            .map(|template| {
                let id = template.id;
                let request = ApplyRequest::new(id, caster, target).with_skill(skill);
                (id, self.admit(template, request))
            })
            .collect()
    }

    fn admit(
        &self,
        template: Arc<EffectTemplate>,
        request: ApplyRequest,
    ) -> Result<EffectHandle, AdmissionError> {
        let slot = self
            .world
            .slot(request.target)
            .ok_or(AdmissionError::ActorNotFound(request.target))?;
        let target = slot.profile();
        if !target.alive {
            return Err(AdmissionError::ActorIneligible {
                actor: request.target,
                reason: "actor is dead",
            });
        }

        if let Some(condition) = &template.condition {
            let caster = self.world.actor(request.caster);
            let mut env = Env::new(self.world.as_ref())
                .with_caster(caster.as_ref())
                .with_target(Some(&target))
                .with_value(request.value);
            if let Some(skill) = request.skill {
                env = env.with_skill(skill);
            }
            if !condition.evaluate(&env) {
                debug!(
                    target: "runtime::engine",
                    template = %template.id,
                    caster = %request.caster,
                    target_actor = %request.target,
                    "condition failed"
                );
                return Err(AdmissionError::ConditionFailed(template.id));
            }
        }

        let id = EffectId(self.next_effect.fetch_add(1, Ordering::Relaxed));
        let effect = Effect::new(id, template, request.caster, request.target, request.skill);

        let mut state = slot.lock();
        if state.removed {
            return Err(AdmissionError::ActorNotFound(request.target));
        }
        // Liveness may have changed while the condition ran.
        let target = slot.profile();
        if !target.alive {
            return Err(AdmissionError::ActorIneligible {
                actor: request.target,
                reason: "actor is dead",
            });
        }
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        let ActorState {
            status, effects, ..
        } = &mut *state;
        let mut ctx = HookCtx::new(&target, status);
        let result = effects.admit(effect, &mut ctx, &self.config, &mut events);
        self.settle(now, events);

        let admission = result?;
        if let Some(timer) = admission.timer() {
            self.schedule(timer, now.saturating_add(timer.delay_ms));
        }
        Ok(EffectHandle {
            actor: request.target,
            effect: admission.id(),
            refreshed: matches!(admission, Admission::Refreshed { .. }),
        })
    }

    // ===== removal =====

    /// Cleanse-style dispel. Returns how many effects were removed; unknown
    /// actors and empty matches yield 0.
    pub fn dispel(&self, actor: ActorId, selector: DispelSelector) -> usize {
        self.dispel_with(actor, selector, DispelCause::Cleanse)
    }

    /// A player cancels the effects of `skill` on their own actor or on one of
    /// their summons.
    pub fn cancel_buff(&self, requester: ActorId, actor: ActorId, skill: SkillId) -> usize {
        if requester != actor {
            let owned = self
                .world
                .actor(actor)
                .is_some_and(|profile| profile.owner == Some(requester));
            if !owned {
                debug!(
                    target: "runtime::engine",
                    %requester,
                    %actor,
                    "cancel refused: actor not owned by requester"
                );
                return 0;
            }
        }
        self.dispel_with(actor, DispelSelector::Skill(skill), DispelCause::Voluntary)
    }

    /// Marks the actor dead and drops every effect that does not survive death.
    pub fn on_actor_death(&self, actor: ActorId) -> usize {
        if !self.world.update_profile(actor, |profile| profile.alive = false) {
            return 0;
        }
        self.dispel_with(actor, DispelSelector::All, DispelCause::Death)
    }

    /// Brings a dead actor back; its surviving effects keep running.
    pub fn on_actor_revived(&self, actor: ActorId) -> bool {
        self.world.update_profile(actor, |profile| profile.alive = true)
    }

    /// Unregisters the actor and exits all of its effects.
    pub fn on_actor_removed(&self, actor: ActorId) -> usize {
        let Some(slot) = self.world.remove(actor) else {
            return 0;
        };
        let profile = slot.profile();
        let mut state = slot.lock();
        state.removed = true;

        let now = self.clock.now_ms();
        let mut events = Vec::new();
        let ActorState {
            status, effects, ..
        } = &mut *state;
        let mut ctx = HookCtx::new(&profile, status);
        let removed = effects.remove_all(EndReason::ActorRemoved, &mut ctx, &mut events);
        self.settle(now, events);
        debug!(target: "runtime::engine", %actor, removed, "actor removed");
        removed
    }

    fn dispel_with(&self, actor: ActorId, selector: DispelSelector, cause: DispelCause) -> usize {
        let Some(slot) = self.world.slot(actor) else {
            return 0;
        };
        self.with_actor(&slot, self.clock.now_ms(), |effects, ctx, config, events| {
            effects.dispel(selector, cause, config, ctx, events)
        })
    }

    // ===== timers =====

    /// Fires up to `max` timers that are due by the clock's current time.
    pub fn drain_due(&self, max: usize) -> usize {
        let entries = self.queue.pop_due(self.clock.now_ms(), max);
        let fired = entries.len();
        for entry in entries {
            self.fire(entry);
        }
        fired
    }

    /// Fires every timer due at or before `deadline_ms` in due order, moving a
    /// manual clock along with them. Timers rescheduled inside the window fire
    /// too.
    pub fn advance_to(&self, deadline_ms: u64) -> usize {
        let mut fired = 0;
        while let Some(entry) = self.queue.pop_due(deadline_ms, 1).pop() {
            self.clock.advance_to(entry.due_ms);
            self.fire(entry);
            fired += 1;
        }
        self.clock.advance_to(deadline_ms);
        fired
    }

    fn schedule(&self, registration: Registration, due_ms: u64) {
        self.queue.schedule_at(registration, due_ms);
        self.metrics.observe_queue_depth(self.queue.len() as u64);
    }

    fn fire(&self, entry: TimerEntry) {
        let registration = entry.registration;
        let Some(slot) = self.world.slot(registration.actor) else {
            self.metrics.record_stale();
            return;
        };

        let outcome = self.with_actor(&slot, entry.due_ms, |effects, ctx, config, events| {
            let outcome = match registration.kind {
                TimerKind::Tick => effects.tick(
                    registration.effect,
                    registration.generation,
                    ctx,
                    config,
                    events,
                ),
                TimerKind::Expire => {
                    if effects.expire(registration.effect, registration.generation, ctx, events) {
                        TickResult::Ended(EndReason::Expired)
                    } else {
                        TickResult::Stale
                    }
                }
            };
            // Reschedule before the actor lock is released.
            if let TickResult::Rescheduled(next) = outcome {
                self.schedule(next, entry.due_ms.saturating_add(next.delay_ms));
            }
            outcome
        });

        match outcome {
            TickResult::Stale => {
                self.metrics.record_stale();
                trace!(
                    target: "runtime::scheduler",
                    actor = %registration.actor,
                    effect = %registration.effect,
                    "stale timer discarded"
                );
            }
            TickResult::Rescheduled(_) => {
                self.metrics.record_fired();
                self.metrics.record_rescheduled();
            }
            TickResult::Ended(reason) => {
                self.metrics.record_fired();
                self.metrics.record_ended();
                trace!(
                    target: "runtime::scheduler",
                    actor = %registration.actor,
                    effect = %registration.effect,
                    %reason,
                    "effect ended by timer"
                );
            }
        }
    }

    /// Locks `slot`, runs `op` against its effect list and settles the events
    /// it produced before unlocking.
    fn with_actor<T>(
        &self,
        slot: &ActorSlot,
        at_ms: u64,
        op: impl FnOnce(
            &mut EffectList,
            &mut HookCtx<'_>,
            &EngineConfig,
            &mut Vec<EffectEvent>,
        ) -> T,
    ) -> T {
        let profile = slot.profile();
        let mut state = slot.lock();
        let ActorState {
            status, effects, ..
        } = &mut *state;
        let mut ctx = HookCtx::new(&profile, status);
        let mut events = Vec::new();
        let result = op(effects, &mut ctx, &self.config, &mut events);
        self.settle(at_ms, events);
        result
    }

    /// Cancels the timers of effects that just ended, then publishes `events`.
    fn settle(&self, at_ms: u64, events: Vec<EffectEvent>) {
        for event in &events {
            if event.end_reason().is_some() {
                self.queue.cancel(event.actor(), event.effect().id);
            }
        }
        self.events.publish_all(at_ms, events);
    }
}

impl std::fmt::Debug for EffectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectEngine")
            .field("config", &self.config)
            .field("actors", &self.world.len())
            .field("pending_timers", &self.queue.len())
            .finish()
    }
}
