//! Cloneable façade over the effect engine.
//!
//! [`RuntimeHandle`] is what game systems hold: skill casting, cleansing,
//! death and despawn handlers call into it from any thread. Every call
//! completes synchronously; timers run on the runtime's worker pool.
use std::collections::HashMap;
use std::sync::Arc;

use effect_core::{
    ActorId, ActorProfile, ActorStatus, AdmissionError, DispelSelector, EffectSummary, SkillId,
    SkillRef, TemplateId,
};
use tokio::sync::broadcast;

use super::errors::Result;
use crate::engine::{ApplyRequest, EffectEngine, EffectHandle};
use crate::events::{Event, Topic};
use crate::scheduler::SchedulerMetrics;

/// Client-facing handle to interact with the runtime
#[derive(Clone, Debug)]
pub struct RuntimeHandle {
    engine: Arc<EffectEngine>,
}

impl RuntimeHandle {
    pub(crate) fn new(engine: Arc<EffectEngine>) -> Self {
        Self { engine }
    }

    /// Apply a single template.
    pub fn apply_effect(&self, request: ApplyRequest) -> Result<EffectHandle> {
        Ok(self.engine.apply_effect(request)?)
    }

    /// Apply every template of a cast skill, reporting each outcome.
    pub fn apply_skill(
        &self,
        caster: ActorId,
        target: ActorId,
        skill: SkillRef,
    ) -> Vec<(TemplateId, std::result::Result<EffectHandle, AdmissionError>)> {
        self.engine.apply_skill(caster, target, skill)
    }

    /// Dispel matching effects; returns how many were removed.
    pub fn dispel(&self, actor: ActorId, selector: DispelSelector) -> usize {
        self.engine.dispel(actor, selector)
    }

    /// Voluntary cancel of a buff by its owner (or the owner of a summon).
    pub fn cancel_buff(&self, requester: ActorId, actor: ActorId, skill: SkillId) -> usize {
        self.engine.cancel_buff(requester, actor, skill)
    }

    pub fn spawn_actor(&self, profile: ActorProfile) {
        self.engine.spawn_actor(profile);
    }

    pub fn on_actor_death(&self, actor: ActorId) -> usize {
        self.engine.on_actor_death(actor)
    }

    pub fn on_actor_revived(&self, actor: ActorId) -> bool {
        self.engine.on_actor_revived(actor)
    }

    pub fn on_actor_removed(&self, actor: ActorId) -> usize {
        self.engine.on_actor_removed(actor)
    }

    pub fn effects(&self, actor: ActorId) -> Vec<EffectSummary> {
        self.engine.effects(actor)
    }

    pub fn status(&self, actor: ActorId) -> Option<ActorStatus> {
        self.engine.status(actor)
    }

    /// Fire timers up to `deadline_ms` on the calling thread.
    ///
    /// Meant for runtimes built with a [`VirtualClock`](crate::VirtualClock)
    /// and no workers.
    pub fn advance_to(&self, deadline_ms: u64) -> usize {
        self.engine.advance_to(deadline_ms)
    }

    pub fn now_ms(&self) -> u64 {
        self.engine.now_ms()
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        self.engine.metrics()
    }

    pub fn engine(&self) -> &Arc<EffectEngine> {
        &self.engine
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Effects` - every lifecycle event, ticks included
    /// - `Topic::Lifecycle` - starts, refreshes and ends only
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.engine.events().subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.engine.events().subscribe_multiple(topics)
    }
}
