//! Running effect instances and their lifecycle state machine.
//!
//! ```text
//! Pending ──start()──► Active ──exit()──► Exited
//!    │                  │  ▲
//!    │ veto             └──┘ action_time()
//!    └──────────────────────────────────► Exited
//! ```
//!
//! `Exited` is terminal. [`Effect::exit`] runs `on_exit` only on the
//! transition out of `Active`, so racing dispels and ticks can never revert
//! an effect twice.
pub mod behavior;
mod error;
mod event;

pub use behavior::Behavior;
pub use error::{AdmissionError, HookError};
pub use event::{EffectEvent, EffectSummary, EndReason};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::actor::{ActorProfile, ActorStatus};
use crate::env::SkillRef;
use crate::template::{AbnormalType, EffectTemplate, ResolvedParams};
use crate::types::{ActorId, EffectId};

/// Lifecycle state of an [`Effect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EffectState {
    #[default]
    Pending,
    Active,
    Exited,
}

/// Mutable view handed to lifecycle hooks.
pub struct HookCtx<'a> {
    pub profile: &'a ActorProfile,
    pub status: &'a mut ActorStatus,
}

impl<'a> HookCtx<'a> {
    pub fn new(profile: &'a ActorProfile, status: &'a mut ActorStatus) -> Self {
        Self { profile, status }
    }
}

/// Kind of timer an active effect needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Periodic `on_action_time` invocation.
    Tick,
    /// One-shot expiry of an effect without periodic behavior.
    Expire,
}

/// Request to schedule a timer for an effect.
///
/// `generation` ties the timer to one activation or refresh. A timer whose
/// generation no longer matches the effect is stale and must be ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Registration {
    pub actor: ActorId,
    pub effect: EffectId,
    pub kind: TimerKind,
    pub delay_ms: u64,
    pub generation: u32,
}

/// One running instance of a template on one actor.
#[derive(Debug)]
pub struct Effect {
    id: EffectId,
    template: Arc<EffectTemplate>,
    behavior: &'static Behavior,
    caster: ActorId,
    effected: ActorId,
    skill: Option<SkillRef>,
    params: ResolvedParams,
    abnormal_type: AbnormalType,
    remaining_ticks: u32,
    ticks_fired: u32,
    stack_order: u64,
    generation: u32,
    state: EffectState,
}

impl Effect {
    /// Instantiates `template` for a cast. The effect starts `Pending`.
    pub fn new(
        id: EffectId,
        template: Arc<EffectTemplate>,
        caster: ActorId,
        effected: ActorId,
        skill: Option<SkillRef>,
    ) -> Self {
        let params = template.resolve(skill);
        Self {
            id,
            behavior: template.kind.behavior(),
            abnormal_type: template.abnormal_type,
            remaining_ticks: params.duration_ticks,
            template,
            caster,
            effected,
            skill,
            params,
            ticks_fired: 0,
            stack_order: 0,
            generation: 0,
            state: EffectState::Pending,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_behavior(mut self, behavior: &'static Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    // ===== accessors =====

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn template(&self) -> &Arc<EffectTemplate> {
        &self.template
    }

    pub fn behavior(&self) -> &'static Behavior {
        self.behavior
    }

    pub fn caster(&self) -> ActorId {
        self.caster
    }

    pub fn effected(&self) -> ActorId {
        self.effected
    }

    pub fn skill(&self) -> Option<SkillRef> {
        self.skill
    }

    pub fn params(&self) -> &ResolvedParams {
        &self.params
    }

    pub fn abnormal_type(&self) -> AbnormalType {
        self.abnormal_type
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    pub fn ticks_fired(&self) -> u32 {
        self.ticks_fired
    }

    pub fn stack_order(&self) -> u64 {
        self.stack_order
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == EffectState::Active
    }

    pub fn is_permanent(&self) -> bool {
        self.params.duration_ticks == 0
    }

    pub(crate) fn set_stack_order(&mut self, order: u64) {
        self.stack_order = order;
    }

    // ===== lifecycle =====

    /// `Pending → Active`.
    ///
    /// Returns `Ok(false)` when `on_start` vetoed: the effect is `Exited` and
    /// `on_exit` is not invoked. On a hook error the partially applied state
    /// is reverted through `on_exit` and the effect is `Exited`.
    pub fn start(&mut self, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
        if self.state != EffectState::Pending {
            return Ok(self.is_active());
        }

        let on_start = self.behavior.on_start;
        match guarded(|| on_start(self, ctx)) {
            Ok(true) => {
                self.state = EffectState::Active;
                Ok(true)
            }
            Ok(false) => {
                self.state = EffectState::Exited;
                Ok(false)
            }
            Err(error) => {
                let on_exit = self.behavior.on_exit;
                // Revert whatever was applied before the failure; a second
                // failure here is subsumed by the first.
                let _ = guarded(|| on_exit(self, ctx));
                self.state = EffectState::Exited;
                Err(error)
            }
        }
    }

    /// Runs one periodic tick. Returns `Ok(false)` when the effect is not
    /// active (the hook is not invoked) or completed on its own.
    pub fn action_time(&mut self, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
        if !self.is_active() {
            return Ok(false);
        }
        let on_action_time = self.behavior.on_action_time;
        guarded(|| on_action_time(self, ctx))
    }

    /// `Active → Exited`, running `on_exit` exactly once.
    ///
    /// Returns `Ok(false)` if the effect had already left `Active`. After this
    /// call the effect is `Exited` regardless of the hook's outcome.
    pub fn exit(&mut self, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
        match self.state {
            EffectState::Active => {
                self.state = EffectState::Exited;
                let on_exit = self.behavior.on_exit;
                guarded(|| on_exit(self, ctx)).map(|()| true)
            }
            EffectState::Pending => {
                self.state = EffectState::Exited;
                Ok(false)
            }
            EffectState::Exited => Ok(false),
        }
    }

    /// Counts a completed periodic tick. Returns true when the duration is
    /// exhausted.
    pub(crate) fn consume_tick(&mut self) -> bool {
        self.ticks_fired += 1;
        if self.is_permanent() {
            return false;
        }
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }

    /// Restarts the duration with a new cast's parameters and invalidates
    /// pending timers.
    pub fn refresh(&mut self, params: ResolvedParams, adopt_enchant: bool) {
        let enchant_level = if adopt_enchant {
            params.enchant_level
        } else {
            self.params.enchant_level
        };
        self.params = ResolvedParams {
            enchant_level,
            ..params
        };
        self.remaining_ticks = params.duration_ticks;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Timer this effect needs in its current generation, if any.
    ///
    /// Periodic effects tick every `tick_interval_ms`. Others expire once after
    /// `duration × expiry_unit_ms`; permanent non-periodic effects need no timer.
    pub fn registration(&self, expiry_unit_ms: u64) -> Option<Registration> {
        if !self.is_active() {
            return None;
        }

        let (kind, delay_ms) = if self.template.is_periodic() {
            (TimerKind::Tick, self.template.tick_interval_ms)
        } else if self.is_permanent() {
            return None;
        } else {
            (
                TimerKind::Expire,
                u64::from(self.remaining_ticks).saturating_mul(expiry_unit_ms),
            )
        };

        Some(Registration {
            actor: self.effected,
            effect: self.id,
            kind,
            delay_ms,
            generation: self.generation,
        })
    }

    pub fn summary(&self) -> EffectSummary {
        EffectSummary {
            id: self.id,
            template: self.template.id,
            caster: self.caster,
            skill: self.skill,
            abnormal_type: self.abnormal_type,
            remaining_ticks: self.remaining_ticks,
            ticks_fired: self.ticks_fired,
            enchant_level: self.params.enchant_level,
            icon: self.template.icon,
        }
    }
}

/// Runs a hook, converting a panic into [`HookError::Panicked`].
fn guarded<T>(hook: impl FnOnce() -> Result<T, HookError>) -> Result<T, HookError> {
    panic::catch_unwind(AssertUnwindSafe(hook))
        .unwrap_or_else(|payload| Err(HookError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::VisualEffects;
    use crate::template::EffectKind;
    use crate::types::{SkillId, TemplateId};

    fn paralyze(ticks: u32, interval: u64) -> Effect {
        let template = EffectTemplate::new(
            TemplateId(10),
            "Hold",
            SkillId(100),
            EffectKind::Paralyze,
            AbnormalType::Paralyze,
        )
        .with_duration(ticks, interval);
        Effect::new(EffectId(1), Arc::new(template), ActorId(1), ActorId(2), None)
    }

    fn panicking_exit(_: &Effect, _: &mut HookCtx<'_>) -> Result<(), HookError> {
        panic!("exit exploded")
    }

    fn failing_start(effect: &Effect, ctx: &mut HookCtx<'_>) -> Result<bool, HookError> {
        ctx.status.start_paralyze(effect.id());
        Err(HookError::Failed("boom"))
    }

    static PANICS_ON_EXIT: Behavior = Behavior {
        on_start: |_, _| Ok(true),
        on_action_time: |_, _| Ok(true),
        on_exit: panicking_exit,
    };

    static FAILS_ON_START: Behavior = Behavior {
        on_start: failing_start,
        on_action_time: |_, _| Ok(true),
        on_exit: |effect, ctx| {
            ctx.status.stop_paralyze(effect.id());
            Ok(())
        },
    };

    #[test]
    fn exit_is_terminal() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let mut effect = paralyze(5, 1000);

        assert!(effect.start(&mut HookCtx::new(&profile, &mut status)).unwrap());
        assert!(status.is_paralyzed());
        assert!(effect.exit(&mut HookCtx::new(&profile, &mut status)).unwrap());
        assert!(!effect.exit(&mut HookCtx::new(&profile, &mut status)).unwrap());
        assert_eq!(effect.state(), EffectState::Exited);
        assert!(status.is_clear());
    }

    #[test]
    fn ticks_after_exit_do_not_reach_the_hook() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let mut effect = paralyze(5, 1000);
        effect.start(&mut HookCtx::new(&profile, &mut status)).unwrap();
        effect.exit(&mut HookCtx::new(&profile, &mut status)).unwrap();

        assert!(!effect.action_time(&mut HookCtx::new(&profile, &mut status)).unwrap());
        assert_eq!(effect.ticks_fired(), 0);
    }

    #[test]
    fn failed_start_reverts_partial_state() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let mut effect = paralyze(5, 1000).with_behavior(&FAILS_ON_START);

        let err = effect
            .start(&mut HookCtx::new(&profile, &mut status))
            .unwrap_err();
        assert_eq!(err, HookError::Failed("boom"));
        assert_eq!(effect.state(), EffectState::Exited);
        assert!(status.is_clear());
    }

    #[test]
    fn exit_panic_is_captured_and_still_terminal() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let mut effect = paralyze(5, 1000).with_behavior(&PANICS_ON_EXIT);
        effect.start(&mut HookCtx::new(&profile, &mut status)).unwrap();

        let err = effect
            .exit(&mut HookCtx::new(&profile, &mut status))
            .unwrap_err();
        assert_eq!(err, HookError::Panicked("exit exploded".into()));
        assert_eq!(effect.state(), EffectState::Exited);
    }

    #[test]
    fn registration_depends_on_periodicity() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();

        let mut periodic = paralyze(5, 1000);
        assert_eq!(periodic.registration(1000), None);
        periodic.start(&mut HookCtx::new(&profile, &mut status)).unwrap();
        let timer = periodic.registration(1000).unwrap();
        assert_eq!((timer.kind, timer.delay_ms), (TimerKind::Tick, 1000));

        let mut timed = paralyze(30, 0);
        timed.start(&mut HookCtx::new(&profile, &mut status)).unwrap();
        let timer = timed.registration(1000).unwrap();
        assert_eq!((timer.kind, timer.delay_ms), (TimerKind::Expire, 30_000));

        let mut permanent = paralyze(0, 0);
        permanent.start(&mut HookCtx::new(&profile, &mut status)).unwrap();
        assert_eq!(permanent.registration(1000), None);
    }

    #[test]
    fn refresh_restarts_duration_and_bumps_generation() {
        let profile = ActorProfile::player(ActorId(2));
        let mut status = ActorStatus::new();
        let mut effect = paralyze(5, 1000);
        effect.start(&mut HookCtx::new(&profile, &mut status)).unwrap();
        effect.consume_tick();
        effect.consume_tick();
        assert_eq!(effect.remaining_ticks(), 3);

        let params = effect.template().resolve(None);
        effect.refresh(params, true);
        assert_eq!(effect.remaining_ticks(), 5);
        assert_eq!(effect.generation(), 1);
        assert_eq!(effect.ticks_fired(), 2);
        assert!(status.visuals().contains(VisualEffects::PARALYZE));
    }
}
