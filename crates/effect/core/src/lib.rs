//! Effect model shared by the runtime and content tooling.
//!
//! `effect-core` defines the canonical rules for timed status effects: the
//! evaluation context ([`Env`]), gating predicates ([`Condition`]), immutable
//! [`EffectTemplate`]s, running [`Effect`] instances and the per-actor
//! [`EffectList`] that enforces stacking. Nothing in this crate blocks, spawns
//! or performs I/O; scheduling and synchronization live in the runtime.
pub mod actor;
pub mod condition;
pub mod config;
pub mod dispel;
pub mod effect;
pub mod env;
pub mod error;
pub mod list;
pub mod stats;
pub mod template;
pub mod types;

pub use actor::{ActorProfile, ActorStatus, ActorTags, VisualEffects};
pub use condition::Condition;
pub use config::EngineConfig;
pub use dispel::{DispelCause, DispelSelector};
pub use effect::{
    AdmissionError, Effect, EffectEvent, EffectState, EffectSummary, EndReason, HookCtx,
    HookError, Registration, TimerKind,
};
pub use env::{Env, OracleError, SkillRef, WorldOracle};
pub use error::{EngineError, ErrorSeverity};
pub use list::{Admission, EffectList, TickResult};
pub use stats::{Bonus, BonusStack, StatBonus, StatKind};
pub use template::{
    AbnormalType, EffectFlags, EffectKind, EffectTemplate, EnchantVariant, RegistryError,
    ResolvedParams, TemplateOracle, TemplateRegistry, TieBreak,
};
pub use types::{ActorId, EffectId, Position, SkillId, TemplateId};
