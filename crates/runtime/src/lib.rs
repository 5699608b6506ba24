//! Runtime services for the effect engine.
//!
//! This crate wires the pure model from `effect-core` to shared state and
//! time: a world registry with per-actor locking, a time-ordered timer queue
//! drained by a worker pool, and a topic-based event bus. Consumers embed
//! [`Runtime`] and interact with it through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`engine`] applies, dispels and ticks effects
//! - [`events`] provides the topic-based event bus
//! - [`scheduler`] keeps the timer queue and background workers
//! - [`world`] and [`clock`] are the adapters the engine reads from
pub mod api;
pub mod clock;
pub mod engine;
pub mod events;
pub mod runtime;
pub mod scheduler;
pub mod world;

pub use api::{Result, RuntimeError, RuntimeHandle};
pub use clock::{Clock, TokioClock, VirtualClock};
pub use engine::{ApplyRequest, EffectEngine, EffectHandle};
pub use events::{Event, EventBus, Topic};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use scheduler::{SchedulerMetrics, TickQueue, TimerEntry};
pub use world::{ActorRegistry, ActorSlot, ActorState};
