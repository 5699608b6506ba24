//! Timer queue and the worker pool that drains it.
//!
//! Every active effect that needs a timer has one entry in the [`TickQueue`].
//! Workers pop due entries and hand them to the engine, which locks the
//! owning actor and routes the timer to its effect list.
mod metrics;
mod queue;
mod worker;

pub use metrics::SchedulerMetrics;
pub use queue::{TickQueue, TimerEntry};
pub(crate) use worker::SchedulerWorker;
