//! Topic-based event bus for effect lifecycle events.
//!
//! Events are published to topics, and consumers subscribe only to the topics
//! they need. Events of one actor are published while that actor is locked, so
//! subscribers see them in lifecycle order.

mod bus;

pub use bus::{Event, EventBus, Topic};
