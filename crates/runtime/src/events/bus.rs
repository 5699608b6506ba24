//! Topic-based event bus implementation.

use std::collections::HashMap;

use effect_core::EffectEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Every lifecycle event, ticks included
    Effects,
    /// Start, refresh and end events only
    Lifecycle,
}

/// Lifecycle event stamped with the engine time it happened at.
///
/// Timer-driven events carry the timer's due time, not the instant a worker
/// got around to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub at_ms: u64,
    pub event: EffectEvent,
}

impl Event {
    pub fn new(at_ms: u64, event: EffectEvent) -> Self {
        Self { at_ms, event }
    }

    pub fn topics(&self) -> &'static [Topic] {
        if self.event.is_tick() {
            &[Topic::Effects]
        } else {
            &[Topic::Effects, Topic::Lifecycle]
        }
    }
}

/// Topic-based event bus
///
/// Delivery is fire-and-forget: publishing never blocks, and a topic without
/// subscribers silently drops the event. Slow subscribers observe
/// `RecvError::Lagged` rather than stalling the engine.
#[derive(Clone)]
pub struct EventBus {
    effects: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Creates a new event bus with specified capacity per topic
    ///
    /// `capacity` is clamped to at least 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            effects: broadcast::channel(capacity).0,
            lifecycle: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Effects => &self.effects,
            Topic::Lifecycle => &self.lifecycle,
        }
    }

    /// Publish an event to every topic it belongs to
    pub fn publish(&self, event: Event) {
        for &topic in event.topics() {
            if self.sender(topic).send(event.clone()).is_err() {
                tracing::trace!(target: "runtime::events", ?topic, "no subscribers");
            }
        }
    }

    /// Publish a batch produced by one engine call, preserving order
    pub fn publish_all(&self, at_ms: u64, events: impl IntoIterator<Item = EffectEvent>) {
        for event in events {
            self.publish(Event::new(at_ms, event));
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("effects_subscribers", &self.effects.receiver_count())
            .field("lifecycle_subscribers", &self.lifecycle.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use effect_core::{
        AbnormalType, ActorId, EffectId, EffectSummary, EndReason, TemplateId,
    };

    use super::*;

    fn summary() -> EffectSummary {
        EffectSummary {
            id: EffectId(1),
            template: TemplateId(12),
            caster: ActorId(1),
            skill: None,
            abnormal_type: AbnormalType::Poison,
            remaining_ticks: 3,
            ticks_fired: 2,
            enchant_level: 0,
            icon: 0,
        }
    }

    #[tokio::test]
    async fn ticks_skip_the_lifecycle_topic() {
        let bus = EventBus::with_capacity(8);
        let mut all = bus.subscribe(Topic::Effects);
        let mut lifecycle = bus.subscribe(Topic::Lifecycle);

        bus.publish_all(
            1000,
            [
                EffectEvent::Ticked {
                    actor: ActorId(2),
                    effect: summary(),
                    magnitude: -40,
                },
                EffectEvent::Ended {
                    actor: ActorId(2),
                    effect: summary(),
                    reason: EndReason::Dispelled,
                },
            ],
        );

        assert!(all.recv().await.unwrap().event.is_tick());
        assert_eq!(
            all.recv().await.unwrap().event.end_reason(),
            Some(EndReason::Dispelled)
        );
        let only = lifecycle.recv().await.unwrap();
        assert_eq!(only.at_ms, 1000);
        assert_eq!(only.event.end_reason(), Some(EndReason::Dispelled));
        assert!(lifecycle.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(Event::new(
            0,
            EffectEvent::Started {
                actor: ActorId(1),
                effect: summary(),
            },
        ));
    }
}
