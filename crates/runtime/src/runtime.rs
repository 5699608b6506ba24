//! High-level runtime orchestrator.
//!
//! The runtime owns the scheduler workers, wires the engine to its event bus,
//! world registry and clock, and exposes a builder-based API.

use std::sync::Arc;

use effect_core::{ActorProfile, EngineConfig, TemplateOracle};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::{Result, RuntimeError, RuntimeHandle};
use crate::clock::{Clock, TokioClock};
use crate::engine::EffectEngine;
use crate::events::{Event, EventBus, Topic};
use crate::scheduler::SchedulerWorker;
use crate::world::ActorRegistry;

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    /// Scheduler workers to spawn. Zero means timers only fire through
    /// [`RuntimeHandle::advance_to`].
    pub worker_count: usize,
    pub event_buffer_size: usize,
    /// Timers a worker fires before yielding.
    pub drain_batch: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_WORKER_COUNT: usize = 2;
    pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;
    pub const DEFAULT_DRAIN_BATCH: usize = 64;

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(RuntimeError::InvalidConfig("event_buffer_size must be positive"));
        }
        if self.drain_batch == 0 {
            return Err(RuntimeError::InvalidConfig("drain_batch must be positive"));
        }
        if self.engine.expiry_unit_ms == 0 {
            return Err(RuntimeError::InvalidConfig("expiry_unit_ms must be positive"));
        }
        if self.engine.max_effects_per_actor == 0 {
            return Err(RuntimeError::InvalidConfig(
                "max_effects_per_actor must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            worker_count: Self::DEFAULT_WORKER_COUNT,
            event_buffer_size: Self::DEFAULT_EVENT_BUFFER_SIZE,
            drain_batch: Self::DEFAULT_DRAIN_BATCH,
        }
    }
}

/// Main runtime that drives effect timers.
///
/// Design: Runtime owns workers and coordinates shutdown.
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    shutdown_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Stop the workers and wait for them to finish.
    ///
    /// Timers still queued are dropped; active effects stay as they are.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx.send_replace(true);

        for worker in self.workers {
            worker.await.map_err(RuntimeError::WorkerJoin)?;
        }
        tracing::debug!(target: "runtime::scheduler", "runtime shut down");
        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    templates: Option<Arc<dyn TemplateOracle>>,
    world: Option<Arc<ActorRegistry>>,
    clock: Option<Arc<dyn Clock>>,
    actors: Vec<ActorProfile>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            templates: None,
            world: None,
            clock: None,
            actors: Vec::new(),
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the required template source
    pub fn templates(mut self, templates: impl TemplateOracle + 'static) -> Self {
        self.templates = Some(Arc::new(templates));
        self
    }

    /// Share a template source with other services
    pub fn shared_templates(mut self, templates: Arc<dyn TemplateOracle>) -> Self {
        self.templates = Some(templates);
        self
    }

    /// Use an existing world registry instead of an empty one
    pub fn world(mut self, world: Arc<ActorRegistry>) -> Self {
        self.world = Some(world);
        self
    }

    /// Replace the tokio-driven clock (e.g. with a `VirtualClock`)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Actors registered before any worker starts
    pub fn actors(mut self, actors: impl IntoIterator<Item = ActorProfile>) -> Self {
        self.actors.extend(actors);
        self
    }

    /// Build the runtime and spawn its workers
    pub async fn build(self) -> Result<Runtime> {
        let templates = self.templates.ok_or(RuntimeError::MissingTemplates)?;
        self.config.validate()?;

        let world = self.world.unwrap_or_default();
        for profile in self.actors {
            world.spawn(profile);
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()) as Arc<dyn Clock>);
        let events = EventBus::with_capacity(self.config.event_buffer_size);

        let engine = Arc::new(EffectEngine::new(
            self.config.engine.clone(),
            templates,
            world,
            clock,
            events,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let workers = (0..self.config.worker_count)
            .map(|id| {
                let worker = SchedulerWorker::new(
                    id,
                    Arc::clone(&engine),
                    shutdown_rx.clone(),
                    self.config.drain_batch,
                );
                tokio::spawn(async move {
                    worker.run().await;
                })
            })
            .collect();

        tracing::info!(
            target: "runtime::scheduler",
            workers = self.config.worker_count,
            actors = engine.world().len(),
            "effect runtime started"
        );

        Ok(Runtime {
            handle: RuntimeHandle::new(engine),
            shutdown_tx,
            workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use effect_core::TemplateRegistry;

    use super::*;

    #[tokio::test]
    async fn build_requires_templates() {
        let err = Runtime::builder().build().await.err();
        assert!(matches!(err, Some(RuntimeError::MissingTemplates)));
    }

    #[tokio::test]
    async fn build_rejects_zero_sized_channels() {
        let config = RuntimeConfig {
            event_buffer_size: 0,
            ..RuntimeConfig::default()
        };
        let err = Runtime::builder()
            .config(config)
            .templates(TemplateRegistry::default())
            .build()
            .await
            .err();
        assert!(matches!(err, Some(RuntimeError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn shutdown_joins_every_worker() {
        let runtime = Runtime::builder()
            .config(RuntimeConfig::default().with_workers(3))
            .templates(TemplateRegistry::default())
            .build()
            .await
            .unwrap();
        runtime.shutdown().await.unwrap();
    }
}
