//! Background task that fires due timers.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::engine::EffectEngine;

/// One member of the scheduler pool.
///
/// Workers share the engine's queue; popping is atomic, so each timer is
/// handled by exactly one worker.
pub(crate) struct SchedulerWorker {
    id: usize,
    engine: Arc<EffectEngine>,
    shutdown: watch::Receiver<bool>,
    batch: usize,
}

impl SchedulerWorker {
    pub(crate) fn new(
        id: usize,
        engine: Arc<EffectEngine>,
        shutdown: watch::Receiver<bool>,
        batch: usize,
    ) -> Self {
        Self {
            id,
            engine,
            shutdown,
            batch: batch.max(1),
        }
    }

    /// Main worker loop.
    pub(crate) async fn run(mut self) {
        debug!(target: "runtime::scheduler", worker = self.id, "scheduler worker started");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            // Register for wakeups before looking at the queue so a timer
            // scheduled in between is not missed.
            let engine = Arc::clone(&self.engine);
            let notified = engine.queue().notify().notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let fired = self.engine.drain_due(self.batch);
            if fired == self.batch {
                tokio::task::yield_now().await;
                continue;
            }

            let wait = self
                .engine
                .next_due()
                .map(|due| due.saturating_sub(self.engine.now_ms()));

            tokio::select! {
                _ = self.shutdown.changed() => break,
                _ = &mut notified => {}
                _ = sleep_for(wait) => {}
            }
        }

        debug!(target: "runtime::scheduler", worker = self.id, "scheduler worker stopped");
    }
}

async fn sleep_for(wait: Option<u64>) {
    match wait {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => std::future::pending().await,
    }
}
