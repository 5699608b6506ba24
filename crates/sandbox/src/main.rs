//! Headless effect sandbox.
//!
//! Loads effect content, starts the runtime and replays a scripted encounter,
//! printing every lifecycle event as a JSON line on stdout.
//!
//! # Examples
//!
//! ```bash
//! # Replay the bundled skirmish instantly on a virtual clock
//! cargo run -p effect-sandbox
//!
//! # Replay in real time with two scheduler workers
//! EFFECT_WORKERS=2 cargo run -p effect-sandbox -- skirmish
//! ```
mod config;
mod logging;
mod replay;

use std::sync::Arc;

use anyhow::{Context, Result};
use effect_content::ContentFactory;
use effect_runtime::{Runtime, RuntimeConfig, VirtualClock};

use crate::config::SandboxConfig;
use crate::replay::Pacing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Load configuration from environment
    let config = SandboxConfig::from_env().with_scenario(std::env::args().nth(1));

    // 2. Setup logging
    let _guard = logging::setup_logging(&config.session_id)?;

    // 3. Load content
    let factory = match &config.content_dir {
        Some(dir) => ContentFactory::new(dir),
        None => ContentFactory::bundled(),
    };
    tracing::info!("Content directory: {}", factory.data_dir().display());
    let engine_config = factory.load_config()?;
    let templates = factory.load_templates()?;
    let scenario = factory
        .load_scenario(&config.scenario)
        .with_context(|| format!("Failed to load scenario '{}'", config.scenario))?;

    // 4. Build runtime
    let runtime_config = RuntimeConfig::default()
        .with_engine(engine_config)
        .with_workers(config.workers);
    let mut builder = Runtime::builder().config(runtime_config).templates(templates);
    let pacing = if config.workers == 0 {
        builder = builder.clock(Arc::new(VirtualClock::new()));
        Pacing::Virtual
    } else {
        Pacing::RealTime
    };
    let runtime = builder.build().await?;

    // 5. Replay
    let handle = runtime.handle();
    let printer = replay::spawn_printer(&handle);
    replay::replay(&handle, &scenario, pacing).await;

    let metrics = handle.metrics();
    tracing::info!(
        fired = metrics.fired(),
        stale = metrics.stale(),
        rescheduled = metrics.rescheduled(),
        peak_queue_depth = metrics.peak_queue_depth(),
        "Scenario finished"
    );

    // 6. Shutdown; the printer ends once the last bus sender is gone.
    drop(handle);
    runtime.shutdown().await?;
    let printed = printer.await.context("Event printer panicked")??;
    tracing::info!("Printed {} events", printed);

    Ok(())
}
