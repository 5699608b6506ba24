//! Tracing setup: stderr plus a per-session log file.
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer when dropped; keep it alive for
/// the whole run.
pub fn setup_logging(session_id: &Option<String>) -> Result<WorkerGuard> {
    let session_id = session_id.clone().unwrap_or_else(|| {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        format!("session_{}", timestamp)
    });

    let session_log_dir = log_dir().join(&session_id);
    std::fs::create_dir_all(&session_log_dir).with_context(|| {
        format!(
            "Failed to create log directory: {}",
            session_log_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "sandbox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/sandbox.log", session_log_dir.display());

    Ok(guard)
}

/// Platform cache directory for sandbox logs.
///
/// - macOS: `~/Library/Caches/effect-sandbox/logs`
/// - Linux: `~/.cache/effect-sandbox/logs` (or `$XDG_CACHE_HOME/...`)
/// - Windows: `%LOCALAPPDATA%\effect-sandbox\cache\logs`
/// - Fallback: `/tmp/effect-sandbox/logs`
fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "effect-sandbox")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/effect-sandbox"))
        .join("logs")
}
