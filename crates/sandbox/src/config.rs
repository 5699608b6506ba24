//! Environment-driven sandbox configuration.
use std::env;
use std::path::PathBuf;

/// Settings for one sandbox run.
#[derive(Clone, Debug)]
pub struct SandboxConfig {
    /// Content directory; the data bundled with `effect-content` when unset.
    pub content_dir: Option<PathBuf>,
    /// Scheduler workers. Zero replays on a virtual clock, instantly.
    pub workers: usize,
    /// Log session name; a timestamp when unset.
    pub session_id: Option<String>,
    pub scenario: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            content_dir: None,
            workers: 0,
            session_id: None,
            scenario: "skirmish".to_string(),
        }
    }
}

impl SandboxConfig {
    /// Reads `EFFECT_CONTENT_DIR`, `EFFECT_WORKERS` and `EFFECT_SESSION`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = read_env::<PathBuf>("EFFECT_CONTENT_DIR") {
            config.content_dir = Some(dir);
        }
        if let Some(workers) = read_env::<usize>("EFFECT_WORKERS") {
            config.workers = workers;
        }
        if let Some(session) = read_env::<String>("EFFECT_SESSION") {
            config.session_id = Some(session);
        }

        config
    }

    pub fn with_scenario(mut self, scenario: Option<String>) -> Self {
        if let Some(scenario) = scenario {
            self.scenario = scenario;
        }
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
