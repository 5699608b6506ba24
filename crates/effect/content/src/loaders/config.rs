//! Engine configuration loader.

use std::path::Path;

use effect_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config data from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse engine config TOML: {}", e))?;

        if config.expiry_unit_ms == 0 {
            anyhow::bail!("expiry_unit_ms must be greater than zero");
        }
        if config.max_effects_per_actor == 0 {
            anyhow::bail!("max_effects_per_actor must be greater than zero");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ConfigLoader::parse("dance_cancel_buff = true\n").unwrap();
        assert!(config.dance_cancel_buff);
        assert_eq!(config.expiry_unit_ms, EngineConfig::DEFAULT_EXPIRY_UNIT_MS);
        assert!(config.refresh_resets_enchant);
    }

    #[test]
    fn zero_expiry_unit_is_rejected() {
        let err = ConfigLoader::parse("expiry_unit_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("expiry_unit_ms"));
    }

    #[test]
    fn malformed_toml_reports_context() {
        let err = ConfigLoader::parse("max_effects_per_actor = \"many\"").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse engine config TOML"));
    }
}
