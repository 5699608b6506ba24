//! Content factory for loading every data file the engine needs.

use std::path::{Path, PathBuf};

use effect_core::{EngineConfig, TemplateRegistry};

use crate::loaders::{ConfigLoader, LoadResult, Scenario, ScenarioLoader, TemplateLoader};

/// Content factory that loads effect content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── engine.toml
/// ├── effects.ron
/// └── scenarios/
///     └── skirmish.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Directory holding the data shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("data"))
    }

    /// Load engine configuration from `engine.toml`, falling back to defaults
    /// when the file does not exist.
    pub fn load_config(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("engine.toml");
        if !path.exists() {
            return Ok(EngineConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load the template registry from `effects.ron`.
    pub fn load_templates(&self) -> LoadResult<TemplateRegistry> {
        let path = self.data_dir.join("effects.ron");
        TemplateLoader::load(&path)
    }

    /// Load a scenario from `scenarios/{name}.ron`.
    pub fn load_scenario(&self, name: &str) -> LoadResult<Scenario> {
        let path = self
            .data_dir
            .join("scenarios")
            .join(format!("{}.ron", name));
        ScenarioLoader::load(&path)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
