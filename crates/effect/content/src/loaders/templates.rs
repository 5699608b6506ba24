//! Effect template catalog loader.

use std::path::Path;

use effect_core::{EffectTemplate, TemplateRegistry};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

/// Template catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateCatalog {
    pub templates: Vec<EffectTemplate>,
}

/// Loader for effect templates from RON files.
pub struct TemplateLoader;

impl TemplateLoader {
    /// Load and validate a template catalog.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not valid RON, or declares the
    /// same template id twice.
    pub fn load(path: &Path) -> LoadResult<TemplateRegistry> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<TemplateRegistry> {
        let catalog: TemplateCatalog = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse effect catalog RON: {}", e))?;

        let count = catalog.templates.len();
        let registry = TemplateRegistry::new(catalog.templates)
            .map_err(|e| anyhow::anyhow!("Invalid effect catalog: {}", e))?;

        tracing::debug!(target: "content::templates", count, "effect templates loaded");
        Ok(registry)
    }
}
