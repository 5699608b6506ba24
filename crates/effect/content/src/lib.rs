//! Data-driven effect content and loaders.
//!
//! This crate reads the static data the effect engine consumes at startup:
//! - Effect templates (RON), validated into a [`TemplateRegistry`](effect_core::TemplateRegistry)
//! - Engine configuration (TOML)
//! - Scripted encounters for the sandbox driver (RON)
//!
//! Content is loaded once and never mutated by the engine.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ActorKindSpec, ActorSpec, ConfigLoader, ContentFactory, LoadResult, Scenario, ScenarioLoader,
    ScenarioStep, TemplateLoader,
};
