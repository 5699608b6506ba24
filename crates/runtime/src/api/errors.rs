//! Unified error types surfaced by the runtime API.
use effect_core::AdmissionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("scheduler worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error("runtime requires a template oracle to be configured before building")]
    MissingTemplates,

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(&'static str),
}
