//! Oracle access errors.

use crate::error::{EngineError, ErrorSeverity};

/// Errors raised when read-only world data cannot be consulted.
///
/// Condition leaves treat every variant as a failed predicate: the gate
/// fails closed instead of surfacing the error to the caster.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OracleError {
    /// No world oracle was attached to the evaluation context.
    #[error("WorldOracle not available")]
    WorldNotAvailable,

    /// The spatial index is still being built or was torn down.
    #[error("spatial index not ready")]
    SpatialIndexNotReady,
}

impl EngineError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::WorldNotAvailable => ErrorSeverity::Fatal,
            Self::SpatialIndexNotReady => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::WorldNotAvailable => "ORACLE_WORLD_NOT_AVAILABLE",
            Self::SpatialIndexNotReady => "ORACLE_SPATIAL_INDEX_NOT_READY",
        }
    }
}
