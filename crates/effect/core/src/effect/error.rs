//! Admission and hook errors.

use crate::error::{EngineError, ErrorSeverity};
use crate::types::{ActorId, EffectId, TemplateId};

/// Failure raised inside an `on_start`/`on_action_time`/`on_exit` hook.
///
/// Panics are captured at the lifecycle boundary and reported as
/// [`HookError::Panicked`]; the effect is then force-exited with reason
/// `faulted`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("hook failed: {0}")]
    Failed(&'static str),

    #[error("hook panicked: {0}")]
    Panicked(String),
}

impl EngineError for HookError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Internal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "HOOK_FAILED",
            Self::Panicked(_) => "HOOK_PANICKED",
        }
    }
}

/// Reasons an application request was rejected.
///
/// No partial state survives a rejection: either the effect never started, or
/// it was reverted before the error was returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("template {0} not found")]
    TemplateNotFound(TemplateId),

    #[error("actor {0} not found")]
    ActorNotFound(ActorId),

    #[error("actor {actor} cannot receive effects: {reason}")]
    ActorIneligible { actor: ActorId, reason: &'static str },

    #[error("condition of {0} failed")]
    ConditionFailed(TemplateId),

    #[error("{incoming} is outranked by active {incumbent}")]
    Outranked {
        incoming: TemplateId,
        incumbent: EffectId,
    },

    #[error("{0} vetoed its own start")]
    Vetoed(TemplateId),

    #[error("{template} failed to start: {source}")]
    StartFailed {
        template: TemplateId,
        #[source]
        source: HookError,
    },
}

impl EngineError for AdmissionError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TemplateNotFound(_) | Self::ActorNotFound(_) | Self::ActorIneligible { .. } => {
                ErrorSeverity::Validation
            }
            Self::ConditionFailed(_) | Self::Outranked { .. } | Self::Vetoed(_) => {
                ErrorSeverity::Recoverable
            }
            Self::StartFailed { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound(_) => "ADMISSION_TEMPLATE_NOT_FOUND",
            Self::ActorNotFound(_) => "ADMISSION_ACTOR_NOT_FOUND",
            Self::ActorIneligible { .. } => "ADMISSION_ACTOR_INELIGIBLE",
            Self::ConditionFailed(_) => "ADMISSION_CONDITION_FAILED",
            Self::Outranked { .. } => "ADMISSION_OUTRANKED",
            Self::Vetoed(_) => "ADMISSION_VETOED",
            Self::StartFailed { .. } => "ADMISSION_START_FAILED",
        }
    }
}
