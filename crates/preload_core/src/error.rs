use thiserror::Error;

use crate::SyncPhase;

/// The Validator could not answer. Treated like `usable = false`, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("snapshot validation unavailable: {0}")]
    Unavailable(String),
}

/// A collaborator event that cannot be applied. The event is dropped and state is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("unknown sync phase {0:?}")]
    UnknownPhase(String),
    #[error("sync phase index {0} out of range")]
    PhaseOutOfRange(i64),
    #[error("progress event carries no phase")]
    MissingPhase,
    #[error("negative counter {field}={value}")]
    NegativeCounter { field: &'static str, value: i64 },
    #[error("non-finite progress fraction")]
    NonFiniteFraction,
}

/// Why a session ended in `Failed`. These are surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("node finished preload in {phase} while peers are configured")]
    InconsistentTerminalPhase { phase: SyncPhase },
    #[error("node failed to start: {cause}")]
    NodeStartFailed { cause: String },
}
