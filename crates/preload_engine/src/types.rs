use std::fmt;
use std::path::PathBuf;

use preload_core::{
    NodeStatusEvent, PreloadProgressEvent, SnapshotMetadata, ValidationError, ValidationResult,
};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    MetadataFetched(Result<SnapshotMetadata, TransferError>),
    Validated(Result<ValidationResult, ValidationError>),
    DownloadProgress { fraction: f64 },
    Downloaded(Result<PathBuf, TransferError>),
    ExtractProgress { fraction: f64 },
    Extracted(Result<(), TransferError>),
    Node(NodeFeedEvent),
    /// The node could not be spawned or its process ended.
    NodeExited { cause: String },
}

/// One line of the node's event feed, e.g. `{"nodeStatus":{"preloadEnded":true}}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeFeedEvent {
    NodeStatus(NodeStatusEvent),
    PreloadProgress(PreloadProgressEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransferError {
    pub kind: TransferFailure,
    pub message: String,
}

impl TransferError {
    pub(crate) fn new(kind: TransferFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled(what: &str) -> Self {
        Self::new(TransferFailure::Cancelled, format!("{what} cancelled"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    Io,
    Archive,
    Cancelled,
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferFailure::InvalidUrl => write!(f, "invalid url"),
            TransferFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransferFailure::Timeout => write!(f, "timeout"),
            TransferFailure::Network => write!(f, "network error"),
            TransferFailure::Io => write!(f, "io error"),
            TransferFailure::Archive => write!(f, "archive error"),
            TransferFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<std::io::Error> for TransferError {
    fn from(err: std::io::Error) -> Self {
        TransferError::new(TransferFailure::Io, err.to_string())
    }
}

impl From<crate::PersistError> for TransferError {
    fn from(err: crate::PersistError) -> Self {
        TransferError::new(TransferFailure::Io, err.to_string())
    }
}
