use std::path::PathBuf;

use serde::Deserialize;

use crate::{AcquisitionStage, SnapshotMetadata, ValidationError, ValidationResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Host asked to begin the preload session.
    Start,
    /// Candidate snapshot metadata arrived from the download subsystem.
    MetadataDownloaded { metadata: SnapshotMetadata },
    /// Validator answered for the pending metadata.
    ValidationFinished(Result<ValidationResult, ValidationError>),
    /// Snapshot bytes progress.
    DownloadProgress { fraction: f64 },
    /// Snapshot archive is on disk.
    DownloadComplete { path: PathBuf },
    /// Decompression progress.
    ExtractProgress { fraction: f64 },
    /// Snapshot extraction finished.
    ExtractComplete,
    /// Download subsystem gave up on a stage.
    AcquisitionFailed {
        stage: AcquisitionStage,
        cause: String,
    },
    /// Node status feed update.
    NodeStatus(NodeStatusEvent),
    /// Node preload progress feed update.
    PreloadProgress(PreloadProgressEvent),
    /// Node process could not be launched or died before preload ended.
    NodeStartFailed { cause: String },
    /// Host cancelled the session.
    Cancel,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Raw node status as delivered by the node feed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatusEvent {
    #[serde(default)]
    pub preload_ended: Option<bool>,
}

impl NodeStatusEvent {
    pub fn ended(preload_ended: bool) -> Self {
        Self {
            preload_ended: Some(preload_ended),
        }
    }
}

/// Raw preload progress as delivered by the node feed. Every field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadProgressEvent {
    #[serde(default)]
    pub current_phase: Option<i64>,
    #[serde(default)]
    pub extra: Option<PreloadProgressExtra>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadProgressExtra {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub current_count: Option<i64>,
    #[serde(default)]
    pub total_count: Option<i64>,
}

impl PreloadProgressEvent {
    /// Builds a well-formed event for a named phase.
    pub fn phase(kind: &str, current: i64, total: i64) -> Self {
        Self {
            current_phase: None,
            extra: Some(PreloadProgressExtra {
                kind: Some(kind.to_string()),
                current_count: Some(current),
                total_count: Some(total),
            }),
        }
    }
}
