use std::path::PathBuf;

use crate::{AcquisitionStage, FailureReason, SnapshotMetadata, Step};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    DownloadMetadata,
    ValidateSnapshot { metadata: SnapshotMetadata },
    RequestDownload { metadata: SnapshotMetadata },
    RequestExtract { path: PathBuf },
    StartNode,
    AbortAcquisition,
    Track(TrackEvent),
    Finished(SessionOutcome),
}

/// Analytics events. Delivery is best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    StepEntered(Step),
    IbdStarted,
    SnapshotSkipped,
    AcquisitionFailed {
        stage: AcquisitionStage,
        cause: String,
    },
}

impl TrackEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TrackEvent::StepEntered(step) => step.label(),
            TrackEvent::IbdStarted => "Launcher/IBD Start",
            TrackEvent::SnapshotSkipped => "Launcher/Snapshot Skipped",
            TrackEvent::AcquisitionFailed { .. } => "Launcher/Snapshot Failed",
        }
    }
}

/// Terminal result of a session, reported once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Ready,
    Failed(FailureReason),
    Cancelled,
}
