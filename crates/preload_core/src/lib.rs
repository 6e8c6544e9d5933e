//! Preload core: pure coordinator state machine and progress helpers.
mod effect;
mod error;
mod monitor;
mod msg;
mod phase;
mod pipeline;
mod progress;
mod state;
mod update;

pub use effect::{Effect, SessionOutcome, TrackEvent};
pub use error::{FailureReason, MalformedEvent, ValidationError};
pub use monitor::{MonitorEvent, NodeSyncMonitor};
pub use msg::{Msg, NodeStatusEvent, PreloadProgressEvent, PreloadProgressExtra};
pub use phase::{SyncCounters, SyncPhase};
pub use pipeline::{AcquisitionPipeline, AcquisitionStage, PipelineEvent, PipelineStage};
pub use progress::{display_progress, status_label, DisplayProgress, Step, STEP_COUNT};
pub use state::{PreloadSession, PreloadState, SessionConfig, SnapshotMetadata, ValidationResult};
pub use update::update;
