use std::fmt;
use std::mem;

use preload_logging::preload_debug;

use crate::progress::status_label;
use crate::{
    display_progress, AcquisitionPipeline, DisplayProgress, FailureReason, NodeSyncMonitor, Step,
    SyncCounters, SyncPhase,
};

/// Opaque snapshot descriptor. Only the validator looks inside.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotMetadata(Vec<u8>);

impl SnapshotMetadata {
    pub fn new(raw: impl Into<Vec<u8>>) -> Self {
        Self(raw.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SnapshotMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SnapshotMetadata({} bytes)", self.0.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationResult {
    pub usable: bool,
}

/// Host configuration, read at start and at the terminal-phase check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub use_snapshot: bool,
    pub peer_list_non_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PreloadState {
    #[default]
    Idle,
    ValidatingSnapshot,
    DownloadingSnapshot {
        fraction: f64,
    },
    ExtractingSnapshot {
        fraction: f64,
    },
    RunningSync {
        phase: SyncPhase,
        counters: SyncCounters,
    },
    SyncComplete,
    Failed(FailureReason),
    Cancelled,
}

impl PreloadState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PreloadState::SyncComplete | PreloadState::Failed(_) | PreloadState::Cancelled
        )
    }

    fn name(&self) -> &'static str {
        match self {
            PreloadState::Idle => "Idle",
            PreloadState::ValidatingSnapshot => "ValidatingSnapshot",
            PreloadState::DownloadingSnapshot { .. } => "DownloadingSnapshot",
            PreloadState::ExtractingSnapshot { .. } => "ExtractingSnapshot",
            PreloadState::RunningSync { .. } => "RunningSync",
            PreloadState::SyncComplete => "SyncComplete",
            PreloadState::Failed(_) => "Failed",
            PreloadState::Cancelled => "Cancelled",
        }
    }
}

/// One preload session: the authoritative state plus everything the transition
/// function needs to decide the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreloadSession {
    config: SessionConfig,
    state: PreloadState,
    pipeline: AcquisitionPipeline,
    monitor: NodeSyncMonitor,
    pending_metadata: Option<SnapshotMetadata>,
    node_started: bool,
    announced_step: Option<Step>,
    dirty: bool,
}

impl PreloadSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn state(&self) -> &PreloadState {
        &self.state
    }

    pub fn progress(&self) -> DisplayProgress {
        display_progress(&self.state)
    }

    pub fn status_label(&self) -> &'static str {
        status_label(&self.state)
    }

    pub fn pipeline(&self) -> &AcquisitionPipeline {
        &self.pipeline
    }

    pub fn monitor(&self) -> &NodeSyncMonitor {
        &self.monitor
    }

    pub fn node_started(&self) -> bool {
        self.node_started
    }

    /// Returns whether the displayed state changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        mem::take(&mut self.dirty)
    }

    pub(crate) fn set_state(&mut self, next: PreloadState) {
        if self.state == next {
            return;
        }
        if mem::discriminant(&self.state) != mem::discriminant(&next) {
            preload_debug!("preload state {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
        self.dirty = true;
    }

    pub(crate) fn pipeline_mut(&mut self) -> &mut AcquisitionPipeline {
        &mut self.pipeline
    }

    pub(crate) fn monitor_mut(&mut self) -> &mut NodeSyncMonitor {
        &mut self.monitor
    }

    pub(crate) fn reset_monitor(&mut self) {
        self.monitor = NodeSyncMonitor::new();
    }

    pub(crate) fn set_pending_metadata(&mut self, metadata: SnapshotMetadata) {
        self.pending_metadata = Some(metadata);
    }

    pub(crate) fn take_pending_metadata(&mut self) -> Option<SnapshotMetadata> {
        self.pending_metadata.take()
    }

    pub(crate) fn has_pending_metadata(&self) -> bool {
        self.pending_metadata.is_some()
    }

    /// Marks the node as started. Returns false if it already was.
    pub(crate) fn mark_node_started(&mut self) -> bool {
        !mem::replace(&mut self.node_started, true)
    }

    /// Returns the current step if it has not been announced yet.
    pub(crate) fn unannounced_step(&mut self) -> Option<Step> {
        if matches!(self.state, PreloadState::Idle) || self.state.is_terminal() {
            return None;
        }
        let step = Step::of(&self.state);
        if self.announced_step == Some(step) {
            return None;
        }
        self.announced_step = Some(step);
        Some(step)
    }
}
