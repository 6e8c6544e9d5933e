//! Snapshot acquisition pipeline: download, extract, then signal ready.
//!
//! The pipeline never moves bytes itself. It records which stage the external
//! download subsystem is in, filters the progress that subsystem reports, and
//! tells the coordinator when the snapshot is ready or when acquisition failed.
//! Once it reaches `Ready` or `Failed` it ignores everything until [`reset`].
//!
//! [`reset`]: AcquisitionPipeline::reset

use std::fmt;
use std::path::PathBuf;

use crate::MalformedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionStage {
    Metadata,
    Download,
    Extract,
}

impl fmt::Display for AcquisitionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionStage::Metadata => write!(f, "metadata"),
            AcquisitionStage::Download => write!(f, "download"),
            AcquisitionStage::Extract => write!(f, "extract"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineStage {
    #[default]
    Idle,
    Downloading {
        fraction: f64,
    },
    Extracting {
        fraction: f64,
    },
    Ready,
    Failed {
        stage: AcquisitionStage,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Progress {
        stage: AcquisitionStage,
        fraction: f64,
    },
    ExtractRequested {
        path: PathBuf,
    },
    SnapshotReady,
    AcquisitionFailed {
        stage: AcquisitionStage,
        cause: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AcquisitionPipeline {
    stage: PipelineStage,
}

impl AcquisitionPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> &PipelineStage {
        &self.stage
    }

    /// True while the external subsystem is transferring or extracting on our behalf.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.stage,
            PipelineStage::Downloading { .. } | PipelineStage::Extracting { .. }
        )
    }

    /// Moves `Idle` into `Downloading`. Returns false if a download was already issued.
    pub fn begin_download(&mut self) -> bool {
        if self.stage != PipelineStage::Idle {
            return false;
        }
        self.stage = PipelineStage::Downloading { fraction: 0.0 };
        true
    }

    pub fn download_progress(
        &mut self,
        fraction: f64,
    ) -> Result<Option<PipelineEvent>, MalformedEvent> {
        let fraction = checked_fraction(fraction)?;
        match &mut self.stage {
            PipelineStage::Downloading { fraction: seen } if fraction > *seen => {
                *seen = fraction;
                Ok(Some(PipelineEvent::Progress {
                    stage: AcquisitionStage::Download,
                    fraction,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn download_complete(&mut self, path: PathBuf) -> Option<PipelineEvent> {
        if !matches!(self.stage, PipelineStage::Downloading { .. }) {
            return None;
        }
        self.stage = PipelineStage::Extracting { fraction: 0.0 };
        Some(PipelineEvent::ExtractRequested { path })
    }

    pub fn extract_progress(
        &mut self,
        fraction: f64,
    ) -> Result<Option<PipelineEvent>, MalformedEvent> {
        let fraction = checked_fraction(fraction)?;
        match &mut self.stage {
            PipelineStage::Extracting { fraction: seen } if fraction > *seen => {
                *seen = fraction;
                Ok(Some(PipelineEvent::Progress {
                    stage: AcquisitionStage::Extract,
                    fraction,
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn extract_complete(&mut self) -> Option<PipelineEvent> {
        if !matches!(self.stage, PipelineStage::Extracting { .. }) {
            return None;
        }
        self.stage = PipelineStage::Ready;
        Some(PipelineEvent::SnapshotReady)
    }

    /// Records a failure signal. Reported at most once per session.
    pub fn fail(&mut self, stage: AcquisitionStage, cause: String) -> Option<PipelineEvent> {
        if !self.is_in_flight() {
            return None;
        }
        self.stage = PipelineStage::Failed { stage };
        Some(PipelineEvent::AcquisitionFailed { stage, cause })
    }

    pub fn reset(&mut self) {
        self.stage = PipelineStage::Idle;
    }
}

fn checked_fraction(fraction: f64) -> Result<f64, MalformedEvent> {
    if !fraction.is_finite() {
        return Err(MalformedEvent::NonFiniteFraction);
    }
    Ok(fraction.clamp(0.0, 1.0))
}
