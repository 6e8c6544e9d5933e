use crate::{PreloadState, SyncPhase};

/// Number of display steps: validate, download, extract, then one per sync phase.
pub const STEP_COUNT: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    ValidateSnapshot,
    DownloadSnapshot,
    ExtractSnapshot,
    Sync(SyncPhase),
}

impl Step {
    pub fn index(self) -> u8 {
        match self {
            Step::ValidateSnapshot => 0,
            Step::DownloadSnapshot => 1,
            Step::ExtractSnapshot => 2,
            Step::Sync(phase) => 3 + phase.index() as u8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::ValidateSnapshot => "Validating snapshot",
            Step::DownloadSnapshot => "Downloading snapshot",
            Step::ExtractSnapshot => "Extracting snapshot",
            Step::Sync(SyncPhase::ActionExecution) => "Executing actions",
            Step::Sync(SyncPhase::BlockDownload) => "Downloading blocks",
            Step::Sync(SyncPhase::BlockHashDownload) => "Downloading block hashes",
            Step::Sync(SyncPhase::BlockVerification) => "Verifying blocks",
            Step::Sync(SyncPhase::StateDownload) => "Downloading states",
        }
    }

    /// The step a state is displayed under.
    pub fn of(state: &PreloadState) -> Step {
        match state {
            PreloadState::Idle | PreloadState::ValidatingSnapshot | PreloadState::Cancelled => {
                Step::ValidateSnapshot
            }
            PreloadState::DownloadingSnapshot { .. } => Step::DownloadSnapshot,
            PreloadState::ExtractingSnapshot { .. } => Step::ExtractSnapshot,
            PreloadState::RunningSync { phase, .. } => Step::Sync(*phase),
            PreloadState::SyncComplete => Step::Sync(SyncPhase::StateDownload),
            PreloadState::Failed(reason) => match reason {
                crate::FailureReason::InconsistentTerminalPhase { phase } => Step::Sync(*phase),
                crate::FailureReason::NodeStartFailed { .. } => {
                    Step::Sync(SyncPhase::ActionExecution)
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayProgress {
    pub step_index: u8,
    pub step_count: u8,
    pub percent: u8,
}

impl Default for DisplayProgress {
    fn default() -> Self {
        Self {
            step_index: 0,
            step_count: STEP_COUNT,
            percent: 0,
        }
    }
}

/// Derives the display-ready progress for any state.
pub fn display_progress(state: &PreloadState) -> DisplayProgress {
    let percent = match state {
        PreloadState::Idle
        | PreloadState::ValidatingSnapshot
        | PreloadState::Failed(_)
        | PreloadState::Cancelled => 0,
        PreloadState::DownloadingSnapshot { fraction }
        | PreloadState::ExtractingSnapshot { fraction } => fraction_percent(*fraction),
        PreloadState::RunningSync { counters, .. } => counters.percent(),
        PreloadState::SyncComplete => 100,
    };
    DisplayProgress {
        step_index: Step::of(state).index(),
        step_count: STEP_COUNT,
        percent,
    }
}

/// Status line text for a state.
pub fn status_label(state: &PreloadState) -> &'static str {
    match state {
        PreloadState::SyncComplete => "Preload completed",
        PreloadState::Failed(_) => "Preload failed",
        PreloadState::Cancelled => "Preload cancelled",
        other => Step::of(other).label(),
    }
}

fn fraction_percent(fraction: f64) -> u8 {
    if !fraction.is_finite() {
        return 0;
    }
    (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FailureReason, SyncCounters};

    #[test]
    fn step_indices_cover_all_eight_steps() {
        let mut indices: Vec<u8> = [
            Step::ValidateSnapshot,
            Step::DownloadSnapshot,
            Step::ExtractSnapshot,
        ]
        .into_iter()
        .chain(SyncPhase::ALL.into_iter().map(Step::Sync))
        .map(Step::index)
        .collect();
        indices.dedup();
        assert_eq!(indices, (0..STEP_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn every_state_has_a_progress() {
        let states = [
            PreloadState::Idle,
            PreloadState::ValidatingSnapshot,
            PreloadState::DownloadingSnapshot { fraction: 0.255 },
            PreloadState::ExtractingSnapshot { fraction: f64::NAN },
            PreloadState::RunningSync {
                phase: SyncPhase::BlockVerification,
                counters: SyncCounters::new(1, 0),
            },
            PreloadState::SyncComplete,
            PreloadState::Failed(FailureReason::NodeStartFailed {
                cause: "missing binary".into(),
            }),
            PreloadState::Cancelled,
        ];
        let percents: Vec<u8> = states.iter().map(|s| display_progress(s).percent).collect();
        assert_eq!(percents, vec![0, 0, 25, 0, 0, 100, 0, 0]);
        assert!(states
            .iter()
            .all(|s| display_progress(s).step_index < STEP_COUNT));
    }

    #[test]
    fn failed_terminal_phase_points_at_the_phase() {
        let state = PreloadState::Failed(FailureReason::InconsistentTerminalPhase {
            phase: SyncPhase::BlockDownload,
        });
        assert_eq!(display_progress(&state).step_index, 4);
        assert_eq!(status_label(&state), "Preload failed");
    }

    #[test]
    fn fraction_rounds_down() {
        assert_eq!(fraction_percent(0.999), 99);
        assert_eq!(fraction_percent(1.0), 100);
        assert_eq!(fraction_percent(-0.5), 0);
    }
}
