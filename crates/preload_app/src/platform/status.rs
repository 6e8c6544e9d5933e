use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use preload_core::{DisplayProgress, SessionOutcome, TrackEvent};
use preload_logging::{preload_info, preload_warn};

/// Receives everything the host shows or reports about a session.
pub(crate) trait StatusSink {
    fn progress(&mut self, progress: DisplayProgress, label: &str);
    fn track(&mut self, event: &TrackEvent);
    fn finished(&mut self, outcome: &SessionOutcome);
}

/// Writes status and telemetry lines to the log.
#[derive(Debug, Default)]
pub(crate) struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn progress(&mut self, progress: DisplayProgress, label: &str) {
        preload_info!(
            "status [{}/{}] {} {}%",
            progress.step_index + 1,
            progress.step_count,
            label,
            progress.percent
        );
    }

    fn track(&mut self, event: &TrackEvent) {
        let at = Utc::now().to_rfc3339();
        match event {
            TrackEvent::AcquisitionFailed { stage, cause } => {
                preload_info!("track {} at={} stage={} cause={}", event.name(), at, stage, cause)
            }
            _ => preload_info!("track {} at={}", event.name(), at),
        }
    }

    fn finished(&mut self, outcome: &SessionOutcome) {
        let at = Utc::now().to_rfc3339();
        match outcome {
            SessionOutcome::Ready => preload_info!("preload ready at={}", at),
            SessionOutcome::Failed(reason) => preload_warn!("preload failed at={}: {}", at, reason),
            SessionOutcome::Cancelled => preload_info!("preload cancelled at={}", at),
        }
    }
}

/// Latest published progress. Readers always see a whole value.
#[derive(Debug, Clone)]
pub(crate) struct ProgressBoard {
    inner: Arc<RwLock<(DisplayProgress, &'static str)>>,
}

impl Default for ProgressBoard {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new((DisplayProgress::default(), ""))),
        }
    }
}

impl ProgressBoard {
    pub(crate) fn publish(&self, progress: DisplayProgress, label: &'static str) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *slot = (progress, label);
    }

    pub(crate) fn snapshot(&self) -> (DisplayProgress, &'static str) {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn board_starts_at_first_step() {
        let board = ProgressBoard::default();
        assert_eq!(board.snapshot(), (DisplayProgress::default(), ""));
    }

    #[test]
    fn board_readers_see_whole_values() {
        let board = ProgressBoard::default();
        let writer = {
            let board = board.clone();
            thread::spawn(move || {
                for percent in 0..=100u8 {
                    board.publish(
                        DisplayProgress {
                            step_index: 1,
                            step_count: 8,
                            percent,
                        },
                        "Downloading snapshot",
                    );
                }
            })
        };
        for _ in 0..100 {
            let (progress, label) = board.snapshot();
            assert!(progress.percent <= 100);
            if progress.step_index == 1 {
                assert_eq!(label, "Downloading snapshot");
            } else {
                assert_eq!(label, "");
            }
        }
        writer.join().unwrap();
        assert_eq!(board.snapshot().0.percent, 100);
    }
}
