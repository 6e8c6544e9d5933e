use std::sync::mpsc;

use preload_core::{update, Effect, Msg, PreloadSession, SessionConfig, SessionOutcome};
use preload_logging::{preload_debug, preload_warn, set_event_seq};

use super::effects::EffectExecutor;
use super::status::{ProgressBoard, StatusSink};

/// Lets the host inject messages into a running session.
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    tx: mpsc::Sender<Msg>,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::Sender<Msg>) -> Self {
        Self { tx }
    }

    /// Returns false once the session loop is gone.
    pub(crate) fn cancel(&self) -> bool {
        self.tx.send(Msg::Cancel).is_ok()
    }
}

/// Drives one preload session from the inbox until it reaches an outcome.
///
/// The inbox is the only source of messages, so every event is applied in the order it
/// was sent. A closed inbox before any outcome counts as cancellation.
pub(crate) fn run_session(
    config: SessionConfig,
    inbox: &mpsc::Receiver<Msg>,
    executor: &mut dyn EffectExecutor,
    sink: &mut dyn StatusSink,
    board: &ProgressBoard,
) -> SessionOutcome {
    let mut session = PreloadSession::new(config);
    publish(&session, sink, board);

    let mut seq = 0u64;
    while let Ok(msg) = inbox.recv() {
        seq += 1;
        set_event_seq(seq);

        let (next, effects) = update(session, msg);
        session = next;

        let mut outcome = None;
        for effect in effects {
            match effect {
                Effect::Track(event) => sink.track(&event),
                Effect::Finished(result) => outcome = Some(result),
                other => executor.execute(other),
            }
        }

        if session.consume_dirty() {
            publish(&session, sink, board);
        }
        if let Some(outcome) = outcome {
            sink.finished(&outcome);
            return outcome;
        }
    }

    preload_warn!("session inbox closed before the preload finished");
    let outcome = SessionOutcome::Cancelled;
    sink.finished(&outcome);
    outcome
}

fn publish(session: &PreloadSession, sink: &mut dyn StatusSink, board: &ProgressBoard) {
    let progress = session.progress();
    let label = session.status_label();
    preload_debug!("publish {:?} {}", progress, label);
    board.publish(progress, label);
    sink.progress(progress, label);
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use preload_core::{
        DisplayProgress, FailureReason, NodeStatusEvent, PreloadProgressEvent, SnapshotMetadata,
        Step, SyncPhase, TrackEvent, ValidationResult,
    };

    use super::*;

    /// Answers each effect with the scripted messages, like a well-behaved engine.
    struct ScriptedExecutor {
        tx: mpsc::Sender<Msg>,
        script: fn(&Effect) -> Vec<Msg>,
        executed: Vec<Effect>,
    }

    impl EffectExecutor for ScriptedExecutor {
        fn execute(&mut self, effect: Effect) {
            for msg in (self.script)(&effect) {
                self.tx.send(msg).unwrap();
            }
            self.executed.push(effect);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        progress: Vec<(DisplayProgress, String)>,
        tracked: Vec<TrackEvent>,
        finished: Vec<SessionOutcome>,
    }

    impl StatusSink for RecordingSink {
        fn progress(&mut self, progress: DisplayProgress, label: &str) {
            self.progress.push((progress, label.to_string()));
        }

        fn track(&mut self, event: &TrackEvent) {
            self.tracked.push(event.clone());
        }

        fn finished(&mut self, outcome: &SessionOutcome) {
            self.finished.push(outcome.clone());
        }
    }

    fn healthy_engine(effect: &Effect) -> Vec<Msg> {
        match effect {
            Effect::DownloadMetadata => vec![Msg::MetadataDownloaded {
                metadata: SnapshotMetadata::new(br#"{"Index":1200}"#.to_vec()),
            }],
            Effect::ValidateSnapshot { .. } => {
                vec![Msg::ValidationFinished(Ok(ValidationResult { usable: true }))]
            }
            Effect::RequestDownload { .. } => vec![
                Msg::DownloadProgress { fraction: 0.5 },
                Msg::DownloadComplete {
                    path: PathBuf::from("downloads/snapshot.zip"),
                },
            ],
            Effect::RequestExtract { .. } => vec![
                Msg::ExtractProgress { fraction: 1.0 },
                Msg::ExtractComplete,
            ],
            Effect::StartNode => vec![
                Msg::NodeStatus(NodeStatusEvent::ended(false)),
                Msg::PreloadProgress(PreloadProgressEvent::phase("BlockDownloadState", 5, 10)),
                Msg::PreloadProgress(PreloadProgressEvent::phase("StateDownloadState", 10, 10)),
                Msg::NodeStatus(NodeStatusEvent::ended(true)),
            ],
            _ => Vec::new(),
        }
    }

    fn run(
        config: SessionConfig,
        script: fn(&Effect) -> Vec<Msg>,
        first: Msg,
    ) -> (SessionOutcome, ScriptedExecutor, RecordingSink, ProgressBoard) {
        preload_logging::initialize_for_tests();
        let (tx, rx) = mpsc::channel();
        tx.send(first).unwrap();
        let mut executor = ScriptedExecutor {
            tx,
            script,
            executed: Vec::new(),
        };
        let mut sink = RecordingSink::default();
        let board = ProgressBoard::default();
        let outcome = run_session(config, &rx, &mut executor, &mut sink, &board);
        (outcome, executor, sink, board)
    }

    fn with_peers() -> SessionConfig {
        SessionConfig {
            use_snapshot: true,
            peer_list_non_empty: true,
        }
    }

    #[test]
    fn snapshot_session_runs_to_ready() {
        let (outcome, executor, sink, board) = run(with_peers(), healthy_engine, Msg::Start);

        assert_eq!(outcome, SessionOutcome::Ready);
        assert_eq!(sink.finished, vec![SessionOutcome::Ready]);
        assert_eq!(
            executor.executed,
            vec![
                Effect::DownloadMetadata,
                Effect::ValidateSnapshot {
                    metadata: SnapshotMetadata::new(br#"{"Index":1200}"#.to_vec()),
                },
                Effect::RequestDownload {
                    metadata: SnapshotMetadata::new(br#"{"Index":1200}"#.to_vec()),
                },
                Effect::RequestExtract {
                    path: PathBuf::from("downloads/snapshot.zip"),
                },
                Effect::StartNode,
            ]
        );
        assert!(sink.tracked.contains(&TrackEvent::IbdStarted));
        assert!(sink
            .tracked
            .contains(&TrackEvent::StepEntered(Step::Sync(SyncPhase::BlockDownload))));

        let (progress, label) = board.snapshot();
        assert_eq!(progress.percent, 100);
        assert_eq!(label, "Preload completed");
    }

    #[test]
    fn published_progress_never_goes_backwards_during_acquisition() {
        let (_, _, sink, _) = run(with_peers(), healthy_engine, Msg::Start);

        let acquisition: Vec<_> = sink
            .progress
            .iter()
            .map(|(progress, _)| *progress)
            .take_while(|progress| progress.step_index < 3)
            .collect();
        for pair in acquisition.windows(2) {
            assert!(
                (pair[1].step_index, pair[1].percent) >= (pair[0].step_index, pair[0].percent),
                "{:?} went back to {:?}",
                pair[0],
                pair[1]
            );
        }
        assert!(acquisition.iter().any(|progress| progress.step_index == 1
            && progress.percent == 50));
    }

    #[test]
    fn disabled_snapshot_starts_node_right_away() {
        let config = SessionConfig {
            use_snapshot: false,
            peer_list_non_empty: false,
        };
        let (outcome, executor, _, _) = run(config, healthy_engine, Msg::Start);

        assert_eq!(outcome, SessionOutcome::Ready);
        assert_eq!(executor.executed, vec![Effect::StartNode]);
    }

    #[test]
    fn early_end_with_peers_fails() {
        fn ends_early(effect: &Effect) -> Vec<Msg> {
            match effect {
                Effect::StartNode => vec![
                    Msg::PreloadProgress(PreloadProgressEvent::phase("BlockDownloadState", 2, 9)),
                    Msg::NodeStatus(NodeStatusEvent::ended(true)),
                ],
                _ => Vec::new(),
            }
        }
        let config = SessionConfig {
            use_snapshot: false,
            peer_list_non_empty: true,
        };
        let (outcome, _, sink, board) = run(config, ends_early, Msg::Start);

        let expected = SessionOutcome::Failed(FailureReason::InconsistentTerminalPhase {
            phase: SyncPhase::BlockDownload,
        });
        assert_eq!(outcome, expected);
        assert_eq!(sink.finished, vec![expected]);
        assert_eq!(board.snapshot().1, "Preload failed");
    }

    #[test]
    fn cancel_during_download_aborts_transfer() {
        fn stalls_in_download(effect: &Effect) -> Vec<Msg> {
            match effect {
                Effect::RequestDownload { .. } => vec![
                    Msg::DownloadProgress { fraction: 0.2 },
                    Msg::Cancel,
                    Msg::DownloadComplete {
                        path: PathBuf::from("late.zip"),
                    },
                ],
                other => healthy_engine(other),
            }
        }
        let (outcome, executor, sink, _) = run(with_peers(), stalls_in_download, Msg::Start);

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(executor.executed.last(), Some(&Effect::AbortAcquisition));
        assert!(!executor
            .executed
            .iter()
            .any(|effect| matches!(effect, Effect::RequestExtract { .. })));
        assert_eq!(sink.finished, vec![SessionOutcome::Cancelled]);
    }

    #[test]
    fn closed_inbox_counts_as_cancelled() {
        preload_logging::initialize_for_tests();
        let (tx, rx) = mpsc::channel();
        let handle = SessionHandle::new(tx.clone());
        drop(tx);
        drop(handle);

        struct Idle;
        impl EffectExecutor for Idle {
            fn execute(&mut self, _effect: Effect) {}
        }
        let mut sink = RecordingSink::default();
        let outcome = run_session(
            with_peers(),
            &rx,
            &mut Idle,
            &mut sink,
            &ProgressBoard::default(),
        );

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(sink.finished, vec![SessionOutcome::Cancelled]);
        assert_eq!(sink.progress.len(), 1);
    }

    #[test]
    fn session_handle_sends_cancel() {
        let (tx, rx) = mpsc::channel();
        let handle = SessionHandle::new(tx);
        assert!(handle.cancel());
        assert_eq!(rx.recv().unwrap(), Msg::Cancel);
        drop(rx);
        assert!(!handle.cancel());
    }
}
