use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use preload_core::SnapshotMetadata;
use preload_logging::preload_debug;
use tokio_util::sync::CancellationToken;

use crate::{
    ChannelProgressSink, EngineEvent, EngineSettings, GraphQlSnapshotValidator, NodeLauncher,
    ProcessNodeLauncher, ProgressSink, ReqwestSnapshotDownloader, SnapshotDownloader,
    SnapshotExtractor, SnapshotValidator, ZipSnapshotExtractor,
};

enum EngineCommand {
    FetchMetadata,
    Validate(SnapshotMetadata),
    Download,
    Extract(PathBuf),
    StartNode,
    AbortTransfers,
    StopNode,
}

/// The collaborators the engine drives.
#[derive(Clone)]
pub struct Backends {
    pub downloader: Arc<dyn SnapshotDownloader>,
    pub validator: Arc<dyn SnapshotValidator>,
    pub extractor: Arc<dyn SnapshotExtractor>,
    pub launcher: Arc<dyn NodeLauncher>,
}

impl Backends {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            downloader: Arc::new(ReqwestSnapshotDownloader::new(settings.clone())),
            validator: Arc::new(GraphQlSnapshotValidator::new(
                settings.validation_url.clone(),
                settings.request_timeout,
            )),
            extractor: Arc::new(ZipSnapshotExtractor::new(settings.extract_dir.clone())),
            launcher: Arc::new(ProcessNodeLauncher::new(settings.node.clone())),
        }
    }
}

/// Sends requests to the engine thread. Requests return immediately; results arrive
/// as [`EngineEvent`]s on the paired [`EngineEvents`].
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

pub struct EngineEvents {
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: &EngineSettings) -> io::Result<(Self, EngineEvents)> {
        Self::with_backends(Backends::from_settings(settings))
    }

    pub fn with_backends(backends: Backends) -> io::Result<(Self, EngineEvents)> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        thread::spawn(move || {
            let sink: Arc<dyn ProgressSink> = Arc::new(ChannelProgressSink::new(event_tx));
            let transfers = CancellationToken::new();
            let node = CancellationToken::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::AbortTransfers => {
                        preload_debug!("aborting snapshot transfers");
                        transfers.cancel();
                    }
                    EngineCommand::StopNode => node.cancel(),
                    command => {
                        let backends = backends.clone();
                        let sink = sink.clone();
                        let transfers = transfers.clone();
                        let node = node.clone();
                        runtime.spawn(async move {
                            handle_command(&backends, command, sink, transfers, node).await;
                        });
                    }
                }
            }
        });

        Ok((Self { cmd_tx }, EngineEvents { event_rx }))
    }

    pub fn fetch_metadata(&self) {
        self.send(EngineCommand::FetchMetadata);
    }

    pub fn validate(&self, metadata: SnapshotMetadata) {
        self.send(EngineCommand::Validate(metadata));
    }

    pub fn download(&self) {
        self.send(EngineCommand::Download);
    }

    pub fn extract(&self, archive: PathBuf) {
        self.send(EngineCommand::Extract(archive));
    }

    pub fn start_node(&self) {
        self.send(EngineCommand::StartNode);
    }

    /// Cancels any in-flight download or extraction. Nothing is re-requested.
    pub fn abort_transfers(&self) {
        self.send(EngineCommand::AbortTransfers);
    }

    pub fn stop_node(&self) {
        self.send(EngineCommand::StopNode);
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl EngineEvents {
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Blocks until the next event. `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    backends: &Backends,
    command: EngineCommand,
    sink: Arc<dyn ProgressSink>,
    transfers: CancellationToken,
    node: CancellationToken,
) {
    match command {
        EngineCommand::FetchMetadata => {
            let result = backends.downloader.fetch_metadata().await;
            sink.emit(EngineEvent::MetadataFetched(result));
        }
        EngineCommand::Validate(metadata) => {
            let result = backends.validator.validate(&metadata).await;
            sink.emit(EngineEvent::Validated(result));
        }
        EngineCommand::Download => {
            let result = backends
                .downloader
                .download(sink.as_ref(), &transfers)
                .await;
            sink.emit(EngineEvent::Downloaded(result));
        }
        EngineCommand::Extract(archive) => {
            let result = backends
                .extractor
                .extract(&archive, sink.clone(), transfers)
                .await;
            sink.emit(EngineEvent::Extracted(result));
        }
        EngineCommand::StartNode => {
            if let Err(err) = backends.launcher.launch(sink.clone(), node).await {
                sink.emit(EngineEvent::NodeExited {
                    cause: err.to_string(),
                });
            }
        }
        EngineCommand::AbortTransfers | EngineCommand::StopNode => {}
    }
}
