use std::sync::mpsc;
use std::thread;

use preload_core::{AcquisitionStage, Effect, Msg};
use preload_engine::{EngineEvent, EngineEvents, EngineHandle, NodeFeedEvent};
use preload_logging::{preload_debug, preload_info, preload_warn};

/// Carries out the IO effects the coordinator asks for.
pub(crate) trait EffectExecutor {
    fn execute(&mut self, effect: Effect);
}

pub(crate) struct EngineEffectRunner {
    engine: EngineHandle,
}

impl EngineEffectRunner {
    pub(crate) fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }
}

impl EffectExecutor for EngineEffectRunner {
    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::DownloadMetadata => {
                preload_info!("DownloadMetadata");
                self.engine.fetch_metadata();
            }
            Effect::ValidateSnapshot { metadata } => {
                preload_info!("ValidateSnapshot metadata_len={}", metadata.len());
                self.engine.validate(metadata);
            }
            Effect::RequestDownload { metadata } => {
                preload_info!("RequestDownload metadata_len={}", metadata.len());
                self.engine.download();
            }
            Effect::RequestExtract { path } => {
                preload_info!("RequestExtract path={}", path.display());
                self.engine.extract(path);
            }
            Effect::StartNode => {
                preload_info!("StartNode");
                self.engine.start_node();
            }
            Effect::AbortAcquisition => {
                preload_info!("AbortAcquisition");
                self.engine.abort_transfers();
            }
            Effect::Track(_) | Effect::Finished(_) => {
                // routed to the status sink by the session loop
            }
        }
    }
}

/// Forwards engine events into the session inbox until either side goes away.
pub(crate) fn spawn_event_pump(events: EngineEvents, msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        while let Some(event) = events.recv() {
            if msg_tx.send(map_engine_event(event)).is_err() {
                break;
            }
        }
        preload_debug!("engine event pump stopped");
    });
}

pub(crate) fn map_engine_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::MetadataFetched(Ok(metadata)) => Msg::MetadataDownloaded { metadata },
        EngineEvent::MetadataFetched(Err(err)) => failed(AcquisitionStage::Metadata, err),
        EngineEvent::Validated(result) => Msg::ValidationFinished(result),
        EngineEvent::DownloadProgress { fraction } => Msg::DownloadProgress { fraction },
        EngineEvent::Downloaded(Ok(path)) => Msg::DownloadComplete { path },
        EngineEvent::Downloaded(Err(err)) => failed(AcquisitionStage::Download, err),
        EngineEvent::ExtractProgress { fraction } => Msg::ExtractProgress { fraction },
        EngineEvent::Extracted(Ok(())) => Msg::ExtractComplete,
        EngineEvent::Extracted(Err(err)) => failed(AcquisitionStage::Extract, err),
        EngineEvent::Node(NodeFeedEvent::NodeStatus(status)) => Msg::NodeStatus(status),
        EngineEvent::Node(NodeFeedEvent::PreloadProgress(progress)) => {
            Msg::PreloadProgress(progress)
        }
        EngineEvent::NodeExited { cause } => Msg::NodeStartFailed { cause },
    }
}

fn failed(stage: AcquisitionStage, err: preload_engine::TransferError) -> Msg {
    preload_warn!("{} stage failed: {}", stage, err);
    Msg::AcquisitionFailed {
        stage,
        cause: err.to_string(),
    }
}
