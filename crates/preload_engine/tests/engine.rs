use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use preload_core::{
    NodeStatusEvent, SnapshotMetadata, ValidationError, ValidationResult,
};
use preload_engine::{
    Backends, EngineEvent, EngineHandle, NodeFeedEvent, NodeLauncher, ProgressSink,
    SnapshotDownloader, SnapshotExtractor, SnapshotValidator, TransferError, TransferFailure,
};
use tokio_util::sync::CancellationToken;

struct FakeDownloader;

#[async_trait::async_trait]
impl SnapshotDownloader for FakeDownloader {
    async fn fetch_metadata(&self) -> Result<SnapshotMetadata, TransferError> {
        Ok(SnapshotMetadata::new(b"meta".to_vec()))
    }

    async fn download(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        sink.emit(EngineEvent::DownloadProgress { fraction: 0.5 });
        cancel.cancelled().await;
        Err(TransferError {
            kind: TransferFailure::Cancelled,
            message: "download cancelled".into(),
        })
    }
}

struct FakeValidator;

#[async_trait::async_trait]
impl SnapshotValidator for FakeValidator {
    async fn validate(
        &self,
        metadata: &SnapshotMetadata,
    ) -> Result<ValidationResult, ValidationError> {
        Ok(ValidationResult {
            usable: metadata.as_bytes() == b"meta",
        })
    }
}

struct FakeExtractor;

#[async_trait::async_trait]
impl SnapshotExtractor for FakeExtractor {
    async fn extract(
        &self,
        _archive: &Path,
        sink: Arc<dyn ProgressSink>,
        _cancel: CancellationToken,
    ) -> Result<(), TransferError> {
        sink.emit(EngineEvent::ExtractProgress { fraction: 1.0 });
        Ok(())
    }
}

#[derive(Default)]
struct FakeLauncher {
    launches: Mutex<usize>,
}

#[async_trait::async_trait]
impl NodeLauncher for FakeLauncher {
    async fn launch(
        &self,
        sink: Arc<dyn ProgressSink>,
        _stop: CancellationToken,
    ) -> Result<(), TransferError> {
        *self.launches.lock().unwrap() += 1;
        sink.emit(EngineEvent::Node(NodeFeedEvent::NodeStatus(
            NodeStatusEvent::ended(true),
        )));
        Ok(())
    }
}

struct FailingLauncher;

#[async_trait::async_trait]
impl NodeLauncher for FailingLauncher {
    async fn launch(
        &self,
        _sink: Arc<dyn ProgressSink>,
        _stop: CancellationToken,
    ) -> Result<(), TransferError> {
        Err(TransferError {
            kind: TransferFailure::Io,
            message: "spawn headless: not found".into(),
        })
    }
}

fn backends(launcher: Arc<dyn NodeLauncher>) -> Backends {
    Backends {
        downloader: Arc::new(FakeDownloader),
        validator: Arc::new(FakeValidator),
        extractor: Arc::new(FakeExtractor),
        launcher,
    }
}

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn requests_are_answered_as_events() {
    let launcher = Arc::new(FakeLauncher::default());
    let (engine, events) = EngineHandle::with_backends(backends(launcher.clone())).unwrap();

    engine.fetch_metadata();
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::MetadataFetched(Ok(SnapshotMetadata::new(
            b"meta".to_vec()
        ))))
    );

    engine.validate(SnapshotMetadata::new(b"meta".to_vec()));
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::Validated(Ok(ValidationResult { usable: true })))
    );

    engine.extract(PathBuf::from("/tmp/snapshot.zip"));
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::ExtractProgress { fraction: 1.0 })
    );
    assert_eq!(events.recv_timeout(WAIT), Some(EngineEvent::Extracted(Ok(()))));

    engine.start_node();
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::Node(NodeFeedEvent::NodeStatus(
            NodeStatusEvent::ended(true)
        )))
    );
    assert_eq!(*launcher.launches.lock().unwrap(), 1);
}

#[test]
fn abort_cancels_in_flight_download() {
    let (engine, events) =
        EngineHandle::with_backends(backends(Arc::new(FakeLauncher::default()))).unwrap();

    engine.download();
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::DownloadProgress { fraction: 0.5 })
    );
    engine.abort_transfers();

    match events.recv_timeout(WAIT) {
        Some(EngineEvent::Downloaded(Err(err))) => {
            assert_eq!(err.kind, TransferFailure::Cancelled)
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn launch_failure_is_reported_as_node_exit() {
    let (engine, events) = EngineHandle::with_backends(backends(Arc::new(FailingLauncher))).unwrap();

    engine.start_node();
    assert_eq!(
        events.recv_timeout(WAIT),
        Some(EngineEvent::NodeExited {
            cause: "io error: spawn headless: not found".into()
        })
    );
}
