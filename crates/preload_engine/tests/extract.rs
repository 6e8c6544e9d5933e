use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use preload_engine::{
    extract_archive, EngineEvent, ProgressSink, SnapshotExtractor, TransferFailure,
    ZipSnapshotExtractor,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn entries_are_extracted_with_progress() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("snapshot.zip");
    write_zip(
        &archive,
        &[
            ("states/000001.sst", b"state"),
            ("blocks/epoch1/0.blk", b"block"),
            ("metadata.json", b"{}"),
            ("txs/0.tx", b"tx"),
        ],
    );
    let dest = temp.path().join("store");
    let sink = TestSink::default();

    let count = extract_archive(&archive, &dest, &sink, &CancellationToken::new()).unwrap();

    assert_eq!(count, 4);
    assert_eq!(fs::read(dest.join("states/000001.sst")).unwrap(), b"state");
    assert_eq!(fs::read(dest.join("blocks/epoch1/0.blk")).unwrap(), b"block");
    let fractions: Vec<f64> = sink
        .events
        .into_inner()
        .unwrap()
        .into_iter()
        .filter_map(|event| match event {
            EngineEvent::ExtractProgress { fraction } => Some(fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions, vec![0.25, 0.5, 0.75, 1.0]);
}

#[test]
fn empty_archive_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("empty.zip");
    write_zip(&archive, &[]);

    let err = extract_archive(
        &archive,
        &temp.path().join("store"),
        &TestSink::default(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind, TransferFailure::Archive);
}

#[test]
fn corrupt_archive_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("broken.zip");
    fs::write(&archive, b"definitely not a zip").unwrap();

    let err = extract_archive(
        &archive,
        &temp.path().join("store"),
        &TestSink::default(),
        &CancellationToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind, TransferFailure::Archive);
}

#[test]
fn cancelled_extraction_stops_before_writing() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("snapshot.zip");
    write_zip(&archive, &[("a.bin", b"a")]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = extract_archive(&archive, &temp.path().join("store"), &TestSink::default(), &cancel)
        .unwrap_err();
    assert_eq!(err.kind, TransferFailure::Cancelled);
    assert!(!temp.path().join("store/a.bin").exists());
}

#[tokio::test]
async fn extractor_runs_off_the_async_thread() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("snapshot.zip");
    write_zip(&archive, &[("block/1", b"1"), ("block/2", b"2")]);
    let dest = temp.path().join("store");

    let extractor = ZipSnapshotExtractor::new(dest.clone());
    let sink: Arc<dyn ProgressSink> = Arc::new(TestSink::default());
    extractor
        .extract(&archive, sink, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fs::read(dest.join("block/2")).unwrap(), b"2");
}
