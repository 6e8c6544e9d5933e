use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use preload_logging::preload_info;
use tokio_util::sync::CancellationToken;

use crate::{ensure_output_dir, EngineEvent, ProgressSink, TransferError, TransferFailure};

#[async_trait::async_trait]
pub trait SnapshotExtractor: Send + Sync {
    async fn extract(
        &self,
        archive: &Path,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<(), TransferError>;
}

/// Unpacks zip snapshots into the node's store directory.
#[derive(Debug, Clone)]
pub struct ZipSnapshotExtractor {
    dest: PathBuf,
}

impl ZipSnapshotExtractor {
    pub fn new(dest: PathBuf) -> Self {
        Self { dest }
    }
}

#[async_trait::async_trait]
impl SnapshotExtractor for ZipSnapshotExtractor {
    async fn extract(
        &self,
        archive: &Path,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<(), TransferError> {
        let archive = archive.to_path_buf();
        let dest = self.dest.clone();
        let entries = tokio::task::spawn_blocking(move || {
            extract_archive(&archive, &dest, sink.as_ref(), &cancel)
        })
        .await
        .map_err(|err| TransferError::new(TransferFailure::Io, err.to_string()))??;
        preload_info!("extracted {} snapshot entries into {}", entries, self.dest.display());
        Ok(())
    }
}

/// Extracts every entry of `archive` below `dest`, reporting the fraction of entries done.
/// Returns the number of entries.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    sink: &dyn ProgressSink,
    cancel: &CancellationToken,
) -> Result<usize, TransferError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(archive_error)?;
    let total = zip.len();
    if total == 0 {
        return Err(TransferError::new(
            TransferFailure::Archive,
            "snapshot archive has no entries",
        ));
    }
    ensure_output_dir(dest)?;

    for index in 0..total {
        if cancel.is_cancelled() {
            return Err(TransferError::cancelled("extraction"));
        }
        let mut entry = zip.by_index(index).map_err(archive_error)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(TransferError::new(
                TransferFailure::Archive,
                format!("entry escapes destination: {}", entry.name()),
            ));
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }

        sink.emit(EngineEvent::ExtractProgress {
            fraction: (index + 1) as f64 / total as f64,
        });
    }
    Ok(total)
}

fn archive_error(err: zip::result::ZipError) -> TransferError {
    TransferError::new(TransferFailure::Archive, err.to_string())
}
