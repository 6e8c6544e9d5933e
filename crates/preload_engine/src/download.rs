use futures_util::StreamExt;
use preload_core::SnapshotMetadata;
use preload_logging::{preload_debug, preload_info};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, EngineSettings, ProgressSink, StagedFile, TransferError, TransferFailure};

/// Name of the downloaded archive inside the download directory.
pub const SNAPSHOT_FILENAME: &str = "snapshot.zip";

#[async_trait::async_trait]
pub trait SnapshotDownloader: Send + Sync {
    async fn fetch_metadata(&self) -> Result<SnapshotMetadata, TransferError>;

    /// Streams the snapshot archive to disk and returns its path.
    async fn download(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<std::path::PathBuf, TransferError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSnapshotDownloader {
    settings: EngineSettings,
}

impl ReqwestSnapshotDownloader {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, with_timeout: bool) -> Result<reqwest::Client, TransferError> {
        let mut builder = reqwest::Client::builder().connect_timeout(self.settings.connect_timeout);
        if with_timeout {
            builder = builder.timeout(self.settings.request_timeout);
        }
        builder
            .build()
            .map_err(|err| TransferError::new(TransferFailure::Network, err.to_string()))
    }

    async fn get(&self, url: &str, with_timeout: bool) -> Result<reqwest::Response, TransferError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| TransferError::new(TransferFailure::InvalidUrl, err.to_string()))?;
        let response = self
            .build_client(with_timeout)?
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::new(
                TransferFailure::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl SnapshotDownloader for ReqwestSnapshotDownloader {
    async fn fetch_metadata(&self) -> Result<SnapshotMetadata, TransferError> {
        let response = self.get(&self.settings.metadata_url, true).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        preload_debug!(
            "fetched {} bytes of snapshot metadata from {}",
            bytes.len(),
            self.settings.metadata_url
        );
        Ok(SnapshotMetadata::new(bytes.to_vec()))
    }

    async fn download(
        &self,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<std::path::PathBuf, TransferError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransferError::cancelled("download")),
            response = self.get(&self.settings.snapshot_url, false) => response?,
        };
        let total = response.content_length().filter(|len| *len > 0);
        let mut staged = StagedFile::create_in(&self.settings.download_dir)?;

        sink.emit(EngineEvent::DownloadProgress { fraction: 0.0 });

        let mut last_percent = 0u64;
        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransferError::cancelled("download")),
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(map_reqwest_error)?;
            let written = staged.append(&chunk)?;

            // One event per whole percent keeps the inbox small on large snapshots.
            if let Some(total) = total {
                let percent = (written.min(total) * 100) / total;
                if percent > last_percent {
                    last_percent = percent;
                    sink.emit(EngineEvent::DownloadProgress {
                        fraction: written.min(total) as f64 / total as f64,
                    });
                }
            }
        }

        let written = staged.written();
        let path = staged.persist(SNAPSHOT_FILENAME)?;
        sink.emit(EngineEvent::DownloadProgress { fraction: 1.0 });
        preload_info!("snapshot saved to {} ({} bytes)", path.display(), written);
        Ok(path)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::new(TransferFailure::Timeout, err.to_string());
    }
    TransferError::new(TransferFailure::Network, err.to_string())
}
