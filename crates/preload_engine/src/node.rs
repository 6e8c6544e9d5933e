//! Launches the blockchain node and forwards its line-delimited JSON event feed.

use std::process::Stdio;
use std::sync::Arc;

use preload_logging::{preload_debug, preload_info, preload_warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, NodeFeedEvent, NodeSettings, ProgressSink, TransferError, TransferFailure};

#[async_trait::async_trait]
pub trait NodeLauncher: Send + Sync {
    /// Spawns the node and returns once it is running. Feed events and the node's
    /// eventual exit are delivered through `sink`; `stop` kills the process.
    async fn launch(
        &self,
        sink: Arc<dyn ProgressSink>,
        stop: CancellationToken,
    ) -> Result<(), TransferError>;
}

#[derive(Debug, Clone)]
pub struct ProcessNodeLauncher {
    settings: NodeSettings,
}

impl ProcessNodeLauncher {
    pub fn new(settings: NodeSettings) -> Self {
        Self { settings }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.settings.command);
        command.args(&self.settings.args);
        for peer in &self.settings.peers {
            command.arg("--peer").arg(peer);
        }
        if let Some(dir) = &self.settings.working_dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

#[async_trait::async_trait]
impl NodeLauncher for ProcessNodeLauncher {
    async fn launch(
        &self,
        sink: Arc<dyn ProgressSink>,
        stop: CancellationToken,
    ) -> Result<(), TransferError> {
        let mut child = self.command().spawn().map_err(|err| {
            TransferError::new(
                TransferFailure::Io,
                format!("spawn {}: {err}", self.settings.command.display()),
            )
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransferError::new(TransferFailure::Io, "node stdout is not captured")
        })?;
        preload_info!(
            "node started: {} ({} peers)",
            self.settings.command.display(),
            self.settings.peers.len()
        );

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                let line = tokio::select! {
                    _ = stop.cancelled() => {
                        if let Err(err) = child.kill().await {
                            preload_warn!("failed to stop node: {err}");
                        }
                        return;
                    }
                    line = lines.next_line() => line,
                };
                match line {
                    Ok(Some(line)) => forward_line(&line, sink.as_ref()),
                    Ok(None) => break,
                    Err(err) => {
                        preload_warn!("node feed read failed: {err}");
                        break;
                    }
                }
            }
            let cause = match child.wait().await {
                Ok(status) => format!("node exited with {status}"),
                Err(err) => format!("node wait failed: {err}"),
            };
            sink.emit(EngineEvent::NodeExited { cause });
        });
        Ok(())
    }
}

/// Decodes one stdout line. Lines that are not feed events are node log output.
pub(crate) fn forward_line(line: &str, sink: &dyn ProgressSink) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<NodeFeedEvent>(line) {
        Ok(event) => sink.emit(EngineEvent::Node(event)),
        Err(_) => preload_debug!("node: {line}"),
    }
}
