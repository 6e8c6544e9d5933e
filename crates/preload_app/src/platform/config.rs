use std::fs;
use std::path::{Path, PathBuf};

use preload_core::SessionConfig;
use preload_engine::{EngineSettings, NodeSettings};
use preload_logging::{preload_info, preload_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const DEFAULT_CONFIG_FILENAME: &str = "preload.ron";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
}

/// Launcher settings persisted next to the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LauncherConfig {
    pub use_snapshot: bool,
    pub peer_strings: Vec<String>,
    pub snapshot_base_url: String,
    /// Snapshot validation service. Defaults to `{snapshot_base_url}/graphql`.
    pub validation_url: Option<String>,
    pub data_dir: PathBuf,
    pub node_command: PathBuf,
    pub node_args: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            use_snapshot: true,
            peer_strings: Vec::new(),
            snapshot_base_url: "http://localhost:8080/snapshots".to_string(),
            validation_url: None,
            data_dir: PathBuf::from("./data"),
            node_command: PathBuf::from("./headless"),
            node_args: Vec::new(),
        }
    }
}

impl LauncherConfig {
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            use_snapshot: self.use_snapshot,
            peer_list_non_empty: self.peers().next().is_some(),
        }
    }

    pub(crate) fn validation_url(&self) -> String {
        match &self.validation_url {
            Some(url) => url.clone(),
            None => format!("{}/graphql", self.snapshot_base_url.trim_end_matches('/')),
        }
    }

    pub(crate) fn engine_settings(&self) -> EngineSettings {
        let launch_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        self.engine_settings_in(&launch_dir)
    }

    /// Settings with a relative node path resolved against `launch_dir`, since the node
    /// runs with `data_dir` as its working directory.
    pub(crate) fn engine_settings_in(&self, launch_dir: &Path) -> EngineSettings {
        let mut settings = EngineSettings::for_data_dir(
            &self.snapshot_base_url,
            &self.validation_url(),
            self.data_dir.clone(),
        );
        settings.node = NodeSettings {
            command: resolve_command(&self.node_command, launch_dir),
            args: self.node_args.clone(),
            peers: self.peers().map(ToOwned::to_owned).collect(),
            working_dir: Some(self.data_dir.clone()),
        };
        settings
    }

    /// Peer strings with blank entries dropped.
    fn peers(&self) -> impl Iterator<Item = &str> {
        self.peer_strings
            .iter()
            .map(|peer| peer.trim())
            .filter(|peer| !peer.is_empty())
    }
}

/// Bare program names stay as they are so the OS can search `PATH`.
fn resolve_command(command: &Path, launch_dir: &Path) -> PathBuf {
    let has_dir = command
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty());
    if command.is_relative() && has_dir {
        launch_dir.join(command)
    } else {
        command.to_path_buf()
    }
}

/// Loads the launcher config. A missing file yields defaults; a broken one is an error.
pub(crate) fn load_config(path: &Path) -> Result<LauncherConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            preload_warn!("No config at {:?}, using defaults", path);
            return Ok(LauncherConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: LauncherConfig = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    preload_info!("Loaded launcher config from {:?}", path);
    Ok(config)
}
