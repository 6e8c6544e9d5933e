use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub metadata_url: String,
    pub snapshot_url: String,
    /// GraphQL endpoint answering `validateSnapshot`. It must be reachable before the node runs.
    pub validation_url: String,
    pub download_dir: PathBuf,
    pub extract_dir: PathBuf,
    pub connect_timeout: Duration,
    /// Applies to metadata and validation requests. Snapshot transfers have no overall limit.
    pub request_timeout: Duration,
    pub node: NodeSettings,
}

#[derive(Debug, Clone, Default)]
pub struct NodeSettings {
    pub command: PathBuf,
    pub args: Vec<String>,
    /// Each entry is passed as `--peer <value>`.
    pub peers: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl EngineSettings {
    /// Settings for a snapshot host serving `latest.json` and `latest.zip` under `base_url`.
    pub fn for_data_dir(base_url: &str, validation_url: &str, data_dir: PathBuf) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            metadata_url: format!("{base}/latest.json"),
            snapshot_url: format!("{base}/latest.zip"),
            validation_url: validation_url.to_string(),
            download_dir: data_dir.join("downloads"),
            extract_dir: data_dir.join("store"),
            ..Self::default()
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            metadata_url: "http://localhost:8080/snapshots/latest.json".to_string(),
            snapshot_url: "http://localhost:8080/snapshots/latest.zip".to_string(),
            validation_url: "http://localhost:8080/snapshots/graphql".to_string(),
            download_dir: PathBuf::from("./data/downloads"),
            extract_dir: PathBuf::from("./data/store"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            node: NodeSettings::default(),
        }
    }
}
