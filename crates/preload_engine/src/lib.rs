//! Preload engine: IO side of the preload session.
mod download;
mod engine;
mod extract;
mod node;
mod persist;
mod settings;
mod sink;
mod types;
mod validate;

pub use download::{ReqwestSnapshotDownloader, SnapshotDownloader, SNAPSHOT_FILENAME};
pub use engine::{Backends, EngineEvents, EngineHandle};
pub use extract::{extract_archive, SnapshotExtractor, ZipSnapshotExtractor};
pub use node::{NodeLauncher, ProcessNodeLauncher};
pub use persist::{ensure_output_dir, PersistError, StagedFile};
pub use settings::{EngineSettings, NodeSettings};
pub use sink::{ChannelProgressSink, ProgressSink};
pub use types::{EngineEvent, NodeFeedEvent, TransferError, TransferFailure};
pub use validate::{GraphQlSnapshotValidator, SnapshotValidator, VALIDATE_SNAPSHOT_QUERY};
