use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writable iff a temp file can be created here.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// A file being written in `dir` that only appears under its final name once persisted.
/// Dropping it without persisting removes the partial data.
pub struct StagedFile {
    dir: PathBuf,
    tmp: NamedTempFile,
    written: u64,
}

impl StagedFile {
    pub fn create_in(dir: &Path) -> Result<Self, PersistError> {
        ensure_output_dir(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            tmp: NamedTempFile::new_in(dir)?,
            written: 0,
        })
    }

    pub fn append(&mut self, chunk: &[u8]) -> Result<u64, PersistError> {
        self.tmp.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(self.written)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and renames to `{dir}/{filename}`, replacing an older file.
    pub fn persist(mut self, filename: &str) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;

        let target = self.dir.join(filename);
        if target.exists() {
            fs::remove_file(&target)?;
        }
        self.tmp
            .persist(&target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}
