use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_debug;
use harvester_core::RepositoryRecord;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure output directory exists and is writable; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    // Writability check before any quota is spent on the first artifact.
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file in
/// the same directory, then renaming it over the target.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(
        &self,
        filename: &str,
        content: impl AsRef<[u8]>,
    ) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_ref())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Writes `content` to `path` through an [`AtomicFileWriter`] on its parent.
pub fn write_file_atomically(
    path: &Path,
    content: impl AsRef<[u8]>,
) -> Result<PathBuf, PersistError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PersistError::OutputDir(format!("no file name in {}", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    AtomicFileWriter::new(dir).write(filename, content)
}

/// Partition artifacts on disk.
///
/// An artifact's existence marks its partition as harvested. Contents are
/// never inspected, so an empty or damaged artifact still counts as done;
/// delete it to force a re-fetch.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    writer: AtomicFileWriter,
    dir: PathBuf,
    cooldown: Duration,
}

impl ArtifactStore {
    /// `cooldown` is slept after every write to stay under secondary rate limits.
    pub fn new(dir: PathBuf, cooldown: Duration) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir.clone()),
            dir,
            cooldown,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, artifact: &str) -> PathBuf {
        self.dir.join(artifact)
    }

    pub fn already_done(&self, artifact: &str) -> bool {
        self.path_for(artifact).exists()
    }

    pub async fn write(
        &self,
        artifact: &str,
        records: &[RepositoryRecord],
    ) -> Result<PathBuf, PersistError> {
        let content = serde_json::to_vec(records)?;
        let path = self.writer.write(artifact, content)?;
        engine_debug!("Wrote {} records to {:?}", records.len(), path);
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
        Ok(path)
    }
}
