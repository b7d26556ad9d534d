use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use engine_logging::{engine_info, engine_warn};
use harvester_core::{rank_owners, OwnerRank, RepoRow, RepositoryRecord};
use serde_json::Value;

use crate::persist::{write_file_atomically, PersistError};

pub const REPO_TABLE_FILENAME: &str = "repos-by-stars.csv";
pub const H_INDEX_FILENAME: &str = "h-index.csv";

const ARTIFACT_PREFIX: &str = "repos.star";
const ARTIFACT_SUFFIX: &str = ".json";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("artifact {path:?} is not a list of repositories: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Artifact files in `dir`, oldest first by modification time.
///
/// Files with equal timestamps are ordered by name.
pub fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let mut artifacts: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_SUFFIX) {
            let modified = entry.metadata()?.modified()?;
            artifacts.push((modified, entry.path()));
        }
    }
    artifacts.sort();
    Ok(artifacts.into_iter().map(|(_, path)| path).collect())
}

/// Merges every artifact in `dir` into table rows.
///
/// A repository appearing in several artifacts keeps the data from the most
/// recently modified one. Rows are sorted by descending stars, then by name.
pub fn merge_artifacts(dir: &Path) -> Result<Vec<RepoRow>, ExportError> {
    let mut by_name: BTreeMap<String, RepoRow> = BTreeMap::new();
    let artifacts = list_artifacts(dir)?;
    for path in &artifacts {
        let content = fs::read(path)?;
        let artifact_error = |source: serde_json::Error| ExportError::Artifact {
            path: path.clone(),
            source,
        };
        let entries: Vec<Value> = serde_json::from_slice(&content).map_err(artifact_error)?;
        for entry in entries {
            if is_empty_entry(&entry) {
                engine_warn!("Skipping empty record in {:?}", path);
                continue;
            }
            let record: RepositoryRecord =
                serde_json::from_value(entry).map_err(artifact_error)?;
            by_name.insert(record.name_with_owner.clone(), RepoRow::from(record));
        }
    }
    engine_info!(
        "Merged {} repositories from {} artifacts",
        by_name.len(),
        artifacts.len()
    );

    let mut rows: Vec<RepoRow> = by_name.into_values().collect();
    // Stable sort keeps name order among equal star counts.
    rows.sort_by(|a, b| b.stars.cmp(&a.stars));
    Ok(rows)
}

/// `null` and `{}` entries carry no repository and are skipped.
fn is_empty_entry(entry: &Value) -> bool {
    match entry {
        Value::Null => true,
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

pub fn write_repo_table(path: &Path, rows: &[RepoRow]) -> Result<PathBuf, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    if rows.is_empty() {
        writer.write_record([
            "repo", "stars", "created", "updated", "language", "watchers", "forks", "isFork",
        ])?;
    }
    let content = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(write_file_atomically(path, content)?)
}

pub fn read_repo_table(path: &Path) -> Result<Vec<RepoRow>, ExportError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<RepoRow>, _>>()?;
    Ok(rows)
}

/// Ranks owners in `rows` and writes those with an h-index of at least
/// `min_h_index`. Returns the written ranks.
pub fn write_h_index_table(
    path: &Path,
    rows: &[RepoRow],
    min_h_index: usize,
) -> Result<Vec<OwnerRank>, ExportError> {
    let ranks: Vec<OwnerRank> = rank_owners(rows.iter().map(|row| (row.repo.as_str(), row.stars)))
        .into_iter()
        .take_while(|rank| rank.h_index >= min_h_index)
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["h_index", "user"])?;
    for rank in &ranks {
        writer.write_record([rank.h_index.to_string(), rank.user.clone()])?;
    }
    let content = writer.into_inner().map_err(|err| err.into_error())?;
    write_file_atomically(path, content)?;
    Ok(ranks)
}
