use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of one repository as returned by the search API.
///
/// Serializes to and from the API's node shape (`stargazers.totalCount`,
/// `primaryLanguage.name`, ...), which is also the artifact format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RepositoryNode", into = "RepositoryNode")]
pub struct RepositoryRecord {
    pub name_with_owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub primary_language: Option<String>,
    pub stars: u64,
    pub watchers: u64,
    pub forks: u64,
    pub is_fork: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    name_with_owner: String,
    created_at: DateTime<Utc>,
    fork_count: u64,
    is_fork: bool,
    updated_at: DateTime<Utc>,
    primary_language: Option<Named>,
    stargazers: TotalCount,
    watchers: TotalCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalCount {
    total_count: u64,
}

impl From<RepositoryNode> for RepositoryRecord {
    fn from(node: RepositoryNode) -> Self {
        Self {
            name_with_owner: node.name_with_owner,
            created_at: node.created_at,
            updated_at: node.updated_at,
            primary_language: node.primary_language.map(|lang| lang.name),
            stars: node.stargazers.total_count,
            watchers: node.watchers.total_count,
            forks: node.fork_count,
            is_fork: node.is_fork,
        }
    }
}

impl From<RepositoryRecord> for RepositoryNode {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            name_with_owner: record.name_with_owner,
            created_at: record.created_at,
            fork_count: record.forks,
            is_fork: record.is_fork,
            updated_at: record.updated_at,
            primary_language: record.primary_language.map(|name| Named { name }),
            stargazers: TotalCount {
                total_count: record.stars,
            },
            watchers: TotalCount {
                total_count: record.watchers,
            },
        }
    }
}

/// One row of the flattened repository table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRow {
    pub repo: String,
    pub stars: u64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub language: String,
    pub watchers: u64,
    pub forks: u64,
    #[serde(rename = "isFork", with = "fork_flag")]
    pub is_fork: bool,
}

impl From<RepositoryRecord> for RepoRow {
    fn from(record: RepositoryRecord) -> Self {
        Self {
            repo: record.name_with_owner,
            stars: record.stars,
            created: record.created_at,
            updated: record.updated_at,
            language: record.primary_language.unwrap_or_default(),
            watchers: record.watchers,
            forks: record.forks,
            is_fork: record.is_fork,
        }
    }
}

impl RepoRow {
    /// Owner part of `owner/name`, if present.
    pub fn owner(&self) -> Option<&str> {
        self.repo.split_once('/').map(|(owner, _)| owner)
    }
}

/// `isFork` column: `1` for forks, empty otherwise.
mod fork_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "1" } else { "" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        Ok(!(raw.is_empty() || raw == "0" || raw.eq_ignore_ascii_case("false")))
    }
}
