use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use harvester_core::{Filter, Partition, RepositoryRecord};
use serde::Deserialize;

use crate::persist::PersistError;

/// Rate-limit snapshot returned with every search response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub cost: u64,
    pub remaining: u64,
    pub reset_at: Option<DateTime<Utc>>,
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cost={} remaining={}", self.cost, self.remaining)?;
        if let Some(reset_at) = self.reset_at {
            write!(f, " reset_at={}", reset_at.to_rfc3339())?;
        }
        Ok(())
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Total number of matches the server reports for the filter.
    pub total: u64,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
    pub records: Vec<RepositoryRecord>,
    pub rate_limit: Option<RateLimit>,
}

/// Why a pagination loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The server reported no further page.
    Exhausted,
    /// The remaining quota fell below the safety threshold; results are truncated.
    RateLimited {
        remaining: u64,
        reset_at: Option<DateTime<Utc>>,
    },
}

/// Records collected for one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Harvested {
    pub records: Vec<RepositoryRecord>,
    pub reported_total: u64,
    pub pages: u32,
    pub completion: Completion,
}

impl Harvested {
    pub fn is_truncated(&self) -> bool {
        matches!(self.completion, Completion::RateLimited { .. })
    }
}

/// Progress reported while harvesting, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    /// Artifact already present; partition not queried.
    Skipped { partition: Partition, artifact: String },
    Probed {
        partition: Partition,
        filter: Filter,
        count: u64,
    },
    Splitting {
        partition: Partition,
        count: u64,
        lower: Partition,
        upper: Partition,
    },
    Refining {
        partition: Partition,
        count: u64,
        finer: Partition,
    },
    PageFetched {
        filter: Filter,
        page: u32,
        accumulated: usize,
        total: u64,
        rate_limit: Option<RateLimit>,
    },
    Written {
        partition: Partition,
        path: PathBuf,
        records: usize,
        total: u64,
        truncated: bool,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: HarvestEvent) {}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
    pub kind: FailureKind,
    pub message: String,
}

impl QueryError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidResponse, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidEndpoint,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    InvalidResponse,
    GraphQl,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidEndpoint => write!(f, "invalid endpoint"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::InvalidResponse => write!(f, "invalid response"),
            FailureKind::GraphQl => write!(f, "graphql error"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// Fatal conditions that abort a harvest run.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("query for `{filter}` failed: {source}")]
    Query {
        filter: Filter,
        #[source]
        source: QueryError,
    },
    #[error("`{filter}` reports {total} results, over the cap of {cap}; splitting went wrong")]
    OverCap { filter: Filter, total: u64, cap: u64 },
    #[error("cannot split further: `{filter}` ({partition}) still has {count} results")]
    Unsplittable {
        filter: Filter,
        partition: Partition,
        count: u64,
    },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

impl HarvestError {
    pub(crate) fn query(filter: &Filter, source: QueryError) -> Self {
        Self::Query {
            filter: filter.clone(),
            source,
        }
    }
}
