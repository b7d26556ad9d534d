//! Repository search over the GraphQL API: count probes and result pages.

use engine_logging::{engine_debug, engine_warn};
use harvester_core::{Filter, RepositoryRecord};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::executor::{into_data, QueryExecutor};
use crate::{QueryError, RateLimit, SearchPage};

/// Placeholder replaced with the search string.
const SEARCH_MARKER: &str = "%SEARCH%";

const REPOSITORY_QUERY: &str = r#"
query popular_repos($start: String, $num: Int!) {
  rateLimit {
    cost
    remaining
    resetAt
  }
  search(query: "%SEARCH%", type: REPOSITORY, first: $num, after: $start) {
    repositoryCount
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        ... on Repository {
          nameWithOwner
          createdAt
          forkCount
          isFork
          updatedAt
          primaryLanguage {
            name
          }
          stargazers {
            totalCount
          }
          watchers {
            totalCount
          }
        }
      }
    }
  }
}
"#;

const COUNT_QUERY: &str = r#"
query {
  rateLimit {
    cost
    remaining
    resetAt
  }
  search(query: "%SEARCH%", type: REPOSITORY, first: 1) {
    repositoryCount
  }
}
"#;

/// Total number of matches for a filter, without fetching records.
#[async_trait::async_trait]
pub trait CountProbe: Send + Sync {
    async fn count(&self, filter: &Filter) -> Result<u64, QueryError>;
}

/// One page of records for a filter, starting after `cursor`.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn page(
        &self,
        filter: &Filter,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<SearchPage, QueryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    rate_limit: Option<RateLimit>,
    search: SearchResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    repository_count: u64,
    page_info: Option<PageInfo>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    /// Null when the search index returns an entry it cannot resolve.
    node: Option<RepositoryRecord>,
}

/// Search backend issuing GraphQL documents through a [`QueryExecutor`].
#[derive(Debug, Clone)]
pub struct GraphQlSearch<E> {
    executor: E,
}

impl<E: QueryExecutor> GraphQlSearch<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    async fn search(
        &self,
        template: &str,
        filter: &Filter,
        variables: Value,
    ) -> Result<SearchData, QueryError> {
        let document = template.replace(SEARCH_MARKER, &filter.search_string());
        let response = self.executor.execute(&document, variables).await?;
        let data = into_data(response)?;
        serde_json::from_value(data).map_err(|err| QueryError::invalid_response(err.to_string()))
    }
}

#[async_trait::async_trait]
impl<E: QueryExecutor> CountProbe for GraphQlSearch<E> {
    async fn count(&self, filter: &Filter) -> Result<u64, QueryError> {
        let data = self.search(COUNT_QUERY, filter, json!({})).await?;
        if let Some(rate_limit) = &data.rate_limit {
            engine_debug!("Count probe `{}`: {}", filter, rate_limit);
        }
        Ok(data.search.repository_count)
    }
}

#[async_trait::async_trait]
impl<E: QueryExecutor> PageSource for GraphQlSearch<E> {
    async fn page(
        &self,
        filter: &Filter,
        cursor: Option<&str>,
        page_size: u32,
    ) -> Result<SearchPage, QueryError> {
        let variables = json!({ "start": cursor, "num": page_size });
        let data = self.search(REPOSITORY_QUERY, filter, variables).await?;
        let page_info = data
            .search
            .page_info
            .ok_or_else(|| QueryError::invalid_response("search result has no pageInfo"))?;
        let edge_count = data.search.edges.len();
        let records: Vec<RepositoryRecord> = data
            .search
            .edges
            .into_iter()
            .filter_map(|edge| edge.node)
            .collect();
        if records.len() < edge_count {
            engine_warn!(
                "Dropped {} null node(s) from a page of `{}`",
                edge_count - records.len(),
                filter
            );
        }
        Ok(SearchPage {
            total: data.search.repository_count,
            has_next_page: page_info.has_next_page,
            end_cursor: page_info.end_cursor,
            records,
            rate_limit: data.rate_limit,
        })
    }
}
