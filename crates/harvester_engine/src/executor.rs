use std::fmt;
use std::time::Duration;

use engine_logging::engine_warn;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::{FailureKind, QueryError};

pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

#[derive(Clone)]
pub struct ExecutorSettings {
    pub endpoint: String,
    pub token: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl ExecutorSettings {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            user_agent: concat!("harvester/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for ExecutorSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorSettings")
            .field("endpoint", &self.endpoint)
            .field("token", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

/// Sends one GraphQL document and returns the decoded response body.
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, QueryError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    settings: ExecutorSettings,
    endpoint: reqwest::Url,
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(settings: ExecutorSettings) -> Result<Self, QueryError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint)
            .map_err(|err| QueryError::new(FailureKind::InvalidEndpoint, err.to_string()))?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| QueryError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            endpoint,
            client,
        })
    }
}

#[async_trait::async_trait]
impl QueryExecutor for ReqwestExecutor {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, QueryError> {
        let body = serde_json::to_vec(&json!({ "query": query, "variables": variables }))
            .map_err(|err| QueryError::new(FailureKind::InvalidResponse, err.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.settings.token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueryError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(QueryError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(QueryError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&bytes).map_err(|err| QueryError::invalid_response(err.to_string()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> QueryError {
    if err.is_timeout() {
        return QueryError::new(FailureKind::Timeout, err.to_string());
    }
    QueryError::new(FailureKind::Network, err.to_string())
}

/// Extracts the `data` payload of a GraphQL response.
///
/// Errors without data are fatal; errors alongside data are logged and the
/// data is used.
pub(crate) fn into_data(mut response: Value) -> Result<Value, QueryError> {
    let errors = response.get("errors").filter(|errors| !errors.is_null()).cloned();
    let data = response
        .get_mut("data")
        .map(Value::take)
        .filter(|data| !data.is_null());
    match (data, errors) {
        (Some(data), None) => Ok(data),
        (Some(data), Some(errors)) => {
            engine_warn!("Query returned partial data with errors: {}", errors);
            Ok(data)
        }
        (None, Some(errors)) => Err(QueryError::new(FailureKind::GraphQl, errors.to_string())),
        (None, None) => Err(QueryError::invalid_response("response has no data")),
    }
}
