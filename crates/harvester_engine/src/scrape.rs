//! Generic scraper for arbitrary paginated GraphQL queries.
//!
//! The response shape is unknown, so the pagination block is found by
//! structural search: the first object holding a `pageInfo` field, whose
//! sibling `nodes` list carries the results. The query must declare a
//! `$start` cursor variable.

use engine_logging::{engine_info, engine_warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::executor::{into_data, QueryExecutor};
use crate::{QueryError, RateLimit};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeOutput {
    pub query: String,
    pub nodes: Vec<Value>,
}

/// First object, in document order, that has a `pageInfo` key.
///
/// Only objects are descended into; lists are not searched.
pub fn find_page_info(value: &Value) -> Option<&Map<String, Value>> {
    let object = value.as_object()?;
    if object.contains_key("pageInfo") {
        return Some(object);
    }
    object.values().find_map(find_page_info)
}

/// Runs `query` page by page until `hasNextPage` is false.
///
/// The rate-limit snapshot of each page, when the query selects one, is
/// logged; a snapshot below `min_remaining` is logged as a warning but does
/// not stop the scrape.
pub async fn scrape_all(
    executor: &dyn QueryExecutor,
    query: &str,
    min_remaining: u64,
) -> Result<ScrapeOutput, QueryError> {
    let mut nodes = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let response = executor
            .execute(query, json!({ "start": cursor }))
            .await?;
        let data = into_data(response)?;

        let holder = find_page_info(&data)
            .ok_or_else(|| QueryError::invalid_response("no pageInfo in response"))?;
        let page_info = &holder["pageInfo"];
        let has_next = page_info
            .get("hasNextPage")
            .and_then(Value::as_bool)
            .ok_or_else(|| QueryError::invalid_response("pageInfo.hasNextPage missing"))?;
        let end_cursor = page_info
            .get("endCursor")
            .and_then(Value::as_str)
            .map(str::to_string);
        let page_nodes = holder
            .get("nodes")
            .and_then(Value::as_array)
            .ok_or_else(|| QueryError::invalid_response("no nodes next to pageInfo"))?;
        nodes.extend(page_nodes.iter().cloned());

        if let Some(raw) = data.get("rateLimit") {
            match serde_json::from_value::<RateLimit>(raw.clone()) {
                Ok(rate_limit) if rate_limit.remaining < min_remaining => {
                    engine_warn!("Rate limit low: {} ({} nodes so far)", rate_limit, nodes.len());
                }
                Ok(rate_limit) => {
                    engine_info!("Rate limit: {} ({} nodes so far)", rate_limit, nodes.len());
                }
                Err(_) => engine_info!("Rate limit: {} ({} nodes so far)", raw, nodes.len()),
            }
        }

        if !has_next {
            break;
        }
        cursor = Some(end_cursor.ok_or_else(|| {
            QueryError::invalid_response("hasNextPage is true but endCursor is missing")
        })?);
    }

    Ok(ScrapeOutput {
        query: query.to_string(),
        nodes,
    })
}
