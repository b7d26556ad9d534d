use std::time::Duration;

use harvester_core::Filter;
use harvester_engine::{
    scrape_all, CountProbe, ExecutorSettings, FailureKind, GraphQlSearch, PageSource,
    QueryExecutor, ReqwestExecutor,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor(server: &MockServer) -> ReqwestExecutor {
    let settings = ExecutorSettings::new(format!("{}/graphql", server.uri()), "secret-token");
    ReqwestExecutor::new(settings).expect("executor")
}

fn repository_node(name: &str, stars: u64) -> serde_json::Value {
    json!({
        "nameWithOwner": name,
        "createdAt": "2014-03-01T12:00:00Z",
        "forkCount": 3,
        "isFork": false,
        "updatedAt": "2020-01-01T00:00:00Z",
        "primaryLanguage": null,
        "stargazers": { "totalCount": stars },
        "watchers": { "totalCount": 4 }
    })
}

#[tokio::test]
async fn executor_posts_query_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_partial_json(json!({
            "query": "query { viewer { login } }",
            "variables": { "x": 1 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "viewer": { "login": "octocat" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = executor(&server)
        .execute("query { viewer { login } }", json!({ "x": 1 }))
        .await
        .expect("query ok");

    assert_eq!(response["data"]["viewer"]["login"], "octocat");
}

#[tokio::test]
async fn executor_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = executor(&server)
        .execute("query { x }", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(502));
}

#[tokio::test]
async fn executor_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = executor(&server)
        .execute("query { x }", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
}

#[tokio::test]
async fn executor_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({ "data": {} })),
        )
        .mount(&server)
        .await;

    let mut settings = ExecutorSettings::new(format!("{}/graphql", server.uri()), "t");
    settings.request_timeout = Duration::from_millis(50);
    let err = ReqwestExecutor::new(settings)
        .unwrap()
        .execute("query { x }", json!({}))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn executor_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\": {\"a\": 12345}}"))
        .mount(&server)
        .await;

    let mut settings = ExecutorSettings::new(format!("{}/graphql", server.uri()), "t");
    settings.max_bytes = 10;
    let err = ReqwestExecutor::new(settings)
        .unwrap()
        .execute("query { x }", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 10, .. }));
}

#[test]
fn invalid_endpoint_is_rejected() {
    let err = ReqwestExecutor::new(ExecutorSettings::new("not a url", "t")).unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidEndpoint);
}

#[tokio::test]
async fn count_probe_reads_repository_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "cost": 1, "remaining": 4999, "resetAt": "2020-01-01T01:00:00Z" },
                "search": { "repositoryCount": 1234 }
            }
        })))
        .mount(&server)
        .await;

    let search = GraphQlSearch::new(executor(&server));
    let count = search.count(&Filter::new("stars:16")).await.unwrap();
    assert_eq!(count, 1234);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let query = body["query"].as_str().unwrap();
    assert!(query.contains("\"is:public stars:16\""));
    assert!(query.contains("first: 1"));
}

#[tokio::test]
async fn page_decodes_records_and_page_info() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "start": "abc", "num": 100 } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "cost": 1, "remaining": 42, "resetAt": "2020-01-01T01:00:00Z" },
                "search": {
                    "repositoryCount": 2,
                    "pageInfo": { "hasNextPage": false, "endCursor": "def" },
                    "edges": [
                        { "node": repository_node("a/one", 20) },
                        { "node": repository_node("b/two", 19) }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let search = GraphQlSearch::new(executor(&server));
    let page = search
        .page(&Filter::new("stars:19..20"), Some("abc"), 100)
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert!(!page.has_next_page);
    assert_eq!(page.end_cursor.as_deref(), Some("def"));
    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].name_with_owner, "a/one");
    assert_eq!(page.records[1].stars, 19);
    assert_eq!(page.rate_limit.unwrap().remaining, 42);
}

#[tokio::test]
async fn null_nodes_are_dropped_from_a_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "cost": 1, "remaining": 42, "resetAt": null },
                "search": {
                    "repositoryCount": 2,
                    "pageInfo": { "hasNextPage": false, "endCursor": "z" },
                    "edges": [
                        { "node": repository_node("a/b", 7) },
                        { "node": null }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let search = GraphQlSearch::new(executor(&server));
    let page = search
        .page(&Filter::new("stars:7"), None, 100)
        .await
        .expect("page with a null node still decodes");

    assert_eq!(page.total, 2);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].name_with_owner, "a/b");
}

#[tokio::test]
async fn graphql_errors_without_data_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "type": "RATE_LIMITED", "message": "API rate limit exceeded" }]
        })))
        .mount(&server)
        .await;

    let search = GraphQlSearch::new(executor(&server));
    let err = search.count(&Filter::new("stars:16")).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::GraphQl);
    assert!(err.message.contains("RATE_LIMITED"));
}

#[tokio::test]
async fn scraper_follows_cursor_until_last_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "start": null } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "rateLimit": { "cost": 1, "remaining": 100, "resetAt": null },
                "viewer": {
                    "starredRepositories": {
                        "pageInfo": { "hasNextPage": true, "endCursor": "page2" },
                        "nodes": [{ "name": "a" }, { "name": "b" }]
                    }
                }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "start": "page2" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "viewer": {
                    "starredRepositories": {
                        "pageInfo": { "hasNextPage": false, "endCursor": "page3" },
                        "nodes": [{ "name": "c" }]
                    }
                }
            }
        })))
        .mount(&server)
        .await;

    let query = "query($start: String) { viewer { starredRepositories(after: $start) { nodes { name } } } }";
    let output = scrape_all(&executor(&server), query, 10).await.unwrap();

    assert_eq!(output.query, query);
    assert_eq!(
        output.nodes,
        vec![json!({ "name": "a" }), json!({ "name": "b" }), json!({ "name": "c" })]
    );
}

#[tokio::test]
async fn scraper_requires_page_info() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "viewer": { "login": "octocat" } }
        })))
        .mount(&server)
        .await;

    let err = scrape_all(&executor(&server), "query { viewer { login } }", 10)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidResponse);
}
