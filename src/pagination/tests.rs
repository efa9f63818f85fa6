//! Tests for pagination module

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig, HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::with_config(
        HttpClientConfig::builder()
            .base_url(server.uri())
            .max_retries(0)
            .build(),
    )
    .unwrap()
}

/// Replays canned responses and records what was sent
#[derive(Default)]
struct ScriptedTransport {
    responses: Mutex<VecDeque<crate::error::Result<HttpResponse>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<crate::error::Result<HttpResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn page(body: Value) -> crate::error::Result<HttpResponse> {
        HttpResponse::json_ok(&body)
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> crate::error::Result<HttpResponse> {
        self.sent.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("script exhausted".into())))
    }
}

fn ids(records: &[Value]) -> Vec<i64> {
    records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

// ============================================================================
// NextPage / PaginationState Tests
// ============================================================================

#[test]
fn test_next_page_constructors() {
    let next = NextPage::with_param("page", "2");
    assert!(next.is_continue());
    assert_eq!(next, NextPage::Continue(Continuation::new().query("page", "2")));

    let next = NextPage::with_url("https://api.example.com/page2");
    match next {
        NextPage::Continue(c) => {
            assert!(c.query.is_empty());
            assert_eq!(c.url.as_deref(), Some("https://api.example.com/page2"));
        }
        NextPage::Done => panic!("Expected Continue"),
    }

    assert!(NextPage::Done.is_done());
    assert!(Continuation::new().is_empty());
}

#[test]
fn test_pagination_state_mutations() {
    let mut state = PaginationState::new();
    state.next_page();
    state.add_offset(50);
    state.set_cursor("cursor123".to_string());
    state.add_page(100);
    state.mark_done();

    assert_eq!(state.page, 1);
    assert_eq!(state.offset, 50);
    assert_eq!(state.cursor, Some("cursor123".to_string()));
    assert_eq!(state.pages, 1);
    assert_eq!(state.total_fetched, 100);
    assert!(state.done);
}

// ============================================================================
// StopCondition Tests
// ============================================================================

#[test]
fn test_stop_condition_empty_page() {
    let state = PaginationState::new();
    let body = json!({});
    assert_eq!(
        check_stop_condition(&StopCondition::EmptyPage, &body, 0, &state),
        StopResult::Stop
    );
    assert!(check_stop_condition(&StopCondition::EmptyPage, &body, 10, &state).should_continue());
}

#[test]
fn test_stop_condition_field() {
    let condition = StopCondition::field("meta.has_more", false);
    let state = PaginationState::new();

    let body = json!({"meta": {"has_more": false}});
    assert!(check_stop_condition(&condition, &body, 10, &state).should_stop());

    let body = json!({"meta": {"has_more": true}});
    assert!(check_stop_condition(&condition, &body, 10, &state).should_continue());
}

#[test]
fn test_stop_condition_totals() {
    let body = json!({"total": 100, "total_pages": 2});
    let mut state = PaginationState::new();

    state.add_page(50);
    assert!(check_stop_condition(&StopCondition::total_count("total"), &body, 50, &state)
        .should_continue());
    assert!(
        check_stop_condition(&StopCondition::total_pages("total_pages"), &body, 50, &state)
            .should_continue()
    );

    state.add_page(50);
    assert!(check_stop_condition(&StopCondition::total_count("total"), &body, 50, &state)
        .should_stop());
    assert!(
        check_stop_condition(&StopCondition::total_pages("total_pages"), &body, 50, &state)
            .should_stop()
    );
}

#[test]
fn test_stop_condition_never() {
    let state = PaginationState::new();
    assert!(check_stop_condition(&StopCondition::Never, &json!({}), 0, &state).should_continue());
}

// ============================================================================
// Strategy Tests
// ============================================================================

#[test]
fn test_cursor_paginator_body_to_query() {
    let paginator = CursorPaginator::new(
        CursorSource::Body {
            path: "next_cursor".into(),
        },
        CursorTarget::Query {
            param: "starting_after".into(),
        },
        StopCondition::Never,
    );
    let mut state = PaginationState::new();
    assert!(paginator.initial(&mut state).is_empty());

    let body = json!({"data": [{"id": 1}], "next_cursor": "cursor_abc"});
    let next = paginator.process_response(&body, &HeaderMap::new(), 1, &mut state);
    assert_eq!(next, NextPage::with_param("starting_after", "cursor_abc"));
    assert_eq!(state.cursor, Some("cursor_abc".to_string()));

    let body = json!({"data": [{"id": 2}], "next_cursor": ""});
    assert!(paginator
        .process_response(&body, &HeaderMap::new(), 1, &mut state)
        .is_done());
}

#[test]
fn test_cursor_paginator_header_to_header() {
    let paginator = CursorPaginator::new(
        CursorSource::Header {
            name: "x-next-token".into(),
        },
        CursorTarget::Header {
            name: "x-page-token".into(),
        },
        StopCondition::Never,
    );
    let mut headers = HeaderMap::new();
    headers.insert("x-next-token", HeaderValue::from_static("t2"));
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!([]), &headers, 0, &mut state);
    assert_eq!(
        next,
        NextPage::Continue(Continuation::new().header("x-page-token", "t2"))
    );

    assert!(paginator
        .process_response(&json!([]), &HeaderMap::new(), 0, &mut state)
        .is_done());
}

#[test]
fn test_cursor_paginator_stop_condition_wins() {
    let paginator = CursorPaginator::new(
        CursorSource::Body {
            path: "next".into(),
        },
        CursorTarget::BodyField {
            path: "page.token".into(),
        },
        StopCondition::field("has_more", false),
    );
    let body = json!({"next": "abc", "has_more": false});
    let mut state = PaginationState::new();
    assert!(paginator
        .process_response(&body, &HeaderMap::new(), 1, &mut state)
        .is_done());
}

#[test]
fn test_offset_paginator() {
    let paginator = OffsetPaginator::new("offset", "limit", 50, StopCondition::EmptyPage);
    let mut state = PaginationState::new();

    let initial = paginator.initial(&mut state);
    assert_eq!(initial.query.get("offset"), Some(&"0".to_string()));
    assert_eq!(initial.query.get("limit"), Some(&"50".to_string()));

    let next = paginator.process_response(&json!({}), &HeaderMap::new(), 50, &mut state);
    match next {
        NextPage::Continue(c) => assert_eq!(c.query.get("offset"), Some(&"50".to_string())),
        NextPage::Done => panic!("Expected Continue"),
    }

    // Short page ends pagination
    assert!(paginator
        .process_response(&json!({}), &HeaderMap::new(), 25, &mut state)
        .is_done());
}

#[test]
fn test_page_number_paginator_starts_at_start_page() {
    let paginator = PageNumberPaginator::new("page", 1).with_page_size("per_page", 25);
    let mut state = PaginationState::new();

    let initial = paginator.initial(&mut state);
    assert_eq!(initial.query.get("page"), Some(&"1".to_string()));
    assert_eq!(initial.query.get("per_page"), Some(&"25".to_string()));

    let next = paginator.process_response(&json!({}), &HeaderMap::new(), 25, &mut state);
    match next {
        NextPage::Continue(c) => assert_eq!(c.query.get("page"), Some(&"2".to_string())),
        NextPage::Done => panic!("Expected Continue"),
    }

    assert!(paginator
        .process_response(&json!({}), &HeaderMap::new(), 10, &mut state)
        .is_done());
}

#[test]
fn test_link_header_paginator() {
    let paginator = LinkHeaderPaginator::default();
    let mut headers = HeaderMap::new();
    headers.insert(
        "link",
        HeaderValue::from_static(
            "<https://api.example.com/items?page=2>; rel=\"next\", <https://api.example.com/items?page=1>; rel=\"prev\"",
        ),
    );
    let mut state = PaginationState::new();

    let next = paginator.process_response(&json!([]), &headers, 10, &mut state);
    assert_eq!(next, NextPage::with_url("https://api.example.com/items?page=2"));

    let mut headers = HeaderMap::new();
    headers.insert(
        "link",
        HeaderValue::from_static("<https://api.example.com/items?page=1>; rel=\"prev\""),
    );
    assert!(paginator
        .process_response(&json!([]), &headers, 10, &mut state)
        .is_done());
}

#[test]
fn test_next_url_paginator() {
    let paginator = NextUrlPaginator::new("pagination.next");
    let mut state = PaginationState::new();

    let body = json!({"pagination": {"next": "https://api.example.com/items?cursor=abc"}});
    let next = paginator.process_response(&body, &HeaderMap::new(), 10, &mut state);
    assert_eq!(next, NextPage::with_url("https://api.example.com/items?cursor=abc"));

    for body in [json!({"pagination": {"next": null}}), json!({"pagination": {"next": ""}})] {
        assert!(paginator
            .process_response(&body, &HeaderMap::new(), 10, &mut state)
            .is_done());
    }
}

// ============================================================================
// PaginationConfig Tests
// ============================================================================

#[test]
fn test_pagination_config_from_yaml() {
    let config: PaginationConfig = serde_yaml::from_str(
        r"
type: cursor
source:
  from: header
  name: x-next-token
target:
  to: body_field
  path: page.token
",
    )
    .unwrap();
    assert_eq!(
        config,
        PaginationConfig::Cursor {
            source: CursorSource::Header {
                name: "x-next-token".into()
            },
            target: CursorTarget::BodyField {
                path: "page.token".into()
            },
            stop: StopCondition::Never,
        }
    );

    let config: PaginationConfig = serde_yaml::from_str(
        r"
type: page_number
page_param: page
stop:
  type: total_pages
  path: meta.pages
",
    )
    .unwrap();
    assert_eq!(
        config,
        PaginationConfig::PageNumber {
            page_param: "page".into(),
            start_page: 1,
            page_size_param: None,
            page_size: None,
            stop: StopCondition::total_pages("meta.pages"),
        }
    );

    let config: PaginationConfig = serde_yaml::from_str("type: none").unwrap();
    assert_eq!(config, PaginationConfig::None);
}

// ============================================================================
// PaginatingTransport Tests
// ============================================================================

#[tokio::test]
async fn test_pages_are_merged_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "99")
                .set_body_json(json!({
                    "data": [{"id": 1}, {"id": 2}],
                    "meta": {"next": "c2", "page": 1}
                })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("cursor", "c2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "98")
                .set_body_json(json!({
                    "data": [{"id": 3}],
                    "meta": {"next": "c3", "page": 2}
                })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("cursor", "c3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ratelimit-remaining", "97")
                .set_body_json(json!({
                    "data": [{"id": 4}, {"id": 5}, {"id": 6}],
                    "meta": {"next": null, "page": 3}
                })),
        )
        .mount(&mock_server)
        .await;

    let transport = PaginatingTransport::new(
        client_for(&mock_server),
        PaginationConfig::cursor("cursor", "meta.next"),
    )
    .with_records_path("data");

    let response = transport.send(HttpRequest::get("/items")).await.unwrap();
    let body = response.json().unwrap();

    assert_eq!(ids(body["data"].as_array().unwrap()), vec![1, 2, 3, 4, 5, 6]);
    // Everything but the record array comes from the first page
    assert_eq!(body["meta"], json!({"next": "c2", "page": 1}));
    // Metadata comes from the last page
    assert_eq!(response.header("x-ratelimit-remaining"), Some("97"));
    assert!(response.headers.get("content-length").is_none());
}

#[tokio::test]
async fn test_root_array_pages() {
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::page(json!([{"id": 1}, {"id": 2}])),
        ScriptedTransport::page(json!([{"id": 3}])),
        ScriptedTransport::page(json!([])),
    ]);
    let transport =
        PaginatingTransport::new(transport, PaginationConfig::page_number("page", 1));

    let fetched = transport
        .fetch_records_with_cancel(HttpRequest::get("/things"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ids(&fetched.records), vec![1, 2, 3]);
    assert_eq!(fetched.pages, 3);

    let pages: Vec<_> = transport
        .inner()
        .sent()
        .iter()
        .map(|r| r.config.query["page"].clone())
        .collect();
    assert_eq!(pages, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_overflow_at_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forever"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1}],
            "next": "again"
        })))
        .expect(5)
        .mount(&mock_server)
        .await;

    let transport = PaginatingTransport::new(
        client_for(&mock_server),
        PaginationConfig::cursor("cursor", "next"),
    )
    .with_records_path("items")
    .with_max_pages(5);

    let err = transport
        .send(HttpRequest::get("/forever"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PaginationOverflow { max_pages: 5 }));
}

#[tokio::test]
async fn test_error_mid_chain_discards_partial_results() {
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::page(json!({"items": [{"id": 1}], "next": "p2"})),
        Err(Error::http_status(502, "bad gateway")),
        ScriptedTransport::page(json!({"items": [{"id": 2}]})),
    ]);
    let transport = PaginatingTransport::new(transport, PaginationConfig::cursor("cursor", "next"))
        .with_records_path("items");

    let err = transport
        .fetch_records(HttpRequest::get("/items"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
    // The failed page is not retried here
    assert_eq!(transport.inner().sent().len(), 2);
}

#[tokio::test]
async fn test_non_success_page_is_an_error() {
    let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(
        reqwest::StatusCode::UNAUTHORIZED,
        HeaderMap::new(),
        "nope",
    ))]);
    let transport = PaginatingTransport::new(transport, PaginationConfig::None);
    let err = transport.send(HttpRequest::get("/x")).await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
}

#[tokio::test]
async fn test_non_array_records_path_is_an_error() {
    let transport = ScriptedTransport::new(vec![ScriptedTransport::page(
        json!({"items": {"id": 1}}),
    )]);
    let transport =
        PaginatingTransport::new(transport, PaginationConfig::None).with_records_path("items");
    let err = transport.send(HttpRequest::get("/x")).await.unwrap_err();
    assert!(matches!(err, Error::RecordExtraction { ref path, .. } if path == "items"));
}

#[tokio::test]
async fn test_missing_records_path_is_empty_page() {
    let transport = ScriptedTransport::new(vec![ScriptedTransport::page(json!({"total": 0}))]);
    let transport =
        PaginatingTransport::new(transport, PaginationConfig::None).with_records_path("items");
    let response = transport.send(HttpRequest::get("/x")).await.unwrap();
    assert_eq!(response.json().unwrap(), json!({"total": 0, "items": []}));
}

#[tokio::test]
async fn test_header_cursor_injection_preserves_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("x-api-key", "k"))
        .and(header("x-page-token", "t2"))
        .and(query_param("region", "eu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2}])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(header("x-api-key", "k"))
        .and(query_param("region", "eu"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-next-token", "t2")
                .set_body_json(json!([{"id": 1}])),
        )
        .mount(&mock_server)
        .await;

    let transport = PaginatingTransport::new(
        client_for(&mock_server),
        PaginationConfig::Cursor {
            source: CursorSource::Header {
                name: "x-next-token".into(),
            },
            target: CursorTarget::Header {
                name: "x-page-token".into(),
            },
            stop: StopCondition::Never,
        },
    );

    let request = HttpRequest::get("/events")
        .header("x-api-key", "k")
        .query("region", "eu");
    let records = transport.fetch_records(request).await.unwrap();
    assert_eq!(ids(&records), vec![1, 2]);
}

#[tokio::test]
async fn test_body_field_cursor_injection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"filter": "active", "page": {"token": "t2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 2}],
            "next_token": null
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(json!({"filter": "active"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 1}],
            "next_token": "t2"
        })))
        .mount(&mock_server)
        .await;

    let transport = PaginatingTransport::new(
        client_for(&mock_server),
        PaginationConfig::Cursor {
            source: CursorSource::Body {
                path: "next_token".into(),
            },
            target: CursorTarget::BodyField {
                path: "page.token".into(),
            },
            stop: StopCondition::Never,
        },
    )
    .with_records_path("results");

    let records = transport
        .fetch_records(HttpRequest::post("/search", json!({"filter": "active"})))
        .await
        .unwrap();
    assert_eq!(ids(&records), vec![1, 2]);
}

#[tokio::test]
async fn test_next_url_replaces_query() {
    let transport = ScriptedTransport::new(vec![
        ScriptedTransport::page(json!({
            "items": [{"id": 1}],
            "next": "https://api.example.com/items?page=2"
        })),
        ScriptedTransport::page(json!({"items": [{"id": 2}]})),
    ]);
    let transport = PaginatingTransport::new(transport, PaginationConfig::next_url("next"))
        .with_records_path("items");

    let request = HttpRequest::get("https://api.example.com/items")
        .query("page", "1")
        .query("per_page", "1");
    let records = transport.fetch_records(request).await.unwrap();
    assert_eq!(ids(&records), vec![1, 2]);

    let sent = transport.inner().sent();
    assert_eq!(sent[1].url, "https://api.example.com/items?page=2");
    assert!(sent[1].config.query.get("page").is_none());
    assert_eq!(sent[1].config.query.get("per_page"), Some(&"1".to_string()));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1}]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let transport =
        PaginatingTransport::new(client_for(&mock_server), PaginationConfig::None);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = transport
        .send_with_cancel(HttpRequest::get("/slow"), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PaginationCancelled { pages: 0 }));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_already_cancelled_sends_nothing() {
    let transport = ScriptedTransport::new(vec![ScriptedTransport::page(json!([]))]);
    let transport = PaginatingTransport::new(transport, PaginationConfig::None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = transport
        .send_with_cancel(HttpRequest::get("/x"), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PaginationCancelled { .. }));
    assert!(transport.inner().sent().is_empty());
}

#[tokio::test]
async fn test_concurrent_logical_requests_are_independent() {
    let mock_server = MockServer::start().await;

    for (resource, first, second) in [("a", 1, 2), ("b", 10, 20)] {
        Mock::given(method("GET"))
            .and(path(format!("/{resource}")))
            .and(query_param("cursor", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": second}]
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{resource}")))
            .and(query_param_is_missing("cursor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": first}],
                "next": "next"
            })))
            .mount(&mock_server)
            .await;
    }

    let transport = PaginatingTransport::new(
        client_for(&mock_server),
        PaginationConfig::cursor("cursor", "next"),
    )
    .with_records_path("items");

    let (a, b) = tokio::join!(
        transport.fetch_records(HttpRequest::get("/a")),
        transport.fetch_records(HttpRequest::get("/b")),
    );
    assert_eq!(ids(&a.unwrap()), vec![1, 2]);
    assert_eq!(ids(&b.unwrap()), vec![10, 20]);
}
