// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: tools through the dispatcher and the full MCP HTTP
//! surface through the axum router.
//!
//! Each test creates an isolated TestHarness with a temp SQLite archive
//! and a scripted mock gateway.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use gramkeep_core::{GramkeepError, PeerInfo, PeerKind};
use gramkeep_test_utils::{MockGateway, TestHarness};

fn peer(id: i64, kind: PeerKind, title: &str, username: Option<&str>) -> PeerInfo {
    PeerInfo {
        id,
        kind,
        title: title.to_string(),
        username: username.map(str::to_string),
    }
}

/// The three-peer index used by the dialog scenarios.
async fn indexed_harness() -> TestHarness {
    TestHarness::builder()
        .with_dialog(peer(-1001, PeerKind::Channel, "Alpha", None))
        .with_dialog(peer(-1002, PeerKind::Channel, "Beta", None))
        .with_dialog(peer(42, PeerKind::User, "Gamma", Some("gamma")))
        .build()
        .await
        .unwrap()
}

// ---- Tool scenarios through the dispatcher ----

#[tokio::test]
async fn list_channels_returns_all_in_insertion_order() {
    let harness = indexed_harness().await;
    let result = harness.call_tool("listChannels", json!({})).await.unwrap();

    let channels = result.as_array().unwrap();
    assert_eq!(channels.len(), 3);
    let ids: Vec<i64> = channels.iter().map(|c| c["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![-1001, -1002, 42]);
    assert_eq!(channels[2]["username"], "gamma");
}

#[tokio::test]
async fn search_channels_matches_case_insensitively() {
    let harness = indexed_harness().await;

    let beta = harness
        .call_tool("searchChannels", json!({"keywords": "beta"}))
        .await
        .unwrap();
    let beta = beta.as_array().unwrap();
    assert_eq!(beta.len(), 1);
    assert_eq!(beta[0]["id"], -1002);

    let gamma = harness
        .call_tool("searchChannels", json!({"keywords": "GAMMA"}))
        .await
        .unwrap();
    let gamma = gamma.as_array().unwrap();
    assert_eq!(gamma.len(), 1);
    assert_eq!(gamma[0]["id"], 42);
}

#[tokio::test]
async fn get_channel_messages_applies_regex_filter() {
    let gamma = peer(42, PeerKind::User, "Gamma", Some("gamma"));
    let harness = TestHarness::builder()
        .with_dialog(gamma.clone())
        .with_history(
            42,
            vec![
                MockGateway::message(&gamma, 1, "hello world"),
                MockGateway::message(&gamma, 2, "abc123"),
                MockGateway::message(&gamma, 3, "xyz"),
            ],
        )
        .build()
        .await
        .unwrap();

    let result = harness
        .call_tool(
            "getChannelMessages",
            json!({"channelId": 42, "filterPattern": "\\d+"}),
        )
        .await
        .unwrap();

    assert_eq!(result["peerTitle"], "Gamma");
    assert_eq!(result["totalFetched"], 3);
    assert_eq!(result["returned"], 1);
    assert_eq!(result["messages"][0]["text"], "abc123");

    // A string channel id parses identically to the number.
    let via_string = harness
        .call_tool(
            "getChannelMessages",
            json!({"channelId": "42", "filterPattern": "\\d+"}),
        )
        .await
        .unwrap();
    assert_eq!(via_string["returned"], 1);

    // Usernames resolve too, case-insensitively and with the @ optional.
    let via_username = harness
        .call_tool("getChannelMessages", json!({"channelId": "@GAMMA"}))
        .await
        .unwrap();
    assert_eq!(via_username["totalFetched"], 3);

    let invalid = harness
        .call_tool("getChannelMessages", json!({"channelId": 42, "filterPattern": "("}))
        .await;
    assert!(matches!(invalid, Err(GramkeepError::InvalidArgument(_))));
}

#[tokio::test]
async fn tool_parameters_are_validated() {
    let harness = indexed_harness().await;

    let zero_limit = harness.call_tool("listChannels", json!({"limit": 0})).await;
    assert!(matches!(zero_limit, Err(GramkeepError::InvalidArgument(_))));

    let empty_keywords = harness
        .call_tool("searchChannels", json!({"keywords": "  "}))
        .await;
    assert!(matches!(empty_keywords, Err(GramkeepError::InvalidArgument(_))));

    let bad_depth = harness
        .call_tool("scheduleMessageSync", json!({"channelId": -1001, "depth": 0}))
        .await;
    assert!(matches!(bad_depth, Err(GramkeepError::InvalidArgument(_))));

    let huge_depth = harness
        .call_tool("scheduleMessageSync", json!({"channelId": -1001, "depth": 60000}))
        .await;
    assert!(matches!(huge_depth, Err(GramkeepError::InvalidArgument(_))));

    let bad_peer = harness
        .call_tool("getChannelMessages", json!({"channelId": "12ab"}))
        .await;
    assert!(matches!(bad_peer, Err(GramkeepError::InvalidPeerId(_))));

    let unknown_peer = harness
        .call_tool("getChannelMessages", json!({"channelId": -7777}))
        .await;
    assert!(matches!(unknown_peer, Err(GramkeepError::NotFound(_))));
}

#[tokio::test]
async fn unauthorized_session_fails_every_tool() {
    let harness = indexed_harness().await;
    harness.gateway.set_authorized(false);

    let result = harness.call_tool("listChannels", json!({})).await;
    assert!(matches!(result, Err(GramkeepError::Unauthorized(_))));
}

#[tokio::test]
async fn schedule_sync_returns_job_row_and_archives() {
    let alpha = peer(-1001, PeerKind::Channel, "Alpha", None);
    let harness = TestHarness::builder()
        .with_dialog(alpha.clone())
        .with_history(
            -1001,
            (1..=30)
                .map(|i| MockGateway::message(&alpha, i, &format!("m{i}")))
                .collect(),
        )
        .build()
        .await
        .unwrap();

    let job = harness
        .call_tool("scheduleMessageSync", json!({"channelId": -1001, "depth": 20}))
        .await
        .unwrap();
    assert_eq!(job["channelId"], "-1001");
    assert_eq!(job["status"], "pending");
    assert_eq!(job["targetMessageCount"], 20);
    assert_eq!(job["peerTitle"], "Alpha");

    let jobs = harness
        .run_worker_until_settled(Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(jobs[0].status.to_string(), "idle");
    assert_eq!(jobs[0].message_count, 20);

    let listed = harness.call_tool("listMessageSyncJobs", json!({})).await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["status"], "idle");

    harness.shutdown().await.unwrap();
}

// ---- HTTP surface ----

async fn post_mcp(
    router: axum::Router,
    session: Option<&str>,
    body: Value,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder()
        .uri("/mcp")
        .method(Method::POST)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header("mcp-session-id", session);
    }
    let response = router
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let session_header = response
        .headers()
        .get("mcp-session-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, session_header, body)
}

/// Open a session via `initialize`, returning its id.
async fn open_session(harness: &TestHarness) -> String {
    let (status, session, body) = post_mcp(
        harness.router(),
        None,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(body["result"]["serverInfo"]["name"], "gramkeep");
    session.expect("initialize must return an mcp-session-id header")
}

/// Call a tool over HTTP and decode the text content payload.
async fn call_tool_http(harness: &TestHarness, session: &str, name: &str, arguments: Value) -> Value {
    let (status, _, body) = post_mcp(
        harness.router(),
        Some(session),
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": name, "arguments": arguments}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["result"].clone()
}

#[tokio::test]
async fn http_initialize_then_tools_list() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;

    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 5);
    assert!(tools.iter().any(|t| t["name"] == "scheduleMessageSync"));
    assert!(tools.iter().all(|t| t.get("inputSchema").is_some()));
}

#[tokio::test]
async fn http_post_without_session_is_bad_request() {
    let harness = indexed_harness().await;
    let (status, _, body) = post_mcp(
        harness.router(),
        None,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(
        body["error"]["message"],
        "Bad Request: No valid session ID provided"
    );
}

#[tokio::test]
async fn http_unknown_session_is_not_found() {
    let harness = indexed_harness().await;
    let (status, _, body) = post_mcp(
        harness.router(),
        Some("b0a6ba38-0000-0000-0000-000000000000"),
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], -32001);
    assert_eq!(body["error"]["message"], "Session not found");
}

#[tokio::test]
async fn http_malformed_body_is_parse_error() {
    let harness = indexed_harness().await;
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn http_sessions_share_the_archive() {
    let alpha = peer(-1001, PeerKind::Channel, "Alpha", None);
    let harness = TestHarness::builder()
        .with_dialog(alpha.clone())
        .with_history(
            -1001,
            (1..=10)
                .map(|i| MockGateway::message(&alpha, i, "m"))
                .collect(),
        )
        .build()
        .await
        .unwrap();

    let session_a = open_session(&harness).await;
    let session_b = open_session(&harness).await;
    assert_ne!(session_a, session_b);

    let scheduled = call_tool_http(
        &harness,
        &session_a,
        "scheduleMessageSync",
        json!({"channelId": -1001, "depth": 10}),
    )
    .await;
    assert_ne!(scheduled["isError"], json!(true));

    let listed = call_tool_http(&harness, &session_b, "listMessageSyncJobs", json!({})).await;
    let payload: Value =
        serde_json::from_str(listed["content"][0]["text"].as_str().unwrap()).unwrap();
    let jobs = payload.as_array().unwrap();
    assert_eq!(jobs.len(), 1, "job scheduled via A is visible via B");
    assert_eq!(jobs[0]["channelId"], "-1001");

    harness.worker.shutdown().await;
}

#[tokio::test]
async fn http_tool_errors_set_is_error() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;
    harness.gateway.set_authorized(false);

    let result = call_tool_http(&harness, &session, "listChannels", json!({})).await;
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("unauthorized"));
}

#[tokio::test]
async fn http_unknown_tool_is_invalid_params() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;

    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {"name": "sendMessage", "arguments": {}}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn http_ping_and_notifications() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;

    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({"jsonrpc": "2.0", "id": 4, "method": "ping"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], json!({}));

    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn http_unknown_method_within_session() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;

    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn http_delete_closes_the_session() {
    let harness = indexed_harness().await;
    let session = open_session(&harness).await;

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .method(Method::DELETE)
                .header("mcp-session-id", session.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The closed session is gone.
    let (status, _, body) = post_mcp(
        harness.router(),
        Some(&session),
        json!({"jsonrpc": "2.0", "id": 6, "method": "ping"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], -32001);
}

#[tokio::test]
async fn http_get_mcp_requires_session_then_405() {
    let harness = indexed_harness().await;

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let session = open_session(&harness).await;
    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .method(Method::GET)
                .header("mcp-session-id", session.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn http_options_health_and_unknown_path() {
    let harness = indexed_harness().await;

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/mcp")
                .method(Method::OPTIONS)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({"status": "ok"}));

    let response = harness
        .router()
        .oneshot(
            Request::builder()
                .uri("/nope")
                .method(Method::GET)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32601);
}
