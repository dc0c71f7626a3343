// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The MCP HTTP endpoint.
//!
//! Routes:
//! - `POST /mcp`: JSON-RPC requests. The first request on a connection
//!   must be `initialize`; the generated session id is echoed in the
//!   `mcp-session-id` response header and required on every request after.
//! - `GET /mcp` / `DELETE /mcp`: session keep-alive and close.
//! - `GET /health`: liveness probe.
//!
//! Session errors use the transport's reserved codes: `-32000` for a
//! missing session, `-32001` for an unknown one.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use gramkeep_core::GramkeepError;

use crate::protocol::{RpcError, RpcRequest, RpcResponse};
use crate::session::{McpSession, SessionRegistry};
use crate::tools::ToolDispatcher;

const SESSION_HEADER: &str = "mcp-session-id";

/// Shared state for the MCP handlers.
#[derive(Clone)]
pub struct McpServerState {
    pub sessions: std::sync::Arc<SessionRegistry>,
    pub dispatcher: std::sync::Arc<ToolDispatcher>,
}

/// Build the MCP router.
pub fn build_router(state: McpServerState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(post_mcp)
                .get(get_mcp)
                .delete(delete_mcp)
                .options(options_mcp),
        )
        .route("/health", get(get_health))
        .fallback(unknown_path)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the cancellation token fires.
pub async fn serve(
    host: &str,
    port: u16,
    state: McpServerState,
    cancel: CancellationToken,
) -> Result<(), GramkeepError> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GramkeepError::Transport {
            message: format!("failed to bind MCP server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("MCP server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| GramkeepError::Transport {
            message: format!("MCP server error: {e}"),
            source: Some(Box::new(e)),
        })
}

async fn post_mcp(
    State(state): State<McpServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(_) => {
            return rpc_response(
                StatusCode::BAD_REQUEST,
                RpcResponse::failure(Value::Null, RpcError::parse_error()),
                None,
            );
        }
    };

    let request_id = request.id.clone().unwrap_or(Value::Null);
    match session_header(&headers) {
        // A fresh connection may only initialize.
        None => {
            if request.method == "initialize" {
                let requested = request.params.get("protocolVersion").and_then(Value::as_str);
                let session = state.sessions.create(requested);
                let result = initialize_result(&session);
                rpc_response(
                    StatusCode::OK,
                    RpcResponse::success(request_id, result),
                    Some(&session.id),
                )
            } else {
                rpc_response(
                    StatusCode::BAD_REQUEST,
                    RpcResponse::failure(request_id, RpcError::no_session()),
                    None,
                )
            }
        }
        Some(id) => match state.sessions.get(&id) {
            None => rpc_response(
                StatusCode::NOT_FOUND,
                RpcResponse::failure(request_id, RpcError::session_not_found()),
                None,
            ),
            Some(session) => handle_session_request(&state, &session, request).await,
        },
    }
}

async fn handle_session_request(
    state: &McpServerState,
    session: &McpSession,
    request: RpcRequest,
) -> Response {
    if request.is_notification() {
        debug!(session_id = %session.id, method = %request.method, "notification accepted");
        return StatusCode::ACCEPTED.into_response();
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    let response = match request.method.as_str() {
        "initialize" => RpcResponse::success(id, initialize_result(session)),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => {
            RpcResponse::success(id, json!({"tools": ToolDispatcher::definitions()}))
        }
        "tools/call" => handle_tools_call(state, id, request.params).await,
        other => RpcResponse::failure(id, RpcError::method_not_found(other)),
    };
    rpc_response(StatusCode::OK, response, None)
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tools_call(state: &McpServerState, id: Value, params: Value) -> RpcResponse {
    let params: ToolCallParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => return RpcResponse::failure(id, RpcError::invalid_params(e.to_string())),
    };
    if !ToolDispatcher::is_known(&params.name) {
        return RpcResponse::failure(
            id,
            RpcError::invalid_params(format!("unknown tool: {}", params.name)),
        );
    }

    match state.dispatcher.call(&params.name, &params.arguments).await {
        Ok(payload) => match serde_json::to_string(&payload) {
            Ok(text) => RpcResponse::success(
                id,
                json!({"content": [{"type": "text", "text": text}]}),
            ),
            Err(e) => RpcResponse::failure(id, RpcError::internal_error(e.to_string())),
        },
        // Tool failures are tool results, not protocol errors.
        Err(e) => RpcResponse::success(
            id,
            json!({
                "content": [{"type": "text", "text": e.to_string()}],
                "isError": true,
            }),
        ),
    }
}

async fn get_mcp(State(state): State<McpServerState>, headers: HeaderMap) -> Response {
    match validated_session(&state, &headers) {
        Err(response) => response,
        Ok(_) => {
            // No standalone server stream is offered; POST carries everything.
            let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
            response
                .headers_mut()
                .insert("allow", HeaderValue::from_static("POST, DELETE"));
            response
        }
    }
}

async fn delete_mcp(State(state): State<McpServerState>, headers: HeaderMap) -> Response {
    match validated_session(&state, &headers) {
        Err(response) => response,
        Ok(id) => {
            state.sessions.remove(&id);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn options_mcp() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn get_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn unknown_path() -> Response {
    rpc_response(
        StatusCode::NOT_FOUND,
        RpcResponse::failure(Value::Null, RpcError::method_not_found("unknown path")),
        None,
    )
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Check the session header for GET/DELETE, mapping failures to the
/// transport's reserved error codes.
fn validated_session(state: &McpServerState, headers: &HeaderMap) -> Result<String, Response> {
    match session_header(headers) {
        None => Err(rpc_response(
            StatusCode::BAD_REQUEST,
            RpcResponse::failure(Value::Null, RpcError::no_session()),
            None,
        )),
        Some(id) if !state.sessions.contains(&id) => Err(rpc_response(
            StatusCode::NOT_FOUND,
            RpcResponse::failure(Value::Null, RpcError::session_not_found()),
            None,
        )),
        Some(id) => Ok(id),
    }
}

fn initialize_result(session: &McpSession) -> Value {
    json!({
        "protocolVersion": session.protocol_version,
        "capabilities": {"tools": {}},
        "serverInfo": {
            "name": "gramkeep",
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn rpc_response(status: StatusCode, body: RpcResponse, session_id: Option<&str>) -> Response {
    let mut response = (status, Json(body)).into_response();
    if let Some(id) = session_id
        && let Ok(value) = HeaderValue::from_str(id)
    {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
