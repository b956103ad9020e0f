//! Axum route handlers for the discord-manage HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`               - Returns `{"status": "ok", "version": ..}`
//! - `GET  /operations`           - Tool descriptor and operation registry
//! - `POST /tools/discord_manage` - One tool call, answered with the result envelope

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::tool::{DiscordManageTool, ToolResponse, TOOL_NAME};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub tool: Arc<DiscordManageTool>,
}

impl AppState {
    pub fn new(tool: Arc<DiscordManageTool>) -> Self {
        Self { tool }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/operations", get(operations_handler))
        .route(&format!("/tools/{}", TOOL_NAME), post(tool_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "discord-manage",
        "symbols": state.tool.catalog().symbol_count(),
    }))
}

/// GET /operations - what the tool accepts.
async fn operations_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.tool.describe())
}

/// HTTP status for an envelope. The body always carries the full envelope.
fn status_for(response: &ToolResponse) -> StatusCode {
    match response.error_code() {
        None => StatusCode::OK,
        Some(
            "validation_error" | "unsupported_operation" | "unsupported_method" | "method_mismatch" | "unknown_symbol"
            | "not_invokable",
        ) => StatusCode::BAD_REQUEST,
        Some("unknown_identity" | "policy_blocked") => StatusCode::FORBIDDEN,
        Some("preflight_mismatch" | "preflight_required") => StatusCode::CONFLICT,
        Some("unresolved_target") => StatusCode::NOT_FOUND,
        Some("identity_binding_failed" | "invocation_failed") => StatusCode::BAD_GATEWAY,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /tools/discord_manage - run one tool call.
///
/// The body is taken as raw JSON so that malformed calls still produce an
/// envelope and an audit event.
async fn tool_handler(State(state): State<AppState>, Json(input): Json<Value>) -> impl IntoResponse {
    let response = state.tool.call_value(input).await;
    let status = status_for(&response);
    if status.is_server_error() {
        tracing::warn!(operation = %response.operation, status = %status, "tool call failed");
    } else {
        tracing::debug!(operation = %response.operation, ok = response.ok, "tool call");
    }
    (status, Json(response))
}
