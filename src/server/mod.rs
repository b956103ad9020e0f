//! HTTP server exposing the `discord_manage` tool.
//!
//! # Endpoints
//!
//! - `GET  /health`               - Liveness probe
//! - `GET  /operations`           - Tool descriptor
//! - `POST /tools/discord_manage` - Tool call

pub mod routes;

pub use routes::{app_router, AppState};
