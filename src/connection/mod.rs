//! The seam between the gateway and live Discord sessions.
//!
//! A [`Connector`] hands out one [`DiscordConnection`] per identity. Each
//! connection carries its identity's credential and entity cache for its
//! whole life, so concurrent calls of different identities never share a
//! session.
//!
//! ```text
//!   DiscordManageTool ──► Connector::connect(identity)
//!                              │
//!   InvocationEngine ──► DiscordConnection ──┬─► RestConnection (Discord REST v10)
//!   ContextResolver  ──►                     └─► InMemoryConnection (tests, demos)
//! ```

pub mod memory;
pub mod rest;

pub use memory::InMemoryConnection;
pub use rest::{RestConnection, RestConnector};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::context::TargetKind;
use crate::identity::Identity;

/// HTTP verbs used by route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully expanded REST call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteCall {
    pub method: HttpMethod,
    /// Path relative to the API base, already percent-encoded
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    /// Sent as `X-Audit-Log-Reason`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RouteCall {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
            reason: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// `"POST /channels/1/messages"`
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Key of a live entity: its id plus the parent id its endpoint needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetKey {
    pub id: String,
    pub parent: Option<String>,
}

impl TargetKey {
    pub fn new(id: impl Into<String>, parent: Option<String>) -> Self {
        Self {
            id: id.into(),
            parent,
        }
    }

    /// Cache key combining kind, parent and id.
    pub fn cache_key(&self, kind: TargetKind) -> String {
        match &self.parent {
            Some(parent) => format!("{}:{}:{}", kind, parent, self.id),
            None => format!("{}:{}", kind, self.id),
        }
    }
}

/// Connection errors
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord API error {status} (code {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No identity bound to the connection")]
    Unbound,

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("{0}")]
    Other(String),
}

/// Opens identity-scoped connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable connector name
    fn name(&self) -> &str;

    /// Connection sending `identity`'s credential.
    ///
    /// Connecting again with an unchanged credential returns the same
    /// session and keeps its cache. A changed credential gets a fresh
    /// session with an empty cache.
    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn DiscordConnection>, ConnectionError>;
}

/// A live Discord session of one identity.
#[async_trait]
pub trait DiscordConnection: Send + Sync {
    /// Human-readable connection name
    fn name(&self) -> &str;

    /// Id of the identity whose credential this connection sends.
    fn active_identity(&self) -> Option<String>;

    /// Entity from the local cache, without network access.
    fn cached(&self, kind: TargetKind, key: &TargetKey) -> Option<Value>;

    /// Fetch an entity over the network and cache it.
    async fn fetch(&self, kind: TargetKind, key: &TargetKey) -> Result<Value, ConnectionError>;

    /// Perform a raw REST call. `Value::Null` for empty responses.
    async fn request(&self, call: RouteCall) -> Result<Value, ConnectionError>;
}
