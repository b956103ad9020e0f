//! Discord REST v10 connection over reqwest.
//!
//! Requests are sent exactly once. A 429 surfaces as
//! [`ConnectionError::RateLimited`] carrying the server's `retry_after`; the
//! caller decides whether to try again.

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{ConnectionError, Connector, DiscordConnection, HttpMethod, RouteCall, TargetKey};
use crate::config::ConnectionConfig;
use crate::context::TargetKind;
use crate::identity::Identity;

/// Hands out one [`RestConnection`] per identity over a shared HTTP client.
pub struct RestConnector {
    client: Client,
    base_url: String,
    sessions: DashMap<String, Arc<RestConnection>>,
}

impl RestConnector {
    pub fn new(config: &ConnectionConfig) -> Result<Self, ConnectionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!(
                "DiscordBot (discord-manage, {})",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            sessions: DashMap::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of identities with an open session.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl Connector for RestConnector {
    fn name(&self) -> &str {
        "Discord REST v10"
    }

    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn DiscordConnection>, ConnectionError> {
        if identity.credential.is_empty() {
            return Err(ConnectionError::InvalidCredential(format!(
                "identity '{}' has an empty token",
                identity.identity_id
            )));
        }

        let authorization = identity.authorization();
        let mut entry = self
            .sessions
            .entry(identity.identity_id.clone())
            .or_insert_with(|| {
                log::debug!("Opening REST session for identity {}", identity.identity_id);
                Arc::new(RestConnection::new(
                    self.client.clone(),
                    self.base_url.clone(),
                    identity.identity_id.clone(),
                    authorization.clone(),
                ))
            });
        if entry.authorization != authorization {
            log::debug!("Credential of identity {} changed; dropping its cache", identity.identity_id);
            *entry = Arc::new(RestConnection::new(
                self.client.clone(),
                self.base_url.clone(),
                identity.identity_id.clone(),
                authorization,
            ));
        }
        let session: Arc<dyn DiscordConnection> = entry.value().clone();
        Ok(session)
    }
}

/// REST session of one identity, with its own entity cache.
pub struct RestConnection {
    client: Client,
    base_url: String,
    identity_id: String,
    authorization: String,
    cache: DashMap<String, Value>,
}

impl RestConnection {
    fn new(client: Client, base_url: String, identity_id: String, authorization: String) -> Self {
        Self {
            client,
            base_url,
            identity_id,
            authorization,
            cache: DashMap::new(),
        }
    }

    /// Number of cached entities.
    pub fn cached_entities(&self) -> usize {
        self.cache.len()
    }

    async fn handle_response(response: Response) -> Result<Value, ConnectionError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(1.0);
            return Err(ConnectionError::RateLimited { retry_after });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }

        let bytes = response.bytes().await?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| ConnectionError::Other(format!("invalid JSON response: {}", e)));
        }

        #[derive(Deserialize)]
        struct ApiErrorBody {
            code: Option<i64>,
            message: Option<String>,
        }

        let body: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or(ApiErrorBody {
            code: None,
            message: Some(String::from_utf8_lossy(&bytes).into_owned()),
        });
        let message = body
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        if status == StatusCode::NOT_FOUND {
            return Err(ConnectionError::NotFound(message));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ConnectionError::InvalidCredential(message));
        }

        Err(ConnectionError::Api {
            status: status.as_u16(),
            code: body.code.unwrap_or(i64::from(status.as_u16())),
            message,
        })
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl DiscordConnection for RestConnection {
    fn name(&self) -> &str {
        "Discord REST v10"
    }

    fn active_identity(&self) -> Option<String> {
        Some(self.identity_id.clone())
    }

    fn cached(&self, kind: TargetKind, key: &TargetKey) -> Option<Value> {
        self.cache.get(&key.cache_key(kind)).map(|entry| entry.value().clone())
    }

    async fn fetch(&self, kind: TargetKind, key: &TargetKey) -> Result<Value, ConnectionError> {
        let path = kind.fetch_path(key).ok_or_else(|| {
            ConnectionError::Other(format!("{} lookup needs a parent id", kind))
        })?;
        let value = self.request(RouteCall::get(path)).await?;
        self.cache.insert(key.cache_key(kind), value.clone());
        Ok(value)
    }

    async fn request(&self, call: RouteCall) -> Result<Value, ConnectionError> {
        let url = format!("{}{}", self.base_url, call.path);
        log::debug!("Discord API request: {} {}", call.method, call.path);

        let mut req = self
            .client
            .request(to_reqwest(call.method), &url)
            .header("Authorization", self.authorization.as_str());

        if !call.query.is_empty() {
            req = req.query(&call.query);
        }
        if let Some(reason) = &call.reason {
            req = req.header("X-Audit-Log-Reason", urlencoding::encode(reason).into_owned());
        }
        if let Some(body) = &call.body {
            req = req.json(body);
        }

        let response = req.send().await?;
        Self::handle_response(response).await
    }
}
