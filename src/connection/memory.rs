//! In-memory connection: seeded entities, recorded requests, scripted failures.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{ConnectionError, Connector, DiscordConnection, RouteCall, TargetKey};
use crate::context::TargetKind;
use crate::identity::Identity;

/// State shared by every session opened from one fixture.
#[derive(Debug, Default)]
struct Fixture {
    /// Entities visible through `cached`
    cache: Mutex<HashMap<(TargetKind, String), Value>>,
    /// Entities visible only through `fetch`
    remote: Mutex<HashMap<(TargetKind, String), Value>>,
    /// Scripted responses keyed by `"METHOD /path"`
    responses: Mutex<HashMap<String, Result<Value, String>>>,
    /// Requests with the identity that sent them
    requests: Mutex<Vec<(Option<String>, RouteCall)>>,
    fetches: Mutex<Vec<(TargetKind, String)>>,
    bindings: Mutex<Vec<String>>,
    rejected_identities: Mutex<Vec<String>>,
    fetch_delay: Mutex<Option<Duration>>,
}

/// Used directly as one session, or as a [`Connector`] handing out
/// sessions that share the seeded entities and the recordings.
#[derive(Debug, Default)]
pub struct InMemoryConnection {
    fixture: Arc<Fixture>,
    active: Mutex<Option<String>>,
    /// Entities this session fetched
    fetched: Mutex<HashMap<(TargetKind, String), Value>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entity into the local cache.
    pub fn with_cached(self, kind: TargetKind, id: &str, value: Value) -> Self {
        self.fixture.cache.lock().insert((kind, id.to_string()), value);
        self
    }

    /// Seed an entity that is only reachable by fetching.
    pub fn with_remote(self, kind: TargetKind, id: &str, value: Value) -> Self {
        self.fixture.remote.lock().insert((kind, id.to_string()), value);
        self
    }

    /// Script the response of a route, e.g. `respond("POST /channels/1/messages", ...)`.
    pub fn respond(self, route_key: &str, value: Value) -> Self {
        self.fixture.responses.lock().insert(route_key.to_string(), Ok(value));
        self
    }

    /// Script a failure for a route.
    pub fn fail(self, route_key: &str, message: &str) -> Self {
        self.fixture
            .responses
            .lock()
            .insert(route_key.to_string(), Err(message.to_string()));
        self
    }

    /// Refuse to bind the given identity.
    pub fn reject_identity(self, identity_id: &str) -> Self {
        self.fixture.rejected_identities.lock().push(identity_id.to_string());
        self
    }

    /// Suspend every fetch for `delay` before answering.
    pub fn with_fetch_delay(self, delay: Duration) -> Self {
        *self.fixture.fetch_delay.lock() = Some(delay);
        self
    }

    /// Make `identity` the credential of this session.
    pub async fn bind_identity(&self, identity: &Identity) -> Result<(), ConnectionError> {
        self.check_identity(identity)?;
        *self.active.lock() = Some(identity.identity_id.clone());
        Ok(())
    }

    fn check_identity(&self, identity: &Identity) -> Result<(), ConnectionError> {
        if self.fixture.rejected_identities.lock().contains(&identity.identity_id) {
            return Err(ConnectionError::InvalidCredential(format!(
                "token for '{}' was rejected",
                identity.identity_id
            )));
        }
        self.fixture.bindings.lock().push(identity.identity_id.clone());
        Ok(())
    }

    /// Requests performed so far, in order.
    pub fn requests(&self) -> Vec<RouteCall> {
        self.fixture.requests.lock().iter().map(|(_, call)| call.clone()).collect()
    }

    /// Requests performed so far, with the identity each was sent as.
    pub fn requests_by_identity(&self) -> Vec<(Option<String>, RouteCall)> {
        self.fixture.requests.lock().clone()
    }

    /// Entities fetched over the "network" so far.
    pub fn fetches(&self) -> Vec<(TargetKind, String)> {
        self.fixture.fetches.lock().clone()
    }

    /// Identities bound so far, including repeated binds.
    pub fn bindings(&self) -> Vec<String> {
        self.fixture.bindings.lock().clone()
    }
}

#[async_trait]
impl Connector for InMemoryConnection {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn connect(&self, identity: &Identity) -> Result<Arc<dyn DiscordConnection>, ConnectionError> {
        self.check_identity(identity)?;
        let session = InMemoryConnection {
            fixture: self.fixture.clone(),
            active: Mutex::new(Some(identity.identity_id.clone())),
            fetched: Mutex::new(HashMap::new()),
        };
        Ok(Arc::new(session))
    }
}

#[async_trait]
impl DiscordConnection for InMemoryConnection {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn active_identity(&self) -> Option<String> {
        self.active.lock().clone()
    }

    fn cached(&self, kind: TargetKind, key: &TargetKey) -> Option<Value> {
        let entry = (kind, key.id.clone());
        if let Some(value) = self.fetched.lock().get(&entry) {
            return Some(value.clone());
        }
        self.fixture.cache.lock().get(&entry).cloned()
    }

    async fn fetch(&self, kind: TargetKind, key: &TargetKey) -> Result<Value, ConnectionError> {
        self.fixture.fetches.lock().push((kind, key.id.clone()));
        let delay = *self.fixture.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let found = self.fixture.remote.lock().get(&(kind, key.id.clone())).cloned();
        match found {
            Some(value) => {
                self.fetched.lock().insert((kind, key.id.clone()), value.clone());
                Ok(value)
            }
            None => Err(ConnectionError::NotFound(format!("Unknown {} {}", kind, key.id))),
        }
    }

    async fn request(&self, call: RouteCall) -> Result<Value, ConnectionError> {
        let active = self.active.lock().clone();
        if active.is_none() {
            return Err(ConnectionError::Unbound);
        }
        let route_key = call.route_key();
        self.fixture.requests.lock().push((active, call.clone()));

        let scripted = self.fixture.responses.lock().get(&route_key).cloned();
        match scripted {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(ConnectionError::Api {
                status: 400,
                code: 50035,
                message,
            }),
            // unscripted routes echo the body, or return nothing
            None => Ok(call.body.unwrap_or(Value::Null)),
        }
    }
}
