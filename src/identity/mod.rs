//! Identities and the identity store.
//!
//! An identity is a logical credential scope. `bot` identities are the
//! privileged application; `user` identities are delegated OAuth sessions.
//! Identities must be registered before use; unknown ids fail closed.

pub mod pool;

pub use pool::IdentityWorkerPool;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::IdentityConfig;

/// Whether an identity acts as the bot application or as a delegated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    Bot,
    User,
}

impl IdentityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::User => "user",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bot" => Some(Self::Bot),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Authorization scheme used on the REST API.
    pub fn auth_scheme(&self) -> &'static str {
        match self {
            Self::Bot => "Bot",
            Self::User => "Bearer",
        }
    }
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secret token of an identity. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token, dropping any `Bot ` / `Bearer ` prefix.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let trimmed = token
            .trim()
            .strip_prefix("Bot ")
            .or_else(|| token.trim().strip_prefix("Bearer "))
            .unwrap_or(token.trim())
            .to_string();
        Self(trimmed)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A registered identity.
#[derive(Debug, Clone)]
pub struct Identity {
    pub identity_id: String,
    pub mode: IdentityMode,
    pub credential: Credential,
}

impl Identity {
    pub fn new(identity_id: impl Into<String>, mode: IdentityMode, credential: Credential) -> Self {
        Self {
            identity_id: identity_id.into(),
            mode,
            credential,
        }
    }

    /// Value of the `Authorization` header for this identity.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.mode.auth_scheme(), self.credential.expose())
    }
}

/// Lookup of registered identities.
pub trait IdentityStore: Send + Sync {
    fn get_identity(&self, identity_id: &str) -> Option<Identity>;

    fn list_identity_ids(&self) -> Vec<String>;

    /// Identity used when a call names a mode but no identity id.
    fn default_identity_id(&self, mode: IdentityMode) -> Option<String>;
}

/// Identity store held in memory, usually built from configuration.
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    identities: RwLock<HashMap<String, Identity>>,
    defaults: RwLock<HashMap<IdentityMode, String>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity. The first identity of each mode becomes that
    /// mode's default unless one was set explicitly.
    pub fn register(&self, identity: Identity) {
        self.defaults
            .write()
            .entry(identity.mode)
            .or_insert_with(|| identity.identity_id.clone());
        self.identities
            .write()
            .insert(identity.identity_id.clone(), identity);
    }

    pub fn set_default(&self, mode: IdentityMode, identity_id: impl Into<String>) {
        self.defaults.write().insert(mode, identity_id.into());
    }

    /// Build the store from configured identities.
    ///
    /// `lookup_env` resolves `token_env` references. Identities with no
    /// resolvable token are skipped with a warning.
    pub fn from_config<F>(configs: &[IdentityConfig], lookup_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = Self::new();
        for cfg in configs {
            let token = cfg
                .token
                .clone()
                .or_else(|| cfg.token_env.as_deref().and_then(&lookup_env));
            let Some(token) = token.filter(|t| !t.trim().is_empty()) else {
                log::warn!("Skipping identity '{}': no token configured", cfg.id);
                continue;
            };
            store.register(Identity::new(cfg.id.clone(), cfg.mode, Credential::new(token)));
            if cfg.default {
                store.set_default(cfg.mode, cfg.id.clone());
            }
        }
        log::info!("Identity store loaded {} identities", store.identities.read().len());
        store
    }
}

impl IdentityStore for InMemoryIdentityStore {
    fn get_identity(&self, identity_id: &str) -> Option<Identity> {
        self.identities.read().get(identity_id).cloned()
    }

    fn list_identity_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.identities.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn default_identity_id(&self, mode: IdentityMode) -> Option<String> {
        self.defaults.read().get(&mode).cloned()
    }
}
