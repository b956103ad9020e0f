//! Gateway configuration.
//!
//! Loaded from an optional YAML file (path in `DISCORD_MANAGE_CONFIG`) and
//! then overridden by environment variables. Every section has defaults, so
//! an empty file and no file at all are both valid.
//!
//! ```yaml
//! policy:
//!   mode: strict
//!   allow_dangerous: false
//!   require_preflight_token: false
//! batch:
//!   max_concurrency: 4
//!   max_items: 100
//! context:
//!   default_guild_id: "123456789012345678"
//! catalog:
//!   manifest_paths: ["manifests"]
//! identities:
//!   - id: main-bot
//!     mode: bot
//!     token_env: DISCORD_BOT_TOKEN
//!     default: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::identity::IdentityMode;
use crate::invocation::PolicyMode;

pub const CONFIG_PATH_ENV: &str = "DISCORD_MANAGE_CONFIG";
pub const BOT_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub const DEFAULT_GUILD_ENV: &str = "DISCORD_DEFAULT_GUILD_ID";
pub const POLICY_MODE_ENV: &str = "DISCORD_MANAGE_POLICY_MODE";
pub const ALLOW_DANGEROUS_ENV: &str = "DISCORD_MANAGE_ALLOW_DANGEROUS";
pub const PORT_ENV: &str = "PORT";

/// Identity id created from `DISCORD_BOT_TOKEN` when no bot identity is configured.
pub const ENV_BOT_IDENTITY: &str = "default-bot";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub policy: PolicyConfig,
    pub batch: BatchConfig,
    pub serialization: SerializationConfig,
    pub context: ContextConfig,
    pub connection: ConnectionConfig,
    pub catalog: CatalogConfig,
    pub identities: Vec<IdentityConfig>,
    pub server: ServerConfig,
}

/// Write policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Configured mode; callers can only tighten it
    pub mode: PolicyMode,

    /// Environment-level override required for `dangerous` symbols
    pub allow_dangerous: bool,

    /// Regex patterns over symbol names allowed to write under `strict`
    pub strict_allowlist: Vec<String>,

    /// Reject live writes that do not present a preflight token
    pub require_preflight_token: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            mode: PolicyMode::Strict,
            allow_dangerous: false,
            strict_allowlist: default_strict_allowlist(),
            require_preflight_token: false,
        }
    }
}

/// Builder-pattern types and container mutators that only touch local data.
pub fn default_strict_allowlist() -> Vec<String> {
    vec![
        r"^[A-Za-z]+Builder[#.]".to_string(),
        r"^Collection#(set|delete|clear)$".to_string(),
        r"^PermissionsBitField[#.]".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on best-effort workers
    pub max_concurrency: usize,
    /// Largest accepted batch
    pub max_items: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_items: 100,
        }
    }
}

/// Bounds applied when turning live values into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    pub max_depth: usize,
    /// Fields kept per object
    pub max_fields: usize,
    /// Items kept per list and set
    pub max_items: usize,
    /// Entries kept per collection
    pub max_entries: usize,
    /// Characters kept per string
    pub max_string_len: usize,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_fields: 100,
            max_items: 100,
            max_entries: 100,
            max_string_len: 4000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Guild used when a call needs one and supplies none
    pub default_guild_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://discord.com/api/v10".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directories scanned recursively for declared-only manifests
    pub manifest_paths: Vec<PathBuf>,
    /// Package aliases excluded from the catalog
    pub disabled_packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub id: String,
    pub mode: IdentityMode,
    /// Inline token; prefer `token_env`
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable holding the token
    #[serde(default)]
    pub token_env: Option<String>,
    /// Make this the default identity of its mode
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl GatewayConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load from `DISCORD_MANAGE_CONFIG` (if set) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        let mut config = match lookup(CONFIG_PATH_ENV) {
            Some(path) => Self::from_yaml_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides(lookup)?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(guild) = lookup(DEFAULT_GUILD_ENV).filter(|g| !g.trim().is_empty()) {
            self.context.default_guild_id = Some(guild.trim().to_string());
        }

        if let Some(mode) = lookup(POLICY_MODE_ENV) {
            self.policy.mode = PolicyMode::parse(&mode).ok_or_else(|| {
                ConfigError::Invalid(format!("{}='{}' is not strict|permissive", POLICY_MODE_ENV, mode))
            })?;
        }

        if let Some(flag) = lookup(ALLOW_DANGEROUS_ENV) {
            self.policy.allow_dangerous = parse_flag(&flag).ok_or_else(|| {
                ConfigError::Invalid(format!("{}='{}' is not a boolean", ALLOW_DANGEROUS_ENV, flag))
            })?;
        }

        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{}='{}' is not a port", PORT_ENV, port)))?;
        }

        let has_bot = self.identities.iter().any(|i| i.mode == IdentityMode::Bot);
        if !has_bot && lookup(BOT_TOKEN_ENV).is_some() {
            self.identities.push(IdentityConfig {
                id: ENV_BOT_IDENTITY.to_string(),
                mode: IdentityMode::Bot,
                token: None,
                token_env: Some(BOT_TOKEN_ENV.to_string()),
                default: true,
            });
        }

        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::Invalid("batch.max_concurrency must be at least 1".into()));
        }
        if self.batch.max_items == 0 {
            return Err(ConfigError::Invalid("batch.max_items must be at least 1".into()));
        }
        if self.serialization.max_depth == 0 {
            return Err(ConfigError::Invalid("serialization.max_depth must be at least 1".into()));
        }
        for pattern in &self.policy.strict_allowlist {
            regex::Regex::new(pattern)
                .map_err(|e| ConfigError::Invalid(format!("strict_allowlist pattern '{}': {}", pattern, e)))?;
        }
        let mut seen = std::collections::HashSet::new();
        for identity in &self.identities {
            if !seen.insert(identity.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate identity id '{}'", identity.id)));
            }
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_yaml_str("").unwrap();
        assert_eq!(config.policy.mode, PolicyMode::Strict);
        assert!(!config.policy.allow_dangerous);
        assert_eq!(config.policy.strict_allowlist.len(), 3);
        assert_eq!(config.batch.max_concurrency, 4);
        assert_eq!(config.connection.api_url, "https://discord.com/api/v10");
    }

    #[test]
    fn test_yaml_sections() {
        let config = GatewayConfig::from_yaml_str(
            r#"
policy:
  mode: permissive
  require_preflight_token: true
batch:
  max_items: 5
context:
  default_guild_id: "42"
identities:
  - id: helper
    mode: user
    token: abc
"#,
        )
        .unwrap();
        assert_eq!(config.policy.mode, PolicyMode::Permissive);
        assert!(config.policy.require_preflight_token);
        assert_eq!(config.batch.max_items, 5);
        assert_eq!(config.batch.max_concurrency, 4);
        assert_eq!(config.context.default_guild_id.as_deref(), Some("42"));
        assert_eq!(config.identities[0].mode, IdentityMode::User);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        config
            .apply_env_overrides(env(&[
                (DEFAULT_GUILD_ENV, "777"),
                (POLICY_MODE_ENV, "permissive"),
                (ALLOW_DANGEROUS_ENV, "true"),
                (PORT_ENV, "9000"),
                (BOT_TOKEN_ENV, "secret"),
            ]))
            .unwrap();
        assert_eq!(config.context.default_guild_id.as_deref(), Some("777"));
        assert_eq!(config.policy.mode, PolicyMode::Permissive);
        assert!(config.policy.allow_dangerous);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.identities.len(), 1);
        assert_eq!(config.identities[0].id, ENV_BOT_IDENTITY);
        assert!(config.identities[0].default);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = GatewayConfig::default();
        assert!(config.apply_env_overrides(env(&[(POLICY_MODE_ENV, "lax")])).is_err());
        assert!(GatewayConfig::from_yaml_str("batch:\n  max_concurrency: 0\n").is_err());
        assert!(GatewayConfig::from_yaml_str("policy:\n  strict_allowlist: ['(']\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  port: 3001").unwrap();
        let config = GatewayConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.server.port, 3001);

        let missing = GatewayConfig::from_yaml_file(Path::new("/nonexistent/discord-manage.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
