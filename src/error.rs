//! Error taxonomy for the operation gateway.
//!
//! Every failure the tool surface can report maps onto one `GatewayError`
//! variant with a stable machine-readable `code`. Nothing in the gateway
//! retries on its own; callers decide what to do with each class.

use serde_json::{json, Value};
use thiserror::Error;

use crate::capabilities::CatalogError;

/// Errors surfaced to callers of the `discord_manage` tool.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed params, too many positional args, bad field types.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation key outside the closed vocabulary.
    #[error("Unsupported operation: '{0}'")]
    UnsupportedOperation(String),

    /// Method other than `read` / `write`.
    #[error("Unsupported method: '{0}'")]
    UnsupportedMethod(String),

    /// Caller-declared method disagrees with the operation's fixed method.
    #[error("Operation '{operation}' is pinned to method '{expected}' and cannot be called with method '{declared}'")]
    MethodMismatch {
        operation: String,
        declared: String,
        expected: String,
    },

    /// No catalog entry matches the requested symbol.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// The symbol exists but cannot be called directly.
    #[error("Symbol '{symbol}' is not invokable: {reason}")]
    NotInvokable { symbol: String, reason: String },

    /// Identity id not registered with the identity store.
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// The connection refused the identity's credential.
    #[error("Failed to bind identity '{identity}': {message}")]
    IdentityBinding { identity: String, message: String },

    /// Write guard, dangerous guard or strict allow-list refused the call.
    #[error("Policy blocked '{symbol}': {}", .reasons.join("; "))]
    PolicyBlocked { symbol: String, reasons: Vec<String> },

    /// A referenced target id was missing or could not be resolved.
    #[error("Unresolved target {kind} ({}): {reason}", .id.as_deref().unwrap_or("no id"))]
    UnresolvedTarget {
        kind: String,
        id: Option<String>,
        reason: String,
    },

    /// The presented preflight token was computed over different parameters.
    #[error("Preflight token mismatch for '{symbol}': parameters changed since preflight, re-run symbols.preflight")]
    PreflightMismatch { symbol: String },

    /// Live writes require a preflight token under the current configuration.
    #[error("Live write '{symbol}' requires a preflight token: run symbols.preflight first")]
    PreflightRequired { symbol: String },

    /// The underlying call failed; `message` is the original error text.
    #[error("Invocation of '{symbol}' failed: {message}")]
    InvocationFailed { symbol: String, message: String },

    /// Catalog could not be built.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl GatewayError {
    /// Stable error code reported in the result envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UnsupportedOperation(_) => "unsupported_operation",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::MethodMismatch { .. } => "method_mismatch",
            Self::UnknownSymbol(_) => "unknown_symbol",
            Self::NotInvokable { .. } => "not_invokable",
            Self::UnknownIdentity(_) => "unknown_identity",
            Self::IdentityBinding { .. } => "identity_binding_failed",
            Self::PolicyBlocked { .. } => "policy_blocked",
            Self::UnresolvedTarget { .. } => "unresolved_target",
            Self::PreflightMismatch { .. } => "preflight_mismatch",
            Self::PreflightRequired { .. } => "preflight_required",
            Self::InvocationFailed { .. } => "invocation_failed",
            Self::Catalog(_) => "catalog_error",
        }
    }

    /// Whether this error is a caller-side validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::UnsupportedOperation(_)
                | Self::UnsupportedMethod(_)
                | Self::MethodMismatch { .. }
                | Self::UnknownSymbol(_)
                | Self::NotInvokable { .. }
        )
    }

    /// Blocking reasons, for policy failures.
    pub fn reasons(&self) -> Option<&[String]> {
        match self {
            Self::PolicyBlocked { reasons, .. } => Some(reasons),
            _ => None,
        }
    }

    /// JSON shape used in tool responses and batch item results.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(reasons) = self.reasons() {
            body["reasons"] = json!(reasons);
        }
        if let Self::UnresolvedTarget { kind, id, .. } = self {
            body["target"] = json!({ "kind": kind, "id": id });
        }
        body
    }
}

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
