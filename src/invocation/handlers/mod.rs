//! Symbol handlers: the command objects behind invokable catalog entries.
//!
//! Three families implement [`SymbolHandler`]:
//! - [`RouteHandler`]: a Discord REST route with placeholders for the bound
//!   target, context ids and positional args
//! - [`NativeHandler`]: a pure function over args and local target data
//!   (formatting helpers, snowflakes, permission bitfields, collections)
//! - [`BuilderHandler`]: one step of a message-component builder

pub mod builder;
pub mod native;
pub mod route;

pub use builder::{BuilderHandler, BuilderOp};
pub use native::{NativeFn, NativeHandler};
pub use route::{BodyScope, BodySpec, Returns, RouteHandler};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::value::LiveValue;
use crate::connection::{ConnectionError, DiscordConnection};
use crate::context::{ResolvedTarget, TargetKind};

/// Errors raised by handlers
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("missing required argument #{index} ({name})")]
    MissingArgument { index: usize, name: String },

    #[error("invalid argument #{index}: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("invalid target data: {0}")]
    InvalidTarget(String),

    #[error("no {0} id available for this call")]
    MissingContext(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Failed(String),
}

/// Inputs of one handler call.
#[derive(Clone, Copy)]
pub struct HandlerCall<'a> {
    /// Catalog name of the called symbol
    pub symbol: &'a str,
    /// Live handle of the bound target, for instance methods on entities
    pub target: Option<&'a ResolvedTarget>,
    /// Local data for builder and container instances
    pub target_data: Option<&'a Value>,
    /// Arguments after `$ref` substitution
    pub args: &'a [Value],
    /// Context ids resolved for this call
    pub ids: &'a BTreeMap<TargetKind, String>,
    pub connection: &'a dyn DiscordConnection,
}

impl fmt::Debug for HandlerCall<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCall")
            .field("symbol", &self.symbol)
            .field("target", &self.target.map(|t| (t.kind, t.id.as_str())))
            .field("args", &self.args.len())
            .field("connection", &self.connection.name())
            .finish()
    }
}

/// Command interface of an invokable symbol.
#[async_trait]
pub trait SymbolHandler: Send + Sync + fmt::Debug {
    /// Static description for discovery and dry-run reports.
    fn describe(&self) -> Value;

    /// Context kinds the handler reads ids of, beyond the bound target.
    fn context_kinds(&self) -> Vec<TargetKind> {
        Vec::new()
    }

    /// What a live call with these inputs would do, without doing it.
    fn plan(&self, _call: &HandlerCall<'_>) -> Value {
        self.describe()
    }

    /// Whether the handler performs network calls.
    fn is_remote(&self) -> bool {
        false
    }

    async fn call(&self, call: HandlerCall<'_>) -> Result<LiveValue, HandlerError>;
}

/// Non-null argument at `index`.
pub fn opt_arg(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|v| !v.is_null())
}

/// Required argument at `index`.
pub fn arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a Value, HandlerError> {
    opt_arg(args, index).ok_or_else(|| HandlerError::MissingArgument {
        index,
        name: name.to_string(),
    })
}

/// Required string-like argument; numbers are accepted for ids.
pub fn arg_str(args: &[Value], index: usize, name: &str) -> Result<String, HandlerError> {
    match arg(args, index, name)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(HandlerError::InvalidArgument {
            index,
            message: format!("{} must be a string, got {}", name, other),
        }),
    }
}
