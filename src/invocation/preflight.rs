//! Stateless preflight tokens.
//!
//! A token binds a dry-run to the exact parameters of the live call that
//! follows it: `"pf1:" + hex(sha256(canonical_json(params)))`. Nothing is
//! stored; the live call recomputes the token and compares.

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::policy::PolicyMode;
use crate::capabilities::SymbolId;
use crate::context::InvocationContext;

pub const TOKEN_PREFIX: &str = "pf1:";

/// Everything a preflight token covers.
#[derive(Debug, Clone, Copy)]
pub struct PreflightParams<'a> {
    pub symbol: &'a SymbolId,
    pub target: Option<&'a Value>,
    pub context: &'a InvocationContext,
    pub args: &'a [Value],
    pub allow_write: bool,
    pub policy_mode: PolicyMode,
}

impl PreflightParams<'_> {
    fn to_value(&self) -> Value {
        json!({
            "symbol": {
                "package": self.symbol.package,
                "kind": self.symbol.kind,
                "name": self.symbol.name,
            },
            "target": self.target.cloned().unwrap_or(Value::Null),
            "context": to_value_or_null(self.context),
            "args": self.args,
            "allowWrite": self.allow_write,
            "policyMode": self.policy_mode,
        })
    }
}

fn to_value_or_null<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Compute the token for `params`.
pub fn compute_token(params: &PreflightParams<'_>) -> String {
    let canonical = canonical_json(&params.to_value());
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}{}", TOKEN_PREFIX, hex::encode(digest))
}

/// Compare a presented token with the expected one.
pub fn verify_token(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.trim().as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// JSON with object keys sorted at every level and no whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(item) = map.get(key) {
                    write_canonical(item, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
