//! Operation registry: the closed vocabulary of tool operations.
//!
//! Every operation is pinned to exactly one [`Method`]. Raw operation strings
//! are parsed once into [`Operation`]; after that, dispatch is by variant.

pub mod params;

pub use params::{declared_params, normalize_params};

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

use crate::error::{GatewayError, GatewayResult};

/// Coarse permission class of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Read,
    Write,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    PackagesList,
    SymbolsDiscover,
    SymbolsPreflight,
    SymbolsInvoke,
    SymbolsBatch,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::PackagesList,
        Operation::SymbolsDiscover,
        Operation::SymbolsPreflight,
        Operation::SymbolsInvoke,
        Operation::SymbolsBatch,
    ];

    /// Canonical operation key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::PackagesList => "packages.list",
            Self::SymbolsDiscover => "symbols.discover",
            Self::SymbolsPreflight => "symbols.preflight",
            Self::SymbolsInvoke => "symbols.invoke",
            Self::SymbolsBatch => "symbols.batch",
        }
    }

    /// The one method this operation may be called under.
    pub fn method(&self) -> Method {
        match self {
            Self::PackagesList | Self::SymbolsDiscover | Self::SymbolsPreflight => Method::Read,
            Self::SymbolsInvoke | Self::SymbolsBatch => Method::Write,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

/// Lowercase with all whitespace removed.
fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

const LEGACY_SPELLINGS: &[(&str, Operation)] = &[
    ("list_packages", Operation::PackagesList),
    ("packages", Operation::PackagesList),
    ("discover", Operation::SymbolsDiscover),
    ("discover_symbols", Operation::SymbolsDiscover),
    ("search_symbols", Operation::SymbolsDiscover),
    ("preflight", Operation::SymbolsPreflight),
    ("dry_run", Operation::SymbolsPreflight),
    ("invoke", Operation::SymbolsInvoke),
    ("call", Operation::SymbolsInvoke),
    ("batch", Operation::SymbolsBatch),
    ("invoke_batch", Operation::SymbolsBatch),
    ("batch_invoke", Operation::SymbolsBatch),
];

/// Parse a canonical operation key.
pub fn resolve_operation(raw: &str) -> GatewayResult<Operation> {
    let normalized = normalize(raw);
    Operation::ALL
        .iter()
        .copied()
        .find(|op| op.key() == normalized)
        .ok_or_else(|| GatewayError::UnsupportedOperation(raw.to_string()))
}

/// Parse a canonical key or a legacy spelling.
///
/// Returns the operation and, for legacy input, the spelling it came from.
pub fn resolve_operation_with_compat(raw: &str) -> GatewayResult<(Operation, Option<String>)> {
    if let Ok(op) = resolve_operation(raw) {
        return Ok((op, None));
    }
    let normalized = normalize(raw).replace('-', "_");
    LEGACY_SPELLINGS
        .iter()
        .find(|(legacy, _)| *legacy == normalized)
        .map(|(_, op)| {
            log::debug!("Translated legacy operation '{}' to {}", raw, op);
            (*op, Some(raw.trim().to_string()))
        })
        .ok_or_else(|| GatewayError::UnsupportedOperation(raw.to_string()))
}

pub fn resolve_method(raw: &str) -> GatewayResult<Method> {
    match normalize(raw).as_str() {
        "read" => Ok(Method::Read),
        "write" => Ok(Method::Write),
        _ => Err(GatewayError::UnsupportedMethod(raw.to_string())),
    }
}

/// Fail with `MethodMismatch` unless `op` is pinned to `declared`.
pub fn ensure_method(declared: Method, op: Operation) -> GatewayResult<()> {
    if op.method() == declared {
        return Ok(());
    }
    Err(GatewayError::MethodMismatch {
        operation: op.key().to_string(),
        declared: declared.to_string(),
        expected: op.method().to_string(),
    })
}

pub fn resolve_operation_for_method(method: Method, raw_operation: &str) -> GatewayResult<Operation> {
    let op = resolve_operation(raw_operation)?;
    ensure_method(method, op)?;
    Ok(op)
}

pub fn domain_method_for_operation(op: Operation) -> Method {
    op.method()
}

pub fn operations_for_method(method: Method) -> Vec<Operation> {
    Operation::ALL
        .iter()
        .copied()
        .filter(|op| op.method() == method)
        .collect()
}

/// Registry listing for discovery endpoints.
pub fn describe_operations() -> Value {
    Value::Array(
        Operation::ALL
            .iter()
            .map(|op| {
                json!({
                    "operation": op,
                    "method": op.method(),
                    "params": declared_params(*op),
                })
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_domain_method() {
        for op in Operation::ALL {
            let method = domain_method_for_operation(op);
            assert_eq!(resolve_operation_for_method(method, op.key()).unwrap(), op);
        }
    }

    #[test]
    fn test_resolve_is_case_and_whitespace_insensitive() {
        assert_eq!(resolve_operation(" Symbols.Invoke ").unwrap(), Operation::SymbolsInvoke);
        assert_eq!(resolve_operation("packages .list").unwrap(), Operation::PackagesList);
        let err = resolve_operation("symbols.delete").unwrap_err();
        assert_eq!(err.code(), "unsupported_operation");
        assert!(err.to_string().contains("symbols.delete"));
    }

    #[test]
    fn test_legacy_spellings() {
        assert_eq!(
            resolve_operation_with_compat("invoke_batch").unwrap(),
            (Operation::SymbolsBatch, Some("invoke_batch".to_string()))
        );
        assert_eq!(
            resolve_operation_with_compat("Dry-Run").unwrap(),
            (Operation::SymbolsPreflight, Some("Dry-Run".to_string()))
        );
        assert_eq!(resolve_operation_with_compat("symbols.discover").unwrap(), (Operation::SymbolsDiscover, None));
        // legacy spellings are not canonical keys
        assert!(resolve_operation("call").is_err());
    }

    #[test]
    fn test_method_mismatch() {
        let err = resolve_operation_for_method(Method::Read, "symbols.invoke").unwrap_err();
        assert!(matches!(
            err,
            GatewayError::MethodMismatch { ref declared, ref expected, .. } if declared == "read" && expected == "write"
        ));
        assert!(resolve_operation_for_method(Method::Write, "symbols.preflight").is_err());
    }

    #[test]
    fn test_methods() {
        assert_eq!(resolve_method("WRITE").unwrap(), Method::Write);
        assert_eq!(resolve_method("admin").unwrap_err().code(), "unsupported_method");
        assert_eq!(
            operations_for_method(Method::Read),
            vec![Operation::PackagesList, Operation::SymbolsDiscover, Operation::SymbolsPreflight]
        );
        assert_eq!(operations_for_method(Method::Write).len(), 2);
    }
}
