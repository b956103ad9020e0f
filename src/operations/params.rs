//! Declared parameters per operation and the mapping of raw tool input
//! onto them.

use serde_json::{Map, Value};

use super::Operation;
use crate::error::{GatewayError, GatewayResult};

/// Parameter names in positional order.
pub fn declared_params(op: Operation) -> &'static [&'static str] {
    match op {
        Operation::PackagesList => &[],
        Operation::SymbolsDiscover => &[
            "query",
            "kinds",
            "packages",
            "page",
            "pageSize",
            "sort",
            "includeKindCounts",
            "behavior",
            "invokableOnly",
        ],
        Operation::SymbolsPreflight => &[
            "symbol",
            "target",
            "args",
            "allowWrite",
            "policyMode",
            "package",
            "operationKey",
        ],
        Operation::SymbolsInvoke => &[
            "symbol",
            "target",
            "args",
            "allowWrite",
            "dryRun",
            "preflightToken",
            "policyMode",
            "package",
            "operationKey",
        ],
        Operation::SymbolsBatch => &[
            "items",
            "mode",
            "dryRun",
            "haltOnPolicyBlock",
            "maxConcurrency",
            "allowWrite",
            "policyMode",
        ],
    }
}

/// `allow_write` → `allowWrite`; camelCase input is returned unchanged.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
            continue;
        }
        if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn unknown_param(op: Operation, key: &str) -> GatewayError {
    let declared = declared_params(op);
    let accepted = if declared.is_empty() {
        "none".to_string()
    } else {
        declared.join(", ")
    };
    GatewayError::Validation(format!(
        "unknown parameter '{}' for {}; accepted: {}",
        key, op, accepted
    ))
}

/// Check names against the declared set, normalizing snake_case keys.
fn named(op: Operation, map: &Map<String, Value>) -> GatewayResult<Map<String, Value>> {
    let declared = declared_params(op);
    let mut out = Map::new();
    for (key, value) in map {
        let name = camel_case(key);
        if !declared.contains(&name.as_str()) {
            return Err(unknown_param(op, key));
        }
        if out.insert(name.clone(), value.clone()).is_some() {
            return Err(GatewayError::Validation(format!(
                "parameter '{}' given more than once",
                name
            )));
        }
    }
    Ok(out)
}

fn positional(op: Operation, args: &[Value]) -> GatewayResult<Map<String, Value>> {
    let declared = declared_params(op);
    if args.len() > declared.len() {
        return Err(GatewayError::Validation(format!(
            "{} takes at most {} positional args ({}), got {}",
            op,
            declared.len(),
            declared.join(", "),
            args.len()
        )));
    }
    Ok(declared
        .iter()
        .zip(args)
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect())
}

/// Build the named parameters of one call from the tool's `params` and `args`.
///
/// - `params` absent: an `args` array maps positionally onto the declared
///   parameters, an `args` object is taken as named params.
/// - `params` present: `args` fills `params.args` for operations that declare
///   an `args` parameter and only when `params` does not set it.
pub fn normalize_params(
    op: Operation,
    params: Option<&Value>,
    args: Option<&Value>,
) -> GatewayResult<Map<String, Value>> {
    let args = args.filter(|a| !a.is_null());
    let params = match params {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(named(op, map)?),
        Some(other) => {
            return Err(GatewayError::Validation(format!(
                "params must be an object, got {}",
                other
            )))
        }
    };

    let Some(mut params) = params else {
        return match args {
            None => Ok(Map::new()),
            Some(Value::Array(items)) => positional(op, items),
            Some(Value::Object(map)) => named(op, map),
            Some(other) => Err(args_shape_error(other)),
        };
    };
    let Some(args) = args else {
        return Ok(params);
    };
    if !args.is_array() && !args.is_object() {
        return Err(args_shape_error(args));
    }
    if !declared_params(op).contains(&"args") {
        return Err(GatewayError::Validation(format!(
            "{} does not take args alongside params",
            op
        )));
    }
    if params.contains_key("args") {
        return Err(GatewayError::Validation(
            "args given both at the top level and in params.args".to_string(),
        ));
    }
    params.insert("args".to_string(), args.clone());
    Ok(params)
}

fn args_shape_error(args: &Value) -> GatewayError {
    GatewayError::Validation(format!("args must be an array or an object, got {}", args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_positional_mapping() {
        let params = normalize_params(
            Operation::SymbolsInvoke,
            None,
            Some(&json!(["TextChannel#send", {"kind": "channel"}, ["hi"], true])),
        )
        .unwrap();
        assert_eq!(params["symbol"], "TextChannel#send");
        assert_eq!(params["args"], json!(["hi"]));
        assert_eq!(params["allowWrite"], true);
    }

    #[test]
    fn test_too_many_positional_args() {
        let err = normalize_params(Operation::PackagesList, None, Some(&json!([1]))).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("at most 0"));
    }

    #[test]
    fn test_args_object_is_named_params() {
        let params = normalize_params(
            Operation::SymbolsDiscover,
            None,
            Some(&json!({"query": "ban", "page_size": 5})),
        )
        .unwrap();
        assert_eq!(params["pageSize"], 5);
    }

    #[test]
    fn test_args_fill_params_args() {
        let params = normalize_params(
            Operation::SymbolsPreflight,
            Some(&json!({"symbol": "bold"})),
            Some(&json!(["text"])),
        )
        .unwrap();
        assert_eq!(params["args"], json!(["text"]));

        let err = normalize_params(
            Operation::SymbolsPreflight,
            Some(&json!({"symbol": "bold", "args": []})),
            Some(&json!(["text"])),
        )
        .unwrap_err();
        assert!(err.is_validation());

        assert!(normalize_params(Operation::SymbolsBatch, Some(&json!({"items": []})), Some(&json!([1]))).is_err());
    }

    #[test]
    fn test_unknown_params_rejected() {
        let err = normalize_params(Operation::SymbolsInvoke, Some(&json!({"sybmol": "x"})), None).unwrap_err();
        assert!(err.to_string().contains("sybmol"));
        assert!(normalize_params(Operation::SymbolsInvoke, Some(&json!("x")), None).is_err());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("include_kind_counts"), "includeKindCounts");
        assert_eq!(camel_case("allowWrite"), "allowWrite");
        assert_eq!(camel_case("_private"), "private");
    }
}
