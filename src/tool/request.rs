//! Wire types of the `discord_manage` tool.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capabilities::{BehaviorClass, SortOrder, SymbolFilter, SymbolKind};
use crate::error::{GatewayError, GatewayResult};

/// One tool call as sent by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToolRequest {
    /// `bot` or `user`
    pub mode: String,
    #[serde(default, alias = "identity_id")]
    pub identity_id: Option<String>,
    /// `read` or `write`; derived from the operation when absent
    #[serde(default)]
    pub method: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl ToolRequest {
    pub fn from_value(value: Value) -> GatewayResult<Self> {
        serde_json::from_value(value).map_err(|e| GatewayError::Validation(format!("invalid tool input: {}", e)))
    }
}

/// Result envelope returned for every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub ok: bool,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compat_translated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_from_operation: Option<String>,
}

impl ToolResponse {
    /// Error code, for failed calls.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref()?.get("code")?.as_str()
    }
}

/// Named params of `symbols.discover`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    kinds: Option<Value>,
    #[serde(default)]
    packages: Option<Value>,
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    include_kind_counts: bool,
    #[serde(default)]
    behavior: Option<Value>,
    #[serde(default)]
    invokable_only: bool,
}

/// A single string or a list of strings.
fn string_list(value: Option<Value>, field: &str) -> GatewayResult<Vec<String>> {
    let invalid = || GatewayError::Validation(format!("{} must be a string or a list of strings", field));
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(invalid()),
            })
            .collect(),
        Some(_) => Err(invalid()),
    }
}

fn parse_all<T>(raw: Vec<String>, field: &str, parse: fn(&str) -> Option<T>) -> GatewayResult<Vec<T>> {
    raw.iter()
        .map(|s| parse(s).ok_or_else(|| GatewayError::Validation(format!("unknown {} '{}'", field, s))))
        .collect()
}

/// Build a catalog filter from discovery params.
pub fn discover_filter(params: Map<String, Value>) -> GatewayResult<SymbolFilter> {
    let p: DiscoverParams = serde_json::from_value(Value::Object(params))
        .map_err(|e| GatewayError::Validation(format!("invalid discovery params: {}", e)))?;
    let sort = match p.sort.as_deref() {
        None => SortOrder::default(),
        Some(raw) => SortOrder::parse(raw)
            .ok_or_else(|| GatewayError::Validation(format!("unknown sort '{}'; use name_asc or name_desc", raw)))?,
    };
    Ok(SymbolFilter {
        query: p.query.filter(|q| !q.trim().is_empty()),
        kinds: parse_all(string_list(p.kinds, "kinds")?, "kind", SymbolKind::parse)?,
        packages: string_list(p.packages, "packages")?,
        invokable_only: p.invokable_only,
        behavior: parse_all(string_list(p.behavior, "behavior")?, "behavior class", BehaviorClass::parse)?,
        page: p.page.unwrap_or(1),
        page_size: p.page_size,
        sort,
        include_kind_counts: p.include_kind_counts,
    })
}
