//! REST route handlers.
//!
//! A route path holds placeholders expanded per call:
//! `{target}` is the bound target's id, `{guild}`, `{channel}`, ... are
//! context ids, `{argN}` is positional argument N. Every expansion is
//! percent-encoded as a single path segment.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{arg_str, opt_arg, HandlerCall, HandlerError, SymbolHandler};
use crate::connection::{HttpMethod, RouteCall};
use crate::context::TargetKind;
use crate::invocation::value::LiveValue;

/// Inputs available to computed bodies.
pub struct BodyScope<'a> {
    pub args: &'a [Value],
    pub target_id: Option<&'a str>,
}

/// Builds a request body from the call.
pub type ComputeBody = fn(&BodyScope<'_>) -> Result<Value, HandlerError>;

/// Where the request body comes from.
#[derive(Debug, Clone, Copy)]
pub enum BodySpec {
    None,
    /// Positional argument N, as given
    Arg(usize),
    /// An object assembled from `(field, arg index)` pairs
    Fields(&'static [(&'static str, usize)]),
    Computed(ComputeBody),
}

/// How the response is turned into a live value.
#[derive(Debug, Clone, Copy)]
pub enum Returns {
    Entity(&'static str),
    /// A keyed collection of `item` entities; `key` is a dotted path
    Collection { item: &'static str, key: &'static str },
    Json,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct RouteHandler {
    method: HttpMethod,
    path: &'static str,
    body: BodySpec,
    query: Option<usize>,
    reason: Option<usize>,
    returns: Returns,
}

impl RouteHandler {
    pub fn new(method: HttpMethod, path: &'static str) -> Self {
        Self {
            method,
            path,
            body: BodySpec::None,
            query: None,
            reason: None,
            returns: Returns::Json,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: &'static str) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: &'static str) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: &'static str) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: &'static str) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn body_arg(mut self, index: usize) -> Self {
        self.body = BodySpec::Arg(index);
        self
    }

    pub fn fields(mut self, fields: &'static [(&'static str, usize)]) -> Self {
        self.body = BodySpec::Fields(fields);
        self
    }

    pub fn computed(mut self, compute: ComputeBody) -> Self {
        self.body = BodySpec::Computed(compute);
        self
    }

    pub fn query_arg(mut self, index: usize) -> Self {
        self.query = Some(index);
        self
    }

    /// Send argument N as the audit log reason.
    pub fn reason_arg(mut self, index: usize) -> Self {
        self.reason = Some(index);
        self
    }

    pub fn entity(mut self, type_name: &'static str) -> Self {
        self.returns = Returns::Entity(type_name);
        self
    }

    pub fn collection(mut self, item: &'static str, key: &'static str) -> Self {
        self.returns = Returns::Collection { item, key };
        self
    }

    pub fn nothing(mut self) -> Self {
        self.returns = Returns::Nothing;
        self
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    /// Placeholder names in the path, in order.
    fn placeholders(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            names.push(&rest[start + 1..start + len]);
            rest = &rest[start + len + 1..];
        }
        names
    }

    fn expand_placeholder(&self, name: &str, call: &HandlerCall<'_>) -> Result<String, HandlerError> {
        if name == "target" {
            return call
                .target
                .map(|t| t.id.clone())
                .ok_or_else(|| HandlerError::MissingContext("target".to_string()));
        }
        if let Some(index) = name.strip_prefix("arg").and_then(|i| i.parse::<usize>().ok()) {
            return arg_str(call.args, index, name);
        }
        let kind = TargetKind::parse(name)
            .ok_or_else(|| HandlerError::Failed(format!("route placeholder '{{{}}}' is not a target kind", name)))?;
        call.ids
            .get(&kind)
            .cloned()
            .ok_or_else(|| HandlerError::MissingContext(kind.to_string()))
    }

    fn expand_path(&self, call: &HandlerCall<'_>) -> Result<String, HandlerError> {
        let mut path = String::with_capacity(self.path.len() + 32);
        let mut rest = self.path;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            path.push_str(&rest[..start]);
            let value = self.expand_placeholder(&rest[start + 1..start + len], call)?;
            path.push_str(&urlencoding::encode(&value));
            rest = &rest[start + len + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }

    fn build_body(&self, call: &HandlerCall<'_>) -> Result<Option<Value>, HandlerError> {
        match self.body {
            BodySpec::None => Ok(None),
            BodySpec::Arg(index) => Ok(opt_arg(call.args, index).cloned()),
            BodySpec::Fields(fields) => {
                let mut body = Map::new();
                for (field, index) in fields {
                    if let Some(value) = opt_arg(call.args, *index) {
                        body.insert(field.to_string(), value.clone());
                    }
                }
                Ok(Some(Value::Object(body)))
            }
            BodySpec::Computed(compute) => {
                let scope = BodyScope {
                    args: call.args,
                    target_id: call.target.map(|t| t.id.as_str()),
                };
                compute(&scope).map(Some)
            }
        }
    }

    fn build_query(&self, call: &HandlerCall<'_>) -> Result<Vec<(String, String)>, HandlerError> {
        let Some(index) = self.query else {
            return Ok(Vec::new());
        };
        match opt_arg(call.args, index) {
            None => Ok(Vec::new()),
            Some(Value::Object(map)) => Ok(map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| {
                    let rendered = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect()),
            Some(other) => Err(HandlerError::InvalidArgument {
                index,
                message: format!("query options must be an object, got {}", other),
            }),
        }
    }

    fn build_reason(&self, call: &HandlerCall<'_>) -> Result<Option<String>, HandlerError> {
        let Some(index) = self.reason else {
            return Ok(None);
        };
        match opt_arg(call.args, index) {
            None => Ok(None),
            Some(Value::String(reason)) => Ok(Some(reason.clone())),
            // option objects may carry the reason
            Some(Value::Object(options)) => Ok(options
                .get("reason")
                .and_then(Value::as_str)
                .map(String::from)),
            Some(other) => Err(HandlerError::InvalidArgument {
                index,
                message: format!("reason must be a string, got {}", other),
            }),
        }
    }

    /// Expand the route for a call.
    pub fn build(&self, call: &HandlerCall<'_>) -> Result<RouteCall, HandlerError> {
        Ok(RouteCall {
            method: self.method,
            path: self.expand_path(call)?,
            body: self.build_body(call)?,
            query: self.build_query(call)?,
            reason: self.build_reason(call)?,
        })
    }

    fn to_live(&self, response: Value) -> LiveValue {
        match self.returns {
            Returns::Nothing => LiveValue::Null,
            Returns::Json => LiveValue::from_json(response),
            Returns::Entity(type_name) => LiveValue::entity(type_name, response),
            Returns::Collection { item, key } => match response {
                Value::Array(items) => LiveValue::collection("Collection", item, key, items),
                other => LiveValue::entity(item, other),
            },
        }
    }
}

fn returns_label(returns: Returns) -> Value {
    match returns {
        Returns::Entity(t) => json!(t),
        Returns::Collection { item, .. } => json!(format!("Collection<{}>", item)),
        Returns::Json => json!("json"),
        Returns::Nothing => Value::Null,
    }
}

#[async_trait]
impl SymbolHandler for RouteHandler {
    fn describe(&self) -> Value {
        json!({
            "handler": "route",
            "method": self.method,
            "path": self.path,
            "returns": returns_label(self.returns),
        })
    }

    fn context_kinds(&self) -> Vec<TargetKind> {
        self.placeholders()
            .into_iter()
            .filter_map(TargetKind::parse)
            .collect()
    }

    fn plan(&self, call: &HandlerCall<'_>) -> Value {
        let mut plan = self.describe();
        match self.build(call) {
            Ok(route) => plan["request"] = json!(route),
            Err(e) => plan["unresolved"] = json!(e.to_string()),
        }
        plan
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn call(&self, call: HandlerCall<'_>) -> Result<LiveValue, HandlerError> {
        let route = self.build(&call)?;
        let response = call.connection.request(route).await?;
        Ok(self.to_live(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnection;
    use crate::context::{ResolutionSource, ResolvedTarget};
    use crate::identity::{Credential, Identity, IdentityMode};
    use std::collections::BTreeMap;

    fn target(kind: TargetKind, id: &str) -> ResolvedTarget {
        ResolvedTarget {
            kind,
            id: id.to_string(),
            handle: json!({"id": id}),
            source: ResolutionSource::Cache,
        }
    }

    #[test]
    fn test_placeholders_and_context_kinds() {
        let route = RouteHandler::put("/guilds/{guild}/members/{target}/roles/{arg0}");
        assert_eq!(route.placeholders(), vec!["guild", "target", "arg0"]);
        assert_eq!(route.context_kinds(), vec![TargetKind::Guild]);
    }

    #[test]
    fn test_build_expands_and_encodes() {
        let conn = InMemoryConnection::new();
        let mut ids = BTreeMap::new();
        ids.insert(TargetKind::Channel, "10".to_string());
        let message = target(TargetKind::Message, "99");
        let args = vec![json!("🔥"), json!("cleanup")];
        let call = HandlerCall {
            symbol: "Message#react",
            target: Some(&message),
            target_data: None,
            args: &args,
            ids: &ids,
            connection: &conn,
        };

        let route = RouteHandler::put("/channels/{channel}/messages/{target}/reactions/{arg0}/@me")
            .reason_arg(1)
            .nothing()
            .build(&call)
            .unwrap();
        assert_eq!(route.path, "/channels/10/messages/99/reactions/%F0%9F%94%A5/@me");
        assert_eq!(route.reason.as_deref(), Some("cleanup"));
        assert!(route.body.is_none());
    }

    #[test]
    fn test_fields_body_skips_missing_args() {
        let conn = InMemoryConnection::new();
        let ids = BTreeMap::new();
        let channel = target(TargetKind::Channel, "1");
        let args = vec![json!("new-name")];
        let call = HandlerCall {
            symbol: "GuildChannel#setName",
            target: Some(&channel),
            target_data: None,
            args: &args,
            ids: &ids,
            connection: &conn,
        };
        let route = RouteHandler::patch("/channels/{target}")
            .fields(&[("name", 0), ("topic", 1)])
            .build(&call)
            .unwrap();
        assert_eq!(route.body, Some(json!({"name": "new-name"})));
    }

    #[test]
    fn test_missing_context_id() {
        let conn = InMemoryConnection::new();
        let ids = BTreeMap::new();
        let call = HandlerCall {
            symbol: "RoleManager#fetch",
            target: None,
            target_data: None,
            args: &[],
            ids: &ids,
            connection: &conn,
        };
        let err = RouteHandler::get("/guilds/{guild}/roles").build(&call).unwrap_err();
        assert!(matches!(err, HandlerError::MissingContext(ref k) if k == "guild"));
    }

    #[tokio::test]
    async fn test_collection_response() {
        let conn = InMemoryConnection::new().respond(
            "GET /guilds/1/roles",
            json!([{"id": "1", "name": "@everyone"}, {"id": "2", "name": "mod"}]),
        );
        conn.bind_identity(&Identity::new("b", IdentityMode::Bot, Credential::new("t")))
            .await
            .unwrap();
        let mut ids = BTreeMap::new();
        ids.insert(TargetKind::Guild, "1".to_string());
        let call = HandlerCall {
            symbol: "RoleManager#fetch",
            target: None,
            target_data: None,
            args: &[],
            ids: &ids,
            connection: &conn,
        };

        let value = RouteHandler::get("/guilds/{guild}/roles")
            .collection("Role", "id")
            .call(call)
            .await
            .unwrap();
        let LiveValue::Map { entries, .. } = value else {
            panic!("expected a collection");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].0, "2");
    }
}
