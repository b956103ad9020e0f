//! Invocation engine: one symbol call, dry-run or live.
//!
//! ```text
//!   lookup ─► target form / invokability ─► policy ─► $ref args
//!          ─► context needs ─► resolve (cache, then fetch) ─► token
//!                                                   │
//!                     dry-run: report ◄─────────────┤
//!                     live: gate ─► handler ─► serialize
//! ```
//!
//! Dry-run and live share the same planning pass, so a live call is always
//! preceded by an inline preflight of exactly the parameters it executes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::handlers::{HandlerCall, HandlerError};
use super::policy::{PolicyDecision, PolicyMode, WritePolicy};
use super::preflight::{compute_token, verify_token, PreflightParams};
use super::serialize::serialize_value;
use super::target::TargetForm;
use crate::capabilities::{Binding, CapabilityCatalog, CapabilitySymbol, RuntimeEntry, SymbolKind, SymbolOrigin};
use crate::config::{GatewayConfig, SerializationConfig};
use crate::connection::DiscordConnection;
use crate::context::{
    resolve_refs, ContextResolver, InvocationContext, Need, RequirementOrigin, ResolvedContext, TargetKind,
};
use crate::error::{GatewayError, GatewayResult};

/// Explicit call target.
///
/// A bare string is shorthand for `{ "id": ... }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetSpec {
    /// Target kind; must agree with the symbol's binding when given
    #[serde(default)]
    pub kind: Option<String>,
    /// Id of the bound entity, overriding the context
    #[serde(default)]
    pub id: Option<String>,
    /// Local state for builders and containers
    #[serde(default)]
    pub data: Option<Value>,
}

impl TargetSpec {
    pub fn from_value(value: &Value) -> GatewayResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(id) => Ok(Self {
                id: Some(id.clone()),
                ..Self::default()
            }),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map_err(|e| GatewayError::Validation(format!("invalid target: {}", e))),
            other => Err(GatewayError::Validation(format!(
                "target must be an object or an id string, got {}",
                other
            ))),
        }
    }
}

/// Parameters of `symbols.preflight` and `symbols.invoke`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub operation_key: Option<String>,
    /// Kept raw: the preflight token covers it verbatim
    #[serde(default)]
    pub target: Option<Value>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub allow_write: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub preflight_token: Option<String>,
    #[serde(default)]
    pub policy_mode: Option<PolicyMode>,
    #[serde(skip)]
    pub context: InvocationContext,
}

impl InvokeRequest {
    pub fn from_params(params: Map<String, Value>, context: InvocationContext) -> GatewayResult<Self> {
        let mut request: Self = serde_json::from_value(Value::Object(params))
            .map_err(|e| GatewayError::Validation(format!("invalid invocation params: {}", e)))?;
        request.context = context;
        Ok(request)
    }
}

/// Outcome of a dry-run.
#[derive(Debug, Clone)]
pub struct Preflight {
    /// Policy allows the call
    pub allowed: bool,
    /// Allowed and every context requirement resolved
    pub callable: bool,
    pub report: Value,
}

/// Everything decided before a handler runs.
struct Plan<'a> {
    symbol: &'a CapabilitySymbol,
    entry: &'a RuntimeEntry,
    form: TargetForm,
    decision: PolicyDecision,
    args: Vec<Value>,
    target_kind: Option<TargetKind>,
    target_data: Option<Value>,
    resolved: ResolvedContext,
    expected_token: String,
}

impl Plan<'_> {
    fn handler_call<'c>(&'c self, connection: &'c dyn DiscordConnection) -> HandlerCall<'c> {
        HandlerCall {
            symbol: &self.symbol.name,
            target: self.target_kind.and_then(|kind| self.resolved.target(kind)),
            target_data: self.target_data.as_ref(),
            args: &self.args,
            ids: &self.resolved.ids,
            connection,
        }
    }
}

pub struct InvocationEngine {
    catalog: Arc<CapabilityCatalog>,
    policy: WritePolicy,
    resolver: ContextResolver,
    limits: SerializationConfig,
    require_preflight_token: bool,
}

impl InvocationEngine {
    pub fn new(catalog: Arc<CapabilityCatalog>, config: &GatewayConfig) -> GatewayResult<Self> {
        let policy = WritePolicy::from_config(&config.policy)
            .map_err(|e| GatewayError::Validation(format!("invalid strict allow-list pattern: {}", e)))?;
        Ok(Self {
            catalog,
            policy,
            resolver: ContextResolver::new(config.context.default_guild_id.clone()),
            limits: config.serialization,
            require_preflight_token: config.policy.require_preflight_token,
        })
    }

    pub fn catalog(&self) -> &CapabilityCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &WritePolicy {
        &self.policy
    }

    /// Look up the symbol a request names.
    pub fn lookup(&self, request: &InvokeRequest) -> GatewayResult<&CapabilitySymbol> {
        match (&request.operation_key, &request.symbol) {
            (Some(key), symbol) => {
                let found = self.catalog.lookup_operation_key(key)?;
                if let Some(name) = symbol {
                    if name.trim() != found.name {
                        return Err(GatewayError::Validation(format!(
                            "operationKey '{}' names '{}', not '{}'",
                            key, found.name, name
                        )));
                    }
                }
                Ok(found)
            }
            (None, Some(name)) => self.catalog.lookup(name, request.package.as_deref()),
            (None, None) => Err(GatewayError::Validation(
                "symbol or operationKey is required".to_string(),
            )),
        }
    }

    fn runtime_entry<'a>(&'a self, symbol: &'a CapabilitySymbol, form: &TargetForm) -> GatewayResult<&'a RuntimeEntry> {
        let not_invokable = |reason: String| GatewayError::NotInvokable {
            symbol: symbol.name.clone(),
            reason,
        };
        if symbol.kind == SymbolKind::Class {
            return Err(not_invokable(
                "classes cannot be invoked directly; call one of their methods".to_string(),
            ));
        }
        if symbol.origin == SymbolOrigin::DeclaredOnly {
            return Err(not_invokable(format!(
                "package '{}' is declared only and has no runtime handlers",
                symbol.package
            )));
        }
        if symbol.kind != SymbolKind::Function {
            return Err(not_invokable(format!("{} declarations are not callable", symbol.kind)));
        }
        self.catalog
            .runtime_entry(&symbol.id())
            .ok_or_else(|| not_invokable(format!("no handler for {} form", form.label())))
    }

    async fn plan<'a>(
        &'a self,
        request: &InvokeRequest,
        connection: &dyn DiscordConnection,
    ) -> GatewayResult<Plan<'a>> {
        let symbol = self.lookup(request)?;
        let form = TargetForm::parse(&symbol.name);
        let entry = self.runtime_entry(symbol, &form)?;
        let decision = self
            .policy
            .evaluate(symbol, request.allow_write, request.policy_mode);

        let spec = match &request.target {
            Some(raw) => TargetSpec::from_value(raw)?,
            None => TargetSpec::default(),
        };
        let mut context = request.context.clone();
        let mut target_kind = None;
        let mut target_data = None;
        match entry.binding {
            Binding::Live(kind) => {
                if let Some(raw_kind) = &spec.kind {
                    let requested = TargetKind::parse(raw_kind).ok_or_else(|| {
                        GatewayError::Validation(format!("unknown target kind '{}'", raw_kind))
                    })?;
                    if requested != kind {
                        return Err(GatewayError::Validation(format!(
                            "'{}' binds a {} target, not a {}",
                            symbol.name, kind, requested
                        )));
                    }
                }
                if let Some(id) = &spec.id {
                    context.set(kind, id.clone());
                }
                target_kind = Some(kind);
            }
            Binding::Local => target_data = spec.data.clone(),
            Binding::Client | Binding::Static => {
                if spec.id.is_some() || spec.data.is_some() {
                    log::debug!("Ignoring target for {} ({})", symbol.name, entry.binding.label());
                }
            }
        }

        let resolved_args = resolve_refs(&request.args, &context, &self.resolver)?;

        let mut needs: Vec<Need> = target_kind.map(Need::target).into_iter().collect();
        needs.extend(
            entry
                .handler
                .context_kinds()
                .into_iter()
                .map(|kind| Need::id_only(kind, RequirementOrigin::Route)),
        );
        needs.extend(
            resolved_args
                .referenced
                .iter()
                .map(|kind| Need::id_only(*kind, RequirementOrigin::Reference)),
        );
        let resolved = self
            .resolver
            .resolve(&context, &needs, connection, false)
            .await?;

        let expected_token = compute_token(&PreflightParams {
            symbol: &symbol.id(),
            target: request.target.as_ref(),
            context: &request.context,
            args: &request.args,
            allow_write: request.allow_write,
            policy_mode: decision.mode,
        });

        Ok(Plan {
            symbol,
            entry,
            form,
            decision,
            args: resolved_args.args,
            target_kind,
            target_data,
            resolved,
            expected_token,
        })
    }

    fn report(&self, plan: &Plan<'_>, connection: &dyn DiscordConnection) -> Preflight {
        let allowed = plan.decision.is_allowed();
        let callable = allowed && plan.resolved.is_satisfied();
        let resolved_target = plan
            .target_kind
            .and_then(|kind| plan.resolved.target(kind))
            .map_or(Value::Null, |t| json!(t));
        let would_invoke = json!({
            "symbol": plan.entry.canonical,
            "form": plan.form.label(),
            "binding": plan.entry.binding.label(),
            "handler": plan.entry.handler.plan(&plan.handler_call(connection)),
        });

        let token = if allowed {
            Value::String(plan.expected_token.clone())
        } else {
            Value::Null
        };
        let report = json!({
            "dryRun": true,
            "symbol": plan.symbol,
            "callable": callable,
            "behaviorClass": plan.symbol.behavior_class,
            "policyDecision": plan.decision,
            "resolvedTarget": resolved_target,
            "contextRequirements": plan.resolved.requirements_json(),
            "wouldInvoke": would_invoke,
            "args": plan.args,
            "preflightToken": token,
        });
        Preflight {
            allowed,
            callable,
            report,
        }
    }

    /// Dry-run: plan the call and report, never executing the handler.
    ///
    /// Unknown symbols and bad `$ref`s are errors; unresolved targets and
    /// policy blocks are reported.
    pub async fn preflight(
        &self,
        request: &InvokeRequest,
        connection: &dyn DiscordConnection,
    ) -> GatewayResult<Preflight> {
        let plan = self.plan(request, connection).await?;
        Ok(self.report(&plan, connection))
    }

    /// Dry-run plus the refusal the live call would hit.
    ///
    /// For a live request the second element is the error `invoke` would
    /// raise before running the handler: a stale token, a missing one, a
    /// policy block or an unresolved target. Dry-run requests never refuse.
    pub async fn vet(
        &self,
        request: &InvokeRequest,
        connection: &dyn DiscordConnection,
    ) -> GatewayResult<(Preflight, Option<GatewayError>)> {
        let plan = self.plan(request, connection).await?;
        let refusal = if request.dry_run {
            None
        } else {
            self.gate(&plan, request).err()
        };
        Ok((self.report(&plan, connection), refusal))
    }

    /// Checks a live call must pass. Returns how the preflight was satisfied.
    fn gate(&self, plan: &Plan<'_>, request: &InvokeRequest) -> GatewayResult<&'static str> {
        let symbol = plan.symbol;
        let gate = match request.preflight_token.as_deref() {
            Some(presented) => {
                if !verify_token(&plan.expected_token, presented) {
                    return Err(GatewayError::PreflightMismatch {
                        symbol: symbol.name.clone(),
                    });
                }
                "token"
            }
            None if plan.decision.write_guarded && self.require_preflight_token => {
                return Err(GatewayError::PreflightRequired {
                    symbol: symbol.name.clone(),
                })
            }
            None => "inline",
        };
        if !plan.decision.is_allowed() {
            return Err(GatewayError::PolicyBlocked {
                symbol: symbol.name.clone(),
                reasons: plan.decision.reasons.clone(),
            });
        }
        if let Some(err) = plan.resolved.first_failure() {
            return Err(err);
        }
        Ok(gate)
    }

    /// `symbols.invoke`: a dry-run report when `dryRun`, the serialized
    /// result otherwise.
    pub async fn invoke(&self, request: &InvokeRequest, connection: &dyn DiscordConnection) -> GatewayResult<Value> {
        if request.dry_run {
            return Ok(self.preflight(request, connection).await?.report);
        }

        let plan = self.plan(request, connection).await?;
        let symbol = plan.symbol;
        let gate = self.gate(&plan, request)?;

        log::debug!(
            "Invoking {} ({}, preflight: {})",
            symbol.name,
            symbol.behavior_class,
            gate
        );
        let value = plan
            .entry
            .handler
            .call(plan.handler_call(connection))
            .await
            .map_err(|e| handler_error(&symbol.name, e))?;

        Ok(json!({
            "symbol": symbol.name,
            "package": symbol.package,
            "behaviorClass": symbol.behavior_class,
            "preflight": gate,
            "result": serialize_value(&value, &self.limits),
        }))
    }
}

fn handler_error(symbol: &str, err: HandlerError) -> GatewayError {
    match err {
        HandlerError::MissingArgument { .. }
        | HandlerError::InvalidArgument { .. }
        | HandlerError::InvalidTarget(_) => GatewayError::Validation(format!("{}: {}", symbol, err)),
        HandlerError::MissingContext(kind) => GatewayError::UnresolvedTarget {
            reason: format!("no {} id available for {}", kind, symbol),
            kind,
            id: None,
        },
        other => GatewayError::InvocationFailed {
            symbol: symbol.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityCatalog;
    use crate::config::CatalogConfig;
    use crate::connection::InMemoryConnection;
    use crate::identity::{Credential, Identity, IdentityMode};

    fn engine_with(config: GatewayConfig) -> InvocationEngine {
        let catalog = CapabilityCatalog::build(&CatalogConfig::default()).unwrap();
        InvocationEngine::new(Arc::new(catalog), &config).unwrap()
    }

    fn engine(mode: PolicyMode) -> InvocationEngine {
        let mut config = GatewayConfig::default();
        config.policy.mode = mode;
        engine_with(config)
    }

    async fn bound(conn: InMemoryConnection) -> InMemoryConnection {
        conn.bind_identity(&Identity::new("bot", IdentityMode::Bot, Credential::new("t")))
            .await
            .unwrap();
        conn
    }

    fn request(value: Value, context: Value) -> InvokeRequest {
        let Value::Object(params) = value else { panic!("params must be an object") };
        InvokeRequest::from_params(params, InvocationContext::from_value(Some(&context)).unwrap()).unwrap()
    }

    fn channel_conn() -> InMemoryConnection {
        InMemoryConnection::new().with_cached(TargetKind::Channel, "10", json!({"id": "10", "type": 0}))
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_calling() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(channel_conn()).await;
        let req = request(
            json!({"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true}),
            json!({"channelId": "10"}),
        );
        let pre = engine.preflight(&req, &conn).await.unwrap();
        assert!(pre.allowed && pre.callable);
        assert_eq!(pre.report["dryRun"], true);
        assert_eq!(pre.report["resolvedTarget"]["id"], "10");
        assert_eq!(pre.report["wouldInvoke"]["symbol"], "TextBasedChannel#send");
        assert_eq!(
            pre.report["wouldInvoke"]["handler"]["request"]["path"],
            "/channels/10/messages"
        );
        assert!(pre.report["preflightToken"].as_str().unwrap().starts_with("pf1:"));
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn test_preflight_then_live_with_token() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(channel_conn().respond(
            "POST /channels/10/messages",
            json!({"id": "77", "content": "hi", "channel_id": "10"}),
        ))
        .await;
        let params = json!({"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true});
        let ctx = json!({"channelId": "10"});

        let pre = engine.preflight(&request(params.clone(), ctx.clone()), &conn).await.unwrap();
        let token = pre.report["preflightToken"].as_str().unwrap().to_string();

        let mut live = params.clone();
        live["preflightToken"] = json!(token);
        let out = engine.invoke(&request(live, ctx.clone()), &conn).await.unwrap();
        assert_eq!(out["preflight"], "token");
        assert_eq!(out["result"]["id"], "77");
        assert_eq!(conn.requests()[0].body, Some(json!({"content": "hi"})));

        // same token, different args
        let tampered = json!({
            "symbol": "TextChannel#send", "args": ["bye"], "allowWrite": true, "preflightToken": token
        });
        let err = engine.invoke(&request(tampered, ctx), &conn).await.unwrap_err();
        assert!(matches!(err, GatewayError::PreflightMismatch { .. }));
        assert_eq!(conn.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_write_blocked_without_allow_write() {
        for mode in [PolicyMode::Permissive, PolicyMode::Strict] {
            let engine = engine(mode);
            let conn = bound(channel_conn()).await;
            let req = request(json!({"symbol": "TextChannel#send", "args": ["hi"]}), json!({"channelId": "10"}));
            let err = engine.invoke(&req, &conn).await.unwrap_err();
            assert_eq!(err.code(), "policy_blocked");
            assert!(conn.requests().is_empty());

            let pre = engine.preflight(&req, &conn).await.unwrap();
            assert!(!pre.allowed);
            assert!(pre.report["preflightToken"].is_null());
        }
    }

    #[tokio::test]
    async fn test_strict_mode_allowlist() {
        let engine = engine(PolicyMode::Strict);
        let conn = bound(channel_conn()).await;
        let send = request(
            json!({"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true}),
            json!({"channelId": "10"}),
        );
        let err = engine.invoke(&send, &conn).await.unwrap_err();
        assert!(err.reasons().unwrap()[0].contains("allow-list"));

        let embed = request(
            json!({"symbol": "EmbedBuilder#setTitle", "args": ["Hello"], "allowWrite": true}),
            json!({}),
        );
        let out = engine.invoke(&embed, &conn).await.unwrap();
        assert_eq!(out["result"], json!({"title": "Hello"}));
    }

    #[tokio::test]
    async fn test_caller_cannot_loosen_mode() {
        let engine = engine(PolicyMode::Strict);
        let conn = bound(channel_conn()).await;
        let req = request(
            json!({"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true, "policyMode": "permissive"}),
            json!({"channelId": "10"}),
        );
        let pre = engine.preflight(&req, &conn).await.unwrap();
        assert_eq!(pre.report["policyDecision"]["mode"], "strict");
        assert!(!pre.allowed);
    }

    #[tokio::test]
    async fn test_dangerous_needs_override() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(channel_conn()).await;
        let req = request(
            json!({"symbol": "TextChannel#bulkDelete", "args": [["1", "2"]], "allowWrite": true}),
            json!({"channelId": "10"}),
        );
        let err = engine.invoke(&req, &conn).await.unwrap_err();
        assert!(err.reasons().unwrap().iter().any(|r| r.contains("dangerous")));

        let mut config = GatewayConfig::default();
        config.policy.mode = PolicyMode::Permissive;
        config.policy.allow_dangerous = true;
        let permissive = engine_with(config);
        permissive.invoke(&req, &conn).await.unwrap();
        assert_eq!(conn.requests()[0].path, "/channels/10/messages/bulk-delete");
    }

    #[tokio::test]
    async fn test_require_preflight_token() {
        let mut config = GatewayConfig::default();
        config.policy.mode = PolicyMode::Permissive;
        config.policy.require_preflight_token = true;
        let engine = engine_with(config);
        let conn = bound(channel_conn()).await;
        let req = request(
            json!({"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true}),
            json!({"channelId": "10"}),
        );
        let err = engine.invoke(&req, &conn).await.unwrap_err();
        assert!(matches!(err, GatewayError::PreflightRequired { .. }));

        // reads are never gated
        let read = request(json!({"symbol": "bold", "args": ["x"]}), json!({}));
        assert_eq!(engine.invoke(&read, &conn).await.unwrap()["result"], "**x**");
    }

    #[tokio::test]
    async fn test_unresolved_target_soft_in_dry_run() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(InMemoryConnection::new()).await;
        let req = request(json!({"symbol": "Message#pin", "allowWrite": true}), json!({"messageId": "5"}));

        let pre = engine.preflight(&req, &conn).await.unwrap();
        assert!(pre.allowed);
        assert!(!pre.callable);
        let requirements = pre.report["contextRequirements"].as_array().unwrap();
        assert!(requirements.iter().any(|r| r["kind"] == "channel" && r["provided"] == false));

        let err = engine.invoke(&req, &conn).await.unwrap_err();
        assert_eq!(err.code(), "unresolved_target");
    }

    #[tokio::test]
    async fn test_target_id_and_refs() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(
            InMemoryConnection::new()
                .with_remote(TargetKind::Guild, "1", json!({"id": "1", "name": "g"}))
                .respond("PUT /guilds/1/members/9/roles/3", Value::Null),
        )
        .await;
        let req = request(
            json!({
                "symbol": "GuildMemberManager#addRole",
                "target": {"kind": "guild", "id": "1"},
                "args": [{"$ref": "user"}, {"$ref": "role"}, "promotion"],
                "allowWrite": true
            }),
            json!({"userId": "9", "roleId": "3"}),
        );
        let out = engine.invoke(&req, &conn).await.unwrap();
        assert!(out["result"].is_null());
        let sent = &conn.requests()[0];
        assert_eq!(sent.path, "/guilds/1/members/9/roles/3");
        assert_eq!(sent.reason.as_deref(), Some("promotion"));
        assert_eq!(conn.fetches(), vec![(TargetKind::Guild, "1".to_string())]);
    }

    #[tokio::test]
    async fn test_bad_ref_is_hard_error_in_dry_run() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(InMemoryConnection::new()).await;
        let req = request(json!({"symbol": "userMention", "args": [{"$ref": "user"}]}), json!({}));
        assert!(engine.preflight(&req, &conn).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_not_invokable_forms() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(InMemoryConnection::new()).await;
        for name in ["Guild", "ChannelType", "messageCreate"] {
            let req = request(json!({"symbol": name}), json!({}));
            let err = engine.preflight(&req, &conn).await.unwrap_err();
            assert_eq!(err.code(), "not_invokable", "{}", name);
        }
        let req = request(json!({"symbol": "Guild#explode"}), json!({}));
        assert_eq!(engine.preflight(&req, &conn).await.unwrap_err().code(), "unknown_symbol");
    }

    #[tokio::test]
    async fn test_handler_failures_are_wrapped() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(channel_conn().fail("POST /channels/10/typing", "Missing Access")).await;
        let req = request(
            json!({"operationKey": "discord::TextChannel#sendTyping", "allowWrite": true}),
            json!({"channelId": "10"}),
        );
        let err = engine.invoke(&req, &conn).await.unwrap_err();
        match err {
            GatewayError::InvocationFailed { symbol, message } => {
                assert_eq!(symbol, "TextChannel#sendTyping");
                assert!(message.contains("Missing Access"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let missing = request(json!({"symbol": "bold"}), json!({}));
        assert!(engine.invoke(&missing, &conn).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_target_kind_must_match_binding() {
        let engine = engine(PolicyMode::Permissive);
        let conn = bound(InMemoryConnection::new()).await;
        let req = request(
            json!({"symbol": "Guild#fetch", "target": {"kind": "channel", "id": "1"}}),
            json!({}),
        );
        assert!(engine.preflight(&req, &conn).await.unwrap_err().is_validation());
    }
}
