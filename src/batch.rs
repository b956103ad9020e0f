//! Batch executor for `symbols.batch`.
//!
//! Two strategies over an ordered list of invocations:
//!
//! - `best_effort`: every item runs independently on a bounded set of
//!   workers pulling indices from a shared cursor. Results come back in
//!   input order whatever the completion order.
//! - `all_or_none`: strictly left to right, stopping at the first failure.
//!   Indices after it are reported under `notAttempted`.
//!
//! With `haltOnPolicyBlock`, every item is dry-run first and a single
//! blocked item refuses the whole batch before anything executes.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::BatchConfig;
use crate::connection::DiscordConnection;
use crate::context::InvocationContext;
use crate::error::{GatewayError, GatewayResult};
use crate::invocation::{InvocationEngine, InvokeRequest, PolicyMode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    #[default]
    BestEffort,
    AllOrNone,
}

/// Parameters of `symbols.batch`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Raw items; each is validated when it runs so one bad item does not
    /// sink its siblings in `best_effort`
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub mode: BatchMode,
    /// Default for items without their own `dryRun`
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub halt_on_policy_block: bool,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub allow_write: bool,
    #[serde(default)]
    pub policy_mode: Option<PolicyMode>,
}

impl BatchRequest {
    pub fn from_params(params: Map<String, Value>) -> GatewayResult<Self> {
        serde_json::from_value(Value::Object(params))
            .map_err(|e| GatewayError::Validation(format!("invalid batch params: {}", e)))
    }
}

/// One entry of `items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BatchItem {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    package: Option<String>,
    #[serde(default)]
    operation_key: Option<String>,
    #[serde(default)]
    target: Option<Value>,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    allow_write: Option<bool>,
    #[serde(default)]
    dry_run: Option<bool>,
    #[serde(default)]
    preflight_token: Option<String>,
    #[serde(default)]
    policy_mode: Option<PolicyMode>,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ItemResult {
    fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/// Symbol label of a raw item, for reports.
fn item_label(raw: &Value) -> Option<String> {
    raw.get("symbol")
        .or_else(|| raw.get("operationKey"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub struct BatchExecutor<'a> {
    engine: &'a InvocationEngine,
    limits: BatchConfig,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(engine: &'a InvocationEngine, limits: BatchConfig) -> Self {
        Self { engine, limits }
    }

    /// Build the invocation for item `index`, applying batch defaults and
    /// merging the item context over the call context.
    fn prepare(
        &self,
        index: usize,
        raw: &Value,
        batch: &BatchRequest,
        call_context: &InvocationContext,
    ) -> GatewayResult<InvokeRequest> {
        let item: BatchItem = serde_json::from_value(raw.clone())
            .map_err(|e| GatewayError::Validation(format!("items[{}]: {}", index, e)))?;
        let context = InvocationContext::from_value(item.context.as_ref())?.merged_over(call_context);
        Ok(InvokeRequest {
            symbol: item.symbol,
            package: item.package,
            operation_key: item.operation_key,
            target: item.target,
            args: item.args,
            allow_write: item.allow_write.unwrap_or(batch.allow_write),
            dry_run: item.dry_run.unwrap_or(batch.dry_run),
            preflight_token: item.preflight_token,
            policy_mode: item.policy_mode.or(batch.policy_mode),
            context,
        })
    }

    async fn run_item(
        &self,
        index: usize,
        raw: &Value,
        batch: &BatchRequest,
        call_context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> ItemResult {
        let symbol = item_label(raw);
        let request = match self.prepare(index, raw, batch, call_context) {
            Ok(request) => request,
            Err(e) => {
                return ItemResult {
                    index,
                    status: ItemStatus::Error,
                    symbol,
                    dry_run: batch.dry_run,
                    output: None,
                    error: Some(e.to_json()),
                }
            }
        };
        let outcome = self.engine.invoke(&request, connection).await;
        if let Err(e) = &outcome {
            log::debug!("Batch item {} ({:?}) failed: {}", index, symbol, e);
        }
        let (status, output, error) = match outcome {
            Ok(output) => (ItemStatus::Success, Some(output), None),
            Err(e) => (ItemStatus::Error, None, Some(e.to_json())),
        };
        ItemResult {
            index,
            status,
            symbol,
            dry_run: request.dry_run,
            output,
            error,
        }
    }

    /// Vet every item before anything runs. `Some(report)` when at least
    /// one item is blocked or would be refused live.
    async fn policy_prepass(
        &self,
        batch: &BatchRequest,
        call_context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> Option<Vec<Value>> {
        let mut reports = Vec::with_capacity(batch.items.len());
        let mut blocked = 0;
        for (index, raw) in batch.items.iter().enumerate() {
            let symbol = item_label(raw);
            let outcome = match self.prepare(index, raw, batch, call_context) {
                Ok(request) => self.engine.vet(&request, connection).await,
                Err(e) => Err(e),
            };
            let entry = match outcome {
                Ok((pre, refusal)) => {
                    if !pre.allowed || refusal.is_some() {
                        blocked += 1;
                    }
                    let mut entry = json!({
                        "index": index,
                        "symbol": symbol,
                        "allowed": pre.allowed,
                        "callable": pre.callable,
                        "preflight": pre.report,
                    });
                    if let Some(e) = refusal {
                        entry["error"] = e.to_json();
                    }
                    entry
                }
                Err(e) => {
                    blocked += 1;
                    json!({
                        "index": index,
                        "symbol": symbol,
                        "allowed": false,
                        "error": e.to_json(),
                    })
                }
            };
            reports.push(entry);
        }
        if blocked == 0 {
            return None;
        }
        log::info!(
            "Refusing batch: {} of {} items blocked at preflight",
            blocked,
            batch.items.len()
        );
        Some(reports)
    }

    async fn best_effort(
        &self,
        batch: &BatchRequest,
        call_context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> Vec<ItemResult> {
        let total = batch.items.len();
        let workers = batch
            .max_concurrency
            .unwrap_or(self.limits.max_concurrency)
            .min(self.limits.max_concurrency)
            .min(total)
            .max(1);
        let cursor = AtomicUsize::new(0);
        let cursor = &cursor;

        let lanes = join_all((0..workers).map(move |_| async move {
            let mut done = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= total {
                    break;
                }
                done.push(
                    self.run_item(index, &batch.items[index], batch, call_context, connection)
                        .await,
                );
            }
            done
        }))
        .await;

        let mut results: Vec<ItemResult> = lanes.into_iter().flatten().collect();
        results.sort_by_key(|r| r.index);
        results
    }

    async fn all_or_none(
        &self,
        batch: &BatchRequest,
        call_context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> (Vec<ItemResult>, Vec<usize>) {
        let mut results = Vec::with_capacity(batch.items.len());
        for (index, raw) in batch.items.iter().enumerate() {
            let result = self.run_item(index, raw, batch, call_context, connection).await;
            let failed = !result.is_success();
            results.push(result);
            if failed {
                return (results, (index + 1..batch.items.len()).collect());
            }
        }
        (results, Vec::new())
    }

    pub async fn run(
        &self,
        batch: &BatchRequest,
        call_context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> GatewayResult<Value> {
        if batch.items.is_empty() {
            return Err(GatewayError::Validation("items must not be empty".to_string()));
        }
        if batch.items.len() > self.limits.max_items {
            return Err(GatewayError::Validation(format!(
                "batch has {} items; the limit is {}",
                batch.items.len(),
                self.limits.max_items
            )));
        }

        if batch.halt_on_policy_block {
            if let Some(reports) = self.policy_prepass(batch, call_context, connection).await {
                return Ok(json!({
                    "mode": batch.mode,
                    "dryRun": batch.dry_run,
                    "halted": true,
                    "reason": "policy_block",
                    "total": batch.items.len(),
                    "executed": 0,
                    "preflight": reports,
                    "results": [],
                }));
            }
        }

        let (results, not_attempted) = match batch.mode {
            BatchMode::BestEffort => (self.best_effort(batch, call_context, connection).await, Vec::new()),
            BatchMode::AllOrNone => self.all_or_none(batch, call_context, connection).await,
        };
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = results.len() - succeeded;

        let mut out = json!({
            "mode": batch.mode,
            "dryRun": batch.dry_run,
            "halted": false,
            "total": batch.items.len(),
            "executed": results.len(),
            "succeeded": succeeded,
            "failed": failed,
            "results": results,
        });
        if batch.mode == BatchMode::AllOrNone {
            out["notAttempted"] = json!(not_attempted);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityCatalog;
    use crate::config::{CatalogConfig, GatewayConfig};
    use crate::connection::InMemoryConnection;
    use crate::context::TargetKind;
    use crate::identity::{Credential, Identity, IdentityMode};
    use std::sync::Arc;

    fn engine() -> InvocationEngine {
        let catalog = CapabilityCatalog::build(&CatalogConfig::default()).unwrap();
        let mut config = GatewayConfig::default();
        config.policy.mode = PolicyMode::Permissive;
        InvocationEngine::new(Arc::new(catalog), &config).unwrap()
    }

    fn limits(max_concurrency: usize, max_items: usize) -> BatchConfig {
        BatchConfig {
            max_concurrency,
            max_items,
        }
    }

    async fn conn() -> InMemoryConnection {
        let conn = InMemoryConnection::new()
            .with_cached(TargetKind::Channel, "10", json!({"id": "10"}))
            .respond("POST /channels/10/messages", json!({"id": "1", "content": "ok"}))
            .fail("POST /channels/10/typing", "Missing Access");
        conn.bind_identity(&Identity::new("bot", IdentityMode::Bot, Credential::new("t")))
            .await
            .unwrap();
        conn
    }

    fn batch(value: Value) -> BatchRequest {
        let Value::Object(params) = value else { panic!("params must be an object") };
        BatchRequest::from_params(params).unwrap()
    }

    fn channel_ctx() -> InvocationContext {
        InvocationContext::from_value(Some(&json!({"channelId": "10"}))).unwrap()
    }

    #[tokio::test]
    async fn test_best_effort_keeps_order_and_isolates_failures() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "allowWrite": true,
            "maxConcurrency": 3,
            "items": [
                {"symbol": "bold", "args": ["a"]},
                {"symbol": "TextChannel#sendTyping"},
                {"symbol": "TextChannel#send", "args": ["hi"]},
                {"symbol": "Nope#nothing"},
                {"symbol": "italic", "args": ["b"]}
            ]
        }));
        let out = BatchExecutor::new(&engine, limits(4, 50))
            .run(&request, &channel_ctx(), &conn)
            .await
            .unwrap();

        let results = out["results"].as_array().unwrap();
        assert_eq!(results.len(), 5);
        let statuses: Vec<&str> = results.iter().map(|r| r["status"].as_str().unwrap()).collect();
        assert_eq!(statuses, vec!["success", "error", "success", "error", "success"]);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r["index"], i);
        }
        assert_eq!(results[1]["error"]["code"], "invocation_failed");
        assert_eq!(results[3]["error"]["code"], "unknown_symbol");
        assert_eq!(results[4]["output"]["result"], "_b_");
        assert_eq!(out["succeeded"], 3);
        assert_eq!(out["failed"], 2);
        assert!(out.get("notAttempted").is_none());
    }

    #[tokio::test]
    async fn test_all_or_none_stops_at_first_failure() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "mode": "all_or_none",
            "allowWrite": true,
            "items": [
                {"symbol": "TextChannel#send", "args": ["one"]},
                {"symbol": "TextChannel#sendTyping"},
                {"symbol": "TextChannel#send", "args": ["three"]},
                {"symbol": "bold", "args": ["x"]}
            ]
        }));
        let out = BatchExecutor::new(&engine, limits(4, 50))
            .run(&request, &channel_ctx(), &conn)
            .await
            .unwrap();
        assert_eq!(out["executed"], 2);
        assert_eq!(out["notAttempted"], json!([2, 3]));
        // the typing call failed, so only the first send went out
        let sent: Vec<String> = conn.requests().iter().map(|r| r.route_key()).collect();
        assert_eq!(sent, vec!["POST /channels/10/messages", "POST /channels/10/typing"]);
    }

    #[tokio::test]
    async fn test_halt_on_policy_block_executes_nothing() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "mode": "all_or_none",
            "haltOnPolicyBlock": true,
            "items": [
                {"symbol": "bold", "args": ["x"]},
                {"symbol": "TextChannel#send", "args": ["hi"], "allowWrite": true},
                {"symbol": "TextChannel#send", "args": ["no write flag"]}
            ]
        }));
        let out = BatchExecutor::new(&engine, limits(4, 50))
            .run(&request, &channel_ctx(), &conn)
            .await
            .unwrap();
        assert_eq!(out["halted"], true);
        assert_eq!(out["executed"], 0);
        let reports = out["preflight"].as_array().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0]["allowed"], true);
        assert_eq!(reports[1]["allowed"], true);
        assert_eq!(reports[2]["allowed"], false);
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn test_halt_on_policy_block_refuses_items_failing_the_live_gate() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "mode": "all_or_none",
            "haltOnPolicyBlock": true,
            "allowWrite": true,
            "items": [
                {"symbol": "TextChannel#send", "args": ["first"]},
                {"symbol": "TextChannel#send", "args": ["second"], "preflightToken": "pf1:stale"},
                {"symbol": "TextChannel#send", "args": ["third"], "context": {"channelId": "77"}}
            ]
        }));
        let out = BatchExecutor::new(&engine, limits(4, 50))
            .run(&request, &channel_ctx(), &conn)
            .await
            .unwrap();
        assert_eq!(out["halted"], true);
        assert_eq!(out["executed"], 0);
        let reports = out["preflight"].as_array().unwrap();
        assert!(reports[0].get("error").is_none());
        assert_eq!(reports[1]["allowed"], true);
        assert_eq!(reports[1]["error"]["code"], "preflight_mismatch");
        assert_eq!(reports[2]["callable"], false);
        assert_eq!(reports[2]["error"]["code"], "unresolved_target");
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn test_halt_on_policy_block_passes_clean_batch() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "haltOnPolicyBlock": true,
            "allowWrite": true,
            "items": [{"symbol": "TextChannel#send", "args": ["hi"]}]
        }));
        let out = BatchExecutor::new(&engine, limits(4, 50))
            .run(&request, &channel_ctx(), &conn)
            .await
            .unwrap();
        assert_eq!(out["halted"], false);
        assert_eq!(out["succeeded"], 1);
        assert_eq!(conn.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_item_overrides_and_context_merge() {
        let engine = engine();
        let conn = conn().await;
        let request = batch(json!({
            "dryRun": true,
            "allowWrite": true,
            "items": [
                {"symbol": "TextChannel#send", "args": ["dry"]},
                {"symbol": "TextChannel#send", "args": ["live"], "dryRun": false, "context": {"channelId": "10"}}
            ]
        }));
        let out = BatchExecutor::new(&engine, limits(1, 50))
            .run(&request, &InvocationContext::default(), &conn)
            .await
            .unwrap();
        let results = out["results"].as_array().unwrap();
        // dry-run without a channel still reports, and counts as success
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[0]["dryRun"], true);
        assert_eq!(results[0]["output"]["callable"], false);
        assert_eq!(results[1]["dryRun"], false);
        assert_eq!(results[1]["output"]["result"]["id"], "1");
        assert_eq!(conn.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_limits_and_bad_items() {
        let engine = engine();
        let conn = conn().await;
        let executor = BatchExecutor::new(&engine, limits(2, 2));
        let too_many = batch(json!({"items": [{"symbol": "bold"}, {"symbol": "bold"}, {"symbol": "bold"}]}));
        let err = executor.run(&too_many, &channel_ctx(), &conn).await.unwrap_err();
        assert!(err.to_string().contains("limit is 2"));

        let empty = batch(json!({"items": []}));
        assert!(executor.run(&empty, &channel_ctx(), &conn).await.unwrap_err().is_validation());

        let malformed = batch(json!({"items": [{"symbol": "bold", "args": ["x"], "colour": 1}]}));
        let out = executor.run(&malformed, &channel_ctx(), &conn).await.unwrap();
        assert_eq!(out["results"][0]["error"]["code"], "validation_error");
    }
}
