//! The `discord_manage` tool: one coarse entry point over the whole gateway.
//!
//! ```text
//!   ToolRequest
//!     → mode / operation / method validation
//!     → identity lookup (fail closed)
//!     → identity lane (IdentityWorkerPool)
//!         → the identity's own connection (Connector::connect)
//!         → catalog (packages.list, symbols.discover)
//!           or engine (symbols.preflight, symbols.invoke, symbols.batch)
//!     → ToolResponse + one AuditEvent
//! ```

pub mod request;

pub use request::{discover_filter, ToolRequest, ToolResponse};

use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::audit::{AuditEvent, AuditSink, AuditStatus};
use crate::batch::{BatchExecutor, BatchRequest};
use crate::capabilities::{BehaviorClass, CapabilityCatalog};
use crate::config::{BatchConfig, GatewayConfig};
use crate::connection::{Connector, DiscordConnection};
use crate::context::InvocationContext;
use crate::error::{GatewayError, GatewayResult};
use crate::identity::{Identity, IdentityMode, IdentityStore, IdentityWorkerPool};
use crate::invocation::{InvocationEngine, InvokeRequest};
use crate::operations::{
    describe_operations, ensure_method, normalize_params, resolve_method, resolve_operation_with_compat, Method,
    Operation,
};

pub const TOOL_NAME: &str = "discord_manage";

/// What is known about a call as it progresses, for the envelope and audit.
#[derive(Debug, Default)]
struct CallTrace {
    operation: Option<Operation>,
    method: Option<Method>,
    identity_id: Option<String>,
    translated_from: Option<String>,
    risk: Option<BehaviorClass>,
}

impl CallTrace {
    fn touch(&mut self, class: BehaviorClass) {
        self.risk = Some(self.risk.map_or(class, |r| r.max(class)));
    }
}

/// A validated call, ready to run on its identity's lane.
struct PreparedCall {
    operation: Operation,
    params: Map<String, Value>,
    context: InvocationContext,
    identity: Identity,
}

pub struct DiscordManageTool {
    engine: Arc<InvocationEngine>,
    identities: Arc<dyn IdentityStore>,
    connector: Arc<dyn Connector>,
    pool: IdentityWorkerPool,
    audit: Arc<dyn AuditSink>,
    batch_limits: BatchConfig,
}

impl DiscordManageTool {
    pub fn new(
        config: &GatewayConfig,
        catalog: Arc<CapabilityCatalog>,
        identities: Arc<dyn IdentityStore>,
        connector: Arc<dyn Connector>,
        audit: Arc<dyn AuditSink>,
    ) -> GatewayResult<Self> {
        Ok(Self {
            engine: Arc::new(InvocationEngine::new(catalog, config)?),
            identities,
            connector,
            pool: IdentityWorkerPool::new(),
            audit,
            batch_limits: config.batch.clone(),
        })
    }

    pub fn catalog(&self) -> &CapabilityCatalog {
        self.engine.catalog()
    }

    pub fn pool(&self) -> &IdentityWorkerPool {
        &self.pool
    }

    /// Tool descriptor for registries and the `/operations` endpoint.
    pub fn describe(&self) -> Value {
        json!({
            "name": TOOL_NAME,
            "description": "Discover and call the Discord client surface under a read/write policy",
            "policyMode": self.engine.policy().mode(),
            "identities": self.identities.list_identity_ids(),
            "operations": describe_operations(),
            "input": {
                "mode": "bot | user",
                "identityId": "string?",
                "method": "read | write?",
                "operation": "string",
                "params": "object?",
                "args": "array | object?",
                "context": "object?",
            },
        })
    }

    /// Run a call given as raw JSON.
    pub async fn call_value(&self, input: Value) -> ToolResponse {
        match ToolRequest::from_value(input.clone()) {
            Ok(request) => self.call(request).await,
            Err(e) => {
                let field = |name: &str| input.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
                let mut event = AuditEvent::new(field("mode"), field("method"), field("operation"));
                event.status = AuditStatus::Error;
                event.error = Some(audit_error(&e));
                event.risk_tier = BehaviorClass::Unknown;
                self.audit.record(event);
                Self::envelope(field("operation"), &CallTrace::default(), Err(e))
            }
        }
    }

    /// Run one call. Never fails: errors are reported in the envelope.
    pub async fn call(&self, request: ToolRequest) -> ToolResponse {
        let started = Instant::now();
        let mut trace = CallTrace::default();
        let outcome = self.execute(&request, &mut trace).await;

        let method = trace
            .method
            .map(|m| m.to_string())
            .or_else(|| request.method.clone())
            .unwrap_or_default();
        let operation = trace
            .operation
            .map(|op| op.key().to_string())
            .unwrap_or_else(|| request.operation.clone());
        let mut event = AuditEvent::new(request.mode.trim().to_ascii_lowercase(), method, operation);
        event.identity_id = trace.identity_id.clone();
        event.risk_tier = trace.risk.unwrap_or(BehaviorClass::Unknown);
        event.duration_ms = started.elapsed().as_millis() as u64;
        if let Err(e) = &outcome {
            event.status = AuditStatus::Error;
            event.error = Some(audit_error(e));
        }
        self.audit.record(event);

        Self::envelope(request.operation.clone(), &trace, outcome)
    }

    fn envelope(raw_operation: String, trace: &CallTrace, outcome: GatewayResult<Value>) -> ToolResponse {
        let mut response = ToolResponse {
            ok: outcome.is_ok(),
            operation: trace.operation.map_or(raw_operation, |op| op.key().to_string()),
            method: trace.method.map(|m| m.to_string()),
            identity_id: trace.identity_id.clone(),
            ..ToolResponse::default()
        };
        if let Some(legacy) = &trace.translated_from {
            response.compat_translated = Some(true);
            response.translated_from_operation = Some(legacy.clone());
        }
        match outcome {
            Ok(result) => response.result = Some(result),
            Err(e) => response.error = Some(e.to_json()),
        }
        response
    }

    /// Everything checked before the call enters an identity lane.
    fn prepare(&self, request: &ToolRequest, trace: &mut CallTrace) -> GatewayResult<PreparedCall> {
        let mode = IdentityMode::parse(&request.mode).ok_or_else(|| {
            GatewayError::Validation(format!("mode must be 'bot' or 'user', got '{}'", request.mode))
        })?;

        let (operation, legacy) = resolve_operation_with_compat(&request.operation)?;
        trace.operation = Some(operation);
        trace.translated_from = legacy;
        let method = match request.method.as_deref() {
            Some(raw) => {
                let declared = resolve_method(raw)?;
                ensure_method(declared, operation)?;
                declared
            }
            None => operation.method(),
        };
        trace.method = Some(method);

        let params = normalize_params(operation, request.params.as_ref(), request.args.as_ref())?;
        let context = InvocationContext::from_value(request.context.as_ref())?;

        let identity_id = match &request.identity_id {
            Some(id) => id.trim().to_string(),
            None => self
                .identities
                .default_identity_id(mode)
                .ok_or_else(|| GatewayError::UnknownIdentity(format!("no default {} identity configured", mode)))?,
        };
        let identity = self
            .identities
            .get_identity(&identity_id)
            .ok_or_else(|| GatewayError::UnknownIdentity(identity_id.clone()))?;
        if identity.mode != mode {
            return Err(GatewayError::Validation(format!(
                "identity '{}' is a {} identity, not {}",
                identity_id, identity.mode, mode
            )));
        }
        trace.identity_id = Some(identity_id);

        Ok(PreparedCall {
            operation,
            params,
            context,
            identity,
        })
    }

    async fn execute(&self, request: &ToolRequest, trace: &mut CallTrace) -> GatewayResult<Value> {
        let call = match self.prepare(request, trace) {
            Ok(call) => call,
            Err(e) => {
                trace.touch(BehaviorClass::Unknown);
                return Err(e);
            }
        };
        trace.touch(self.risk_of(&call));

        let lane = call.identity.identity_id.clone();
        self.pool
            .run(&lane, async move {
                let connection = self
                    .connector
                    .connect(&call.identity)
                    .await
                    .map_err(|e| GatewayError::IdentityBinding {
                        identity: call.identity.identity_id.clone(),
                        message: e.to_string(),
                    })?;
                self.dispatch(call.operation, call.params, &call.context, connection.as_ref())
                    .await
            })
            .await
    }

    async fn dispatch(
        &self,
        operation: Operation,
        params: Map<String, Value>,
        context: &InvocationContext,
        connection: &dyn DiscordConnection,
    ) -> GatewayResult<Value> {
        match operation {
            Operation::PackagesList => Ok(json!({ "packages": self.catalog().list_packages() })),
            Operation::SymbolsDiscover => {
                let filter = discover_filter(params)?;
                Ok(json!(self.catalog().get_symbols(&filter)?))
            }
            Operation::SymbolsPreflight => {
                let request = InvokeRequest::from_params(params, context.clone())?;
                Ok(self.engine.preflight(&request, connection).await?.report)
            }
            Operation::SymbolsInvoke => {
                let request = InvokeRequest::from_params(params, context.clone())?;
                self.engine.invoke(&request, connection).await
            }
            Operation::SymbolsBatch => {
                let batch = BatchRequest::from_params(params)?;
                BatchExecutor::new(&self.engine, self.batch_limits.clone())
                    .run(&batch, context, connection)
                    .await
            }
        }
    }

    /// Highest behavior class a call can touch. Discovery is read; invoke
    /// and preflight take the symbol's class; batches take the maximum.
    fn risk_of(&self, call: &PreparedCall) -> BehaviorClass {
        match call.operation {
            Operation::PackagesList | Operation::SymbolsDiscover => BehaviorClass::Read,
            Operation::SymbolsPreflight | Operation::SymbolsInvoke => self.symbol_risk(&call.params),
            Operation::SymbolsBatch => call
                .params
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(|item| self.symbol_risk(item))
                        .max()
                        .unwrap_or(BehaviorClass::Read)
                })
                .unwrap_or(BehaviorClass::Unknown),
        }
    }

    fn symbol_risk(&self, params: &Map<String, Value>) -> BehaviorClass {
        let text = |key: &str| params.get(key).and_then(Value::as_str).map(str::to_string);
        let probe = InvokeRequest {
            symbol: text("symbol"),
            package: text("package"),
            operation_key: text("operationKey"),
            ..InvokeRequest::default()
        };
        self.engine
            .lookup(&probe)
            .map_or(BehaviorClass::Unknown, |symbol| symbol.behavior_class)
    }
}

/// `"code: message"`, so the audit trail keeps the failure detail.
fn audit_error(e: &GatewayError) -> String {
    format!("{}: {}", e.code(), e)
}
