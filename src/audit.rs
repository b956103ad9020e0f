//! Audit events for tool calls.
//!
//! Every completed `discord_manage` call produces exactly one [`AuditEvent`],
//! success or failure. Sinks are synchronous and infallible from the
//! caller's side: a sink that cannot deliver logs and drops the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::capabilities::BehaviorClass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
}

/// Record of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub call_id: String,
    pub timestamp: DateTime<Utc>,
    /// Absent when the call failed before an identity was chosen
    pub identity_id: Option<String>,
    pub mode: String,
    pub method: String,
    pub operation: String,
    /// Highest behavior class the call touched
    pub risk_tier: BehaviorClass,
    pub status: AuditStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    /// A new event stamped with a fresh call id and the current time.
    pub fn new(mode: impl Into<String>, method: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            identity_id: None,
            mode: mode.into(),
            method: method.into(),
            operation: operation.into(),
            risk_tier: BehaviorClass::Read,
            status: AuditStatus::Success,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Writes events to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, event: AuditEvent) {
        log::info!(
            "audit call={} identity={} {}:{} risk={} status={:?} {}ms{}",
            event.call_id,
            event.identity_id.as_deref().unwrap_or("-"),
            event.method,
            event.operation,
            event.risk_tier,
            event.status,
            event.duration_ms,
            event.error.map(|e| format!(" error={}", e)).unwrap_or_default()
        );
    }
}

/// Hands events to an external persister over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelAuditSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Err(e) = self.tx.send(event) {
            log::warn!("Audit receiver closed, dropping event {}", e.0.call_id);
        }
    }
}
