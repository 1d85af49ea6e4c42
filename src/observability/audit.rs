//! Audit events for provisioning and rollback invocations.
//!
//! Every invocation emits a `started` event followed by exactly one `success`
//! or `error` event. All events carry the request correlation id so operators
//! can follow a single invocation (and its later rollback) through the logs.
//!
//! The sink is pluggable so tests can observe the events that were emitted.
//! The default sink writes structured `tracing` events on the
//! [`AUDIT_TARGET`] target.

use serde::Serialize;

/// `tracing` target used for audit events.
pub const AUDIT_TARGET: &str = "provisioner::audit";

/// Operation an audit event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Provision,
    Rollback,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Provision => "provision",
            Operation::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Started,
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Started => "started",
            AuditStatus::Success => "success",
            AuditStatus::Error => "error",
        }
    }
}

/// A single structured audit record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub correlation_id: String,
    pub operation: Operation,
    pub status: AuditStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upn: Option<String>,
    /// Correlation id of the provision call a rollback reverses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_correlation_id: Option<String>,
    /// Request payload as received, on `started` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(operation: Operation, status: AuditStatus, correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            operation,
            status,
            upn: None,
            original_correlation_id: None,
            payload: None,
            error: None,
            result: None,
        }
    }

    pub fn with_upn(mut self, upn: impl Into<String>) -> Self {
        self.upn = Some(upn.into());
        self
    }

    pub fn with_original_correlation_id(mut self, id: Option<&str>) -> Self {
        self.original_correlation_id = id.map(str::to_owned);
        self
    }

    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_error(mut self, error: impl std::fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attach the serialized result payload. Serialization failures drop the field.
    pub fn with_result<T: Serialize>(mut self, result: &T) -> Self {
        self.result = serde_json::to_value(result).ok();
        self
    }
}

/// Destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Record a single event. Sinks must not fail the calling operation.
    fn record(&self, event: &AuditEvent);

    /// Get the sink name for logging.
    fn name(&self) -> &'static str;
}

/// Sink that emits audit events as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let payload = serde_json::to_string(event).unwrap_or_default();
        match event.status {
            AuditStatus::Error => tracing::error!(
                target: AUDIT_TARGET,
                correlation_id = %event.correlation_id,
                operation = event.operation.as_str(),
                status = event.status.as_str(),
                upn = event.upn.as_deref(),
                error = event.error.as_deref(),
                event = %payload,
                "{} failed",
                event.operation
            ),
            _ => tracing::info!(
                target: AUDIT_TARGET,
                correlation_id = %event.correlation_id,
                operation = event.operation.as_str(),
                status = event.status.as_str(),
                upn = event.upn.as_deref(),
                event = %payload,
                "{} {}",
                event.operation,
                event.status.as_str()
            ),
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Sink that keeps events in memory, for assertions in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl RecordingAuditSink {
    pub(crate) fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn statuses(&self) -> Vec<AuditStatus> {
        self.events().iter().map(|e| e.status).collect()
    }
}

#[cfg(test)]
impl AuditSink for RecordingAuditSink {
    fn record(&self, event: &AuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
