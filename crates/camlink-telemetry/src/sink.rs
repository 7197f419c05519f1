use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a discrete lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
}

impl EventSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Info => "info",
            EventSeverity::Warning => "warning",
            EventSeverity::Error => "error",
        }
    }
}

/// Outbound boundary to the telemetry platform.
///
/// Streams are addressed by name (e.g. `adapter.state`); the platform side
/// decides routing and retention.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Post a text message to a named stream.
    async fn post_text(&self, stream: &str, text: &str) -> Result<()>;

    /// Post a JSON payload to a named stream.
    async fn post_json(&self, stream: &str, payload: &Value) -> Result<()>;

    /// Post a named-boolean record (bitset-style stream).
    async fn post_bitset(&self, stream: &str, fields: &[(&str, bool)]) -> Result<()>;

    /// Emit a discrete lifecycle event.
    async fn create_event(&self, message: &str, severity: EventSeverity) -> Result<()>;

    /// Sink name, for diagnostics.
    fn name(&self) -> &str;
}
