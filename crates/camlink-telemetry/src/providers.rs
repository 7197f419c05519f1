use crate::sink::{EventSeverity, TelemetrySink};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

// ============================================================================
// Console sink
// ============================================================================

/// Renders every post through tracing. Default sink when no platform
/// endpoint is configured; also handy in tests and local runs.
pub struct ConsoleSink;

#[async_trait]
impl TelemetrySink for ConsoleSink {
    async fn post_text(&self, stream: &str, text: &str) -> Result<()> {
        info!(target: "telemetry", stream = %stream, "{}", text);
        Ok(())
    }

    async fn post_json(&self, stream: &str, payload: &Value) -> Result<()> {
        info!(target: "telemetry", stream = %stream, payload = %payload, "json");
        Ok(())
    }

    async fn post_bitset(&self, stream: &str, fields: &[(&str, bool)]) -> Result<()> {
        let rendered = fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        info!(target: "telemetry", stream = %stream, "{}", rendered);
        Ok(())
    }

    async fn create_event(&self, message: &str, severity: EventSeverity) -> Result<()> {
        match severity {
            EventSeverity::Info => info!(target: "telemetry", event = %message, "event"),
            _ => warn!(target: "telemetry", event = %message, severity = severity.as_str(), "event"),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

// ============================================================================
// Webhook sink
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub headers: Option<HashMap<String, String>>,
}

/// POSTs each record as a JSON envelope to a platform ingestion URL.
pub struct WebhookSink {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn envelope(&self, stream: &str, kind: &str, payload: Value) -> Value {
        serde_json::json!({
            "stream": stream,
            "kind": kind,
            "payload": payload,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }

    async fn deliver(&self, body: &Value) -> Result<()> {
        let mut request = self.client.post(&self.config.url);

        if let Some(headers) = &self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(body).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(anyhow!("webhook delivery failed: {}", response.status()))
        }
    }
}

#[async_trait]
impl TelemetrySink for WebhookSink {
    async fn post_text(&self, stream: &str, text: &str) -> Result<()> {
        let body = self.envelope(stream, "text", Value::String(text.to_string()));
        self.deliver(&body).await
    }

    async fn post_json(&self, stream: &str, payload: &Value) -> Result<()> {
        let body = self.envelope(stream, "json", payload.clone());
        self.deliver(&body).await
    }

    async fn post_bitset(&self, stream: &str, fields: &[(&str, bool)]) -> Result<()> {
        let map: serde_json::Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Bool(*v)))
            .collect();
        let body = self.envelope(stream, "bitset", Value::Object(map));
        self.deliver(&body).await
    }

    async fn create_event(&self, message: &str, severity: EventSeverity) -> Result<()> {
        let mut body = self.envelope(
            "adapter.events",
            "event",
            Value::String(message.to_string()),
        );
        body["severity"] = Value::String(severity.as_str().to_string());
        self.deliver(&body).await
    }

    fn name(&self) -> &str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_console_sink_accepts_all_kinds() {
        let sink = ConsoleSink;
        sink.post_text("adapter.info", "hello").await.unwrap();
        sink.post_json("adapter.encoder_config", &serde_json::json!({"a": 1}))
            .await
            .unwrap();
        sink.post_bitset("adapter.state", &[("online", true), ("connected", false)])
            .await
            .unwrap();
        sink.create_event("camera connected", EventSeverity::Info)
            .await
            .unwrap();
    }

    #[test]
    fn test_webhook_envelope_shape() {
        let sink = WebhookSink::new(WebhookConfig {
            url: "http://localhost/ingest".to_string(),
            headers: None,
        });

        let body = sink.envelope("adapter.state", "bitset", serde_json::json!({"online": true}));
        assert_eq!(body["stream"], "adapter.state");
        assert_eq!(body["kind"], "bitset");
        assert_eq!(body["payload"]["online"], true);
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn test_severity_labels() {
        assert_eq!(EventSeverity::Info.as_str(), "info");
        assert_eq!(EventSeverity::Warning.as_str(), "warning");
    }
}
