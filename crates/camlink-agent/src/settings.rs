use anyhow::Result;
use camlink_telemetry::{ConsoleSink, TelemetrySink, WebhookConfig, WebhookSink};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Agent bootstrap settings. These are local to the daemon process; the
/// adapter's own operating parameters come from the options file via the
/// config provider, so the platform can change them at runtime.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentSettings {
    #[serde(default = "default_http_bind")]
    pub http_bind: String,

    /// TOML file holding the adapter key-value options.
    #[serde(default = "default_options_file")]
    pub options_file: String,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TelemetrySettings {
    Console,
    Webhook {
        url: String,
        headers: Option<HashMap<String, String>>,
    },
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        TelemetrySettings::Console
    }
}

impl TelemetrySettings {
    pub fn build(&self) -> Arc<dyn TelemetrySink> {
        match self {
            TelemetrySettings::Console => Arc::new(ConsoleSink),
            TelemetrySettings::Webhook { url, headers } => Arc::new(WebhookSink::new(
                WebhookConfig {
                    url: url.clone(),
                    headers: headers.clone(),
                },
            )),
        }
    }
}

fn default_http_bind() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_options_file() -> String {
    "camlink-options.toml".to_string()
}

fn default_startup_timeout_secs() -> u64 {
    60
}

fn default_publish_interval_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            http_bind: default_http_bind(),
            options_file: default_options_file(),
            telemetry: TelemetrySettings::default(),
            startup_timeout_secs: default_startup_timeout_secs(),
            publish_interval_secs: default_publish_interval_secs(),
            log_level: default_log_level(),
        }
    }
}

impl AgentSettings {
    /// Load settings from a TOML file; a missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level
            .parse()
            .unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let settings = AgentSettings::load("/nonexistent/camlink.toml").unwrap();
        assert_eq!(settings.http_bind, "0.0.0.0:8090");
        assert_eq!(settings.startup_timeout_secs, 60);
        assert_eq!(settings.publish_interval_secs, 5);
        assert!(matches!(settings.telemetry, TelemetrySettings::Console));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
http_bind = "127.0.0.1:9000"

[telemetry]
mode = "webhook"
url = "http://platform.local/ingest"
"#
        )
        .unwrap();

        let settings = AgentSettings::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.http_bind, "127.0.0.1:9000");
        assert_eq!(settings.publish_interval_secs, 5);
        match settings.telemetry {
            TelemetrySettings::Webhook { ref url, .. } => {
                assert_eq!(url, "http://platform.local/ingest")
            }
            _ => panic!("expected webhook telemetry"),
        }
    }

    #[test]
    fn test_unknown_log_level_falls_back_to_info() {
        let settings = AgentSettings {
            log_level: "chatty".to_string(),
            ..AgentSettings::default()
        };
        assert_eq!(settings.log_level(), tracing::Level::INFO);
    }
}
