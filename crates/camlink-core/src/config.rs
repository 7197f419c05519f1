use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

pub const DEFAULT_DEVICE_HOST: &str = "192.168.1.110";
pub const DEFAULT_DEVICE_PORT: u16 = 80;
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "123456";
pub const DEFAULT_PTZ_RATE: f64 = 1.0;
pub const DEFAULT_ZOOM_RATE: f64 = 0.5;

/// Operating parameters for the adapter.
///
/// Immutable snapshot, replaced wholesale on each refresh. The default
/// credentials are placeholders; deployments must override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub device_host: String,
    pub device_port: u16,
    pub username: String,
    pub password: String,
    pub pan_rate: f64,
    pub tilt_rate: f64,
    pub zoom_rate: f64,
    pub debug_mode: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            device_host: DEFAULT_DEVICE_HOST.to_string(),
            device_port: DEFAULT_DEVICE_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            pan_rate: DEFAULT_PTZ_RATE,
            tilt_rate: DEFAULT_PTZ_RATE,
            zoom_rate: DEFAULT_ZOOM_RATE,
            debug_mode: false,
        }
    }
}

/// Key-value source for adapter options (the platform's app config).
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Fetch the raw value for a key; `None` when the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
}

/// Holds the current [`AdapterConfig`] snapshot behind a watch channel so
/// concurrent readers never observe a half-updated config.
pub struct ConfigStore {
    provider: Arc<dyn ConfigProvider>,
    tx: watch::Sender<AdapterConfig>,
}

impl ConfigStore {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        let (tx, _rx) = watch::channel(AdapterConfig::default());
        Self { provider, tx }
    }

    pub fn current(&self) -> AdapterConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AdapterConfig> {
        self.tx.subscribe()
    }

    /// Pull every option from the provider and swap in the new snapshot.
    ///
    /// Never partially applies: a malformed value fails the whole refresh
    /// and the previous snapshot stays active.
    pub async fn refresh(&self) -> Result<AdapterConfig> {
        let config = self.load().await?;
        self.tx.send_replace(config.clone());
        info!(
            host = %config.device_host,
            port = config.device_port,
            "Adapter config refreshed"
        );
        Ok(config)
    }

    async fn load(&self) -> Result<AdapterConfig> {
        let defaults = AdapterConfig::default();
        Ok(AdapterConfig {
            device_host: self.string_opt("device_host", defaults.device_host).await?,
            device_port: self.parsed_opt("device_port", defaults.device_port).await?,
            username: self.string_opt("username", defaults.username).await?,
            password: self.string_opt("password", defaults.password).await?,
            pan_rate: self.parsed_opt("pan_rate", defaults.pan_rate).await?,
            tilt_rate: self.parsed_opt("tilt_rate", defaults.tilt_rate).await?,
            zoom_rate: self.parsed_opt("zoom_rate", defaults.zoom_rate).await?,
            debug_mode: self.bool_opt("debug_mode", defaults.debug_mode).await?,
        })
    }

    async fn raw(&self, key: &str) -> Result<Option<String>> {
        self.provider
            .get(key)
            .await
            .map_err(|e| AdapterError::config(format!("failed to read {}: {}", key, e)))
    }

    async fn string_opt(&self, key: &str, default: String) -> Result<String> {
        Ok(self.raw(key).await?.unwrap_or(default))
    }

    async fn parsed_opt<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.raw(key).await? {
            Some(value) => value.trim().parse::<T>().map_err(|e| {
                AdapterError::config(format!("malformed value for {}: {:?} ({})", key, value, e))
            }),
            None => Ok(default),
        }
    }

    // Boolean options are matched case-insensitively; anything other than
    // "true" reads as false.
    async fn bool_opt(&self, key: &str, default: bool) -> Result<bool> {
        Ok(match self.raw(key).await? {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        })
    }
}
