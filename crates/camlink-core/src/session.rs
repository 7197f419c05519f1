use crate::config::{AdapterConfig, ConfigStore};
use crate::device::{CameraSession, CameraTransport};
use crate::error::{AdapterError, Result};
use crate::motion::MotionCommand;
use camlink_telemetry::{EventSeverity, TelemetrySink};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Connectivity of the device link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Disconnected,
    Connected,
}

/// A link-state transition, carrying the previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
}

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Capped exponential delay between consecutive failed reconnects.
struct Backoff {
    failures: u32,
}

impl Backoff {
    fn new() -> Self {
        Self { failures: 0 }
    }

    fn delay(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        let exp = self.failures.saturating_sub(1).min(16);
        BACKOFF_BASE
            .saturating_mul(2u32.saturating_pow(exp))
            .min(BACKOFF_CAP)
    }

    fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    fn reset(&mut self) {
        self.failures = 0;
    }
}

struct ActiveSession {
    handle: Box<dyn CameraSession>,
    profile_token: String,
}

/// Owns the device session lifecycle: connect, liveness sampling, failure
/// detection, and single-flight reconnection with backoff.
///
/// State machine: Disconnected → Connecting → Connected, any state →
/// Disconnected on error. Link-state transitions funnel through one
/// mutex-guarded holder, so the connected/disconnected events fire exactly
/// once per edge even under concurrent pollers.
pub struct SessionManager {
    transport: Arc<dyn CameraTransport>,
    config: Arc<ConfigStore>,
    telemetry: Arc<dyn TelemetrySink>,
    session: RwLock<Option<ActiveSession>>,
    link: Mutex<ConnectivityState>,
    link_tx: watch::Sender<ConnectivityState>,
    reconnect_gate: Mutex<()>,
    backoff: Mutex<Backoff>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn CameraTransport>,
        config: Arc<ConfigStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        let (link_tx, _rx) = watch::channel(ConnectivityState::Disconnected);
        Self {
            transport,
            config,
            telemetry,
            session: RwLock::new(None),
            link: Mutex::new(ConnectivityState::Disconnected),
            link_tx,
            reconnect_gate: Mutex::new(()),
            backoff: Mutex::new(Backoff::new()),
        }
    }

    /// Run the session-establishment sequence with the current config.
    ///
    /// Steps: open an authenticated session, list media profiles, select the
    /// first profile's token as master token, fetch the encoder
    /// configuration. Any step failing aborts the sequence; no partial
    /// session is retained.
    pub async fn connect(&self) -> Result<()> {
        let cfg = self.config.current();
        self.log_step(&cfg, "Starting authentication").await;

        match self.establish(&cfg).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn establish(&self, cfg: &AdapterConfig) -> Result<()> {
        let handle = self
            .transport
            .open(&cfg.device_host, cfg.device_port, &cfg.username, &cfg.password)
            .await
            .map_err(|e| AdapterError::connect("open session", e))?;
        self.log_step(cfg, "Device session opened").await;

        let profiles = handle
            .media_profiles()
            .await
            .map_err(|e| AdapterError::connect("list profiles", e))?;
        let profile_token = profiles
            .first()
            .ok_or_else(|| {
                AdapterError::connect("select profile", "device advertises no media profiles")
            })?
            .token
            .clone();
        self.log_step(cfg, "Profile token received").await;

        let encoder = handle
            .encoder_config()
            .await
            .map_err(|e| AdapterError::connect("fetch encoder config", e))?;

        // Diagnostic only; a failed post must not tear down a good session.
        if let Err(e) = self
            .telemetry
            .post_json(
                "adapter.encoder_config",
                &serde_json::json!({ "encoder config": encoder }),
            )
            .await
        {
            warn!("Failed to publish encoder config: {}", e);
        }

        *self.session.write().await = Some(ActiveSession {
            handle,
            profile_token,
        });
        self.set_link_state(ConnectivityState::Connected).await;
        self.backoff.lock().await.reset();
        Ok(())
    }

    /// Liveness check against the live handle, not a cached flag. False when
    /// no session is held or the probe fails.
    pub async fn is_connected(&self) -> bool {
        let session = self.session.read().await;
        match session.as_ref() {
            Some(active) => active.handle.probe().await.unwrap_or(false),
            None => false,
        }
    }

    /// Sampling entry point for the state publisher.
    ///
    /// No session held, or a probe transport failure, is an error: the
    /// caller enters the recovery path. A probe that answers `false` is a
    /// level observation — the edge is recorded and the session kept.
    pub async fn sample(&self) -> Result<bool> {
        let probe = {
            let session = self.session.read().await;
            let Some(active) = session.as_ref() else {
                return Err(AdapterError::publish("no device session to sample"));
            };
            active.handle.probe().await
        };

        match probe {
            Ok(true) => {
                self.set_link_state(ConnectivityState::Connected).await;
                Ok(true)
            }
            Ok(false) => {
                self.set_link_state(ConnectivityState::Disconnected).await;
                Ok(false)
            }
            Err(e) => {
                self.teardown().await;
                Err(AdapterError::publish(format!("connectivity probe failed: {}", e)))
            }
        }
    }

    /// Re-run config refresh and the connect sequence.
    ///
    /// Single-flight: a reconnect already in progress absorbs further
    /// requests rather than stacking. Consecutive failures back off
    /// exponentially (1 s base, 30 s cap), so a persistently unreachable
    /// device cannot drive a tight retry loop.
    pub async fn reconnect(&self) -> Result<()> {
        let Ok(_guard) = self.reconnect_gate.try_lock() else {
            debug!("Reconnect already in flight; absorbing request");
            return Ok(());
        };

        // Commands issued during the window fail fast instead of racing a
        // half-initialized handle.
        self.teardown().await;

        let delay = self.backoff.lock().await.delay();
        if !delay.is_zero() {
            debug!(?delay, "Delaying reconnect attempt");
            tokio::time::sleep(delay).await;
        }

        if let Err(e) = self.config.refresh().await {
            // Prior snapshot stays active; connect with what we have.
            self.report_error(&format!("Failed config update: {}", e)).await;
        }

        match self.connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.backoff.lock().await.record_failure();
                self.report_error(&format!("Error starting: {}", e)).await;
                Err(e)
            }
        }
    }

    /// Issue one motion command through the active session.
    ///
    /// Fails fast with no session; the device boundary is never touched.
    pub async fn apply(&self, command: &MotionCommand) -> Result<()> {
        let session = self.session.read().await;
        let active = session.as_ref().ok_or(AdapterError::NotConnected)?;

        match command {
            MotionCommand::Move {
                axis,
                velocity,
                timeout,
            } => active
                .handle
                .continuous_move(&active.profile_token, *axis, *velocity, *timeout)
                .await
                .map_err(AdapterError::command),
            MotionCommand::Stop => active
                .handle
                .stop(&active.profile_token)
                .await
                .map_err(AdapterError::command),
        }
    }

    /// Last observed link state (level, not edge).
    pub fn connectivity(&self) -> ConnectivityState {
        *self.link_tx.borrow()
    }

    pub async fn profile_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.profile_token.clone())
    }

    /// Wait until the link reports connected, bounded by `timeout`.
    pub async fn wait_until_connected(&self, timeout: Duration) -> Result<()> {
        let mut rx = self.link_tx.subscribe();
        let wait = async {
            while *rx.borrow_and_update() != ConnectivityState::Connected {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            AdapterError::connect(
                "startup wait",
                format!("device not connected within {:?}", timeout),
            )
        })
    }

    async fn teardown(&self) {
        *self.session.write().await = None;
        self.set_link_state(ConnectivityState::Disconnected).await;
    }

    // All transitions pass through here; emission happens under the lock so
    // transitions serialize and each edge notifies exactly once. Returns the
    // recorded edge, `None` on a steady state.
    async fn set_link_state(&self, next: ConnectivityState) -> Option<Transition> {
        let mut state = self.link.lock().await;
        let prev = *state;
        if prev == next {
            return None;
        }
        *state = next;
        let _ = self.link_tx.send(next);

        match next {
            ConnectivityState::Connected => {
                info!("Camera connected");
                if let Err(e) = self
                    .telemetry
                    .create_event("camera connected", EventSeverity::Info)
                    .await
                {
                    warn!("Failed to emit connect event: {}", e);
                }
            }
            ConnectivityState::Disconnected => {
                warn!("Camera disconnected");
                if let Err(e) = self
                    .telemetry
                    .create_event("camera disconnected", EventSeverity::Warning)
                    .await
                {
                    warn!("Failed to emit disconnect event: {}", e);
                }
            }
        }

        Some(Transition { from: prev, to: next })
    }

    async fn report_error(&self, message: &str) {
        warn!("{}", message);
        if let Err(e) = self.telemetry.post_text("adapter.errors", message).await {
            warn!("Failed to post error to telemetry: {}", e);
        }
    }

    // Step log for operators: always traced, forwarded to the platform only
    // in debug mode.
    async fn log_step(&self, cfg: &AdapterConfig, message: &str) {
        info!("{}", message);
        if cfg.debug_mode {
            if let Err(e) = self.telemetry.post_text("adapter.info", message).await {
                warn!("Failed to post info to telemetry: {}", e);
            }
        }
    }
}
