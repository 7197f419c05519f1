use crate::session::SessionManager;
use camlink_telemetry::TelemetrySink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default period of the state-publishing loop.
pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(5);

/// Periodically samples device connectivity and publishes the adapter state
/// record. A failed tick reports the error and triggers reconnection — the
/// adapter's sole self-healing path; retry pacing is the session manager's
/// backoff.
pub struct StatePublisher {
    sessions: Arc<SessionManager>,
    telemetry: Arc<dyn TelemetrySink>,
    interval: Duration,
}

impl StatePublisher {
    pub fn new(
        sessions: Arc<SessionManager>,
        telemetry: Arc<dyn TelemetrySink>,
        interval: Duration,
    ) -> Self {
        Self {
            sessions,
            telemetry,
            interval,
        }
    }

    /// Spawn the publishing loop. Flipping `stop` to true ends it after the
    /// current tick.
    pub fn start(self: Arc<Self>, mut stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stop.changed() => {}
                }
                if *stop.borrow() {
                    debug!("State publisher stopped");
                    break;
                }

                if let Err(e) = self.tick().await {
                    let message = format!("Error publishing state: {}", e);
                    warn!("{}", message);
                    if let Err(post_err) =
                        self.telemetry.post_text("adapter.errors", &message).await
                    {
                        warn!("Failed to post error to telemetry: {}", post_err);
                    }

                    // Reconnect reports its own failure; nothing more to do
                    // here before the next tick.
                    let _ = self.sessions.reconnect().await;
                }
            }
        })
    }

    /// One sampling/publishing cycle.
    pub async fn tick(&self) -> crate::error::Result<()> {
        let connected = self.sessions.sample().await?;
        self.telemetry
            .post_bitset("adapter.state", &[("online", true), ("connected", connected)])
            .await
            .map_err(crate::error::AdapterError::publish)?;
        Ok(())
    }
}
