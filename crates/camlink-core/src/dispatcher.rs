use crate::config::ConfigStore;
use crate::error::Result;
use crate::motion::{self, ControlChannel, ControlEvent};
use crate::session::SessionManager;
use camlink_telemetry::TelemetrySink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Routes inbound platform control events to the motion translator.
///
/// Faults are isolated per event: an error is reported and the next event is
/// handled normally.
pub struct CommandDispatcher {
    sessions: Arc<SessionManager>,
    config: Arc<ConfigStore>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl CommandDispatcher {
    pub fn new(
        sessions: Arc<SessionManager>,
        config: Arc<ConfigStore>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            sessions,
            config,
            telemetry,
        }
    }

    /// Consume control events until the channel closes.
    pub fn start(self: Arc<Self>, mut rx: mpsc::Receiver<ControlEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = self.handle(&event).await {
                    let message = format!("Error handling teleop: {}", e);
                    warn!("{}", message);
                    if let Err(post_err) =
                        self.telemetry.post_text("adapter.errors", &message).await
                    {
                        warn!("Failed to post error to telemetry: {}", post_err);
                    }
                }
            }
            debug!("Control event channel closed; dispatcher exiting");
        })
    }

    /// Handle one control event. Unknown channels are ignored.
    pub async fn handle(&self, event: &ControlEvent) -> Result<()> {
        let Some(channel) = ControlChannel::parse(&event.channel) else {
            debug!(channel = %event.channel, "Ignoring event for unknown channel");
            return Ok(());
        };

        let cfg = self.config.current();
        for command in motion::translate(channel, event, &cfg) {
            self.sessions.apply(&command).await?;
        }
        Ok(())
    }
}
