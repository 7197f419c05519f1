use crate::motion::{MotionAxis, Velocity};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A media profile advertised by the device.
#[derive(Debug, Clone)]
pub struct MediaProfile {
    pub token: String,
    pub name: String,
}

/// Device-protocol boundary: opens authenticated sessions.
#[async_trait]
pub trait CameraTransport: Send + Sync {
    /// Open a session against the device. Authentication happens here;
    /// an unreachable host or rejected credentials fail the open.
    async fn open(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> anyhow::Result<Box<dyn CameraSession>>;
}

/// An established device session.
#[async_trait]
pub trait CameraSession: Send + Sync {
    /// List media profiles advertised by the device.
    async fn media_profiles(&self) -> anyhow::Result<Vec<MediaProfile>>;

    /// Current video encoder configuration, as reported by the device.
    async fn encoder_config(&self) -> anyhow::Result<Value>;

    /// Start a continuous move. The device stops on its own once `timeout`
    /// elapses without a follow-up command.
    async fn continuous_move(
        &self,
        profile_token: &str,
        axis: MotionAxis,
        velocity: Velocity,
        timeout: Duration,
    ) -> anyhow::Result<()>;

    /// Stop all motion on the profile.
    async fn stop(&self, profile_token: &str) -> anyhow::Result<()>;

    /// Cheap liveness check against the live handle. `Ok(false)` means the
    /// handle answered but reports itself unready; a transport failure is
    /// an error.
    async fn probe(&self) -> anyhow::Result<bool>;
}
