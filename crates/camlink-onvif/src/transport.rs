use crate::client::OnvifClient;
use async_trait::async_trait;
use camlink_core::device::{CameraSession, CameraTransport, MediaProfile};
use camlink_core::motion::{MotionAxis, Velocity};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// ONVIF 设备传输层，实现核心层的相机接口
pub struct OnvifTransport;

pub struct OnvifSession {
    client: OnvifClient,
}

#[async_trait]
impl CameraTransport for OnvifTransport {
    async fn open(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> anyhow::Result<Box<dyn CameraSession>> {
        let client =
            OnvifClient::new(host, port).with_auth(username.to_string(), password.to_string());

        // 先取设备信息，确认可达且认证有效
        let device_info = client.get_device_information().await?;
        info!(
            manufacturer = %device_info.manufacturer,
            model = %device_info.model,
            "ONVIF camera initialized"
        );

        Ok(Box::new(OnvifSession { client }))
    }
}

#[async_trait]
impl CameraSession for OnvifSession {
    async fn media_profiles(&self) -> anyhow::Result<Vec<MediaProfile>> {
        let profiles = self.client.get_profiles().await?;
        Ok(profiles
            .into_iter()
            .map(|p| MediaProfile {
                token: p.token,
                name: p.name,
            })
            .collect())
    }

    async fn encoder_config(&self) -> anyhow::Result<Value> {
        let configs = self.client.get_video_encoder_configurations().await?;
        Ok(serde_json::to_value(configs)?)
    }

    async fn continuous_move(
        &self,
        profile_token: &str,
        axis: MotionAxis,
        velocity: Velocity,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        match axis {
            MotionAxis::PanTilt => {
                self.client
                    .continuous_move_pan_tilt(profile_token, velocity.x, velocity.y, timeout)
                    .await
            }
            MotionAxis::Zoom => {
                self.client
                    .continuous_move_zoom(profile_token, velocity.x, timeout)
                    .await
            }
        }
    }

    async fn stop(&self, profile_token: &str) -> anyhow::Result<()> {
        self.client.stop(profile_token).await
    }

    async fn probe(&self) -> anyhow::Result<bool> {
        self.client.get_device_information().await?;
        Ok(true)
    }
}
