use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ONVIF PTZ 客户端
pub struct OnvifClient {
    client: Client,
    device_url: String,
    username: Option<String>,
    password: Option<String>,
}

/// ONVIF Profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnvifProfile {
    pub token: String,
    pub name: String,
}

/// 视频编码器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEncoderConfig {
    pub token: String,
    pub name: String,
    pub encoding: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<f64>,
}

/// 设备信息
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInformation {
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
}

impl OnvifClient {
    /// 创建 ONVIF 客户端
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| Client::new()),
            device_url: format!("http://{}:{}/onvif/device_service", host, port),
            username: None,
            password: None,
        }
    }

    /// 设置认证
    pub fn with_auth(mut self, username: String, password: String) -> Self {
        self.username = Some(username);
        self.password = Some(password);
        self
    }

    /// 获取设备信息（同时用作连通性探测）
    pub async fn get_device_information(&self) -> Result<DeviceInformation> {
        let request = Self::build_soap_request(
            r#"<GetDeviceInformation xmlns="http://www.onvif.org/ver10/device/wsdl"/>"#,
        );

        let response = self.send_request(&self.device_url, &request).await?;
        Ok(DeviceInformation {
            manufacturer: Self::extract_tag(&response, "Manufacturer").unwrap_or_default(),
            model: Self::extract_tag(&response, "Model").unwrap_or_default(),
            firmware_version: Self::extract_tag(&response, "FirmwareVersion").unwrap_or_default(),
        })
    }

    /// 获取 Profiles
    pub async fn get_profiles(&self) -> Result<Vec<OnvifProfile>> {
        let media_url = self
            .get_service_url("http://www.onvif.org/ver10/media/wsdl", "media_service")
            .await?;

        let request = Self::build_soap_request(
            r#"<GetProfiles xmlns="http://www.onvif.org/ver10/media/wsdl"/>"#,
        );

        let response = self.send_request(&media_url, &request).await?;
        Self::parse_profiles(&response)
    }

    /// 获取视频编码器配置
    pub async fn get_video_encoder_configurations(&self) -> Result<Vec<VideoEncoderConfig>> {
        let media_url = self
            .get_service_url("http://www.onvif.org/ver10/media/wsdl", "media_service")
            .await?;

        let request = Self::build_soap_request(
            r#"<GetVideoEncoderConfigurations xmlns="http://www.onvif.org/ver10/media/wsdl"/>"#,
        );

        let response = self.send_request(&media_url, &request).await?;
        Self::parse_encoder_configs(&response)
    }

    /// 持续移动（云台）
    pub async fn continuous_move_pan_tilt(
        &self,
        profile_token: &str,
        x: f64,
        y: f64,
        timeout: Duration,
    ) -> Result<()> {
        let body = Self::pan_tilt_move_body(profile_token, x, y, timeout);
        let ptz_url = self
            .get_service_url("http://www.onvif.org/ver20/ptz/wsdl", "ptz_service")
            .await?;
        self.send_request(&ptz_url, &Self::build_soap_request(&body))
            .await?;
        Ok(())
    }

    /// 持续移动（变焦）
    pub async fn continuous_move_zoom(
        &self,
        profile_token: &str,
        x: f64,
        timeout: Duration,
    ) -> Result<()> {
        let body = Self::zoom_move_body(profile_token, x, timeout);
        let ptz_url = self
            .get_service_url("http://www.onvif.org/ver20/ptz/wsdl", "ptz_service")
            .await?;
        self.send_request(&ptz_url, &Self::build_soap_request(&body))
            .await?;
        Ok(())
    }

    /// 停止所有移动
    pub async fn stop(&self, profile_token: &str) -> Result<()> {
        let body = format!(
            r#"<Stop xmlns="http://www.onvif.org/ver20/ptz/wsdl">
                <ProfileToken>{}</ProfileToken>
                <PanTilt>true</PanTilt>
                <Zoom>true</Zoom>
            </Stop>"#,
            profile_token
        );
        let ptz_url = self
            .get_service_url("http://www.onvif.org/ver20/ptz/wsdl", "ptz_service")
            .await?;
        self.send_request(&ptz_url, &Self::build_soap_request(&body))
            .await?;
        Ok(())
    }

    /// 通过 GetServices 查找服务地址，找不到时退回默认路径
    async fn get_service_url(&self, namespace: &str, default_path: &str) -> Result<String> {
        let request = Self::build_soap_request(
            r#"<GetServices xmlns="http://www.onvif.org/ver10/device/wsdl">
                <IncludeCapability>false</IncludeCapability>
            </GetServices>"#,
        );

        if let Ok(response) = self.send_request(&self.device_url, &request).await {
            let marker = format!("<Namespace>{}</Namespace>", namespace);
            if let Some(ns_pos) = response.find(&marker) {
                if let Some(xaddr_start) = response[..ns_pos].rfind("<XAddr>") {
                    let content_start = xaddr_start + 7;
                    if let Some(xaddr_end) = response[content_start..].find("</XAddr>") {
                        return Ok(response[content_start..content_start + xaddr_end].to_string());
                    }
                }
            }
        }

        let base_url = self.device_url.trim_end_matches("/onvif/device_service");
        Ok(format!("{}/onvif/{}", base_url, default_path))
    }

    /// 构建 SOAP 请求
    fn build_soap_request(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    {}
  </s:Body>
</s:Envelope>"#,
            body
        )
    }

    fn pan_tilt_move_body(profile_token: &str, x: f64, y: f64, timeout: Duration) -> String {
        format!(
            r#"<ContinuousMove xmlns="http://www.onvif.org/ver20/ptz/wsdl">
                <ProfileToken>{}</ProfileToken>
                <Velocity>
                    <PanTilt xmlns="http://www.onvif.org/ver10/schema" x="{}" y="{}"/>
                </Velocity>
                <Timeout>{}</Timeout>
            </ContinuousMove>"#,
            profile_token,
            x,
            y,
            Self::iso8601_duration(timeout)
        )
    }

    fn zoom_move_body(profile_token: &str, x: f64, timeout: Duration) -> String {
        format!(
            r#"<ContinuousMove xmlns="http://www.onvif.org/ver20/ptz/wsdl">
                <ProfileToken>{}</ProfileToken>
                <Velocity>
                    <Zoom xmlns="http://www.onvif.org/ver10/schema" x="{}"/>
                </Velocity>
                <Timeout>{}</Timeout>
            </ContinuousMove>"#,
            profile_token,
            x,
            Self::iso8601_duration(timeout)
        )
    }

    fn iso8601_duration(timeout: Duration) -> String {
        format!("PT{}S", timeout.as_secs())
    }

    /// 发送请求
    async fn send_request(&self, url: &str, request: &str) -> Result<String> {
        debug!(target: "onvif_client", "Sending request to {}", url);

        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .body(request.to_string());

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            req = req.basic_auth(username, Some(password));
        }

        let response = req.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(anyhow!("ONVIF request failed: {}", status));
        }

        Ok(text)
    }

    /// 解析 Profiles
    fn parse_profiles(xml: &str) -> Result<Vec<OnvifProfile>> {
        let mut profiles = Vec::new();

        let mut search_start = 0;
        while let Some(profile_start) = xml[search_start..].find("<trt:Profiles") {
            let abs_start = search_start + profile_start;

            if let Some(profile_end) = xml[abs_start..].find("</trt:Profiles>") {
                let profile_xml = &xml[abs_start..abs_start + profile_end + 15];

                if let Ok(token) = Self::extract_attribute(profile_xml, "token") {
                    profiles.push(OnvifProfile {
                        token,
                        name: Self::extract_tag(profile_xml, "Name")
                            .unwrap_or_else(|_| "Unknown".to_string()),
                    });
                }

                search_start = abs_start + profile_end + 15;
            } else {
                break;
            }
        }

        Ok(profiles)
    }

    /// 解析编码器配置
    fn parse_encoder_configs(xml: &str) -> Result<Vec<VideoEncoderConfig>> {
        let mut configs = Vec::new();

        let mut search_start = 0;
        while let Some(start) = xml[search_start..].find("<trt:Configurations") {
            let abs_start = search_start + start;

            if let Some(end) = xml[abs_start..].find("</trt:Configurations>") {
                let config_xml = &xml[abs_start..abs_start + end + 21];

                if let Ok(token) = Self::extract_attribute(config_xml, "token") {
                    configs.push(VideoEncoderConfig {
                        token,
                        name: Self::extract_tag(config_xml, "Name")
                            .unwrap_or_else(|_| "Unknown".to_string()),
                        encoding: Self::extract_tag(config_xml, "Encoding").unwrap_or_default(),
                        width: Self::extract_tag(config_xml, "Width")
                            .ok()
                            .and_then(|v| v.parse().ok()),
                        height: Self::extract_tag(config_xml, "Height")
                            .ok()
                            .and_then(|v| v.parse().ok()),
                        quality: Self::extract_tag(config_xml, "Quality")
                            .ok()
                            .and_then(|v| v.parse().ok()),
                    });
                }

                search_start = abs_start + end + 21;
            } else {
                break;
            }
        }

        Ok(configs)
    }

    /// 提取 XML 标签
    fn extract_tag(xml: &str, tag: &str) -> Result<String> {
        let patterns = [
            (format!("<{}>", tag), format!("</{}>", tag)),
            (format!("<tds:{}>", tag), format!("</tds:{}>", tag)),
            (format!("<tt:{}>", tag), format!("</tt:{}>", tag)),
            (format!("<trt:{}>", tag), format!("</trt:{}>", tag)),
        ];

        for (start_tag, end_tag) in &patterns {
            if let Some(start) = xml.find(start_tag) {
                let content_start = start + start_tag.len();
                if let Some(end) = xml[content_start..].find(end_tag) {
                    return Ok(xml[content_start..content_start + end].to_string());
                }
            }
        }

        Err(anyhow!("Tag {} not found", tag))
    }

    /// 提取 XML 属性
    fn extract_attribute(xml: &str, attr: &str) -> Result<String> {
        let pattern = format!("{}=\"", attr);
        if let Some(start) = xml.find(&pattern) {
            let content_start = start + pattern.len();
            if let Some(end) = xml[content_start..].find('"') {
                return Ok(xml[content_start..content_start + end].to_string());
            }
        }
        Err(anyhow!("Attribute {} not found", attr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tag() {
        let xml = r#"<tt:Name>mainStream</tt:Name>"#;
        let result = OnvifClient::extract_tag(xml, "Name").unwrap();
        assert_eq!(result, "mainStream");
    }

    #[test]
    fn test_extract_attribute() {
        let xml = r#"<trt:Profiles token="Profile_1" fixed="true">"#;
        let result = OnvifClient::extract_attribute(xml, "token").unwrap();
        assert_eq!(result, "Profile_1");
    }

    #[test]
    fn test_build_soap_request() {
        let request = OnvifClient::build_soap_request("<Test/>");
        assert!(request.contains("Envelope"));
        assert!(request.contains("<Test/>"));
    }

    #[test]
    fn test_iso8601_duration() {
        assert_eq!(
            OnvifClient::iso8601_duration(Duration::from_secs(3)),
            "PT3S"
        );
    }

    #[test]
    fn test_pan_tilt_move_body() {
        let body =
            OnvifClient::pan_tilt_move_body("Profile_1", 0.5, -0.25, Duration::from_secs(3));
        assert!(body.contains(r#"<ProfileToken>Profile_1</ProfileToken>"#));
        assert!(body.contains(r#"<PanTilt xmlns="http://www.onvif.org/ver10/schema" x="0.5" y="-0.25"/>"#));
        assert!(body.contains("<Timeout>PT3S</Timeout>"));
        assert!(!body.contains("<Zoom"));
    }

    #[test]
    fn test_zoom_move_body() {
        let body = OnvifClient::zoom_move_body("Profile_1", -0.5, Duration::from_secs(3));
        assert!(body.contains(r#"<Zoom xmlns="http://www.onvif.org/ver10/schema" x="-0.5"/>"#));
        assert!(!body.contains("<PanTilt"));
    }

    #[test]
    fn test_parse_profiles() {
        let xml = r#"
            <trt:GetProfilesResponse>
                <trt:Profiles token="Profile_1" fixed="true">
                    <tt:Name>mainStream</tt:Name>
                </trt:Profiles>
                <trt:Profiles token="Profile_2" fixed="true">
                    <tt:Name>subStream</tt:Name>
                </trt:Profiles>
            </trt:GetProfilesResponse>"#;

        let profiles = OnvifClient::parse_profiles(xml).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].token, "Profile_1");
        assert_eq!(profiles[0].name, "mainStream");
        assert_eq!(profiles[1].token, "Profile_2");
    }

    #[test]
    fn test_parse_encoder_configs() {
        let xml = r#"
            <trt:GetVideoEncoderConfigurationsResponse>
                <trt:Configurations token="VideoEncoderConfig_1">
                    <tt:Name>VideoEncoder_1</tt:Name>
                    <tt:Encoding>H264</tt:Encoding>
                    <tt:Resolution>
                        <tt:Width>1920</tt:Width>
                        <tt:Height>1080</tt:Height>
                    </tt:Resolution>
                    <tt:Quality>4.5</tt:Quality>
                </trt:Configurations>
            </trt:GetVideoEncoderConfigurationsResponse>"#;

        let configs = OnvifClient::parse_encoder_configs(xml).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].token, "VideoEncoderConfig_1");
        assert_eq!(configs[0].encoding, "H264");
        assert_eq!(configs[0].width, Some(1920));
        assert_eq!(configs[0].height, Some(1080));
        assert_eq!(configs[0].quality, Some(4.5));
    }
}
