use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use camlink_agent::api::{create_router, AppState};
use camlink_core::{
    CameraSession, CameraTransport, ConfigProvider, ConfigStore, ControlEvent, SessionManager,
};
use camlink_telemetry::ConsoleSink;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

struct UnreachableTransport;

#[async_trait]
impl CameraTransport for UnreachableTransport {
    async fn open(
        &self,
        _host: &str,
        _port: u16,
        _username: &str,
        _password: &str,
    ) -> anyhow::Result<Box<dyn CameraSession>> {
        anyhow::bail!("no device in tests")
    }
}

struct EmptyProvider;

#[async_trait]
impl ConfigProvider for EmptyProvider {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

fn test_state() -> (AppState, mpsc::Receiver<ControlEvent>) {
    let config = Arc::new(ConfigStore::new(Arc::new(EmptyProvider)));
    let sessions = Arc::new(SessionManager::new(
        Arc::new(UnreachableTransport),
        config,
        Arc::new(ConsoleSink),
    ));
    let (teleop_tx, rx) = mpsc::channel(8);
    (AppState { teleop_tx, sessions }, rx)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (state, _rx) = test_state();
    let app = create_router(state);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_teleop_event_is_queued() {
    let (state, mut rx) = test_state();
    let app = create_router(state);

    let payload = serde_json::json!({
        "channel": "joystick",
        "axes": { "linear_x": 0.5, "angular_z": -1.0 }
    });

    let request = Request::builder()
        .uri("/api/v1/teleop")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.channel, "joystick");
    assert_eq!(event.axes.linear_x, 0.5);
    assert_eq!(event.axes.angular_z, -1.0);
    assert!(event.buttons.is_empty());
}

#[tokio::test]
async fn test_state_endpoint_reports_connectivity() {
    let (state, _rx) = test_state();
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/v1/state")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["online"], true);
    assert_eq!(body["connected"], false);
}

#[tokio::test]
async fn test_config_reload_is_accepted() {
    let (state, _rx) = test_state();
    let app = create_router(state);

    let request = Request::builder()
        .uri("/api/v1/config/reload")
        .method("POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}
