use camlink_agent::api::{self, AppState};
use camlink_agent::provider::FileOptionsProvider;
use camlink_agent::settings::AgentSettings;
use camlink_core::{CommandDispatcher, ConfigStore, SessionManager, StatePublisher};
use camlink_onvif::OnvifTransport;
use camlink_telemetry::EventSeverity;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Camlink ONVIF PTZ adapter")]
struct Args {
    /// Settings file path
    #[arg(short, long, default_value = "camlink.toml")]
    config: String,

    /// Override the HTTP bind address
    #[arg(long)]
    http_bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = AgentSettings::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level())
        .init();

    info!("Starting camlink adapter with settings: {}", args.config);

    let telemetry = settings.telemetry.build();
    let config = Arc::new(ConfigStore::new(Arc::new(FileOptionsProvider::new(
        settings.options_file.clone(),
    ))));
    if let Err(e) = config.refresh().await {
        warn!("Initial config refresh failed, continuing with defaults: {}", e);
    }

    let sessions = Arc::new(SessionManager::new(
        Arc::new(OnvifTransport),
        config.clone(),
        telemetry.clone(),
    ));

    if let Err(e) = telemetry
        .create_event("camlink adapter online", EventSeverity::Info)
        .await
    {
        warn!("Failed to emit online event: {}", e);
    }

    // First connection attempt runs in the background; the wait below is
    // bounded, and the publisher keeps retrying if the device is not up yet.
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let _ = sessions.reconnect().await;
        });
    }
    let startup = Duration::from_secs(settings.startup_timeout_secs);
    match sessions.wait_until_connected(startup).await {
        Ok(()) => info!("Device connected"),
        Err(e) => warn!("Proceeding without device connection: {}", e),
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let publisher = Arc::new(StatePublisher::new(
        sessions.clone(),
        telemetry.clone(),
        Duration::from_secs(settings.publish_interval_secs),
    ));
    let publisher_handle = publisher.start(stop_rx);

    let (teleop_tx, teleop_rx) = mpsc::channel(64);
    let dispatcher = Arc::new(CommandDispatcher::new(
        sessions.clone(),
        config.clone(),
        telemetry.clone(),
    ));
    let dispatcher_handle = dispatcher.start(teleop_rx);

    let app = api::create_router(AppState {
        teleop_tx,
        sessions: sessions.clone(),
    });

    let addr = args.http_bind.unwrap_or(settings.http_bind);
    info!("HTTP API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    let _ = stop_tx.send(true);
    let _ = publisher_handle.await;
    dispatcher_handle.abort();
    Ok(())
}
