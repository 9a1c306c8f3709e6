//! fitsense server
//!
//! Main entry point: wires the analysis pipeline, the sensor poller and the
//! HTTP surface together.

use fitsense_core::analysis::{GeminiClient, VideoAnalyzer};
use fitsense_core::config::ServiceConfig;
use fitsense_core::readings::ReadingStore;
use fitsense_core::sensor::{
    demo::DemoPorts, DeviceConnection, PortLocator, PortProvider, Poller, PollerConfig,
    SystemPorts,
};
use fitsense_server::{create_router, AppState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fitsense_server=debug,fitsense_core=debug,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting fitsense server v{}", fitsense_core::VERSION);

    let config = ServiceConfig::load()?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        model = %config.analysis.model,
        demo_mode = config.sensor.demo_mode,
        baud_rate = config.sensor.baud_rate,
        "Configuration loaded"
    );
    if config.analysis.api_key.is_empty() {
        tracing::warn!("GOOGLE_API_KEY is not set; video analysis will return fallback reports");
    }

    // Analysis pipeline
    let gemini = Arc::new(GeminiClient::new(&config.analysis));
    let analyzer = VideoAnalyzer::new(gemini, &config.analysis);

    // Sensor
    let provider: Arc<dyn PortProvider> = if config.sensor.demo_mode {
        tracing::info!("Demo mode enabled, using simulated pulse sensor");
        Arc::new(DemoPorts::new())
    } else {
        Arc::new(SystemPorts)
    };
    let device = DeviceConnection::new(
        provider,
        PortLocator::new(config.sensor.device_keywords.clone()),
        config.sensor.read_timeout(),
    )
    .into_shared();
    let readings = Arc::new(ReadingStore::new(config.sensor.reading_capacity));
    tracing::debug!(capacity = readings.capacity().await, "Reading store ready");

    if config.sensor.auto_connect {
        let startup_device = device.clone();
        let baud_rate = config.sensor.baud_rate;
        let connected = tokio::task::spawn_blocking(move || {
            startup_device.blocking_lock().connect(None, baud_rate)
        })
        .await?;
        if let Err(e) = connected {
            tracing::warn!(error = %e, "No sensor at startup, poller will keep retrying");
        }
    }

    let shutdown = CancellationToken::new();
    let poller = Poller::new(
        device.clone(),
        readings.clone(),
        PollerConfig::from(&config.sensor),
    )
    .spawn(shutdown.clone());
    tracing::info!("Sensor reading task started");

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, analyzer, device.clone(), readings);
    let app = create_router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    shutdown.cancel();
    if let Err(e) = poller.await {
        tracing::error!(error = %e, "Sensor reading task ended abnormally");
    }
    device.lock().await.close();
    tracing::info!("Sensor connection closed");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
