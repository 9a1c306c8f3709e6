//! API Routes

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use fitsense_core::analysis::NormalizedReport;
use fitsense_core::readings::{current_timestamp, Reading};
use fitsense_core::sensor::PortInfo;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Multipart field carrying the video
const VIDEO_FIELD: &str = "video_file";
/// Multipart field carrying the optional prompt
const PROMPT_FIELD: &str = "prompt";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/healthz", get(health_check))
        // Video analysis
        .route(
            "/process_video/",
            post(process_video).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Heart rate feed
        .route("/heart_rate/", post(add_heart_rate).get(list_heart_rate))
        // Device
        .route("/arduino/status", get(device_status))
        .route("/arduino/connect", post(connect_device))
        .route("/arduino/ports", get(list_device_ports))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": fitsense_core::VERSION,
    }))
}

// ========================================
// Video analysis
// ========================================

/// Analyze an uploaded workout video
///
/// Always answers 200 with a report; anything that goes wrong, including a
/// malformed form, degrades to the fallback report.
async fn process_video(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Json<NormalizedReport> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected video upload form");
            return Json(NormalizedReport::fallback());
        }
    };

    let mut video = None;
    let mut prompt = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read video upload form");
                return Json(NormalizedReport::fallback());
            }
        };

        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(VIDEO_FIELD) => match field.bytes().await {
                Ok(bytes) => video = Some(bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read uploaded video");
                    return Json(NormalizedReport::fallback());
                }
            },
            Some(PROMPT_FIELD) => prompt = field.text().await.ok(),
            other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let Some(video) = video else {
        tracing::warn!("No video_file in upload, returning fallback report");
        return Json(NormalizedReport::fallback());
    };

    tracing::info!(size = video.len(), "Received workout video");
    Json(state.analyzer.analyze_bytes(&video, prompt.as_deref()).await)
}

// ========================================
// Heart rate feed
// ========================================

/// Client-submitted reading
#[derive(Debug, Deserialize)]
pub struct HeartRateSubmission {
    pub bpm: f64,
    pub spo2: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

async fn add_heart_rate(
    State(state): State<AppState>,
    body: std::result::Result<Json<HeartRateSubmission>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(submission) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let timestamp = submission
        .timestamp
        .filter(|t| !t.is_empty())
        .unwrap_or_else(current_timestamp);
    let reading = Reading::new(submission.bpm, submission.spo2, timestamp);
    tracing::info!(bpm = reading.bpm, spo2 = reading.spo2, "Heart rate reading submitted");
    state.readings.push(reading).await;

    Ok(Json(json!({
        "message": "Heart rate reading added successfully"
    })))
}

async fn list_heart_rate(State(state): State<AppState>) -> Json<Vec<Reading>> {
    Json(state.readings.all().await)
}

// ========================================
// Device
// ========================================

#[derive(Debug, Serialize)]
struct DeviceStatusResponse {
    connected: bool,
    port: Option<String>,
    readings_count: usize,
}

async fn device_status(State(state): State<AppState>) -> Json<DeviceStatusResponse> {
    let status = state.device.lock().await.status();
    Json(DeviceStatusResponse {
        connected: status.connected,
        port: status.port,
        readings_count: state.readings.len().await,
    })
}

/// Query for a manual connect
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ConnectResponse {
    success: bool,
    message: String,
    port: Option<String>,
}

async fn connect_device(
    State(state): State<AppState>,
    params: std::result::Result<Query<ConnectParams>, QueryRejection>,
) -> Result<Json<ConnectResponse>> {
    let Query(params) = params.map_err(|e| ApiError::Validation(e.body_text()))?;
    let baud_rate = params.baud_rate.unwrap_or(state.config.sensor.baud_rate);
    let requested = params.port.filter(|p| !p.is_empty());

    let device = state.device.clone();
    let result = tokio::task::spawn_blocking(move || {
        device.blocking_lock().connect(requested.as_deref(), baud_rate)
    })
    .await?;

    Ok(Json(match result {
        Ok(port) => ConnectResponse {
            success: true,
            message: format!("Connected to Arduino on {port}"),
            port: Some(port),
        },
        Err(e) => ConnectResponse {
            success: false,
            message: format!("Failed to connect to Arduino: {e}"),
            port: None,
        },
    }))
}

#[derive(Debug, Serialize)]
struct PortsResponse {
    ports: Vec<PortInfo>,
    /// Port auto-discovery would pick
    candidate: Option<String>,
}

async fn list_device_ports(State(state): State<AppState>) -> Result<Json<PortsResponse>> {
    let device = state.device.clone();
    let (ports, candidate) = tokio::task::spawn_blocking(move || {
        let device = device.blocking_lock();
        (device.available_ports(), device.candidate_port())
    })
    .await?;

    Ok(Json(PortsResponse { ports, candidate }))
}
