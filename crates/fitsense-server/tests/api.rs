use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use fitsense_core::analysis::{
    AnalysisError, FileState, GenerativeService, NormalizedReport, UploadedFile, VideoAnalyzer,
};
use fitsense_core::config::ServiceConfig;
use fitsense_core::readings::ReadingStore;
use fitsense_core::sensor::demo::{DemoPorts, DEMO_PORT};
use fitsense_core::sensor::{
    DeviceConnection, PortInfo, PortLocator, PortProvider, SensorError, SerialLink,
};
use fitsense_server::{create_router, AppState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "fitsense-test-boundary";

/// Generative service answering with a fixed outcome
struct StubService {
    response: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl StubService {
    fn failing() -> Self {
        Self {
            response: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn answering(text: &'static str) -> Self {
        Self {
            response: Some(text),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl GenerativeService for StubService {
    async fn upload(&self, _path: &Path, mime_type: &str) -> Result<UploadedFile, AnalysisError> {
        if self.response.is_none() {
            return Err(AnalysisError::Upload("503: service unavailable".to_string()));
        }
        Ok(UploadedFile {
            name: "files/stub".to_string(),
            uri: "stub://files/stub".to_string(),
            mime_type: mime_type.to_string(),
            state: FileState::Ready,
        })
    }

    async fn get_status(&self, _file: &UploadedFile) -> Result<FileState, AnalysisError> {
        Ok(FileState::Ready)
    }

    async fn generate(&self, prompt: &str, _file: &UploadedFile) -> Result<String, AnalysisError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response
            .map(str::to_string)
            .ok_or(AnalysisError::EmptyResponse)
    }
}

/// Machine with no serial ports at all
struct NoPorts;

impl PortProvider for NoPorts {
    fn list_ports(&self) -> Vec<PortInfo> {
        Vec::new()
    }

    fn open(
        &self,
        port: &str,
        _baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, SensorError> {
        Err(SensorError::OpenFailed {
            port: port.to_string(),
            reason: "No such file or directory".to_string(),
        })
    }
}

fn app_with(service: Arc<StubService>, provider: Arc<dyn PortProvider>) -> Router {
    build_app(ServiceConfig::default(), service, provider)
}

fn build_app(
    config: ServiceConfig,
    service: Arc<StubService>,
    provider: Arc<dyn PortProvider>,
) -> Router {
    let analyzer = VideoAnalyzer::new(service, &config.analysis);
    let device =
        DeviceConnection::new(provider, PortLocator::default(), Duration::from_millis(10))
            .into_shared();
    let readings = Arc::new(ReadingStore::new(config.sensor.reading_capacity));
    create_router(AppState::new(config, analyzer, device, readings))
}

fn app() -> Router {
    app_with(Arc::new(StubService::failing()), Arc::new(NoPorts))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(prompt: Option<&str>) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"video_file\"; filename=\"workout.mp4\"\r\n\
         Content-Type: video/mp4\r\n\r\n\
         not really a video\r\n"
    );
    if let Some(prompt) = prompt {
        body.push_str(&format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"prompt\"\r\n\r\n\
             {prompt}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri("/process_video/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_process_video_failure_returns_fallback() {
    let (status, body) = send(&app(), upload_request(None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::to_value(NormalizedReport::fallback()).unwrap());
}

#[tokio::test]
async fn test_process_video_returns_normalized_report() {
    let service = Arc::new(StubService::answering(
        r#"{"workout_report": {"exercises": [{"name": "Kettlebell Swing", "sets": 4, "reps": 15}],
            "nutrition_plan": [{"meal": "Late Snack", "time": "22:00", "food": "Casein"}]}}"#,
    ));
    let app = app_with(service.clone(), Arc::new(NoPorts));

    let (status, body) = send(&app, upload_request(Some("count my swings"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["workout_exercises"],
        json!([{ "name": "Kettlebell Swing", "sets": "4", "reps": "15" }])
    );
    assert_eq!(
        body["nutrition_plan"],
        json!({ "late_snack": { "time": "22:00", "food": "Casein" } })
    );
    assert!(body["facial_emotions"].as_array().is_some_and(|a| !a.is_empty()));
    assert_eq!(*service.prompts.lock().unwrap(), vec!["count my swings".to_string()]);
}

#[tokio::test]
async fn test_process_video_without_video_returns_fallback() {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"prompt\"\r\n\r\n\
         hi\r\n\
         --{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/process_video/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::to_value(NormalizedReport::fallback()).unwrap());
}

#[tokio::test]
async fn test_process_video_not_multipart_returns_fallback() {
    let (status, body) = send(&app(), post_json("/process_video/", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::to_value(NormalizedReport::fallback()).unwrap());
}

#[tokio::test]
async fn test_heart_rate_submit_then_list() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json(
            "/heart_rate/",
            json!({ "bpm": 88.0, "spo2": 97.5, "timestamp": "2024-05-01T10:00:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Heart rate reading added successfully" }));

    send(&app, post_json("/heart_rate/", json!({ "bpm": 90, "spo2": 96 }))).await;

    let (status, body) = send(&app, get("/heart_rate/")).await;
    assert_eq!(status, StatusCode::OK);
    let readings = body.as_array().unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(
        readings[0],
        json!({ "bpm": 88.0, "spo2": 97.5, "timestamp": "2024-05-01T10:00:00" })
    );
    assert_eq!(readings[1]["bpm"], json!(90.0));
    assert!(!readings[1]["timestamp"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_heart_rate_feed_respects_capacity() {
    let mut config = ServiceConfig::default();
    config.sensor.reading_capacity = 3;
    let app = build_app(config, Arc::new(StubService::failing()), Arc::new(NoPorts));

    for second in 0..4 {
        let timestamp = format!("2024-05-01T10:00:0{second}");
        let (status, _) = send(
            &app,
            post_json(
                "/heart_rate/",
                json!({ "bpm": 80 + second, "spo2": 98, "timestamp": timestamp }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get("/heart_rate/")).await;
    let timestamps: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    assert_eq!(
        timestamps,
        vec!["2024-05-01T10:00:01", "2024-05-01T10:00:02", "2024-05-01T10:00:03"]
    );
    assert_eq!(body[0]["bpm"], json!(81.0));

    let (_, body) = send(&app, get("/arduino/status")).await;
    assert_eq!(body["readings_count"], json!(3));
}

#[tokio::test]
async fn test_heart_rate_rejects_malformed_submission() {
    let (status, body) = send(&app(), post_json("/heart_rate/", json!({ "bpm": "fast" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_status_without_device() {
    let app = app();
    send(&app, post_json("/heart_rate/", json!({ "bpm": 70, "spo2": 99 }))).await;

    let (status, body) = send(&app, get("/arduino/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "connected": false, "port": null, "readings_count": 1 })
    );
}

#[tokio::test]
async fn test_connect_without_ports_fails() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/arduino/connect")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["port"], Value::Null);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to connect to Arduino"));
}

#[tokio::test]
async fn test_connect_to_demo_sensor() {
    let app = app_with(Arc::new(StubService::failing()), Arc::new(DemoPorts::new()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/arduino/connect?baud_rate=115200")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "message": format!("Connected to Arduino on {DEMO_PORT}"),
            "port": DEMO_PORT,
        })
    );

    let (_, body) = send(&app, get("/arduino/status")).await;
    assert_eq!(body["connected"], json!(true));
    assert_eq!(body["port"], json!(DEMO_PORT));
}

#[tokio::test]
async fn test_ports_listing_marks_candidate() {
    let app = app_with(Arc::new(StubService::failing()), Arc::new(DemoPorts::new()));

    let (status, body) = send(&app, get("/arduino/ports")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["candidate"], json!(DEMO_PORT));
    assert_eq!(body["ports"][0]["name"], json!(DEMO_PORT));
}

#[tokio::test]
async fn test_healthz() {
    let (status, body) = send(&app(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], fitsense_core::VERSION);
}
