//! Analysis errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while analyzing a video
///
/// None of these reach an HTTP client; they are logged and replaced with
/// the fallback report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Video processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Analysis timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation failed: {0}")]
    Generate(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
