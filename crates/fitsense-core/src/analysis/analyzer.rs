//! Video analysis orchestration
//!
//! upload -> wait for processing -> generate -> parse -> normalize, all
//! under a single timeout.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::normalize::normalize;
use super::service::{FileState, GenerativeService};
use super::{AnalysisError, NormalizedReport, DEFAULT_PROMPT, VIDEO_MIME_TYPE};
use crate::config::AnalysisConfig;

/// Runs workout videos through a generative model
pub struct VideoAnalyzer {
    service: Arc<dyn GenerativeService>,
    timeout: Duration,
    poll_interval: Duration,
}

impl VideoAnalyzer {
    pub fn new(service: Arc<dyn GenerativeService>, config: &AnalysisConfig) -> Self {
        Self {
            service,
            timeout: config.timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Override the timeout and status poll interval
    pub fn with_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    /// Analyze uploaded video bytes, never failing
    ///
    /// The bytes are spooled to a temporary `.mp4` that is removed when this
    /// returns. Any failure is logged and answered with the fallback report.
    pub async fn analyze_bytes(&self, video: &[u8], prompt: Option<&str>) -> NormalizedReport {
        match self.try_analyze_bytes(video, prompt).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "Video analysis failed, returning fallback report");
                NormalizedReport::fallback()
            }
        }
    }

    async fn try_analyze_bytes(
        &self,
        video: &[u8],
        prompt: Option<&str>,
    ) -> Result<NormalizedReport, AnalysisError> {
        let spool = tempfile::Builder::new()
            .prefix("fitsense-")
            .suffix(".mp4")
            .tempfile()?;
        tokio::fs::write(spool.path(), video).await?;
        tracing::info!(
            path = %spool.path().display(),
            size = video.len(),
            "Temporary video file created"
        );

        let result = self.analyze_file(spool.path(), prompt).await;

        let path = spool.path().to_path_buf();
        match spool.close() {
            Ok(()) => tracing::info!(path = %path.display(), "Temporary video file deleted"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to delete temporary video file"
            ),
        }
        result
    }

    /// Analyze a video file on disk
    ///
    /// A blank or missing prompt is replaced with [`DEFAULT_PROMPT`].
    pub async fn analyze_file(
        &self,
        path: &Path,
        prompt: Option<&str>,
    ) -> Result<NormalizedReport, AnalysisError> {
        let prompt = match prompt.map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_PROMPT,
        };

        tokio::time::timeout(self.timeout, self.run(path, prompt))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout))?
    }

    async fn run(&self, path: &Path, prompt: &str) -> Result<NormalizedReport, AnalysisError> {
        let mut file = self.service.upload(path, VIDEO_MIME_TYPE).await?;
        tracing::info!(name = %file.name, uri = %file.uri, "Completed upload");

        let started = Instant::now();
        while file.state == FileState::Pending {
            tracing::info!(
                elapsed_secs = started.elapsed().as_secs_f64(),
                "Processing..."
            );
            tokio::time::sleep(self.poll_interval).await;
            file.state = self.service.get_status(&file).await?;
        }
        if file.state == FileState::Failed {
            return Err(AnalysisError::ProcessingFailed(file.name));
        }

        tracing::info!("Making inference request");
        let text = self.service.generate(prompt, &file).await?;

        tracing::info!("Response received, parsing JSON");
        let raw: serde_json::Value = serde_json::from_str(&text)?;
        tracing::debug!(
            "Parsed model response: {}",
            serde_json::to_string_pretty(&raw).unwrap_or_default()
        );

        let report = normalize(&raw);
        tracing::debug!(
            "Normalized report: {}",
            serde_json::to_string_pretty(&report).unwrap_or_default()
        );
        Ok(report)
    }
}
