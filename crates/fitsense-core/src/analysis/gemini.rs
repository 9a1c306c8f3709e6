//! Gemini REST client
//!
//! Talks to the generative language API: raw media upload, file status
//! lookup and `generateContent` with a JSON-constrained response.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

use super::service::{FileState, GenerativeService, UploadedFile};
use super::AnalysisError;
use crate::config::{AnalysisConfig, GenerationSettings};

/// File resource as returned by the files API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: Option<GeminiFile>,
}

/// Generative language API client
pub struct GeminiClient {
    /// HTTP client for API requests
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    generation: GenerationSettings,
}

impl GeminiClient {
    /// Create a client from analysis settings
    pub fn new(config: &AnalysisConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fitsense/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            generation: config.generation.clone(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/v1beta/files", self.base_url)
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/v1beta/{}", self.base_url, name)
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Request body for a prompt against an uploaded file
    fn generate_body(&self, prompt: &str, file: &UploadedFile) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt },
                    { "file_data": { "mime_type": file.mime_type, "file_uri": file.uri } }
                ]
            }],
            "generationConfig": {
                "temperature": self.generation.temperature,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
                "maxOutputTokens": self.generation.max_output_tokens,
                "responseMimeType": self.generation.response_mime_type,
            }
        })
    }
}

/// Map the service's state names onto [`FileState`]
fn parse_state(state: Option<&str>) -> FileState {
    match state {
        Some("ACTIVE") => FileState::Ready,
        Some("FAILED") => FileState::Failed,
        // PROCESSING, STATE_UNSPECIFIED or absent
        _ => FileState::Pending,
    }
}

/// Concatenate the text parts of the first candidate
fn response_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<UploadedFile, AnalysisError> {
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Uploading media");

        let response = self
            .client
            .post(self.upload_url())
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Upload(format!("{status}: {detail}")));
        }

        let file = response
            .json::<UploadResponse>()
            .await?
            .file
            .ok_or_else(|| AnalysisError::Upload("response carried no file".to_string()))?;

        Ok(UploadedFile {
            state: parse_state(file.state.as_deref()),
            mime_type: file.mime_type.unwrap_or_else(|| mime_type.to_string()),
            name: file.name,
            uri: file.uri,
        })
    }

    async fn get_status(&self, file: &UploadedFile) -> Result<FileState, AnalysisError> {
        let remote = self
            .client
            .get(self.file_url(&file.name))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<GeminiFile>()
            .await?;
        Ok(parse_state(remote.state.as_deref()))
    }

    async fn generate(&self, prompt: &str, file: &UploadedFile) -> Result<String, AnalysisError> {
        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.generate_body(prompt, file))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Generate(format!("{status}: {detail}")));
        }

        let body: Value = response.json().await?;
        response_text(&body).ok_or(AnalysisError::EmptyResponse)
    }
}
