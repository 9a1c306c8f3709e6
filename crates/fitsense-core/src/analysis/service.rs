//! Generative AI service seam
//!
//! The analyzer only needs three calls from the remote model: upload a
//! media file, check whether it finished processing, and run a prompt
//! against it. Tests substitute their own implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::AnalysisError;

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    /// Still being processed remotely
    Pending,
    /// Ready to be referenced in a prompt
    Ready,
    /// Processing failed; the file cannot be used
    Failed,
}

/// Handle to a file held by the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Service resource name (e.g. `files/abc123`)
    pub name: String,
    /// URI used to reference the file in prompts
    pub uri: String,
    pub mime_type: String,
    /// State reported at upload time
    pub state: FileState,
}

/// Remote generative model operations used by the analyzer
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Upload a local media file
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<UploadedFile, AnalysisError>;

    /// Current processing state of an uploaded file
    async fn get_status(&self, file: &UploadedFile) -> Result<FileState, AnalysisError>;

    /// Run `prompt` against the file and return the raw response text
    async fn generate(&self, prompt: &str, file: &UploadedFile) -> Result<String, AnalysisError>;
}
