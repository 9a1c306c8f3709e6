//! Workout Video Analysis
//!
//! Uploads a workout video to a generative AI service, asks it for a JSON
//! report and reconciles whatever comes back into a [`NormalizedReport`].
//!
//! The pipeline never fails towards the caller: an upload, processing or
//! parsing failure yields [`NormalizedReport::fallback`].

mod analyzer;
mod error;
mod gemini;
pub mod normalize;
mod report;
mod service;

pub use analyzer::VideoAnalyzer;
pub use error::AnalysisError;
pub use gemini::GeminiClient;
pub use normalize::normalize;
pub use report::{EmotionMark, Exercise, Meal, NormalizedReport};
pub use service::{FileState, GenerativeService, UploadedFile};

/// Prompt used when the client does not supply one
pub const DEFAULT_PROMPT: &str = "Analyze the video and provide a JSON report with workout \
exercises minimum 5 (name of exercise, sets, reps), facial emotions minimum 10 (emotion, \
timestamp), voice emotions minimum 8 (emotion, timestamp), and nutrition plan (meal, time, food)";

/// MIME type the uploaded video is declared as
pub const VIDEO_MIME_TYPE: &str = "video/mp4";
