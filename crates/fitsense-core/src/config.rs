//! Service configuration
//!
//! Every tunable of the service lives here. Values start from built-in
//! defaults, may be replaced wholesale by a JSON file named in
//! `FITSENSE_CONFIG`, and are finally overridden field by field from the
//! environment.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default serial baud rate for the pulse sensor
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Number of readings kept in memory
pub const DEFAULT_READING_CAPACITY: usize = 100;

/// Port description substrings that identify the sensor board
pub const DEFAULT_DEVICE_KEYWORDS: [&str; 3] = ["Arduino", "CH340", "USB Serial"];

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Top level configuration for the whole service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,

    /// Video analysis settings
    pub analysis: AnalysisConfig,

    /// Pulse sensor settings
    pub sensor: SensorConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 512 * 1024 * 1024,
            analysis: AnalysisConfig::default(),
            sensor: SensorConfig::default(),
        }
    }
}

/// Generative AI call settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// API key for the generative language service
    pub api_key: String,

    /// Model used for inference
    pub model: String,

    /// Service base URL (without version path)
    pub base_url: String,

    /// Upper bound for upload processing plus inference, in milliseconds
    pub timeout_ms: u64,

    /// Delay between upload status checks, in milliseconds
    pub poll_interval_ms: u64,

    /// Sampling settings sent with every generation request
    pub generation: GenerationSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash-preview-04-17".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_ms: 600_000,
            poll_interval_ms: 10_000,
            generation: GenerationSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Overall analysis timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Upload status poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Sampling parameters for the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    /// MIME type the response is constrained to
    pub response_mime_type: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "application/json".to_string(),
        }
    }
}

/// Serial sensor and poller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Baud rate used when none is requested explicitly
    pub baud_rate: u32,

    /// Serial read timeout in milliseconds
    pub read_timeout_ms: u64,

    /// Poller idle delay between iterations, in milliseconds
    pub idle_tick_ms: u64,

    /// Wait before reconnecting after a lost link, in milliseconds
    pub reconnect_backoff_ms: u64,

    /// Maximum number of readings kept in memory
    pub reading_capacity: usize,

    /// Port description keywords used for auto-discovery
    pub device_keywords: Vec<String>,

    /// Attempt a connection at startup
    pub auto_connect: bool,

    /// Use the simulated sensor instead of real serial ports
    pub demo_mode: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            idle_tick_ms: 100,
            reconnect_backoff_ms: 5000,
            reading_capacity: DEFAULT_READING_CAPACITY,
            device_keywords: DEFAULT_DEVICE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            auto_connect: true,
            demo_mode: false,
        }
    }
}

impl SensorConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from `FITSENSE_CONFIG` (if set) and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("FITSENSE_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("FITSENSE_BIND_ADDR") {
            self.bind_addr = addr;
        }
        override_parsed(&lookup, "FITSENSE_MAX_UPLOAD_BYTES", &mut self.max_upload_bytes)?;

        let analysis = &mut self.analysis;
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            analysis.api_key = key;
        }
        if let Some(model) = lookup("FITSENSE_GEMINI_MODEL") {
            analysis.model = model;
        }
        if let Some(url) = lookup("FITSENSE_GEMINI_BASE_URL") {
            analysis.base_url = url.trim_end_matches('/').to_string();
        }
        override_parsed(&lookup, "FITSENSE_ANALYSIS_TIMEOUT_MS", &mut analysis.timeout_ms)?;
        override_parsed(
            &lookup,
            "FITSENSE_PROCESSING_POLL_MS",
            &mut analysis.poll_interval_ms,
        )?;

        let sensor = &mut self.sensor;
        override_parsed(&lookup, "FITSENSE_BAUD_RATE", &mut sensor.baud_rate)?;
        override_parsed(&lookup, "FITSENSE_READ_TIMEOUT_MS", &mut sensor.read_timeout_ms)?;
        override_parsed(&lookup, "FITSENSE_IDLE_TICK_MS", &mut sensor.idle_tick_ms)?;
        override_parsed(
            &lookup,
            "FITSENSE_RECONNECT_BACKOFF_MS",
            &mut sensor.reconnect_backoff_ms,
        )?;
        if lookup("FITSENSE_READING_CAPACITY").is_some() {
            let mut capacity = NonZeroUsize::MIN;
            override_parsed(&lookup, "FITSENSE_READING_CAPACITY", &mut capacity)?;
            sensor.reading_capacity = capacity.get();
        }
        if sensor.reading_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                var: "sensor.reading_capacity".to_string(),
                value: "0".to_string(),
            });
        }
        if let Some(keywords) = lookup("FITSENSE_DEVICE_KEYWORDS") {
            sensor.device_keywords = keywords
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        override_flag(&lookup, "FITSENSE_AUTO_CONNECT", &mut sensor.auto_connect)?;
        override_flag(&lookup, "FITSENSE_DEMO", &mut sensor.demo_mode)?;

        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, var: &str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(var) {
        *target = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(())
}

fn override_flag<F>(lookup: &F, var: &str, target: &mut bool) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(var) {
        *target = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidValue {
                    var: var.to_string(),
                    value: raw,
                })
            }
        };
    }
    Ok(())
}
