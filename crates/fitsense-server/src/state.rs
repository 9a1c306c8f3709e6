//! Application state
//!
//! Process-scoped services constructed once at startup and shared with
//! every handler.

use fitsense_core::analysis::VideoAnalyzer;
use fitsense_core::config::ServiceConfig;
use fitsense_core::readings::ReadingStore;
use fitsense_core::sensor::SharedDevice;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ServiceConfig>,
    /// Video analysis pipeline
    pub analyzer: Arc<VideoAnalyzer>,
    /// Sensor connection, shared with the poller
    pub device: SharedDevice,
    /// Heart rate history
    pub readings: Arc<ReadingStore>,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        analyzer: VideoAnalyzer,
        device: SharedDevice,
        readings: Arc<ReadingStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            analyzer: Arc::new(analyzer),
            device,
            readings,
        }
    }
}
