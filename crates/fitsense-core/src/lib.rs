//! # fitsense Core Library
//!
//! Core functionality for the fitsense workout backend.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Normalization of free-form generative AI workout reports into a fixed schema
//! - A Gemini-backed video analysis pipeline with a never-fail fallback policy
//! - Serial port discovery and connection management for a pulse oximeter
//! - The `<DATA,bpm,spo2>` line protocol parser
//! - A bounded in-memory store of heart rate readings and the background poller feeding it
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitsense_core::analysis::normalize;
//! use fitsense_core::sensor::parse_line;
//!
//! let report = normalize(&serde_json::json!({ "exercises": [] }));
//! assert!(!report.facial_emotions.is_empty());
//!
//! let sample = parse_line("<DATA,72.5,98.1>").unwrap();
//! assert_eq!(sample.bpm, 72.5);
//! ```

pub mod analysis;
pub mod config;
pub mod readings;
pub mod sensor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analysis::{
        normalize, AnalysisError, GeminiClient, GenerativeService, NormalizedReport,
        VideoAnalyzer,
    };
    pub use crate::config::{AnalysisConfig, ConfigError, SensorConfig, ServiceConfig};
    pub use crate::readings::{Reading, ReadingStore};
    pub use crate::sensor::{
        DeviceConnection, DeviceStatus, PortInfo, PortLocator, PortProvider, Poller,
        SensorError, SerialLink, SharedDevice,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
