//! Sensor errors

use thiserror::Error;

/// Errors that can occur while talking to the pulse sensor
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("No serial port available")]
    NoPortFound,

    #[error("Permission denied for port {port}; it may be in use by another program")]
    PermissionDenied { port: String },

    #[error("Failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Not connected to sensor")]
    NotConnected,

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SensorError {
    /// Whether the failure is the port being held by someone else
    pub fn is_port_busy(&self) -> bool {
        matches!(self, SensorError::PermissionDenied { .. })
    }
}
