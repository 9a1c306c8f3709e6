//! Connection management
//!
//! Owns the single device link and its lifecycle. At most one link is open
//! at any time: connecting always releases the previous one first.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{PortLocator, PortProvider, SensorError, SerialLink};

/// Device connection shared between the poller and HTTP handlers
pub type SharedDevice = Arc<Mutex<DeviceConnection>>;

/// Snapshot of the connection state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub connected: bool,
    /// Port of the live link, `None` when disconnected
    pub port: Option<String>,
}

/// Pulse sensor connection manager
pub struct DeviceConnection {
    /// Port enumeration and opening
    provider: Arc<dyn PortProvider>,
    /// Auto-discovery policy when no port is requested
    locator: PortLocator,
    /// Live link; `Some` exactly when connected
    link: Option<Box<dyn SerialLink>>,
    /// Read timeout applied to every opened port
    read_timeout: Duration,
}

impl DeviceConnection {
    /// Create a disconnected manager
    pub fn new(
        provider: Arc<dyn PortProvider>,
        locator: PortLocator,
        read_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            locator,
            link: None,
            read_timeout,
        }
    }

    /// Wrap into the shared handle used across tasks
    pub fn into_shared(self) -> SharedDevice {
        Arc::new(Mutex::new(self))
    }

    /// Ports currently visible to the provider
    pub fn available_ports(&self) -> Vec<super::PortInfo> {
        self.provider.list_ports()
    }

    /// The port auto-discovery would pick right now
    pub fn candidate_port(&self) -> Option<String> {
        let ports = self.provider.list_ports();
        self.locator.locate(&ports).map(|p| p.name.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Port of the live link
    pub fn port_name(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.port_name())
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            connected: self.is_connected(),
            port: self.port_name().map(str::to_string),
        }
    }

    /// Connect to `port`, or to the discovered sensor port when `None`
    ///
    /// Any existing link is released first, so a failed attempt always
    /// leaves the manager disconnected. Returns the connected port name.
    pub fn connect(&mut self, port: Option<&str>, baud_rate: u32) -> Result<String, SensorError> {
        let port = match port {
            Some(p) => p.to_string(),
            None => match self.candidate_port() {
                Some(p) => p,
                None => {
                    tracing::error!("No sensor port available");
                    self.close();
                    return Err(SensorError::NoPortFound);
                }
            },
        };

        if self.link.is_some() {
            self.close();
            tracing::info!("Closed existing serial connection");
        }

        match self.provider.open(&port, baud_rate, self.read_timeout) {
            Ok(link) => {
                self.link = Some(link);
                tracing::info!(port = %port, baud_rate, "Connected to sensor");
                Ok(port)
            }
            Err(e) => {
                if e.is_port_busy() {
                    tracing::error!(
                        port = %port,
                        "Permission denied for port; it may be in use by another program. \
                         Close any other program using the serial port (such as a serial monitor)"
                    );
                } else {
                    tracing::error!(port = %port, error = %e, "Failed to connect to sensor");
                }
                Err(e)
            }
        }
    }

    /// Release the device handle if held; idempotent
    pub fn close(&mut self) {
        if let Some(link) = self.link.take() {
            let port = link.port_name().to_string();
            if let Err(e) = link.close() {
                tracing::warn!(port = %port, error = %e, "Error closing serial connection");
            }
        }
    }

    /// Drop the link after a device fault without attempting a clean close
    pub fn mark_disconnected(&mut self) {
        if let Some(link) = self.link.take() {
            tracing::warn!(port = %link.port_name(), "Sensor link marked disconnected");
        }
    }

    /// Read one line if bytes are waiting
    ///
    /// `Ok(None)` means nothing to read. An error means the link is broken;
    /// the caller decides when to drop it.
    pub fn poll_line(&mut self) -> Result<Option<Vec<u8>>, SensorError> {
        let link = self.link.as_mut().ok_or(SensorError::NotConnected)?;
        if link.bytes_available()? == 0 {
            return Ok(None);
        }
        Ok(Some(link.read_line()?))
    }
}

impl Drop for DeviceConnection {
    fn drop(&mut self) {
        self.close();
    }
}
