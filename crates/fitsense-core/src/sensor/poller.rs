//! Background sensor poller
//!
//! Keeps the device connected and moves parsed frames into the
//! [`ReadingStore`]. Serial I/O is blocking, so each device step runs on
//! the blocking pool while the loop itself stays on the async runtime and
//! checks its cancellation token between steps.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{decode_line, parse_line, SensorError, SharedDevice};
use crate::config::SensorConfig;
use crate::readings::{Reading, ReadingStore};

/// Poller timing and connection settings
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Delay at the end of every iteration
    pub idle_tick: Duration,
    /// Wait after a lost link or a connect attempt
    pub reconnect_backoff: Duration,
    /// Baud rate for reconnects
    pub baud_rate: u32,
}

impl From<&SensorConfig> for PollerConfig {
    fn from(config: &SensorConfig) -> Self {
        Self {
            idle_tick: config.idle_tick(),
            reconnect_backoff: config.reconnect_backoff(),
            baud_rate: config.baud_rate,
        }
    }
}

/// Result of one device step
enum Step {
    /// A line was read
    Line(Vec<u8>),
    /// Connected, nothing waiting
    Idle,
    /// The link faulted during a read
    Faulted(SensorError),
    /// No link is open
    Disconnected,
}

/// Long-running task feeding the reading store from the sensor
pub struct Poller {
    device: SharedDevice,
    store: Arc<ReadingStore>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(device: SharedDevice, store: Arc<ReadingStore>, config: PollerConfig) -> Self {
        Self {
            device,
            store,
            config,
        }
    }

    /// Spawn the poll loop on the current runtime
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// Run until `token` is cancelled
    pub async fn run(self, token: CancellationToken) {
        tracing::info!("Sensor poller started");

        while !token.is_cancelled() {
            match self.step().await {
                Step::Line(raw) => self.handle_line(&raw).await,
                Step::Idle => {}
                Step::Faulted(e) => {
                    tracing::error!(error = %e, "Error reading from sensor");
                    self.with_device(|device| device.mark_disconnected()).await;
                    if !pause(&token, self.config.reconnect_backoff).await {
                        break;
                    }
                    self.reconnect().await;
                }
                Step::Disconnected => {
                    self.reconnect().await;
                    if !pause(&token, self.config.reconnect_backoff).await {
                        break;
                    }
                }
            }

            if !pause(&token, self.config.idle_tick).await {
                break;
            }
        }

        tracing::info!("Sensor poller stopped");
    }

    async fn step(&self) -> Step {
        self.with_device(|device| {
            if !device.is_connected() {
                return Step::Disconnected;
            }
            match device.poll_line() {
                Ok(Some(line)) => Step::Line(line),
                Ok(None) => Step::Idle,
                Err(e) => Step::Faulted(e),
            }
        })
        .await
        .unwrap_or_else(|| Step::Faulted(SensorError::Serial("device task panicked".to_string())))
    }

    async fn handle_line(&self, raw: &[u8]) {
        let line = decode_line(raw);
        if line.is_empty() {
            return;
        }
        tracing::debug!(line = %line, "Raw sensor data");

        if let Some(sample) = parse_line(&line) {
            self.store.push(Reading::now(sample.bpm, sample.spo2)).await;
            tracing::info!(bpm = sample.bpm, spo2 = sample.spo2, "Stored heart rate data");
        }
    }

    async fn reconnect(&self) {
        let baud_rate = self.config.baud_rate;
        // Failures are logged by the connection manager
        let _ = self
            .with_device(move |device| device.connect(None, baud_rate))
            .await;
    }

    /// Run a blocking closure against the locked device
    async fn with_device<F, T>(&self, f: F) -> Option<T>
    where
        F: FnOnce(&mut super::DeviceConnection) -> T + Send + 'static,
        T: Send + 'static,
    {
        let device = self.device.clone();
        match tokio::task::spawn_blocking(move || {
            let mut guard = device.blocking_lock();
            f(&mut guard)
        })
        .await
        {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(error = %e, "Device task failed");
                None
            }
        }
    }
}

/// Sleep for `duration`; false if cancelled first
async fn pause(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
