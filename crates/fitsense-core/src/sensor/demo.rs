//! Demo Mode - Simulated pulse oximeter
//!
//! Advertises one Arduino-like port and emits `<DATA,bpm,spo2>` frames
//! about once a second, so the whole sensor path can run without hardware.
//! Heart rate drifts around a resting value with occasional effort spikes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::time::{Duration, Instant};

use super::{PortInfo, PortProvider, SensorError, SerialLink};

/// Name of the simulated port
pub const DEMO_PORT: &str = "demo0";

/// Interval between simulated frames
const FRAME_INTERVAL: Duration = Duration::from_millis(1000);

/// Port provider exposing a single simulated sensor
#[derive(Debug, Clone)]
pub struct DemoPorts {
    seed: Option<u64>,
    frame_interval: Duration,
}

impl Default for DemoPorts {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoPorts {
    pub fn new() -> Self {
        Self {
            seed: None,
            frame_interval: FRAME_INTERVAL,
        }
    }

    /// Deterministic simulator with a custom frame interval
    pub fn seeded(seed: u64, frame_interval: Duration) -> Self {
        Self {
            seed: Some(seed),
            frame_interval,
        }
    }
}

impl PortProvider for DemoPorts {
    fn list_ports(&self) -> Vec<PortInfo> {
        vec![PortInfo::new(DEMO_PORT, "Arduino Uno (simulated pulse sensor)")]
    }

    fn open(
        &self,
        port: &str,
        _baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, SensorError> {
        if port != DEMO_PORT {
            return Err(SensorError::OpenFailed {
                port: port.to_string(),
                reason: "no such simulated port".to_string(),
            });
        }
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Box::new(DemoLink::new(rng, self.frame_interval)))
    }
}

/// Simulated device link
pub struct DemoLink {
    rng: StdRng,
    frame_interval: Duration,
    next_frame_at: Instant,
    /// Current heart rate (smoothed)
    bpm: f64,
    spo2: f64,
    /// Remaining frames of an effort spike
    spike_frames: u32,
    pending: Option<Vec<u8>>,
}

impl DemoLink {
    fn new(rng: StdRng, frame_interval: Duration) -> Self {
        Self {
            rng,
            frame_interval,
            next_frame_at: Instant::now(),
            bpm: 72.0,
            spo2: 98.0,
            spike_frames: 0,
            pending: None,
        }
    }

    /// Advance the simulation by one frame
    fn next_sample(&mut self) -> (f64, f64) {
        if self.spike_frames == 0 && self.rng.gen_bool(0.05) {
            self.spike_frames = self.rng.gen_range(5..15);
        }

        let target = if self.spike_frames > 0 {
            self.spike_frames -= 1;
            125.0
        } else {
            72.0
        };
        self.bpm += (target - self.bpm) * 0.2 + self.rng.gen_range(-1.5..1.5);
        self.bpm = self.bpm.clamp(45.0, 180.0);

        let spo2_target = if self.spike_frames > 0 { 96.0 } else { 98.0 };
        self.spo2 += (spo2_target - self.spo2) * 0.3 + self.rng.gen_range(-0.3..0.3);
        self.spo2 = self.spo2.clamp(90.0, 100.0);

        (self.bpm, self.spo2)
    }

    fn fill(&mut self) {
        if self.pending.is_none() && Instant::now() >= self.next_frame_at {
            let (bpm, spo2) = self.next_sample();
            self.pending = Some(format!("<DATA,{bpm:.1},{spo2:.1}>\r\n").into_bytes());
            self.next_frame_at = Instant::now() + self.frame_interval;
        }
    }
}

impl SerialLink for DemoLink {
    fn port_name(&self) -> &str {
        DEMO_PORT
    }

    fn bytes_available(&mut self) -> io::Result<u32> {
        self.fill();
        Ok(self.pending.as_ref().map_or(0, |line| line.len() as u32))
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        self.fill();
        Ok(self.pending.take().unwrap_or_default())
    }
}
