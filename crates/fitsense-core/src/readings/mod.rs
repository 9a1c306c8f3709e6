//! Heart rate readings
//!
//! Bounded in-memory history of pulse oximeter samples. The poller and
//! HTTP submissions append; status and query handlers read.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::config::DEFAULT_READING_CAPACITY;

/// One sensor sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Heart rate in beats per minute
    pub bpm: f64,
    /// Oxygen saturation in percent
    pub spo2: f64,
    /// ISO-8601 time the sample was taken
    pub timestamp: String,
}

impl Reading {
    /// Create a reading with an explicit timestamp
    pub fn new(bpm: f64, spo2: f64, timestamp: impl Into<String>) -> Self {
        Self {
            bpm,
            spo2,
            timestamp: timestamp.into(),
        }
    }

    /// Create a reading stamped with the current wall-clock time
    pub fn now(bpm: f64, spo2: f64) -> Self {
        Self::new(bpm, spo2, current_timestamp())
    }
}

/// Current local time as an ISO-8601 string
pub fn current_timestamp() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Ring of readings, oldest first
struct ReadingRing {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl ReadingRing {
    fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, reading: Reading) {
        self.readings.push_back(reading);
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }
}

/// Shared, capacity-bounded reading history
pub struct ReadingStore {
    ring: RwLock<ReadingRing>,
}

impl ReadingStore {
    /// Create an empty store holding at most `capacity` readings
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(ReadingRing::new(capacity)),
        }
    }

    /// Append a reading, evicting the oldest ones beyond capacity
    pub async fn push(&self, reading: Reading) {
        let mut ring = self.ring.write().await;
        ring.push(reading);
        tracing::trace!(count = ring.readings.len(), "Reading stored");
    }

    /// All readings, oldest to newest
    pub async fn all(&self) -> Vec<Reading> {
        let ring = self.ring.read().await;
        ring.readings.iter().cloned().collect()
    }

    /// Number of readings currently held
    pub async fn len(&self) -> usize {
        self.ring.read().await.readings.len()
    }

    /// Whether no readings are held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Maximum number of readings kept
    pub async fn capacity(&self) -> usize {
        self.ring.read().await.capacity
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new(DEFAULT_READING_CAPACITY)
    }
}
