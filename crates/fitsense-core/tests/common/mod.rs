//! Scripted serial devices for sensor tests

#![allow(dead_code)]

use fitsense_core::sensor::{PortInfo, PortProvider, SensorError, SerialLink};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted event on a mock link
#[derive(Debug, Clone)]
pub enum Script {
    Line(&'static str),
    Fault,
}

/// Counters shared by a provider and every link it opened
#[derive(Default)]
pub struct MockState {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub open_handles: AtomicUsize,
    pub max_open_handles: AtomicUsize,
    pub last_baud: AtomicUsize,
    busy: Mutex<Vec<String>>,
    scripts: Mutex<VecDeque<Vec<Script>>>,
}

impl MockState {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn max_open_handles(&self) -> usize {
        self.max_open_handles.load(Ordering::SeqCst)
    }
}

pub struct MockPorts {
    ports: Vec<PortInfo>,
    pub state: Arc<MockState>,
}

impl MockPorts {
    pub fn new(ports: &[(&str, &str)]) -> Self {
        Self {
            ports: ports
                .iter()
                .map(|(name, description)| PortInfo::new(*name, *description))
                .collect(),
            state: Arc::new(MockState::default()),
        }
    }

    /// Sensor board on /dev/ttyACM0 next to an unrelated port
    pub fn with_sensor() -> Self {
        Self::new(&[("/dev/ttyS0", "n/a"), ("/dev/ttyACM0", "Arduino Uno")])
    }

    /// Script for the next opened link; later opens use later scripts
    pub fn script(self, items: Vec<Script>) -> Self {
        self.state.scripts.lock().unwrap().push_back(items);
        self
    }

    pub fn busy(self, port: &str) -> Self {
        self.state.busy.lock().unwrap().push(port.to_string());
        self
    }
}

impl PortProvider for MockPorts {
    fn list_ports(&self) -> Vec<PortInfo> {
        self.ports.clone()
    }

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        _timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, SensorError> {
        if self.state.busy.lock().unwrap().iter().any(|p| p == port) {
            return Err(SensorError::PermissionDenied {
                port: port.to_string(),
            });
        }
        if !self.ports.iter().any(|p| p.name == port) {
            return Err(SensorError::OpenFailed {
                port: port.to_string(),
                reason: "No such file or directory".to_string(),
            });
        }

        self.state.opens.fetch_add(1, Ordering::SeqCst);
        self.state.last_baud.store(baud_rate as usize, Ordering::SeqCst);
        let now_open = self.state.open_handles.fetch_add(1, Ordering::SeqCst) + 1;
        self.state
            .max_open_handles
            .fetch_max(now_open, Ordering::SeqCst);

        let script = self.state.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::new(MockLink {
            name: port.to_string(),
            script: script.into(),
            state: self.state.clone(),
        }))
    }
}

pub struct MockLink {
    name: String,
    script: VecDeque<Script>,
    state: Arc<MockState>,
}

impl SerialLink for MockLink {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> io::Result<u32> {
        match self.script.front() {
            Some(Script::Line(line)) => Ok(line.len() as u32),
            Some(Script::Fault) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            )),
            None => Ok(0),
        }
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        match self.script.pop_front() {
            Some(Script::Line(line)) => Ok(line.as_bytes().to_vec()),
            Some(Script::Fault) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            )),
            None => Ok(Vec::new()),
        }
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        self.state.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}
