//! Serial port handling
//!
//! Port enumeration, opening, and the line-oriented link the poller reads
//! from. [`SerialLink`] and [`PortProvider`] are the seams that let the
//! connection manager run against simulated or scripted devices.

use serde::Serialize;
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use super::SensorError;

/// Description reported for ports that carry none
const NO_DESCRIPTION: &str = "n/a";

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// Human readable description used for device matching
    pub description: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// Port with only a name and description
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                let description = usb_info
                    .product
                    .clone()
                    .or_else(|| usb_info.manufacturer.clone())
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string());
                Self {
                    name: info.port_name,
                    description,
                    vid: Some(usb_info.vid),
                    pid: Some(usb_info.pid),
                    manufacturer: usb_info.manufacturer,
                    product: usb_info.product,
                }
            }
            SerialPortType::BluetoothPort => Self::new(info.port_name, "Bluetooth serial port"),
            SerialPortType::PciPort => Self::new(info.port_name, "PCI serial port"),
            SerialPortType::Unknown => Self::new(info.port_name, NO_DESCRIPTION),
        }
    }
}

/// Helper used to sort port names so that:
///  - ttyACM* ports come first (sorted numerically by suffix)
///  - then ttyUSB* ports (sorted numerically)
///  - then other ports (sorted by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    match serialport::available_ports() {
        Ok(found) => {
            for info in found {
                let p = PortInfo::from(info);
                map.entry(p.name.clone()).or_insert(p);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Serial port enumeration failed"),
    }

    // Linux-only: add /dev/ttyACM* and /dev/ttyUSB* entries the API missed
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::new(full, NO_DESCRIPTION));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

fn is_busy(e: &serialport::Error) -> bool {
    if matches!(
        e.kind,
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
    ) {
        return true;
    }
    let description = e.description.to_lowercase();
    description.contains("permission denied")
        || description.contains("access is denied")
        || description.contains("busy")
}

/// Open a serial port for line reading (8N1, no flow control)
pub fn open_port(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, SensorError> {
    serialport::new(name, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(|e| {
            if is_busy(&e) {
                SensorError::PermissionDenied {
                    port: name.to_string(),
                }
            } else {
                SensorError::OpenFailed {
                    port: name.to_string(),
                    reason: e.to_string(),
                }
            }
        })
}

/// An open, line-oriented device link
pub trait SerialLink: Send {
    /// Name of the underlying port
    fn port_name(&self) -> &str;

    /// Number of bytes ready to be read without blocking
    fn bytes_available(&mut self) -> io::Result<u32>;

    /// Read up to and including the next `\n`
    ///
    /// Returns whatever arrived before the read timeout, possibly nothing.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Release the device
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Source of serial ports: enumeration and opening
pub trait PortProvider: Send + Sync {
    /// Currently visible ports, in listing order
    fn list_ports(&self) -> Vec<PortInfo>;

    /// Open `port` for reading
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, SensorError>;
}

/// Serial port wrapper implementing [`SerialLink`]
pub struct SerialChannel {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
}

impl SerialChannel {
    pub fn new(name: impl Into<String>, port: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.into(),
            reader: BufReader::new(port),
        }
    }
}

impl SerialLink for SerialChannel {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> io::Result<u32> {
        let buffered = self.reader.buffer().len() as u32;
        let pending = self
            .reader
            .get_mut()
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buffered + pending)
    }

    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            // Partial line at timeout; bytes read so far are kept in `line`
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(line),
            Err(e) => Err(e),
        }
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let port = self.reader.into_inner();
        port.clear(serialport::ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// The machine's real serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortProvider for SystemPorts {
    fn list_ports(&self) -> Vec<PortInfo> {
        list_ports()
    }

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Box<dyn SerialLink>, SensorError> {
        let handle = open_port(port, baud_rate, timeout)?;
        Ok(Box::new(SerialChannel::new(port, handle)))
    }
}
