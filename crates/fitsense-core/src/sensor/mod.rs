//! Pulse Sensor Link
//!
//! Finds the pulse oximeter among the visible serial ports, keeps a single
//! connection to it alive and turns its `<DATA,bpm,spo2>` lines into
//! [`Reading`](crate::readings::Reading)s.
//!
//! The device handle is owned by [`DeviceConnection`]; everything else goes
//! through [`SharedDevice`].

mod connection;
pub mod demo;
mod error;
mod locator;
pub mod parser;
mod poller;
pub mod serial;

pub use connection::{DeviceConnection, DeviceStatus, SharedDevice};
pub use error::SensorError;
pub use locator::PortLocator;
pub use parser::{decode_line, parse_line, SensorSample};
pub use poller::{Poller, PollerConfig};
pub use serial::{list_ports, open_port, PortInfo, PortProvider, SerialLink, SystemPorts};
