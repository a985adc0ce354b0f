pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod sim;
pub mod util;

pub use error::HwError;
#[cfg(feature = "hardware")]
pub use serial::SerialBalance;
pub use sim::{SimHandle, SimulatedBalance};

use sisaqui_traits::SerialLine;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Port name plus line framing.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub read_timeout: Duration,
}

/// A serial device the OS reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: String,
}

#[cfg(feature = "hardware")]
pub fn list_ports() -> error::Result<Vec<PortInfo>> {
    serial::list_ports()
}

#[cfg(not(feature = "hardware"))]
pub fn list_ports() -> error::Result<Vec<PortInfo>> {
    tracing::debug!("serial enumeration unavailable without the hardware feature");
    Ok(Vec::new())
}

/// Open the port described by `settings`.
#[cfg(feature = "hardware")]
pub fn open(settings: &SerialSettings) -> error::Result<Box<dyn SerialLine + Send>> {
    Ok(Box::new(SerialBalance::open(settings)?))
}

#[cfg(not(feature = "hardware"))]
pub fn open(settings: &SerialSettings) -> error::Result<Box<dyn SerialLine + Send>> {
    tracing::warn!(port = %settings.port, "serial support not compiled in");
    Err(HwError::Unsupported)
}
