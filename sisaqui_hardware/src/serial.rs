use std::io::{Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, SerialPortType, StopBits};
use sisaqui_traits::SerialLine;
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{LineAssembler, deadline_after, expired};
use crate::{Parity, PortInfo, SerialSettings};

/// Slice length for blocking reads; keeps `read_line` responsive to its deadline.
const READ_SLICE: Duration = Duration::from_millis(50);

pub struct SerialBalance {
    port: Box<dyn SerialPort>,
    lines: LineAssembler,
}

impl SerialBalance {
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let data_bits = match settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            8 => DataBits::Eight,
            other => {
                return Err(HwError::Open {
                    port: settings.port.clone(),
                    reason: format!("unsupported data bits {other}"),
                });
            }
        };
        let stop_bits = if settings.stop_bits == 2 {
            StopBits::Two
        } else {
            StopBits::One
        };
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        };

        let port = serialport::new(settings.port.clone(), settings.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(FlowControl::None)
            .timeout(READ_SLICE)
            .open()
            .map_err(|e| HwError::Open {
                port: settings.port.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            port = %settings.port,
            baud = settings.baud_rate,
            data_bits = settings.data_bits,
            stop_bits = settings.stop_bits,
            "serial port opened"
        );
        Ok(Self {
            port,
            lines: LineAssembler::new(),
        })
    }

    fn read_line_inner(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = deadline_after(timeout);
        let mut buf = [0u8; 64];
        loop {
            if let Some(line) = self.lines.pop_line() {
                trace!(line = %line, "serial line");
                return Ok(Some(line));
            }
            if expired(deadline) {
                return Ok(None);
            }
            match self.port.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => self.lines.push(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(HwError::Io(e)),
            }
        }
    }
}

impl SerialLine for SerialBalance {
    fn send(&mut self, frame: &[u8]) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port.write_all(frame).map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.read_line_inner(timeout)?)
    }

    fn clear_input(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lines.clear();
        self.port
            .clear(ClearBuffer::Input)
            .map_err(|e| HwError::Serial(e.to_string()))?;
        Ok(())
    }
}

pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|e| HwError::Serial(e.to_string()))?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let kind = match p.port_type {
                SerialPortType::UsbPort(usb) => match usb.product {
                    Some(product) => format!("usb ({product})"),
                    None => format!("usb {:04x}:{:04x}", usb.vid, usb.pid),
                },
                SerialPortType::PciPort => "pci".to_string(),
                SerialPortType::BluetoothPort => "bluetooth".to_string(),
                SerialPortType::Unknown => "unknown".to_string(),
            };
            PortInfo {
                name: p.port_name,
                kind,
            }
        })
        .collect())
}
