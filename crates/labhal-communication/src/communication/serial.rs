//! Serial port link
//!
//! Provides the blocking serial [`Link`] used for RS-232 instruments and
//! USB devices exposing a CDC/serial interface.
//!
//! Supports:
//! - Baud rate configuration
//! - Flow control settings
//! - Parity and stop bit configuration
//! - Blocking reads bounded by a per-call deadline

use super::{Link, TransportResult};
use labhal_core::TransportError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl std::fmt::Display for SerialParity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Even => write!(f, "even"),
            Self::Odd => write!(f, "odd"),
        }
    }
}

/// Serial line settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port path (e.g., "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Hardware flow control
    pub flow_control: bool,
    /// Deadline for a single read, in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 19200,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: false,
            timeout_ms: 300,
        }
    }
}

impl SerialSettings {
    /// Settings for `port` with default line parameters
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Read deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn to_serialport_data_bits(bits: u8) -> Option<serialport::DataBits> {
    match bits {
        5 => Some(serialport::DataBits::Five),
        6 => Some(serialport::DataBits::Six),
        7 => Some(serialport::DataBits::Seven),
        8 => Some(serialport::DataBits::Eight),
        _ => None,
    }
}

fn to_serialport_stop_bits(bits: u8) -> Option<serialport::StopBits> {
    match bits {
        1 => Some(serialport::StopBits::One),
        2 => Some(serialport::StopBits::Two),
        _ => None,
    }
}

fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Serial link backed by the `serialport` crate
pub struct SerialLink {
    settings: SerialSettings,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialLink {
    /// Create a closed link
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            port: None,
        }
    }

    /// Line settings
    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }

    fn unavailable(&self, reason: impl Into<String>) -> TransportError {
        TransportError::LinkUnavailable {
            port: self.settings.port.clone(),
            reason: reason.into(),
        }
    }

    fn io_error(&self, e: impl std::fmt::Display) -> TransportError {
        TransportError::Io {
            port: self.settings.port.clone(),
            reason: e.to_string(),
        }
    }

    fn port_mut(&mut self) -> TransportResult<&mut Box<dyn serialport::SerialPort>> {
        let name = self.settings.port.clone();
        self.port
            .as_mut()
            .ok_or(TransportError::NotOpen { port: name })
    }
}

impl Link for SerialLink {
    fn name(&self) -> String {
        self.settings.port.clone()
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn open(&mut self) -> TransportResult<()> {
        if self.port.is_some() {
            return Err(TransportError::AlreadyOpen { port: self.name() });
        }

        let data_bits = to_serialport_data_bits(self.settings.data_bits).ok_or_else(|| {
            self.unavailable(format!("Invalid data bits: {}", self.settings.data_bits))
        })?;
        let stop_bits = to_serialport_stop_bits(self.settings.stop_bits).ok_or_else(|| {
            self.unavailable(format!("Invalid stop bits: {}", self.settings.stop_bits))
        })?;

        let builder = serialport::new(&self.settings.port, self.settings.baud_rate)
            .timeout(self.settings.timeout())
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(to_serialport_parity(self.settings.parity))
            .flow_control(if self.settings.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            });

        match builder.open() {
            Ok(port) => {
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", self.settings.port, e);
                Err(self.unavailable(e.to_string()))
            }
        }
    }

    fn close(&mut self) -> TransportResult<()> {
        match self.port.take() {
            Some(_) => Ok(()),
            None => Err(TransportError::NotOpen { port: self.name() }),
        }
    }

    fn bytes_available(&self) -> TransportResult<usize> {
        match &self.port {
            Some(port) => port
                .bytes_to_read()
                .map(|n| n as usize)
                .map_err(|e| self.io_error(e)),
            None => Err(TransportError::NotOpen { port: self.name() }),
        }
    }

    fn discard_buffers(&mut self) -> TransportResult<()> {
        let result = self.port_mut()?.clear(serialport::ClearBuffer::All);
        result.map_err(|e| self.io_error(e))
    }

    fn read(&mut self, length: usize) -> TransportResult<Vec<u8>> {
        let deadline = Instant::now() + self.settings.timeout();
        let mut buf = vec![0u8; length];
        let mut filled = 0;

        while filled < length {
            let result = self.port_mut()?.read(&mut buf[filled..]);
            match result {
                Ok(n) if n > 0 => filled += n,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(self.io_error(e)),
            }

            if filled < length && Instant::now() >= deadline {
                return Err(TransportError::ReadTimeout {
                    expected: length,
                    received: filled,
                });
            }
        }

        Ok(buf)
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<usize> {
        let mut written = 0;
        while written < data.len() {
            let result = self.port_mut()?.write(&data[written..]);
            match result {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(self.io_error(e)),
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> TransportResult<()> {
        let result = self.port_mut()?.flush();
        result.map_err(|e| self.io_error(e))
    }
}
