//! # labhal Communication
//!
//! Transports for lab instruments. A [`Link`] moves bytes over a serial
//! port or a simulated device; [`CommunicationPort`] layers the
//! request/reply protocol on top of it.

pub mod communication;

pub use communication::{
    CommandMatch, CommandPattern, CommunicationPort, Link, SerialLink, SerialParity,
    SerialSettings, SimulatedLink, TransportResult,
};
pub use communication::simulated::ReplyRule;

/// A port talking to a serial instrument
pub type SerialPort = CommunicationPort<SerialLink>;

/// A port talking to a simulated instrument
pub type SimulatedPort = CommunicationPort<SimulatedLink>;
