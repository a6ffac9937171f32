//! Transport layer
//!
//! A [`Link`] moves raw bytes over one physical or simulated connection.
//! [`CommunicationPort`] wraps a link with the request/reply protocol used by
//! line-oriented instruments: write a command, read one reply line, match it
//! against an expected pattern.

pub mod port;
pub mod serial;
pub mod simulated;

pub use port::CommunicationPort;
pub use serial::{SerialLink, SerialParity, SerialSettings};
pub use simulated::{CommandMatch, CommandPattern, SimulatedLink};

use labhal_core::TransportError;
use regex::{Captures, Regex};

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Byte-oriented connection owned by a [`CommunicationPort`]
///
/// Every read blocks up to the link's own deadline. Implementations never
/// return a short read: they either produce exactly the requested number of
/// bytes or fail with [`TransportError::ReadTimeout`].
pub trait Link: Send {
    /// Port path or identifier
    fn name(&self) -> String;

    /// Whether the connection is established
    fn is_open(&self) -> bool;

    /// Establish the connection
    fn open(&mut self) -> TransportResult<()>;

    /// Release the connection
    fn close(&mut self) -> TransportResult<()>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&self) -> TransportResult<usize>;

    /// Discard pending input and output
    fn discard_buffers(&mut self) -> TransportResult<()>;

    /// Read exactly `length` bytes
    fn read(&mut self, length: usize) -> TransportResult<Vec<u8>>;

    /// Hand `data` to the link, returning how many bytes were accepted
    fn write(&mut self, data: &[u8]) -> TransportResult<usize>;

    /// Block until accepted bytes have left the outbound buffer
    fn flush(&mut self) -> TransportResult<()>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn open(&mut self) -> TransportResult<()> {
        (**self).open()
    }

    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }

    fn bytes_available(&self) -> TransportResult<usize> {
        (**self).bytes_available()
    }

    fn discard_buffers(&mut self) -> TransportResult<()> {
        (**self).discard_buffers()
    }

    fn read(&mut self, length: usize) -> TransportResult<Vec<u8>> {
        (**self).read(length)
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<usize> {
        (**self).write(data)
    }

    fn flush(&mut self) -> TransportResult<()> {
        (**self).flush()
    }
}

/// Leftmost match of `regex` in a hex encoding that starts on a byte
/// boundary and whose capture groups cover whole bytes
pub(crate) fn byte_aligned_captures<'h>(regex: &Regex, encoded: &'h str) -> Option<Captures<'h>> {
    let mut start = 0;
    while start <= encoded.len() {
        let captures = regex.captures_at(encoded, start)?;
        let whole_start = captures.get(0)?.start();
        let aligned = whole_start % 2 == 0
            && captures
                .iter()
                .skip(1)
                .flatten()
                .all(|group| group.start() % 2 == 0 && group.end() % 2 == 0);
        if aligned {
            return Some(captures);
        }
        // Next byte boundary after this match's start
        start = (whole_start + 2) & !1;
    }
    None
}
