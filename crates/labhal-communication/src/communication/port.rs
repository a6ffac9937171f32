//! Request/reply protocol over a [`Link`]
//!
//! Two guards protect a port. The byte guard wraps the link itself and makes
//! every individual read or write atomic. The transaction guard is held for a
//! whole write-then-read exchange, so two callers' transactions never
//! interleave on the wire. Bare reads and writes issued outside a transaction
//! only take the byte guard.

use super::{byte_aligned_captures, Link, TransportResult};
use labhal_core::TransportError;
use parking_lot::Mutex;
use regex::{Captures, Regex};

const LINE_FEED: u8 = b'\n';

/// Line-oriented communication port
pub struct CommunicationPort<L: Link> {
    link: Mutex<L>,
    transaction: Mutex<()>,
}

impl<L: Link> CommunicationPort<L> {
    /// Wrap a link
    ///
    /// A link that is already open is closed here: the port decides when the
    /// connection is established.
    pub fn new(mut link: L) -> Self {
        if link.is_open() {
            tracing::debug!("Closing pre-opened link {}", link.name());
            if let Err(e) = link.close() {
                tracing::warn!("Failed to close pre-opened link {}: {}", link.name(), e);
            }
        }

        Self {
            link: Mutex::new(link),
            transaction: Mutex::new(()),
        }
    }

    /// Port path or identifier
    pub fn port_name(&self) -> String {
        self.link.lock().name()
    }

    /// Whether the underlying link is open
    pub fn is_open(&self) -> bool {
        self.link.lock().is_open()
    }

    /// Open the underlying link
    pub fn open(&self) -> TransportResult<()> {
        let mut link = self.link.lock();
        if link.is_open() {
            return Err(TransportError::AlreadyOpen { port: link.name() });
        }
        link.open()?;
        tracing::debug!("Opened {}", link.name());
        Ok(())
    }

    /// Close the underlying link
    pub fn close(&self) -> TransportResult<()> {
        let mut link = self.link.lock();
        link.close()?;
        tracing::debug!("Closed {}", link.name());
        Ok(())
    }

    /// Number of received bytes waiting to be read
    pub fn bytes_available(&self) -> TransportResult<usize> {
        self.link.lock().bytes_available()
    }

    /// Discard pending input and output, if the port is open
    pub fn discard_buffers(&self) -> TransportResult<()> {
        let mut link = self.link.lock();
        if link.is_open() {
            link.discard_buffers()?;
        }
        Ok(())
    }

    /// Read exactly `length` bytes
    pub fn read_bytes(&self, length: usize) -> TransportResult<Vec<u8>> {
        let data = self.link.lock().read(length)?;
        tracing::trace!("Read {} bytes: {:02x?}", data.len(), data);
        Ok(data)
    }

    /// Write all of `data`, then flush the link
    pub fn write_bytes(&self, data: &[u8]) -> TransportResult<usize> {
        let mut link = self.link.lock();
        let written = link.write(data)?;
        if written != data.len() {
            return Err(TransportError::WriteIncomplete {
                expected: data.len(),
                written,
            });
        }
        link.flush()?;
        tracing::trace!("Wrote {} bytes: {:02x?}", written, data);
        Ok(written)
    }

    /// Read one line terminated by a line feed
    ///
    /// Bytes are read one at a time. The terminator (and a carriage return
    /// before it) is not part of the returned text.
    pub fn read_line(&self) -> TransportResult<String> {
        let mut link = self.link.lock();
        let mut data = Vec::new();
        loop {
            let byte = link.read(1)?;
            match byte.first() {
                Some(&LINE_FEED) => break,
                Some(&b) => data.push(b),
                None => break,
            }
        }
        drop(link);

        if data.last() == Some(&b'\r') {
            data.pop();
        }
        let line = String::from_utf8(data)?;
        tracing::trace!("Read line {:?}", line);
        Ok(line)
    }

    /// Write `text` encoded as UTF-8
    pub fn write_line(&self, text: &str) -> TransportResult<usize> {
        self.write_bytes(text.as_bytes())
    }

    /// Write `text`, read one reply line and check it against `success`
    ///
    /// Returns the full reply line. A reply matching only `alternate` fails
    /// with [`TransportError::AlternateMatch`]; a reply matching neither fails
    /// with [`TransportError::NoMatch`].
    pub fn transact(
        &self,
        text: &str,
        success: &str,
        alternate: Option<&str>,
    ) -> TransportResult<String> {
        let _transaction = self.transaction.lock();
        self.write_line(text)?;
        let reply = self.read_line()?;
        match_reply(&reply, success, alternate)?;
        Ok(reply)
    }

    /// Like [`transact`](Self::transact), returning the capture groups
    ///
    /// Optional groups that did not participate in the match are `None`.
    pub fn transact_groups(
        &self,
        text: &str,
        success: &str,
        alternate: Option<&str>,
    ) -> TransportResult<Vec<Option<String>>> {
        let _transaction = self.transaction.lock();
        self.write_line(text)?;
        let reply = self.read_line()?;
        let captures = match_reply(&reply, success, alternate)?;
        Ok(captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect())
    }

    /// Like [`transact`](Self::transact), returning the first capture group
    ///
    /// Fails with [`TransportError::NoMatch`] if the pattern captured nothing.
    pub fn transact_first_group(
        &self,
        text: &str,
        success: &str,
        alternate: Option<&str>,
    ) -> TransportResult<String> {
        let groups = self.transact_groups(text, success, alternate)?;
        match groups.into_iter().next() {
            Some(Some(first)) => Ok(first),
            _ => Err(TransportError::NoMatch {
                pattern: success.to_string(),
                reply: "no captured group".to_string(),
            }),
        }
    }

    /// Binary exchange: write `data`, read exactly `reply_length` bytes
    ///
    /// Patterns apply to the lowercase hex encoding of the reply. Only
    /// matches starting on a byte boundary count, and their groups must
    /// cover whole bytes; the groups are decoded back to bytes.
    pub fn transact_bytes(
        &self,
        data: &[u8],
        reply_length: usize,
        hex_success: &str,
        hex_alternate: Option<&str>,
    ) -> TransportResult<Vec<Option<Vec<u8>>>> {
        let _transaction = self.transaction.lock();
        self.write_bytes(data)?;
        let reply = hex::encode(self.read_bytes(reply_length)?);
        let captures =
            match_reply_with(&reply, hex_success, hex_alternate, byte_aligned_captures)?;

        captures
            .iter()
            .skip(1)
            .map(|group| match group {
                Some(m) => hex::decode(m.as_str())
                    .map(Some)
                    .map_err(|_| TransportError::NoMatch {
                        pattern: hex_success.to_string(),
                        reply: reply.clone(),
                    }),
                None => Ok(None),
            })
            .collect()
    }

    /// Run `f` with exclusive access to the link
    pub fn with_link<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut self.link.lock())
    }

    /// Consume the port, returning the link
    pub fn into_inner(self) -> L {
        self.link.into_inner()
    }
}

impl<L: Link> std::fmt::Debug for CommunicationPort<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.link.lock();
        f.debug_struct("CommunicationPort")
            .field("port", &link.name())
            .field("open", &link.is_open())
            .finish()
    }
}

/// Search `reply` for `success`, falling back to `alternate` to classify a
/// mismatch
fn match_reply<'r>(
    reply: &'r str,
    success: &str,
    alternate: Option<&str>,
) -> TransportResult<Captures<'r>> {
    match_reply_with(reply, success, alternate, |regex, reply| regex.captures(reply))
}

fn match_reply_with<'r>(
    reply: &'r str,
    success: &str,
    alternate: Option<&str>,
    find: impl Fn(&Regex, &'r str) -> Option<Captures<'r>>,
) -> TransportResult<Captures<'r>> {
    if let Some(captures) = find(&Regex::new(success)?, reply) {
        return Ok(captures);
    }

    if let Some(alternate) = alternate {
        if find(&Regex::new(alternate)?, reply).is_some() {
            return Err(TransportError::AlternateMatch {
                pattern: alternate.to_string(),
                reply: reply.to_string(),
            });
        }
    }

    Err(TransportError::NoMatch {
        pattern: success.to_string(),
        reply: reply.to_string(),
    })
}
