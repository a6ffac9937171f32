//! Simulated link
//!
//! A pattern-matching stand-in for a real instrument. Each registered
//! command pairs a pattern with a reply rule; writing a payload runs the
//! first command whose pattern matches and queues its reply in an output
//! buffer that reads drain. Protocol code can be exercised deterministically
//! without hardware.

use super::{byte_aligned_captures, CommunicationPort, Link, TransportResult};
use labhal_core::TransportError;
use regex::Regex;
use std::collections::VecDeque;
use std::sync::OnceLock;
use std::time::Duration;

/// Reply rule for a simulated command
pub type ReplyRule = Box<dyn Fn(&CommandMatch<'_>) -> TransportResult<Vec<u8>> + Send + Sync>;

/// Pattern selecting which payloads a simulated command answers
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Regex searched in the payload decoded as UTF-8
    Text(Regex),
    /// Regex searched in the lowercase hex encoding of the payload; matches
    /// must start on a byte boundary and groups must cover whole bytes
    Data(Regex),
}

impl CommandPattern {
    /// Compile a text pattern
    pub fn text(pattern: &str) -> TransportResult<Self> {
        Ok(Self::Text(Regex::new(pattern)?))
    }

    /// Compile a hex pattern
    pub fn data(hex_pattern: &str) -> TransportResult<Self> {
        Ok(Self::Data(Regex::new(hex_pattern)?))
    }

    /// Capture groups for `payload`, or `None` if the pattern does not match
    fn captures(&self, payload: &[u8]) -> Option<Vec<Option<Vec<u8>>>> {
        match self {
            CommandPattern::Text(regex) => {
                let text = std::str::from_utf8(payload).ok()?;
                let captures = regex.captures(text)?;
                Some(
                    captures
                        .iter()
                        .skip(1)
                        .map(|group| group.map(|m| m.as_str().as_bytes().to_vec()))
                        .collect(),
                )
            }
            CommandPattern::Data(regex) => {
                let encoded = hex::encode(payload);
                let captures = byte_aligned_captures(regex, &encoded)?;
                captures
                    .iter()
                    .skip(1)
                    .map(|group| match group {
                        Some(m) => hex::decode(m.as_str()).ok().map(Some),
                        None => Some(None),
                    })
                    .collect()
            }
        }
    }
}

fn any_text() -> Regex {
    static ANY: OnceLock<Regex> = OnceLock::new();
    ANY.get_or_init(|| Regex::new("(.+)").expect("invalid regex pattern"))
        .clone()
}

/// A payload matched by a simulated command
#[derive(Debug)]
pub struct CommandMatch<'a> {
    /// Name the command was registered under
    pub name: &'a str,
    /// Captured groups (text as UTF-8 bytes, hex groups decoded)
    pub groups: Vec<Option<Vec<u8>>>,
    /// The payload as written
    pub payload: &'a [u8],
}

impl CommandMatch<'_> {
    /// Captured group `index` (0-based) as text
    pub fn group_text(&self, index: usize) -> Option<&str> {
        let group = self.groups.get(index)?.as_deref()?;
        std::str::from_utf8(group).ok()
    }

    /// The payload as text
    pub fn payload_text(&self) -> Option<&str> {
        std::str::from_utf8(self.payload).ok()
    }
}

struct SimulatedCommand {
    name: String,
    pattern: CommandPattern,
    reply: ReplyRule,
}

/// Deterministic in-memory link
pub struct SimulatedLink {
    name: String,
    commands: Vec<SimulatedCommand>,
    output: VecDeque<u8>,
    open: bool,
    reply_delay: Duration,
}

impl SimulatedLink {
    /// Create a link with no registered commands
    pub fn new() -> Self {
        Self {
            name: "simulated".to_string(),
            commands: Vec::new(),
            output: VecDeque::new(),
            open: false,
            reply_delay: Duration::ZERO,
        }
    }

    /// A link echoing every text payload back unchanged
    pub fn echo_text() -> Self {
        Self::new()
            .with_name("simulated-echo-text")
            .with_command("echoString", CommandPattern::Text(any_text()), |m| {
                Ok(m.payload.to_vec())
            })
    }

    /// A link echoing every binary payload back unchanged
    pub fn echo_data() -> Self {
        Self::new()
            .with_name("simulated-echo-data")
            .with_command("echoData", CommandPattern::Data(any_text()), |m| {
                Ok(m.payload.to_vec())
            })
    }

    /// Set the link name reported to the port
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay every write, standing in for an instrument's processing time
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Builder form of [`register_command`](Self::register_command)
    pub fn with_command<F>(mut self, name: impl Into<String>, pattern: CommandPattern, reply: F) -> Self
    where
        F: Fn(&CommandMatch<'_>) -> TransportResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.register_command(name, pattern, reply);
        self
    }

    /// Append a command; earlier registrations take precedence
    pub fn register_command<F>(&mut self, name: impl Into<String>, pattern: CommandPattern, reply: F)
    where
        F: Fn(&CommandMatch<'_>) -> TransportResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.commands.push(SimulatedCommand {
            name: name.into(),
            pattern,
            reply: Box::new(reply),
        });
    }

    /// Number of registered commands
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Reply produced by the first matching command, empty if none matches
    fn reply_for(&self, payload: &[u8]) -> TransportResult<Vec<u8>> {
        for command in &self.commands {
            if let Some(groups) = command.pattern.captures(payload) {
                tracing::trace!("Simulated command '{}' matched", command.name);
                let matched = CommandMatch {
                    name: &command.name,
                    groups,
                    payload,
                };
                return (command.reply)(&matched);
            }
        }
        Ok(Vec::new())
    }
}

impl Default for SimulatedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Link for SimulatedLink {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self) -> TransportResult<()> {
        if self.open {
            return Err(TransportError::AlreadyOpen { port: self.name() });
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.open = false;
        Ok(())
    }

    fn bytes_available(&self) -> TransportResult<usize> {
        Ok(self.output.len())
    }

    fn discard_buffers(&mut self) -> TransportResult<()> {
        self.output.clear();
        Ok(())
    }

    fn read(&mut self, length: usize) -> TransportResult<Vec<u8>> {
        if self.output.len() < length {
            return Err(TransportError::ReadTimeout {
                expected: length,
                received: self.output.len(),
            });
        }
        Ok(self.output.drain(..length).collect())
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<usize> {
        if !self.reply_delay.is_zero() {
            std::thread::sleep(self.reply_delay);
        }
        let reply = self.reply_for(data)?;
        self.output.extend(reply);
        Ok(data.len())
    }

    fn flush(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

impl CommunicationPort<SimulatedLink> {
    /// Register a command on the simulated link behind this port
    pub fn register_command<F>(&self, name: impl Into<String>, pattern: CommandPattern, reply: F)
    where
        F: Fn(&CommandMatch<'_>) -> TransportResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.with_link(|link| link.register_command(name, pattern, reply));
    }
}
