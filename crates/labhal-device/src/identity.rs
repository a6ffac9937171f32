//! Hardware identifiers and compatibility predicates

use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Requested serial number: a wildcard or an anchored pattern
#[derive(Debug, Clone, Default)]
pub enum SerialNumber {
    /// Any serial number
    #[default]
    Any,
    /// Serial numbers matching the pattern in full
    Pattern {
        /// The pattern as given
        source: String,
        /// Anchored compiled form
        regex: Regex,
    },
}

impl SerialNumber {
    /// Parse a serial number; `"*"` and the empty string mean any
    pub fn parse(serial: &str) -> Result<Self, regex::Error> {
        let serial = serial.trim();
        if serial.is_empty() || serial == "*" {
            return Ok(Self::Any);
        }
        Ok(Self::Pattern {
            source: serial.to_string(),
            regex: Regex::new(&format!("^(?:{serial})$"))?,
        })
    }

    /// Check whether a concrete serial number is accepted
    pub fn matches(&self, serial: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern { regex, .. } => regex.is_match(serial),
        }
    }

    /// Whether this is the wildcard
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// The serial number as given (`"*"` for the wildcard)
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => "*",
            Self::Pattern { source, .. } => source,
        }
    }
}

impl FromStr for SerialNumber {
    type Err = regex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for SerialNumber {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for SerialNumber {}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of the device a caller asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// USB vendor identifier
    pub vendor_id: u16,
    /// USB product identifier
    pub product_id: u16,
    /// Requested serial number
    pub serial_number: SerialNumber,
}

impl DeviceIdentity {
    /// Create an identity
    pub fn new(vendor_id: u16, product_id: u16, serial_number: SerialNumber) -> Self {
        Self {
            vendor_id,
            product_id,
            serial_number,
        }
    }

    /// Identity accepting any serial number
    pub fn any_serial(vendor_id: u16, product_id: u16) -> Self {
        Self::new(vendor_id, product_id, SerialNumber::Any)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} ({})",
            self.vendor_id, self.product_id, self.serial_number
        )
    }
}

/// Predicate over device identities
///
/// Absent fields accept anything. A serial pattern is checked against the
/// requested serial number's text; a wildcard request always passes it.
#[derive(Debug, Clone, Default)]
pub struct DeviceMatcher {
    /// Required vendor identifier
    pub vendor_id: Option<u16>,
    /// Required product identifier
    pub product_id: Option<u16>,
    /// Required serial number pattern
    pub serial: Option<Regex>,
}

impl DeviceMatcher {
    /// Accept every identity
    pub fn any() -> Self {
        Self::default()
    }

    /// Accept one vendor/product pair
    pub fn usb(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id: Some(vendor_id),
            product_id: Some(product_id),
            serial: None,
        }
    }

    /// Restrict to serial numbers matching `pattern`
    pub fn with_serial(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.serial = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Check whether `identity` satisfies this predicate
    pub fn matches(&self, identity: &DeviceIdentity) -> bool {
        self.vendor_id.is_none_or(|id| id == identity.vendor_id)
            && self.product_id.is_none_or(|id| id == identity.product_id)
            && match &self.serial {
                Some(pattern) => {
                    identity.serial_number.is_any()
                        || pattern.is_match(identity.serial_number.as_str())
                }
                None => true,
            }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_serial() {
        assert!(SerialNumber::parse("*").unwrap().is_any());
        assert!(SerialNumber::parse("").unwrap().is_any());
        assert!(SerialNumber::parse("*").unwrap().matches("anything"));
    }

    #[test]
    fn test_serial_pattern_is_anchored() {
        let serial = SerialNumber::parse("FTDI-0[0-9]").unwrap();
        assert!(serial.matches("FTDI-07"));
        assert!(!serial.matches("FTDI-071"));
        assert!(!serial.matches("xFTDI-07"));
        assert_eq!(serial.as_str(), "FTDI-0[0-9]");
    }

    #[test]
    fn test_invalid_serial_pattern() {
        assert!("AB(".parse::<SerialNumber>().is_err());
    }

    #[test]
    fn test_matcher_fields() {
        let matcher = DeviceMatcher::usb(0x0403, 0x6001);
        assert!(matcher.matches(&DeviceIdentity::any_serial(0x0403, 0x6001)));
        assert!(!matcher.matches(&DeviceIdentity::any_serial(0x0403, 0x6010)));
        assert!(DeviceMatcher::any().matches(&DeviceIdentity::any_serial(1, 2)));
    }

    #[test]
    fn test_matcher_serial() {
        let matcher = DeviceMatcher::usb(0x1313, 0x8072)
            .with_serial("^P00")
            .unwrap();
        let wanted = SerialNumber::parse("P0012345").unwrap();
        let other = SerialNumber::parse("M0099").unwrap();

        assert!(matcher.matches(&DeviceIdentity::new(0x1313, 0x8072, wanted)));
        assert!(!matcher.matches(&DeviceIdentity::new(0x1313, 0x8072, other)));
        assert!(matcher.matches(&DeviceIdentity::any_serial(0x1313, 0x8072)));
    }

    #[test]
    fn test_identity_display() {
        let identity = DeviceIdentity::any_serial(0x0403, 0x6001);
        assert_eq!(identity.to_string(), "0403:6001 (*)");
    }
}
