//! Stable device identifiers and the alias namespace that maps them to ports.
//!
//! Raw port names like `/dev/ttyACM0` are handed out in plug order and change
//! between reboots. Linux udev also publishes symlinks in `/dev/serial/by-id/`
//! whose names are built from the USB descriptors:
//!
//! ```text
//! usb-{VENDOR}_{MODEL}_{SERIAL}-if{INTERFACE}[-port{PORT}]
//! ```
//!
//! Examples:
//! - `usb-IPS_HPU_100123-if00` (IPS laser module, CDC ACM)
//! - `usb-Arduino__www.arduino.cc__0043_75735323-if00` (Arduino Uno)
//!
//! Matching those names against [`IdentifierPattern`]s lets discovery probe the
//! laser without ever opening the other devices on the bus.

pub mod alias;

pub use alias::{Alias, AliasNamespace, ByIdDirectory, DEFAULT_BY_ID_DIR, StaticAliases};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A stable, hardware-derived device name from the alias namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentifier {
    /// Alias file name (e.g., `usb-IPS_HPU_100123-if00`).
    pub name: String,
    /// Full alias path (e.g., `/dev/serial/by-id/usb-IPS_HPU_100123-if00`).
    pub path: PathBuf,
    /// Vendor parsed from the name, if any.
    pub vendor: Option<String>,
    /// Model parsed from the name, if any.
    pub model: Option<String>,
    /// Serial number parsed from the name, if any.
    pub serial: Option<String>,
}

impl DeviceIdentifier {
    /// Build an identifier from an alias name and its path.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let (vendor, model, serial) = parse_by_id_name(&name);
        Self {
            name,
            path: path.into(),
            vendor,
            model,
            serial,
        }
    }
}

impl fmt::Display for DeviceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Parse vendor, model, and serial from a by-id name.
///
/// Format: `usb-{VENDOR}_{MODEL}_{SERIAL}-if{N}[-port{N}]`
fn parse_by_id_name(name: &str) -> (Option<String>, Option<String>, Option<String>) {
    let Some(name) = name.strip_prefix("usb-") else {
        return (None, None, None);
    };

    let name = name
        .rfind("-if")
        .map_or(name, |idx| &name[..idx]);

    // First is vendor, last is serial, middle parts are model
    let parts: Vec<&str> = name
        .split('_')
        .collect();
    match parts.as_slice() {
        [] | [""] => (None, None, None),
        [vendor] => (Some((*vendor).to_string()), None, None),
        [vendor, serial] => (
            Some((*vendor).to_string()),
            None,
            Some((*serial).to_string()),
        ),
        [vendor, model @ .., serial] => (
            Some((*vendor).to_string()),
            Some(model.join("_")),
            Some((*serial).to_string()),
        ),
    }
}

/// Selects the aliases that belong to the laser.
///
/// Every field that is set must match; a pattern with no field set matches
/// nothing, so an empty pattern can never widen discovery to every device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPattern {
    /// Prefix of the alias name after `usb-` (e.g., `IPS`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Substring of the alias name (e.g., `HPU`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Substring of the alias name (e.g., a laser serial number).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
}

impl IdentifierPattern {
    /// Create an empty pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the vendor prefix.
    #[must_use]
    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Set the model substring.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the serial substring.
    #[must_use]
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Whether at least one criterion is set.
    pub fn is_valid(&self) -> bool {
        self.vendor
            .is_some()
            || self
                .model
                .is_some()
            || self
                .serial
                .is_some()
    }

    /// Check whether an identifier satisfies this pattern.
    pub fn matches(&self, identifier: &DeviceIdentifier) -> bool {
        if !self.is_valid() {
            return false;
        }

        let Some(name) = identifier
            .name
            .strip_prefix("usb-")
        else {
            return false;
        };

        if let Some(ref vendor) = self.vendor {
            if !name.starts_with(vendor.as_str()) {
                return false;
            }
        }
        if let Some(ref model) = self.model {
            if !name.contains(model.as_str()) {
                return false;
            }
        }
        if let Some(ref serial) = self.serial {
            if !name.contains(serial.as_str()) {
                return false;
            }
        }
        true
    }

    /// Patterns for the USB names IPS laser modules enumerate with.
    pub fn ips_defaults() -> Vec<Self> {
        vec![
            Self::new().vendor("IPS"),
            Self::new().vendor("Innovative_Photonic"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> DeviceIdentifier {
        DeviceIdentifier::new(name, format!("/dev/serial/by-id/{name}"))
    }

    #[test]
    fn test_parse_by_id_name() {
        let ips = id("usb-IPS_HPU_100123-if00");
        assert_eq!(ips.vendor.as_deref(), Some("IPS"));
        assert_eq!(ips.model.as_deref(), Some("HPU"));
        assert_eq!(ips.serial.as_deref(), Some("100123"));

        let ftdi = id("usb-FTDI_FT230X_Basic_UART_DJ00XXXX-if00-port0");
        assert_eq!(ftdi.vendor.as_deref(), Some("FTDI"));
        assert_eq!(ftdi.model.as_deref(), Some("FT230X_Basic_UART"));
        assert_eq!(ftdi.serial.as_deref(), Some("DJ00XXXX"));
    }

    #[test]
    fn test_parse_non_usb_name() {
        let pci = id("pci-0000:00:16.3");
        assert!(pci.vendor.is_none());
        assert!(pci.model.is_none());
        assert!(pci.serial.is_none());
    }

    #[test]
    fn test_parse_vendor_and_serial_only() {
        let short = id("usb-IPS_0042-if00");
        assert_eq!(short.vendor.as_deref(), Some("IPS"));
        assert!(short.model.is_none());
        assert_eq!(short.serial.as_deref(), Some("0042"));
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = IdentifierPattern::new().vendor("IPS").model("HPU");

        assert!(pattern.matches(&id("usb-IPS_HPU_100123-if00")));
        assert!(!pattern.matches(&id("usb-IPS_Other_100123-if00")));
        assert!(!pattern.matches(&id(
            "usb-Arduino__www.arduino.cc__0043_75735323-if00"
        )));
    }

    #[test]
    fn test_vendor_is_prefix_not_substring() {
        let pattern = IdentifierPattern::new().vendor("IPS");
        assert!(!pattern.matches(&id("usb-WCH_CHIPS_1234-if00")));
    }

    #[test]
    fn test_empty_pattern_matches_nothing() {
        let pattern = IdentifierPattern::new();
        assert!(!pattern.is_valid());
        assert!(!pattern.matches(&id("usb-IPS_HPU_100123-if00")));
    }

    #[test]
    fn test_serial_pattern_pins_one_laser() {
        let pattern = IdentifierPattern::new().serial("100124");
        assert!(pattern.matches(&id("usb-IPS_HPU_100124-if00")));
        assert!(!pattern.matches(&id("usb-IPS_HPU_100123-if00")));
    }

    #[test]
    fn test_ips_defaults() {
        let defaults = IdentifierPattern::ips_defaults();
        assert!(
            defaults
                .iter()
                .any(|p| p.matches(&id("usb-IPS_HPU_100123-if00")))
        );
        assert!(
            !defaults
                .iter()
                .any(|p| p.matches(&id("usb-1a86_USB_Serial-if00-port0")))
        );
    }
}
