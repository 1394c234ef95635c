//! Laser identification strings.
//!
//! IPS modules answer `*IDN?` with five comma-separated fields:
//!
//! ```text
//! IPS,<model>,<serial number>,<wavelength>,<firmware revision>
//! ```
//!
//! e.g. `IPS,HPU,100123,785.12nm,3.1.4`. Firmware revisions differ in spacing
//! and units, so every field past the first is parsed leniently.

use serde::Serialize;
use std::fmt;

/// Parsed reply to the identification query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentIdentity {
    /// The reply exactly as received, trimmed.
    pub raw: String,
    /// Manufacturer field.
    pub manufacturer: Option<String>,
    /// Model field.
    pub model: Option<String>,
    /// Serial number field.
    pub serial_number: Option<String>,
    /// Factory measured wavelength in nm.
    pub wavelength_nm: Option<f64>,
    /// Firmware revision field.
    pub firmware: Option<String>,
}

impl InstrumentIdentity {
    /// Parse an identification reply.
    pub fn parse(reply: &str) -> Self {
        let raw = reply
            .trim()
            .to_string();
        let mut fields = raw
            .split(',')
            .map(str::trim);
        let mut next_field = || {
            fields
                .next()
                .filter(|f| !f.is_empty())
                .map(str::to_string)
        };

        let manufacturer = next_field();
        let model = next_field();
        let serial_number = next_field();
        let wavelength_nm = next_field()
            .as_deref()
            .and_then(parse_quantity);
        let firmware = next_field();

        Self {
            raw,
            manufacturer,
            model,
            serial_number,
            wavelength_nm,
            firmware,
        }
    }

    /// Whether the reply contains `signature`.
    pub fn matches(&self, signature: &str) -> bool {
        self.raw
            .contains(signature)
    }
}

impl fmt::Display for InstrumentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a number that may carry a unit suffix (`785nm`, `3.14 m`, `-12 mA`).
///
/// Returns `None` when the text is not a number followed by an optional
/// alphabetic unit.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    let split = text
        .find(|c: char| c.is_alphabetic() || c.is_whitespace())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let unit = unit.trim();

    if !unit
        .chars()
        .all(char::is_alphanumeric)
    {
        return None;
    }
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
