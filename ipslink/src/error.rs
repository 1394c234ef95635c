//! Error types for ipslink.

use crate::discovery::DiscoveryReport;
use std::io;
use thiserror::Error;

/// Result type for ipslink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ipslink operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, alias directory, config files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The port is held open by another process or session.
    #[error("Port busy: {0}")]
    PortBusy(String),

    /// Communication timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The host could not list serial ports or read the alias namespace.
    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    /// Every candidate was probed and none answered as the laser.
    #[error("Laser not found: {0}")]
    NotFound(DiscoveryReport),

    /// Discovery was interrupted or ran past its overall deadline.
    #[error("Discovery cancelled: {0}")]
    Cancelled(DiscoveryReport),

    /// A connection is already open; disconnect it first.
    #[error("Already connected to {port}")]
    AlreadyConnected {
        /// Address of the live connection.
        port: String,
    },

    /// The connection has been closed.
    #[error("Not connected")]
    NotConnected,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Diagnostics gathered before discovery gave up, if any.
    #[must_use]
    pub fn report(&self) -> Option<&DiscoveryReport> {
        match self {
            Self::NotFound(report) | Self::Cancelled(report) => Some(report),
            _ => None,
        }
    }
}
