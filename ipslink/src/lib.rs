//! # ipslink
//!
//! A library for finding and connecting to IPS lasers over serial ports.
//!
//! A host usually has several serial devices attached (an Arduino, a second
//! instrument, a USB modem) and the laser's port name changes between boots.
//! This crate finds the laser without disturbing the others:
//!
//! - Candidate ports are narrowed through stable identifiers
//!   (`/dev/serial/by-id`) and fall back to every raw port
//! - Each candidate is probed with a bounded timeout and the `*IDN?` query
//! - Every port that turns out not to be the laser is closed before moving on
//! - The laser's port is handed out as a single owned [`Connection`]
//!
//! ## Supported Platforms
//!
//! - **Native** (default): Linux, macOS, Windows via the `serialport` crate
//! - **Simulated**: [`port::sim`] for tests and dry runs, on every platform
//!
//! ## Features
//!
//! - `native` (default): Native serial port support
//!
//! ## Example
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "native")]
//!     {
//!         let mut laser = ipslink::host::find_laser()?;
//!         println!("{} on {}", laser.identity(), laser.address());
//!         println!("{}", laser.query("*IDN?")?);
//!         laser.disconnect()?;
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod config;
pub mod connection;
pub mod device;
pub mod discovery;
pub mod error;
#[cfg(feature = "native")]
pub mod host;
pub mod identity;
pub mod port;
pub mod probe;
pub mod protocol;
pub mod resolver;

static INTERRUPT_CHECKER: OnceLock<Arc<dyn Fn() -> bool + Send + Sync>> = OnceLock::new();

/// Register a global interruption checker consulted before every probe.
///
/// The checker should return `true` when discovery should stop (for example
/// after the embedding application received Ctrl-C). Only the first
/// registration takes effect.
pub fn set_interrupt_checker<F>(checker: F)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let _ = INTERRUPT_CHECKER.set(Arc::new(checker));
}

/// Returns whether interruption was requested by the embedding application.
#[must_use]
pub fn is_interrupted_requested() -> bool {
    INTERRUPT_CHECKER
        .get()
        .is_some_and(|checker| checker())
}

// Re-exports for convenience
#[cfg(feature = "native")]
pub use port::{NativePort, NativePortEnumerator, NativePortOpener};
pub use {
    config::Config,
    connection::{Connection, ConnectionManager},
    device::{AliasNamespace, ByIdDirectory, DeviceIdentifier, IdentifierPattern},
    discovery::{
        Discovery, DiscoveryConfig, DiscoveryOptions, DiscoveryReport, FoundLaser, ProbeRecord,
        ScanReport,
    },
    error::{Error, Result},
    identity::InstrumentIdentity,
    port::{Port, PortEnumerator, PortInfo, PortOpener, SerialConfig},
    probe::{OutcomeKind, ProbeOutcome, ProbeSettings},
    resolver::{Candidate, Priority, Provenance},
};
