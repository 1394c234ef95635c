//! Probing one candidate port.
//!
//! A probe opens the port exclusively, asks the device who it is and
//! classifies the answer. The port is held by a [`CloseOnExit`] guard for the
//! whole exchange, so every path out of the probe (early error return, panic,
//! or a plain non-matching reply) releases it. Only an identified laser leaves
//! the probe open, and then the caller owns it.

use {
    crate::{
        error::Error,
        identity::InstrumentIdentity,
        port::{DEFAULT_BAUD, Port, PortOpener, SerialConfig},
        protocol,
        resolver::Candidate,
    },
    log::{debug, trace, warn},
    serde::Serialize,
    std::{
        fmt,
        ops::{Deref, DerefMut},
        thread,
        time::{Duration, Instant},
    },
};

/// Default identification query.
pub const IDN_QUERY: &str = "*IDN?";

/// Default reply substring identifying an IPS laser.
pub const IPS_SIGNATURE: &str = "IPS";

/// How to talk to a candidate during a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Serial line settings; the port name is filled in per candidate.
    pub serial: SerialConfig,
    /// Identification query.
    pub query: String,
    /// Line terminator for the query and the reply.
    pub terminator: String,
    /// Substring a reply must contain to be the laser.
    pub signature: String,
    /// Pause between opening the port and sending the query.
    pub settle_delay: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            serial: SerialConfig::new("", DEFAULT_BAUD),
            query: IDN_QUERY.to_string(),
            terminator: "\n".to_string(),
            signature: IPS_SIGNATURE.to_string(),
            settle_delay: Duration::from_millis(50),
        }
    }
}

/// A port that answered as the laser, still open.
pub struct IdentifiedPort<P> {
    /// The open port; ownership passes to the caller.
    pub port: P,
    /// Parsed identification reply.
    pub identity: InstrumentIdentity,
}

impl<P: Port> fmt::Debug for IdentifiedPort<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifiedPort")
            .field("port", &self.port.name())
            .field("identity", &self.identity)
            .finish()
    }
}

/// Result of probing one candidate.
#[derive(Debug)]
pub enum ProbeOutcome<P: Port> {
    /// The laser answered; the port is open and owned by the caller.
    Identified(IdentifiedPort<P>),
    /// Something answered, but not the laser.
    WrongDevice {
        /// What it said.
        response: String,
    },
    /// The port is held by another process.
    Busy,
    /// Nothing answered within the timeout.
    Timeout,
    /// Transport failure (unplugged, framing, permission).
    IoError(String),
}

impl<P: Port> ProbeOutcome<P> {
    /// The outcome without the port.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Identified(_) => OutcomeKind::Identified,
            Self::WrongDevice { .. } => OutcomeKind::WrongDevice,
            Self::Busy => OutcomeKind::Busy,
            Self::Timeout => OutcomeKind::Timeout,
            Self::IoError(_) => OutcomeKind::IoError,
        }
    }

    /// Human-readable detail for diagnostics.
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Identified(found) => Some(
                found
                    .identity
                    .raw
                    .clone(),
            ),
            Self::WrongDevice { response } => Some(response.clone()),
            Self::IoError(detail) => Some(detail.clone()),
            Self::Busy | Self::Timeout => None,
        }
    }
}

/// Outcome tag recorded in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutcomeKind {
    /// The laser answered.
    Identified,
    /// Another device answered.
    WrongDevice,
    /// Port held elsewhere.
    Busy,
    /// No answer.
    Timeout,
    /// Transport failure.
    IoError,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Identified => "identified",
            Self::WrongDevice => "wrong device",
            Self::Busy => "busy",
            Self::Timeout => "timeout",
            Self::IoError => "I/O error",
        })
    }
}

/// Closes the borrowed port when dropped, unless released.
pub struct CloseOnExit<'a, P: Port> {
    port: &'a mut P,
    armed: bool,
}

impl<'a, P: Port> CloseOnExit<'a, P> {
    /// Guard `port` until the end of the current scope.
    pub fn new(port: &'a mut P) -> Self {
        Self { port, armed: true }
    }

    /// Keep the port open past the end of the scope.
    pub fn release(mut self) {
        self.armed = false;
    }
}

impl<P: Port> Deref for CloseOnExit<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.port
    }
}

impl<P: Port> DerefMut for CloseOnExit<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.port
    }
}

impl<P: Port> Drop for CloseOnExit<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.port.close() {
                warn!("Failed to close {}: {e}", self.port.name());
            } else {
                trace!("Released {}", self.port.name());
            }
        }
    }
}

/// What the device said, before ownership is decided.
enum Verdict {
    Identified(InstrumentIdentity),
    WrongDevice(String),
    Silent,
}

/// Probe one candidate.
///
/// `timeout` bounds the open, the settle delay and the wait for the reply.
/// Every outcome other than [`ProbeOutcome::Identified`] returns with the port
/// closed.
pub fn probe<O: PortOpener>(
    opener: &O,
    candidate: &Candidate,
    settings: &ProbeSettings,
    timeout: Duration,
) -> ProbeOutcome<O::Port> {
    let deadline = Instant::now() + timeout;
    let config = settings
        .serial
        .for_port(&candidate.address)
        .with_timeout(timeout);

    debug!("Probing {candidate}");

    let mut port = match opener.open(&config) {
        Ok(port) => port,
        Err(Error::PortBusy(_)) => return ProbeOutcome::Busy,
        Err(Error::Timeout(_)) => return ProbeOutcome::Timeout,
        Err(e) => return ProbeOutcome::IoError(e.to_string()),
    };

    let verdict = {
        let mut guard = CloseOnExit::new(&mut port);
        match exchange(&mut *guard, settings, deadline) {
            Ok(Verdict::Identified(identity)) => {
                guard.release();
                Ok(identity)
            },
            Ok(Verdict::WrongDevice(response)) => Err(ProbeOutcome::WrongDevice { response }),
            Ok(Verdict::Silent) => Err(ProbeOutcome::Timeout),
            Err(Error::Timeout(_)) => Err(ProbeOutcome::Timeout),
            Err(e) => Err(ProbeOutcome::IoError(e.to_string())),
        }
    };

    match verdict {
        Ok(identity) => {
            debug!("{} identified as {identity}", candidate.address);
            ProbeOutcome::Identified(IdentifiedPort { port, identity })
        },
        Err(outcome) => {
            debug!("{}: {}", candidate.address, outcome.kind());
            outcome
        },
    }
}

fn exchange<P: Port>(
    port: &mut P,
    settings: &ProbeSettings,
    deadline: Instant,
) -> crate::Result<Verdict> {
    // The settle pause counts against the per-port timeout
    let settle = settings
        .settle_delay
        .min(deadline.saturating_duration_since(Instant::now()));
    if !settle.is_zero() {
        thread::sleep(settle);
    }
    port.clear_buffers()?;

    let remaining = deadline.saturating_duration_since(Instant::now());
    let reply = protocol::query(port, &settings.query, &settings.terminator, remaining)?;
    Ok(match reply {
        None => Verdict::Silent,
        Some(text) => {
            let identity = InstrumentIdentity::parse(&text);
            if identity.matches(&settings.signature) {
                Verdict::Identified(identity)
            } else {
                Verdict::WrongDevice(text)
            }
        },
    })
}
