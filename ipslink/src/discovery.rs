//! Discovery: probe candidates one at a time until the laser answers.
//!
//! ## Example
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "native")]
//!     {
//!         use ipslink::device::ByIdDirectory;
//!         use ipslink::port::{NativePortEnumerator, NativePortOpener};
//!         use ipslink::{Discovery, DiscoveryConfig};
//!
//!         let discovery = Discovery::new(
//!             NativePortEnumerator,
//!             ByIdDirectory::default(),
//!             NativePortOpener,
//!             DiscoveryConfig::default(),
//!         );
//!
//!         let mut laser = discovery.find_instrument()?;
//!         println!("{} on {}", laser.identity(), laser.address());
//!         laser.disconnect()?;
//!     }
//!
//!     Ok(())
//! }
//! ```

use {
    crate::{
        connection::Connection,
        device::{AliasNamespace, DeviceIdentifier, IdentifierPattern},
        error::{Error, Result},
        identity::InstrumentIdentity,
        port::{Port, PortEnumerator, PortOpener},
        probe::{OutcomeKind, ProbeOutcome, ProbeSettings, probe},
        resolver::{Candidate, Provenance, resolve_candidates},
    },
    log::{debug, info, warn},
    serde::Serialize,
    std::{
        fmt,
        time::{Duration, Instant},
    },
};

/// Default time allowed for one probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(250);

/// Limits for one discovery call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Time allowed to open one candidate and read its reply.
    pub probe_timeout: Duration,
    /// Stop after probing this many candidates.
    pub max_attempts: Option<usize>,
    /// Give up once this much time has passed since the call started.
    pub overall_timeout: Option<Duration>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_attempts: None,
            overall_timeout: None,
        }
    }
}

impl DiscoveryOptions {
    /// Reject a zero probe timeout.
    pub fn validate(&self) -> Result<()> {
        if self
            .probe_timeout
            .is_zero()
        {
            return Err(Error::Config(
                "discovery.probe_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Everything discovery needs besides the host collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// How each candidate is probed.
    pub probe: ProbeSettings,
    /// Limits per call.
    pub options: DiscoveryOptions,
    /// Alias patterns that narrow the search.
    pub patterns: Vec<IdentifierPattern>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe: ProbeSettings::default(),
            options: DiscoveryOptions::default(),
            patterns: IdentifierPattern::ips_defaults(),
        }
    }
}

impl DiscoveryConfig {
    /// Reject settings under which no probe could classify a reply.
    ///
    /// An empty signature matches every reply and an empty terminator never
    /// ends a line.
    pub fn validate(&self) -> Result<()> {
        let probe = &self.probe;
        if probe
            .signature
            .is_empty()
        {
            return Err(Error::Config("identify.signature must not be empty".into()));
        }
        if probe
            .terminator
            .is_empty()
        {
            return Err(Error::Config("identify.terminator must not be empty".into()));
        }
        if probe
            .query
            .trim()
            .is_empty()
        {
            return Err(Error::Config("identify.query must not be empty".into()));
        }
        if probe.serial.baud_rate == 0 {
            return Err(Error::Config("serial.baud must be greater than zero".into()));
        }
        self.options
            .validate()
    }
}

/// Diagnostic entry for one probed candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeRecord {
    /// Port address.
    pub address: String,
    /// Alias name the port was reached through.
    pub identifier: Option<String>,
    /// Narrowed, fallback or explicit.
    pub provenance: Provenance,
    /// What happened.
    pub outcome: OutcomeKind,
    /// Reply text or error detail.
    pub detail: Option<String>,
}

impl ProbeRecord {
    fn new<P: Port>(candidate: &Candidate, outcome: &ProbeOutcome<P>) -> Self {
        Self {
            address: candidate
                .address
                .clone(),
            identifier: candidate
                .identifier
                .as_ref()
                .map(|id| {
                    id.name
                        .clone()
                }),
            provenance: candidate.provenance,
            outcome: outcome.kind(),
            detail: outcome.detail(),
        }
    }
}

impl fmt::Display for ProbeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.address, self.provenance)?;
        if let Some(id) = &self.identifier {
            write!(f, " via {id}")?;
        }
        write!(f, "): {}", self.outcome)?;
        if let Some(detail) = &self.detail {
            write!(f, " [{detail}]")?;
        }
        Ok(())
    }
}

/// Per-candidate diagnostics for one discovery call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// One record per probed candidate, in probe order.
    pub attempts: Vec<ProbeRecord>,
    /// Candidates left unprobed because a limit was reached.
    pub skipped: usize,
}

impl DiscoveryReport {
    /// Number of attempts that ended with `kind`.
    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.attempts
            .iter()
            .filter(|r| r.outcome == kind)
            .count()
    }
}

impl fmt::Display for DiscoveryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self
            .attempts
            .is_empty()
        {
            f.write_str("no candidates probed")?;
        } else {
            write!(f, "{} candidate(s) probed", self.attempts.len())?;
            for record in &self.attempts {
                write!(f, "; {record}")?;
            }
        }
        if self.skipped > 0 {
            write!(f, "; {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// A laser seen during a full scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundLaser {
    /// Port address.
    pub address: String,
    /// Alias the port was reached through.
    pub identifier: Option<DeviceIdentifier>,
    /// Identification reply.
    pub identity: InstrumentIdentity,
}

/// Result of [`Discovery::scan`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    /// Every laser that answered, in probe order.
    pub lasers: Vec<FoundLaser>,
    /// Every probe, lasers included.
    pub report: DiscoveryReport,
}

enum Step {
    Probe(Duration),
    LimitReached,
    Cancelled,
}

/// Tracks the per-call limits.
struct Budget {
    probe_timeout: Duration,
    max_attempts: Option<usize>,
    deadline: Option<Instant>,
}

impl Budget {
    fn start(options: &DiscoveryOptions) -> Self {
        Self {
            probe_timeout: options.probe_timeout,
            max_attempts: options.max_attempts,
            deadline: options
                .overall_timeout
                .map(|t| Instant::now() + t),
        }
    }

    fn next(&self, attempted: usize) -> Step {
        if crate::is_interrupted_requested() {
            return Step::Cancelled;
        }
        let timeout = match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Step::Cancelled;
                }
                remaining.min(self.probe_timeout)
            },
            None => self.probe_timeout,
        };
        if self
            .max_attempts
            .is_some_and(|max| attempted >= max)
        {
            return Step::LimitReached;
        }
        Step::Probe(timeout)
    }
}

/// Finds the laser among the host's serial ports.
///
/// Generic over the three host collaborators so the same logic drives real
/// hardware and the simulated bus.
#[derive(Debug, Clone)]
pub struct Discovery<E, A, O> {
    enumerator: E,
    aliases: A,
    opener: O,
    config: DiscoveryConfig,
}

impl<E, A, O> Discovery<E, A, O>
where
    E: PortEnumerator,
    A: AliasNamespace,
    O: PortOpener,
{
    /// Create a discovery over the given collaborators.
    pub fn new(enumerator: E, aliases: A, opener: O, config: DiscoveryConfig) -> Self {
        Self {
            enumerator,
            aliases,
            opener,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// The ordered candidate list, freshly queried from the host.
    pub fn candidates(&self) -> Result<Vec<Candidate>> {
        let mut candidates =
            resolve_candidates(&self.enumerator, &self.aliases, &self.config.patterns)?;
        // Stable: keeps each group's own order
        candidates.sort_by_key(Candidate::priority);
        Ok(candidates)
    }

    /// Find the laser using the configured limits.
    pub fn find_instrument(&self) -> Result<Connection<O::Port>> {
        self.find_instrument_with(&self.config.options)
    }

    /// Find the laser, probing candidates in priority order.
    ///
    /// Stops at the first identified laser. Every other probed port is closed
    /// before this returns, whatever the result.
    pub fn find_instrument_with(&self, options: &DiscoveryOptions) -> Result<Connection<O::Port>> {
        self.config
            .validate()?;
        options.validate()?;
        let candidates = self.candidates()?;
        info!("Searching for laser among {} candidate(s)", candidates.len());

        let budget = Budget::start(options);
        let mut report = DiscoveryReport::default();

        for (index, candidate) in candidates
            .iter()
            .enumerate()
        {
            let timeout = match budget.next(index) {
                Step::Probe(timeout) => timeout,
                Step::LimitReached => {
                    report.skipped = candidates.len() - index;
                    debug!("Attempt limit reached, {} candidate(s) skipped", report.skipped);
                    break;
                },
                Step::Cancelled => {
                    report.skipped = candidates.len() - index;
                    info!("Discovery cancelled after {index} probe(s)");
                    return Err(Error::Cancelled(report));
                },
            };

            match probe(&self.opener, candidate, &self.config.probe, timeout) {
                ProbeOutcome::Identified(found) => {
                    info!("Found laser on {candidate}: {}", found.identity);
                    return Ok(Connection::new(
                        found,
                        candidate.clone(),
                        &self.config.probe,
                        options.probe_timeout,
                    ));
                },
                outcome => {
                    log_rejection(candidate, &outcome);
                    report
                        .attempts
                        .push(ProbeRecord::new(candidate, &outcome));
                },
            }
        }

        info!("Laser not found: {report}");
        Err(Error::NotFound(report))
    }

    /// Probe one known address and connect if the laser answers there.
    pub fn connect_to(&self, address: &str) -> Result<Connection<O::Port>> {
        self.config
            .validate()?;
        let candidate = Candidate::new(address, None, Provenance::Explicit);
        let timeout = self
            .config
            .options
            .probe_timeout;

        match probe(&self.opener, &candidate, &self.config.probe, timeout) {
            ProbeOutcome::Identified(found) => {
                info!("Connected to {address}: {}", found.identity);
                Ok(Connection::new(found, candidate, &self.config.probe, timeout))
            },
            outcome => {
                log_rejection(&candidate, &outcome);
                Err(Error::NotFound(DiscoveryReport {
                    attempts: vec![ProbeRecord::new(&candidate, &outcome)],
                    skipped: 0,
                }))
            },
        }
    }

    /// Probe every candidate and list all lasers found.
    ///
    /// Unlike [`find_instrument`](Self::find_instrument) this does not stop at
    /// the first match, and it closes identified ports too.
    pub fn scan(&self) -> Result<ScanReport> {
        self.config
            .validate()?;
        let candidates = self.candidates()?;
        info!("Scanning {} candidate(s)", candidates.len());

        let budget = Budget::start(&self.config.options);
        let mut scan = ScanReport::default();

        for (index, candidate) in candidates
            .iter()
            .enumerate()
        {
            let timeout = match budget.next(index) {
                Step::Probe(timeout) => timeout,
                Step::LimitReached => {
                    scan.report.skipped = candidates.len() - index;
                    break;
                },
                Step::Cancelled => {
                    scan.report.skipped = candidates.len() - index;
                    return Err(Error::Cancelled(scan.report));
                },
            };

            let outcome = probe(&self.opener, candidate, &self.config.probe, timeout);
            scan.report
                .attempts
                .push(ProbeRecord::new(candidate, &outcome));

            match outcome {
                ProbeOutcome::Identified(mut found) => {
                    if let Err(e) = found
                        .port
                        .close()
                    {
                        warn!("Failed to close {}: {e}", candidate.address);
                    }
                    scan.lasers
                        .push(FoundLaser {
                            address: candidate
                                .address
                                .clone(),
                            identifier: candidate
                                .identifier
                                .clone(),
                            identity: found.identity,
                        });
                },
                outcome => log_rejection(candidate, &outcome),
            }
        }

        info!("Scan found {} laser(s)", scan.lasers.len());
        Ok(scan)
    }
}

fn log_rejection<P: Port>(candidate: &Candidate, outcome: &ProbeOutcome<P>) {
    match outcome {
        ProbeOutcome::IoError(detail) => warn!("Probe failed on {candidate}: {detail}"),
        ProbeOutcome::WrongDevice { response } => {
            debug!("{candidate} is not the laser (replied {response:?})");
        },
        other => debug!("{candidate}: {}", other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Alias, StaticAliases};
    use crate::port::sim::{SimulatedBus, SimulatedDevice};

    const LASER: &str = "IPS,HPU,100123,785nm,3.1";

    fn fast_config() -> DiscoveryConfig {
        let mut config = DiscoveryConfig::default();
        config.probe.settle_delay = Duration::ZERO;
        config.options.probe_timeout = Duration::from_millis(20);
        config
    }

    fn discovery(
        bus: &SimulatedBus,
        aliases: StaticAliases,
    ) -> Discovery<SimulatedBus, StaticAliases, SimulatedBus> {
        Discovery::new(bus.clone(), aliases, bus.clone(), fast_config())
    }

    #[test]
    fn test_busy_then_identified() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyACM0", SimulatedDevice::Busy)
            .with_port("/dev/ttyACM1", SimulatedDevice::laser(LASER));

        let connection = discovery(&bus, StaticAliases::unavailable())
            .find_instrument()
            .unwrap();

        assert_eq!(connection.address(), "/dev/ttyACM1");
        assert_eq!(bus.stats().attempts_on("/dev/ttyACM0"), 1);
        drop(connection);
        assert_eq!(bus.stats().open_handles(), 0);
    }

    #[test]
    fn test_io_error_does_not_abort() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyACM0", SimulatedDevice::Faulty)
            .with_port("/dev/ttyACM1", SimulatedDevice::Unplugged)
            .with_port("/dev/ttyACM2", SimulatedDevice::laser(LASER));

        let connection = discovery(&bus, StaticAliases::unavailable())
            .find_instrument()
            .unwrap();
        assert_eq!(connection.address(), "/dev/ttyACM2");
    }

    #[test]
    fn test_not_found_aggregates_every_outcome() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyS1", SimulatedDevice::Busy)
            .with_port("/dev/ttyS2", SimulatedDevice::Silent)
            .with_port("/dev/ttyS3", SimulatedDevice::Faulty);

        let err = discovery(&bus, StaticAliases::unavailable())
            .find_instrument()
            .unwrap_err();

        let Error::NotFound(report) = err else {
            panic!("expected NotFound, got {err:?}");
        };
        let outcomes: Vec<OutcomeKind> = report
            .attempts
            .iter()
            .map(|r| r.outcome)
            .collect();
        assert_eq!(
            outcomes,
            [
                OutcomeKind::WrongDevice,
                OutcomeKind::Busy,
                OutcomeKind::Timeout,
                OutcomeKind::IoError,
            ]
        );
        assert_eq!(report.attempts[0].detail.as_deref(), Some("arduino ready"));
        assert_eq!(report.skipped, 0);

        let stats = bus.stats();
        assert_eq!(stats.opens, stats.closes);
    }

    #[test]
    fn test_max_attempts_limits_probing() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::Silent)
            .with_port("/dev/ttyS1", SimulatedDevice::Silent)
            .with_port("/dev/ttyS2", SimulatedDevice::laser(LASER));

        let options = DiscoveryOptions {
            max_attempts: Some(2),
            ..fast_config().options
        };
        let err = discovery(&bus, StaticAliases::unavailable())
            .find_instrument_with(&options)
            .unwrap_err();

        let report = err
            .report()
            .unwrap();
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(bus.stats().attempts_on("/dev/ttyS2"), 0);
    }

    #[test]
    fn test_overall_timeout_cancels() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::Silent)
            .with_port("/dev/ttyS1", SimulatedDevice::Silent)
            .with_port("/dev/ttyS2", SimulatedDevice::Silent)
            .with_port("/dev/ttyS3", SimulatedDevice::laser(LASER));

        let options = DiscoveryOptions {
            probe_timeout: Duration::from_millis(40),
            overall_timeout: Some(Duration::from_millis(60)),
            max_attempts: None,
        };
        let err = discovery(&bus, StaticAliases::unavailable())
            .find_instrument_with(&options)
            .unwrap_err();

        let Error::Cancelled(report) = err else {
            panic!("expected Cancelled, got {err:?}");
        };
        assert!(report.skipped >= 1);
        assert_eq!(report.attempts.len() + report.skipped, 4);
        assert_eq!(bus.stats().attempts_on("/dev/ttyS3"), 0);
        assert_eq!(bus.stats().open_handles(), 0);
    }

    #[test]
    fn test_settle_delay_stays_within_overall_timeout() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::Silent)
            .with_port("/dev/ttyS1", SimulatedDevice::Silent)
            .with_port("/dev/ttyS2", SimulatedDevice::Silent);
        let mut config = fast_config();
        config.probe.settle_delay = Duration::from_millis(100);
        let discovery = Discovery::new(bus.clone(), StaticAliases::unavailable(), bus.clone(), config);

        let options = DiscoveryOptions {
            probe_timeout: Duration::from_millis(100),
            overall_timeout: Some(Duration::from_millis(50)),
            max_attempts: None,
        };
        let start = Instant::now();
        let err = discovery
            .find_instrument_with(&options)
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(bus.stats().open_handles(), 0);
    }

    #[test]
    fn test_empty_signature_is_rejected_before_opening() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyS1", SimulatedDevice::laser(LASER));
        let mut config = fast_config();
        config.probe.signature = String::new();
        let discovery = Discovery::new(bus.clone(), StaticAliases::unavailable(), bus.clone(), config);

        assert!(matches!(discovery.find_instrument(), Err(Error::Config(_))));
        assert!(matches!(discovery.scan(), Err(Error::Config(_))));
        assert!(matches!(discovery.connect_to("/dev/ttyS1"), Err(Error::Config(_))));
        assert!(bus.stats().open_attempts.is_empty());
    }

    #[test]
    fn test_zero_port_timeout_is_rejected() {
        let bus = SimulatedBus::new().with_port("/dev/ttyS0", SimulatedDevice::laser(LASER));
        let options = DiscoveryOptions {
            probe_timeout: Duration::ZERO,
            ..fast_config().options
        };
        let err = discovery(&bus, StaticAliases::unavailable())
            .find_instrument_with(&options)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(bus.stats().open_attempts.is_empty());
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyS1", SimulatedDevice::laser(LASER));
        let discovery = discovery(&bus, StaticAliases::unavailable());

        let first = discovery
            .find_instrument()
            .unwrap();
        let first_address = first
            .address()
            .to_string();
        drop(first);
        let second = discovery
            .find_instrument()
            .unwrap();

        assert_eq!(first_address, second.address());
        assert_eq!(
            bus.stats().open_attempts,
            ["/dev/ttyS0", "/dev/ttyS1", "/dev/ttyS0", "/dev/ttyS1"]
        );
    }

    #[test]
    fn test_enumeration_failure_attempts_nothing() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::laser(LASER))
            .failing_enumeration("no udev");

        let err = discovery(&bus, StaticAliases::unavailable())
            .find_instrument()
            .unwrap_err();
        assert!(matches!(err, Error::Enumeration(_)));
        assert!(bus.stats().open_attempts.is_empty());
    }

    #[test]
    fn test_connect_to_known_address() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyS1", SimulatedDevice::laser(LASER));
        let discovery = discovery(&bus, StaticAliases::unavailable());

        let connection = discovery
            .connect_to("/dev/ttyS1")
            .unwrap();
        assert_eq!(connection.candidate().provenance, Provenance::Explicit);
        assert_eq!(bus.stats().attempts_on("/dev/ttyS0"), 0);

        let err = discovery
            .connect_to("/dev/ttyS0")
            .unwrap_err();
        let report = err
            .report()
            .unwrap();
        assert_eq!(report.attempts[0].outcome, OutcomeKind::WrongDevice);
    }

    #[test]
    fn test_scan_lists_every_laser_and_closes_all() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyACM0", SimulatedDevice::laser("IPS,HPU,1,785nm,3.1"))
            .with_port("/dev/ttyACM1", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyACM2", SimulatedDevice::laser("IPS,HPU,2,1064nm,3.1"));

        let scan = discovery(&bus, StaticAliases::unavailable())
            .scan()
            .unwrap();

        let serials: Vec<Option<&str>> = scan
            .lasers
            .iter()
            .map(|l| {
                l.identity
                    .serial_number
                    .as_deref()
            })
            .collect();
        assert_eq!(serials, [Some("1"), Some("2")]);
        assert_eq!(scan.report.count(OutcomeKind::Identified), 2);
        assert_eq!(scan.report.count(OutcomeKind::WrongDevice), 1);

        let stats = bus.stats();
        assert_eq!(stats.opens, 3);
        assert_eq!(stats.open_handles(), 0);
    }

    #[test]
    fn test_scan_uses_narrowed_candidates() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyACM0", SimulatedDevice::responder("arduino ready"))
            .with_port("/dev/ttyACM1", SimulatedDevice::laser(LASER));
        let aliases = StaticAliases::new(vec![Alias::new("usb-IPS_HPU_100123-if00", "/dev/ttyACM1")]);

        let scan = discovery(&bus, aliases)
            .scan()
            .unwrap();
        assert_eq!(scan.lasers.len(), 1);
        assert_eq!(
            scan.lasers[0]
                .identifier
                .as_ref()
                .map(|id| id.name.as_str()),
            Some("usb-IPS_HPU_100123-if00")
        );
        assert_eq!(bus.stats().attempts_on("/dev/ttyACM0"), 0);
    }

    #[test]
    fn test_report_display() {
        let report = DiscoveryReport {
            attempts: vec![ProbeRecord {
                address: "/dev/ttyS0".to_string(),
                identifier: None,
                provenance: Provenance::Fallback,
                outcome: OutcomeKind::WrongDevice,
                detail: Some("arduino ready".to_string()),
            }],
            skipped: 2,
        };
        assert_eq!(
            report.to_string(),
            "1 candidate(s) probed; /dev/ttyS0 (fallback): wrong device [arduino ready]; 2 skipped"
        );
        assert_eq!(DiscoveryReport::default().to_string(), "no candidates probed");
    }
}
