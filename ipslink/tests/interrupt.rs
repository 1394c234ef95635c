//! Cancellation through the global interrupt checker.
//!
//! Kept in its own test binary: the checker is process-wide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ipslink::{
    Discovery, DiscoveryConfig, Error,
    device::StaticAliases,
    port::sim::{SimulatedBus, SimulatedDevice},
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[test]
fn interrupt_stops_discovery_before_the_next_probe() {
    ipslink::set_interrupt_checker(|| INTERRUPTED.load(Ordering::Relaxed));

    let bus = SimulatedBus::new()
        .with_port("/dev/ttyS0", SimulatedDevice::Silent)
        .with_port("/dev/ttyS1", SimulatedDevice::laser("IPS,HPU,1,785nm,1.0"));

    let mut config = DiscoveryConfig::default();
    config.probe.settle_delay = Duration::ZERO;
    config.options.probe_timeout = Duration::from_millis(20);
    let discovery = Discovery::new(bus.clone(), StaticAliases::unavailable(), bus.clone(), config);

    INTERRUPTED.store(true, Ordering::Relaxed);
    let err = discovery
        .find_instrument()
        .unwrap_err();

    let Error::Cancelled(report) = err else {
        panic!("expected Cancelled, got {err:?}");
    };
    assert!(report.attempts.is_empty());
    assert_eq!(report.skipped, 2);
    assert!(bus.stats().open_attempts.is_empty());

    INTERRUPTED.store(false, Ordering::Relaxed);
    assert!(discovery.find_instrument().is_ok());
    assert_eq!(bus.stats().open_handles(), 0);
}
