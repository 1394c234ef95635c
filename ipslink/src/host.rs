//! Host-side helpers wired to the real serial ports and loaded config.

use crate::{
    Result,
    config::Config,
    connection::Connection,
    device::ByIdDirectory,
    discovery::{Discovery, ScanReport},
    port::{NativePort, NativePortEnumerator, NativePortOpener, PortEnumerator, PortInfo},
};

/// Discovery over the host's serial ports and `/dev/serial/by-id`.
pub type NativeDiscovery = Discovery<NativePortEnumerator, ByIdDirectory, NativePortOpener>;

/// Build a discovery for this host from `config`.
pub fn native_discovery(config: &Config) -> Result<NativeDiscovery> {
    Ok(Discovery::new(
        NativePortEnumerator,
        ByIdDirectory::new(config.by_id_dir()),
        NativePortOpener,
        config.discovery_config()?,
    ))
}

/// Find the laser using the config files found on this host.
pub fn find_laser() -> Result<Connection<NativePort>> {
    native_discovery(&Config::load())?.find_instrument()
}

/// Probe every candidate and list the lasers found.
pub fn scan_lasers() -> Result<ScanReport> {
    native_discovery(&Config::load())?.scan()
}

/// List the raw serial ports visible to the host.
pub fn discover_ports() -> Result<Vec<PortInfo>> {
    NativePortEnumerator.list_ports()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_native_discovery_uses_config() {
        let mut config = Config::default();
        config.discovery.by_id_dir = Some(PathBuf::from("/tmp/ipslink-by-id"));
        config.discovery.max_attempts = Some(4);

        let discovery = native_discovery(&config).unwrap();
        assert_eq!(discovery.config().options.max_attempts, Some(4));
        assert_eq!(discovery.config(), &config.discovery_config().unwrap());
    }

    #[test]
    fn test_invalid_config_is_not_used() {
        let mut config = Config::default();
        config.identify.signature = Some(String::new());
        assert!(matches!(native_discovery(&config), Err(crate::Error::Config(_))));
    }
}
