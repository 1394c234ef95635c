//! Configuration file support for ipslink.
//!
//! Configuration is loaded from two files, the local one winning field by
//! field:
//! 1. Local config file (`./ipslink.toml`)
//! 2. Global config file (`~/.config/ipslink/config.toml`)
//!
//! ```toml
//! [serial]
//! baud = 115200
//! data_bits = 8
//! parity = "none"
//! stop_bits = 1
//! flow_control = "none"
//!
//! [identify]
//! query = "*IDN?"
//! terminator = "\n"
//! signature = "IPS"
//! settle_ms = 50
//!
//! [discovery]
//! probe_timeout_ms = 250
//! overall_timeout_ms = 5000
//! max_attempts = 8
//! by_id_dir = "/dev/serial/by-id"
//!
//! [[discovery.identifier]]
//! vendor = "IPS"
//! model = "HPU"
//! ```

use {
    crate::{
        device::{DEFAULT_BY_ID_DIR, IdentifierPattern},
        discovery::{DiscoveryConfig, DiscoveryOptions},
        error::{Error, Result},
        port::{DataBits, FlowControl, Parity, StopBits},
        probe::ProbeSettings,
    },
    directories::ProjectDirs,
    log::{debug, warn},
    serde::{Deserialize, Serialize},
    std::{
        fs,
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Name of the local config file.
pub const LOCAL_CONFIG_FILE: &str = "ipslink.toml";

/// Serial line settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSection {
    /// Baud rate.
    pub baud: Option<u32>,
    /// Data bits (`7` or `8`).
    pub data_bits: Option<DataBits>,
    /// Parity (`"none"`, `"odd"`, `"even"`).
    pub parity: Option<Parity>,
    /// Stop bits (`1` or `2`).
    pub stop_bits: Option<StopBits>,
    /// Flow control (`"none"`, `"hardware"`, `"software"`).
    pub flow_control: Option<FlowControl>,
}

/// How a probe identifies the laser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifySection {
    /// Identification query (default `*IDN?`).
    pub query: Option<String>,
    /// Line terminator (default `\n`).
    pub terminator: Option<String>,
    /// Reply substring marking the laser (default `IPS`).
    pub signature: Option<String>,
    /// Pause after opening a port, in milliseconds.
    pub settle_ms: Option<u64>,
}

/// Discovery limits and alias patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// Time allowed per probe, in milliseconds.
    pub probe_timeout_ms: Option<u64>,
    /// Time allowed for a whole discovery call, in milliseconds.
    pub overall_timeout_ms: Option<u64>,
    /// Probe at most this many candidates per call.
    pub max_attempts: Option<usize>,
    /// Directory of stable serial links.
    pub by_id_dir: Option<PathBuf>,
    /// Alias patterns; the IPS defaults apply when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<IdentifierPattern>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Serial line settings.
    #[serde(default)]
    pub serial: SerialSection,
    /// Identification settings.
    #[serde(default)]
    pub identify: IdentifySection,
    /// Discovery settings.
    #[serde(default)]
    pub discovery: DiscoverySection,
}

impl Config {
    /// Load configuration from all available sources.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_from_file(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file, falling back to defaults.
    pub fn load_from_path(path: &Path) -> Self {
        if let Some(config) = Self::load_from_file(path) {
            debug!("Loaded config from {}", path.display());
            config
        } else {
            warn!(
                "Could not load config from {}, using defaults",
                path.display()
            );
            Self::default()
        }
    }

    /// Load configuration from a specific file, reporting why it failed.
    pub fn try_load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match Self::try_load_from_path(path) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("{e}");
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ipslink").map(|dirs| {
            dirs.config_dir()
                .to_path_buf()
        })
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one; set fields in `other` win.
    pub fn merge(&mut self, other: Self) {
        // Serial
        let serial = other.serial;
        if serial
            .baud
            .is_some()
        {
            self.serial.baud = serial.baud;
        }
        if serial
            .data_bits
            .is_some()
        {
            self.serial.data_bits = serial.data_bits;
        }
        if serial
            .parity
            .is_some()
        {
            self.serial.parity = serial.parity;
        }
        if serial
            .stop_bits
            .is_some()
        {
            self.serial.stop_bits = serial.stop_bits;
        }
        if serial
            .flow_control
            .is_some()
        {
            self.serial.flow_control = serial.flow_control;
        }

        // Identify
        let identify = other.identify;
        if identify
            .query
            .is_some()
        {
            self.identify.query = identify.query;
        }
        if identify
            .terminator
            .is_some()
        {
            self.identify.terminator = identify.terminator;
        }
        if identify
            .signature
            .is_some()
        {
            self.identify.signature = identify.signature;
        }
        if identify
            .settle_ms
            .is_some()
        {
            self.identify.settle_ms = identify.settle_ms;
        }

        // Discovery
        let discovery = other.discovery;
        if discovery
            .probe_timeout_ms
            .is_some()
        {
            self.discovery.probe_timeout_ms = discovery.probe_timeout_ms;
        }
        if discovery
            .overall_timeout_ms
            .is_some()
        {
            self.discovery.overall_timeout_ms = discovery.overall_timeout_ms;
        }
        if discovery
            .max_attempts
            .is_some()
        {
            self.discovery.max_attempts = discovery.max_attempts;
        }
        if discovery
            .by_id_dir
            .is_some()
        {
            self.discovery.by_id_dir = discovery.by_id_dir;
        }
        self.discovery
            .identifier
            .extend(discovery.identifier);
    }

    /// Directory of stable serial links.
    pub fn by_id_dir(&self) -> PathBuf {
        self.discovery
            .by_id_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BY_ID_DIR))
    }

    /// Discovery settings with defaults filled in.
    ///
    /// Fails with [`Error::Config`] when a value would make every probe
    /// misclassify, such as an empty signature or a zero timeout.
    pub fn discovery_config(&self) -> Result<DiscoveryConfig> {
        let defaults = DiscoveryConfig::default();
        let probe_defaults = defaults.probe;
        let line = &self.serial;
        let identify = &self.identify;

        let mut serial = probe_defaults
            .serial
            .clone();
        if let Some(baud) = line.baud {
            serial.baud_rate = baud;
        }
        if let Some(data_bits) = line.data_bits {
            serial.data_bits = data_bits;
        }
        if let Some(parity) = line.parity {
            serial.parity = parity;
        }
        if let Some(stop_bits) = line.stop_bits {
            serial.stop_bits = stop_bits;
        }
        if let Some(flow_control) = line.flow_control {
            serial.flow_control = flow_control;
        }

        let probe = ProbeSettings {
            serial,
            query: identify
                .query
                .clone()
                .unwrap_or(probe_defaults.query),
            terminator: identify
                .terminator
                .clone()
                .unwrap_or(probe_defaults.terminator),
            signature: identify
                .signature
                .clone()
                .unwrap_or(probe_defaults.signature),
            settle_delay: identify
                .settle_ms
                .map_or(probe_defaults.settle_delay, Duration::from_millis),
        };

        let discovery = &self.discovery;
        let options = DiscoveryOptions {
            probe_timeout: discovery
                .probe_timeout_ms
                .map_or(defaults.options.probe_timeout, Duration::from_millis),
            max_attempts: discovery.max_attempts,
            overall_timeout: discovery
                .overall_timeout_ms
                .map(Duration::from_millis),
        };

        let mut patterns: Vec<IdentifierPattern> = Vec::new();
        for pattern in &discovery.identifier {
            if pattern.is_valid() {
                patterns.push(pattern.clone());
            } else {
                warn!("Ignoring identifier pattern with no vendor, model or serial");
            }
        }
        if patterns.is_empty() {
            patterns = defaults.patterns;
        }

        let config = DiscoveryConfig {
            probe,
            options,
            patterns,
        };
        config.validate()?;
        Ok(config)
    }
}
