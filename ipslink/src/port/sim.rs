//! Simulated serial bus for tests and dry runs.
//!
//! A [`SimulatedBus`] holds a fixed list of ports, each backed by a
//! [`SimulatedDevice`] that decides how the "hardware" reacts to an open and to
//! the lines written to it. The bus implements both [`PortEnumerator`] and
//! [`PortOpener`] and counts every open and close, so callers can assert that
//! discovery left nothing open.
//!
//! ```rust
//! use ipslink::port::sim::{SimulatedBus, SimulatedDevice};
//!
//! let bus = SimulatedBus::new()
//!     .with_port("/dev/ttyS0", SimulatedDevice::responder("arduino ready"))
//!     .with_port("/dev/ttyS1", SimulatedDevice::laser("IPS,HPU,12345,785.0nm,1.2"));
//! assert_eq!(bus.stats().opens, 0);
//! ```

use {
    crate::{
        error::{Error, Result},
        port::{Port, PortEnumerator, PortInfo, PortOpener, SerialConfig},
    },
    std::{
        collections::VecDeque,
        io::{Read, Write},
        sync::{Arc, Mutex, MutexGuard, PoisonError},
        thread,
        time::Duration,
    },
};

/// How a simulated port behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulatedDevice {
    /// Answers `query` with `reply`; any other line goes unanswered.
    Laser {
        /// Identification query the laser answers.
        query: String,
        /// Identification string returned.
        reply: String,
    },
    /// Answers every line with the same text (an Arduino sketch, another instrument).
    Responder(String),
    /// Opens fine but never answers.
    Silent,
    /// Held by another process; open fails with `PortBusy`.
    Busy,
    /// Opens, then every read fails with a transport error.
    Faulty,
    /// Listed by the host but gone by the time it is opened.
    Unplugged,
}

impl SimulatedDevice {
    /// A laser answering `*IDN?` with `idn`.
    pub fn laser(idn: impl Into<String>) -> Self {
        Self::Laser {
            query: "*IDN?".to_string(),
            reply: idn.into(),
        }
    }

    /// A device answering every line with `reply`.
    pub fn responder(reply: impl Into<String>) -> Self {
        Self::Responder(reply.into())
    }
}

/// Open/close accounting for a [`SimulatedBus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Successful opens.
    pub opens: usize,
    /// Closes of previously open ports.
    pub closes: usize,
    /// Every address an open was attempted on, in order.
    pub open_attempts: Vec<String>,
    /// Every line written to any port, as `(address, line)`.
    pub lines: Vec<(String, String)>,
}

impl BusStats {
    /// Ports opened and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.opens
            .saturating_sub(self.closes)
    }

    /// Number of open attempts made on `address`.
    pub fn attempts_on(&self, address: &str) -> usize {
        self.open_attempts
            .iter()
            .filter(|a| *a == address)
            .count()
    }
}

/// A set of simulated ports sharing one [`BusStats`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    ports: Vec<(String, SimulatedDevice)>,
    stats: Arc<Mutex<BusStats>>,
    enumeration_error: Option<String>,
}

impl SimulatedBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port; ports are listed in insertion order.
    #[must_use]
    pub fn with_port(mut self, address: impl Into<String>, device: SimulatedDevice) -> Self {
        self.ports
            .push((address.into(), device));
        self
    }

    /// Make `list_ports` fail as if the host could not be queried.
    #[must_use]
    pub fn failing_enumeration(mut self, reason: impl Into<String>) -> Self {
        self.enumeration_error = Some(reason.into());
        self
    }

    /// Snapshot of the accounting so far.
    pub fn stats(&self) -> BusStats {
        lock(&self.stats).clone()
    }

    fn device(&self, address: &str) -> Option<&SimulatedDevice> {
        self.ports
            .iter()
            .find(|(name, _)| name == address)
            .map(|(_, device)| device)
    }
}

impl PortEnumerator for SimulatedBus {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        if let Some(reason) = &self.enumeration_error {
            return Err(Error::Enumeration(reason.clone()));
        }
        Ok(self
            .ports
            .iter()
            .map(|(name, _)| PortInfo::named(name.clone()))
            .collect())
    }
}

impl PortOpener for SimulatedBus {
    type Port = SimulatedPort;

    fn open(&self, config: &SerialConfig) -> Result<SimulatedPort> {
        let address = config
            .port_name
            .clone();
        lock(&self.stats)
            .open_attempts
            .push(address.clone());

        let device = match self.device(&address) {
            Some(SimulatedDevice::Busy) => return Err(Error::PortBusy(address)),
            Some(SimulatedDevice::Unplugged) | None => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{address}: no such device"),
                )));
            },
            Some(device) => device.clone(),
        };

        lock(&self.stats).opens += 1;

        Ok(SimulatedPort {
            name: address,
            device,
            timeout: config.timeout,
            open: true,
            pending: Vec::new(),
            rx: VecDeque::new(),
            stats: Arc::clone(&self.stats),
        })
    }
}

/// An open port on a [`SimulatedBus`].
#[derive(Debug)]
pub struct SimulatedPort {
    name: String,
    device: SimulatedDevice,
    timeout: Duration,
    open: bool,
    pending: Vec<u8>,
    rx: VecDeque<u8>,
    stats: Arc<Mutex<BusStats>>,
}

impl SimulatedPort {
    fn answer(&mut self, line: &str) {
        let reply = match &self.device {
            SimulatedDevice::Laser { query, reply } if line == query.as_str() => Some(reply.clone()),
            SimulatedDevice::Responder(reply) => Some(reply.clone()),
            _ => None,
        };
        if let Some(reply) = reply {
            self.rx
                .extend(reply.bytes());
            self.rx
                .push_back(b'\n');
        }
    }
}

impl Port for SimulatedPort {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.pending
            .clear();
        self.rx
            .clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            lock(&self.stats).closes += 1;
        }
        Ok(())
    }
}

impl Read for SimulatedPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.open {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "port closed",
            ));
        }
        if self.device == SimulatedDevice::Faulty {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "framing error",
            ));
        }
        if self.rx.is_empty() {
            // A real port blocks for its timeout before giving up
            thread::sleep(self.timeout);
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "no data",
            ));
        }
        let n = buf
            .len()
            .min(self.rx.len());
        for (slot, byte) in buf
            .iter_mut()
            .zip(self.rx.drain(..n))
        {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.open {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "port closed",
            ));
        }
        self.pending
            .extend_from_slice(buf);
        while let Some(pos) = self
            .pending
            .iter()
            .position(|&b| b == b'\n')
        {
            let raw: Vec<u8> = self
                .pending
                .drain(..=pos)
                .collect();
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            lock(&self.stats)
                .lines
                .push((self.name.clone(), line.clone()));
            self.answer(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for SimulatedPort {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn lock(stats: &Mutex<BusStats>) -> MutexGuard<'_, BusStats> {
    stats
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> SerialConfig {
        SerialConfig::new(address, 115_200).with_timeout(Duration::from_millis(5))
    }

    #[test]
    fn test_lists_ports_in_insertion_order() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS1", SimulatedDevice::Silent)
            .with_port("/dev/ttyS0", SimulatedDevice::Silent);
        let names: Vec<String> = bus
            .list_ports()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["/dev/ttyS1", "/dev/ttyS0"]);
    }

    #[test]
    fn test_laser_answers_idn_only() {
        let bus = SimulatedBus::new().with_port("/dev/ttyACM0", SimulatedDevice::laser("IPS,HPU"));
        let mut port = bus
            .open(&config("/dev/ttyACM0"))
            .unwrap();

        port.write_all(b"Laser:Current?\n")
            .unwrap();
        let mut buf = [0u8; 32];
        assert_eq!(
            port.read(&mut buf)
                .unwrap_err()
                .kind(),
            std::io::ErrorKind::TimedOut
        );

        port.write_all(b"*IDN?\n")
            .unwrap();
        let n = port
            .read(&mut buf)
            .unwrap();
        assert_eq!(&buf[..n], b"IPS,HPU\n");
    }

    #[test]
    fn test_busy_and_unplugged_open_failures() {
        let bus = SimulatedBus::new()
            .with_port("/dev/ttyS0", SimulatedDevice::Busy)
            .with_port("/dev/ttyS1", SimulatedDevice::Unplugged);

        assert!(matches!(
            bus.open(&config("/dev/ttyS0")),
            Err(Error::PortBusy(_))
        ));
        assert!(matches!(bus.open(&config("/dev/ttyS1")), Err(Error::Io(_))));

        let stats = bus.stats();
        assert_eq!(stats.opens, 0);
        assert_eq!(stats.open_attempts, ["/dev/ttyS0", "/dev/ttyS1"]);
    }

    #[test]
    fn test_close_counts_once() {
        let bus = SimulatedBus::new().with_port("/dev/ttyS0", SimulatedDevice::Silent);
        let mut port = bus
            .open(&config("/dev/ttyS0"))
            .unwrap();
        assert_eq!(bus.stats().open_handles(), 1);

        port.close()
            .unwrap();
        port.close()
            .unwrap();
        drop(port);

        let stats = bus.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.closes, 1);
        assert_eq!(stats.open_handles(), 0);
    }

    #[test]
    fn test_drop_closes_port() {
        let bus = SimulatedBus::new().with_port("/dev/ttyS0", SimulatedDevice::Silent);
        drop(
            bus.open(&config("/dev/ttyS0"))
                .unwrap(),
        );
        assert_eq!(bus.stats().open_handles(), 0);
    }

    #[test]
    fn test_failing_enumeration() {
        let bus = SimulatedBus::new().failing_enumeration("udev unavailable");
        assert!(matches!(bus.list_ports(), Err(Error::Enumeration(_))));
    }
}
