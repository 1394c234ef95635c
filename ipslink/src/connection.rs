//! The live connection to the laser and its lifecycle.

use {
    crate::{
        device::AliasNamespace,
        discovery::Discovery,
        error::{Error, Result},
        identity::InstrumentIdentity,
        port::{Port, PortEnumerator, PortOpener},
        probe::{IdentifiedPort, ProbeSettings},
        protocol,
        resolver::Candidate,
    },
    log::{debug, info, warn},
    std::{fmt, time::Duration},
};

/// An open port to an identified laser.
///
/// The port is closed by [`disconnect`](Self::disconnect) or, failing that,
/// when the connection is dropped.
pub struct Connection<P: Port> {
    port: Option<P>,
    candidate: Candidate,
    identity: InstrumentIdentity,
    terminator: String,
    timeout: Duration,
}

impl<P: Port> Connection<P> {
    pub(crate) fn new(
        found: IdentifiedPort<P>,
        candidate: Candidate,
        settings: &ProbeSettings,
        timeout: Duration,
    ) -> Self {
        Self {
            port: Some(found.port),
            candidate,
            identity: found.identity,
            terminator: settings
                .terminator
                .clone(),
            timeout,
        }
    }

    /// Port address of the laser.
    pub fn address(&self) -> &str {
        &self
            .candidate
            .address
    }

    /// The candidate the laser was found through.
    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    /// Identification reply given during the probe.
    pub fn identity(&self) -> &InstrumentIdentity {
        &self.identity
    }

    /// Whether the port is still open.
    pub fn is_connected(&self) -> bool {
        self.port
            .as_ref()
            .is_some_and(Port::is_open)
    }

    /// Reply timeout used by [`query`](Self::query).
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the reply timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The open port, for protocol code that needs raw access.
    pub fn port_mut(&mut self) -> Result<&mut P> {
        self.port
            .as_mut()
            .filter(|p| p.is_open())
            .ok_or(Error::NotConnected)
    }

    /// Send one command line without waiting for a reply.
    pub fn send(&mut self, command: &str) -> Result<()> {
        let terminator = self
            .terminator
            .clone();
        protocol::send_line(self.port_mut()?, command, &terminator)
    }

    /// Send one command line and read one reply line.
    pub fn query(&mut self, command: &str) -> Result<String> {
        let terminator = self
            .terminator
            .clone();
        let timeout = self.timeout;
        let port = self.port_mut()?;
        port.clear_buffers()?;
        protocol::query(port, command, &terminator, timeout)?
            .ok_or_else(|| Error::Timeout(format!("no reply to {command:?}")))
    }

    /// Close the port. Calling this again is a no-op.
    pub fn disconnect(&mut self) -> Result<()> {
        match self
            .port
            .take()
        {
            Some(mut port) => {
                info!("Disconnecting from {}", self.candidate.address);
                port.close()
            },
            None => {
                debug!("{} already disconnected", self.candidate.address);
                Ok(())
            },
        }
    }
}

impl<P: Port> Drop for Connection<P> {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            warn!("Failed to close {}: {e}", self.candidate.address);
        }
    }
}

impl<P: Port> fmt::Debug for Connection<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("candidate", &self.candidate)
            .field("identity", &self.identity)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

/// Owns at most one [`Connection`] at a time.
///
/// ```rust
/// use ipslink::{ConnectionManager, Discovery, DiscoveryConfig};
/// use ipslink::device::StaticAliases;
/// use ipslink::port::sim::{SimulatedBus, SimulatedDevice};
///
/// let bus = SimulatedBus::new()
///     .with_port("/dev/ttyS0", SimulatedDevice::laser("IPS,HPU,1,785nm,1.0"));
/// let discovery = Discovery::new(
///     bus.clone(),
///     StaticAliases::unavailable(),
///     bus.clone(),
///     DiscoveryConfig::default(),
/// );
/// let mut manager = ConnectionManager::new(discovery);
///
/// let serial = manager
///     .with_connection(|laser| Ok(laser.identity().serial_number.clone()))
///     .unwrap();
/// assert_eq!(serial.as_deref(), Some("1"));
/// assert_eq!(bus.stats().open_handles(), 0);
/// ```
pub struct ConnectionManager<E, A, O: PortOpener> {
    discovery: Discovery<E, A, O>,
    connection: Option<Connection<O::Port>>,
}

impl<E, A, O> ConnectionManager<E, A, O>
where
    E: PortEnumerator,
    A: AliasNamespace,
    O: PortOpener,
{
    /// Create a manager with no connection.
    pub fn new(discovery: Discovery<E, A, O>) -> Self {
        Self {
            discovery,
            connection: None,
        }
    }

    /// The discovery used to connect.
    pub fn discovery(&self) -> &Discovery<E, A, O> {
        &self.discovery
    }

    /// Find the laser and keep the connection.
    ///
    /// Fails with [`Error::AlreadyConnected`] while a live connection exists.
    pub fn connect(&mut self) -> Result<&mut Connection<O::Port>> {
        self.ensure_idle()?;
        let connection = self
            .discovery
            .find_instrument()?;
        Ok(self
            .connection
            .insert(connection))
    }

    /// Connect to a known address, still checking the identity.
    pub fn connect_to(&mut self, address: &str) -> Result<&mut Connection<O::Port>> {
        self.ensure_idle()?;
        let connection = self
            .discovery
            .connect_to(address)?;
        Ok(self
            .connection
            .insert(connection))
    }

    /// Close the connection, if any. Calling this again is a no-op.
    pub fn disconnect(&mut self) -> Result<()> {
        match self
            .connection
            .take()
        {
            Some(mut connection) => connection.disconnect(),
            None => Ok(()),
        }
    }

    /// Whether a live connection is held.
    pub fn is_connected(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(Connection::is_connected)
    }

    /// The live connection, if any.
    pub fn connection(&self) -> Option<&Connection<O::Port>> {
        self.connection
            .as_ref()
            .filter(|c| c.is_connected())
    }

    /// The live connection, if any.
    pub fn connection_mut(&mut self) -> Option<&mut Connection<O::Port>> {
        self.connection
            .as_mut()
            .filter(|c| c.is_connected())
    }

    /// Connect, run `f`, then disconnect.
    ///
    /// The port is closed whether `f` succeeds, fails or panics.
    pub fn with_connection<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection<O::Port>) -> Result<T>,
    {
        self.ensure_idle()?;
        let mut connection = self
            .discovery
            .find_instrument()?;
        let result = f(&mut connection);
        let closed = connection.disconnect();
        let value = result?;
        closed?;
        Ok(value)
    }

    fn ensure_idle(&mut self) -> Result<()> {
        if let Some(connection) = &self.connection {
            if connection.is_connected() {
                return Err(Error::AlreadyConnected {
                    port: connection
                        .address()
                        .to_string(),
                });
            }
        }
        // Drop a handle that was disconnected directly
        self.connection = None;
        Ok(())
    }
}

impl<E, A, O: PortOpener> fmt::Debug for ConnectionManager<E, A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}
