//! Process-wide transport configuration.
//!
//! Built once at startup and shared by reference with the frame transport
//! and the dispatcher; nothing mutates it afterwards.

use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::Path;

use serde::{Deserialize, Serialize};
use spdm_sock_proto::{DEFAULT_MAX_PAYLOAD, DEFAULT_PORT, TransportType};

use crate::{Error, Result};

/// Immutable settings for a responder or client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct Config {
    /// TCP port to listen on or connect to.
    pub port: u16,
    /// Local address the listener binds.
    pub bind_addr: Ipv4Addr,
    /// Responder address a [`Client`](crate::Client) connects to.
    pub peer_addr: Ipv4Addr,
    /// Transport tag every frame must carry.
    pub transport: TransportType,
    /// Whether the engine should perform the TCP binding handshake.
    pub tcp_handshake: bool,
    /// Largest payload accepted in a single frame.
    pub max_payload: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: Ipv4Addr::UNSPECIFIED,
            peer_addr: Ipv4Addr::LOCALHOST,
            transport: TransportType::default(),
            tcp_handshake: false,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}

impl Config {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_payload == 0 {
            return Err(Error::Config("max_payload must be non-zero".into()));
        }
        if u32::try_from(self.max_payload).is_err() {
            return Err(Error::Config(format!(
                "max_payload {} exceeds the 32-bit length field",
                self.max_payload
            )));
        }
        Ok(())
    }

    /// Sets the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the listener bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: Ipv4Addr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the address clients connect to.
    #[must_use]
    pub const fn with_peer_addr(mut self, addr: Ipv4Addr) -> Self {
        self.peer_addr = addr;
        self
    }

    /// Sets the transport tag.
    #[must_use]
    pub const fn with_transport(mut self, transport: TransportType) -> Self {
        self.transport = transport;
        self
    }

    /// Enables or disables the TCP binding handshake.
    #[must_use]
    pub const fn with_tcp_handshake(mut self, enabled: bool) -> Self {
        self.tcp_handshake = enabled;
        self
    }

    /// Sets the per-frame payload capacity.
    #[must_use]
    pub const fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Address the listener binds.
    pub const fn listen_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.bind_addr, self.port)
    }

    /// Address a client connects to.
    pub const fn connect_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.peer_addr, self.port)
    }
}
