//! Command codes, transport tags and protocol constants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default TCP port of the platform socket.
pub const DEFAULT_PORT: u16 = 2323;

/// Port reserved for the TCP-transport variant.
pub const TCP_PORT: u16 = 4194;

/// Default receive capacity for a single payload (16 KiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024;

/// Acknowledgement payload returned for [`Command::Test`].
pub const TEST_ACK: &[u8] = b"Server Hello!\0";

/// Command code carried in the first header field of every frame.
///
/// Codes this crate does not know are preserved as [`Command::Other`] so
/// the dispatcher can answer them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    /// Opaque protocol payload (`0x0001`).
    Normal,
    /// Out-of-band encapsulated key update (`0x8001`).
    OobEncapKeyUpdate,
    /// Keep serving the current session (`0xFFFD`).
    Continue,
    /// End the current session (`0xFFFE`).
    Shutdown,
    /// Reply to an unrecognized command (`0xFFFF`).
    Unknown,
    /// Liveness probe (`0xDEAD`).
    Test,
    /// Any other code.
    Other(u32),
}

impl Command {
    /// Wire value of [`Command::Normal`].
    pub const NORMAL: u32 = 0x0001;
    /// Wire value of [`Command::OobEncapKeyUpdate`].
    pub const OOB_ENCAP_KEY_UPDATE: u32 = 0x8001;
    /// Wire value of [`Command::Continue`].
    pub const CONTINUE: u32 = 0xFFFD;
    /// Wire value of [`Command::Shutdown`].
    pub const SHUTDOWN: u32 = 0xFFFE;
    /// Wire value of [`Command::Unknown`].
    pub const UNKNOWN: u32 = 0xFFFF;
    /// Wire value of [`Command::Test`].
    pub const TEST: u32 = 0xDEAD;

    /// Returns the code as sent on the wire.
    pub const fn code(self) -> u32 {
        match self {
            Self::Normal => Self::NORMAL,
            Self::OobEncapKeyUpdate => Self::OOB_ENCAP_KEY_UPDATE,
            Self::Continue => Self::CONTINUE,
            Self::Shutdown => Self::SHUTDOWN,
            Self::Unknown => Self::UNKNOWN,
            Self::Test => Self::TEST,
            Self::Other(code) => code,
        }
    }
}

impl From<u32> for Command {
    fn from(code: u32) -> Self {
        match code {
            Self::NORMAL => Self::Normal,
            Self::OOB_ENCAP_KEY_UPDATE => Self::OobEncapKeyUpdate,
            Self::CONTINUE => Self::Continue,
            Self::SHUTDOWN => Self::Shutdown,
            Self::UNKNOWN => Self::Unknown,
            Self::TEST => Self::Test,
            other => Self::Other(other),
        }
    }
}

impl From<Command> for u32 {
    fn from(cmd: Command) -> Self {
        cmd.code()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("NORMAL"),
            Self::OobEncapKeyUpdate => f.write_str("OOB_ENCAP_KEY_UPDATE"),
            Self::Continue => f.write_str("CONTINUE"),
            Self::Shutdown => f.write_str("SHUTDOWN"),
            Self::Unknown => f.write_str("UNKNOWN"),
            Self::Test => f.write_str("TEST"),
            Self::Other(code) => write!(f, "{code:#06x}"),
        }
    }
}

/// Outer encapsulation the protocol payload is nested in.
///
/// Chosen once per process; every frame must carry the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum TransportType {
    /// No encapsulation (`0x00`).
    None,
    /// MCTP (`0x01`).
    Mctp,
    /// PCI Data Object Exchange (`0x02`).
    #[default]
    PciDoe,
    /// SPDM over TCP (`0x03`).
    Tcp,
}

impl TransportType {
    /// Returns the tag as sent on the wire.
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0x00,
            Self::Mctp => 0x01,
            Self::PciDoe => 0x02,
            Self::Tcp => 0x03,
        }
    }

    /// Conventional listening port for this transport.
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Tcp => TCP_PORT,
            _ => DEFAULT_PORT,
        }
    }
}

impl TryFrom<u32> for TransportType {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        match code {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Mctp),
            0x02 => Ok(Self::PciDoe),
            0x03 => Ok(Self::Tcp),
            other => Err(other),
        }
    }
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "mctp" => Ok(Self::Mctp),
            "pci-doe" | "pcidoe" | "doe" => Ok(Self::PciDoe),
            "tcp" => Ok(Self::Tcp),
            other => Err(format!(
                "unknown transport `{other}` (expected none, mctp, pci-doe or tcp)"
            )),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Mctp => "mctp",
            Self::PciDoe => "pci-doe",
            Self::Tcp => "tcp",
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_roundtrip() {
        for code in [0x0001, 0x8001, 0xFFFD, 0xFFFE, 0xFFFF, 0xDEAD, 0x1234] {
            assert_eq!(Command::from(code).code(), code);
        }
        assert_eq!(Command::from(0x1234), Command::Other(0x1234));
        assert_eq!(Command::from(0xDEAD), Command::Test);
    }

    #[test]
    fn transport_parse_and_display() {
        for t in [
            TransportType::None,
            TransportType::Mctp,
            TransportType::PciDoe,
            TransportType::Tcp,
        ] {
            assert_eq!(t.to_string().parse::<TransportType>(), Ok(t));
            assert_eq!(TransportType::try_from(t.code()), Ok(t));
        }
        assert!("usb".parse::<TransportType>().is_err());
        assert_eq!(TransportType::try_from(7), Err(7));
    }

    #[test]
    fn tcp_transport_uses_reserved_port() {
        assert_eq!(TransportType::Tcp.default_port(), 4194);
        assert_eq!(TransportType::PciDoe.default_port(), 2323);
        assert_eq!(TransportType::default(), TransportType::PciDoe);
    }
}
