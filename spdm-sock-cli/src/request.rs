//! Client commands: test, shutdown, discover, send.

use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use spdm_sock::{Client, TransportType};

/// Connection flags shared by client commands.
#[derive(clap::Args)]
pub struct ConnArgs {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Responder address.
    #[arg(long)]
    host: Option<Ipv4Addr>,

    /// Responder port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Transport tag to send and expect.
    #[arg(short, long)]
    transport: Option<TransportType>,
}

/// Arguments for `spdm-sock send`.
#[derive(clap::Args)]
pub struct SendArgs {
    #[command(flatten)]
    conn: ConnArgs,

    /// Payload as hex, e.g. `010000000300000000000000`.
    payload: String,
}

impl ConnArgs {
    fn connect(&self) -> Result<Client> {
        let mut config = crate::load_config(self.config.as_deref())?;
        if let Some(t) = self.transport {
            config = config.with_transport(t);
            if self.config.is_none() {
                config = config.with_port(t.default_port());
            }
        }
        if let Some(host) = self.host {
            config = config.with_peer_addr(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        let addr = config.connect_addr();
        Client::connect(&config).with_context(|| format!("connecting to {addr}"))
    }
}

pub fn test(args: &ConnArgs) -> Result<()> {
    let ack = args.connect()?.test()?;
    let text = ack.strip_suffix(b"\0").unwrap_or(&ack[..]);
    println!("{}", String::from_utf8_lossy(text));
    Ok(())
}

pub fn shutdown(args: &ConnArgs) -> Result<()> {
    args.connect()?.shutdown()?;
    println!("session closed");
    Ok(())
}

pub fn discover(args: &ConnArgs) -> Result<()> {
    let protocols = args.connect()?.discover()?;
    println!("{:<8} {:<8} {}", "INDEX", "VENDOR", "TYPE");
    for (i, p) in protocols.iter().enumerate() {
        println!(
            "{:<8} {:<8} {}",
            i,
            format!("{:#06x}", p.vendor_id),
            type_name(p.data_object_type)
        );
    }
    Ok(())
}

pub fn send(args: &SendArgs) -> Result<()> {
    let payload = parse_hex(&args.payload)?;
    let response = args.conn.connect()?.send_normal(&payload)?;
    println!("{}", to_hex(&response));
    Ok(())
}

fn type_name(data_object_type: u8) -> String {
    use spdm_sock::doe::{DOE_TYPE_DISCOVERY, DOE_TYPE_SECURED_SPDM, DOE_TYPE_SPDM};
    match data_object_type {
        DOE_TYPE_DISCOVERY => "discovery".to_owned(),
        DOE_TYPE_SPDM => "spdm".to_owned(),
        DOE_TYPE_SECURED_SPDM => "secured-spdm".to_owned(),
        other => format!("{other:#04x}"),
    }
}

/// Parses hex digits, ignoring whitespace.
fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = s.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex payload has an odd number of digits");
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).context("payload is not ASCII")?;
            u8::from_str_radix(pair, 16).with_context(|| format!("invalid hex byte `{pair}`"))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let bytes = parse_hex("01 00 00 00\n0300ff").unwrap();
        assert_eq!(bytes, [0x01, 0, 0, 0, 0x03, 0x00, 0xff]);
        assert_eq!(to_hex(&bytes), "010000000300ff");
    }

    #[test]
    fn hex_rejects_bad_input() {
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn documented_payload_is_a_discovery_request() {
        let payload = parse_hex("010000000300000000000000").unwrap();
        assert_eq!(payload, spdm_sock::doe::discovery_request(0));

        let response = spdm_sock::DoeDiscoveryResponder::default()
            .discover(&payload)
            .unwrap();
        assert_eq!(response.len(), 12);
    }

    #[test]
    fn names_known_types() {
        assert_eq!(type_name(1), "spdm");
        assert_eq!(type_name(9), "0x09");
    }
}
