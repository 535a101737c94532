//! `spdm-sock serve`: run the platform responder.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use spdm_sock::{
    Config, DoeDiscoveryResponder, Forever, IdleTimeout, NullEngine, Server, ServeDriver,
    SessionLimit, TransportType,
};

/// Arguments for `spdm-sock serve`.
#[derive(clap::Args)]
pub struct ServeArgs {
    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listening port (default 2323, or 4194 with --transport tcp).
    #[arg(short, long)]
    port: Option<u16>,

    /// Local address to bind.
    #[arg(long)]
    bind: Option<Ipv4Addr>,

    /// Transport tag every frame must carry: none, mctp, pci-doe, tcp.
    #[arg(short, long)]
    transport: Option<TransportType>,

    /// Ask the engine to perform the TCP binding handshake.
    #[arg(long)]
    tcp_handshake: bool,

    /// Largest payload accepted per frame, in bytes.
    #[arg(long)]
    max_payload: Option<usize>,

    /// Exit after serving this many sessions.
    #[arg(long)]
    sessions: Option<usize>,

    /// Close a session after this many seconds without traffic.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    idle_timeout: Option<u64>,
}

impl ServeArgs {
    /// Builds the configuration from the file and flag overrides.
    fn config(&self) -> Result<Config> {
        let mut config = crate::load_config(self.config.as_deref())?;
        if let Some(t) = self.transport {
            config = config.with_transport(t);
            if self.config.is_none() {
                config = config.with_port(t.default_port());
            }
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(addr) = self.bind {
            config = config.with_bind_addr(addr);
        }
        if self.tcp_handshake {
            config = config.with_tcp_handshake(true);
        }
        if let Some(n) = self.max_payload {
            config = config.with_max_payload(n);
        }
        config.validate()?;
        Ok(config)
    }

    /// Binds the responder and serves until the driver stops or accept fails.
    pub fn run(self) -> Result<()> {
        let config = self.config()?;
        let engine = NullEngine::init(&config).context("initializing protocol engine")?;
        let mut server = Server::bind(config, engine, DoeDiscoveryResponder::default())
            .context("creating platform service socket")?;

        let timeout = self.idle_timeout.map(Duration::from_secs);
        match (self.sessions, timeout) {
            (Some(n), Some(t)) => serve(&mut server, IdleTimeout::new(SessionLimit::new(n), t)),
            (Some(n), None) => serve(&mut server, SessionLimit::new(n)),
            (None, Some(t)) => serve(&mut server, IdleTimeout::new(Forever, t)),
            (None, None) => serve(&mut server, Forever),
        }
    }
}

fn serve(
    server: &mut Server<NullEngine, DoeDiscoveryResponder>,
    driver: impl ServeDriver,
) -> Result<()> {
    server.serve(driver)?;
    tracing::info!("session limit reached, exiting");
    Ok(())
}
