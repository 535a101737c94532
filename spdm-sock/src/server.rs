//! Single-session TCP responder.
//!
//! Accepts one connection at a time and serves it to completion before the
//! next `accept`. Only listener errors stop the loop; every session outcome
//! is logged and followed by a new accept.

#![cfg(unix)]

use std::io;
use std::net::SocketAddr;

use crate::config::Config;
use crate::dispatch::{Dispatcher, SessionEnd};
use crate::driver::ServeDriver;
use crate::engine::{ProtocolEngine, SecondaryResponder};
use crate::listener::{Listener, accept_session, create_listener};
use crate::Result;

/// A bound responder owning its engine and secondary responder.
#[derive(Debug)]
pub struct Server<E, R> {
    /// Immutable process configuration.
    config: Config,
    /// Listening socket, alive for the server's lifetime.
    listener: Listener,
    /// Primary protocol engine.
    engine: E,
    /// Handler for `NORMAL` payloads the engine declines.
    responder: R,
}

impl<E: ProtocolEngine, R: SecondaryResponder> Server<E, R> {
    /// Validates `config` and binds its listening socket.
    pub fn bind(config: Config, engine: E, responder: R) -> Result<Self> {
        config.validate()?;
        let listener = create_listener(&config)?;
        Ok(Self {
            config,
            listener,
            engine,
            responder,
        })
    }

    /// Locally bound address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Configuration the server was bound with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the accept/serve loop until `driver` stops it or accept fails.
    pub fn serve(&mut self, mut driver: impl ServeDriver) -> Result<()> {
        let port = self.local_addr().map_or(self.config.port, |a| a.port());
        while driver.should_accept() {
            tracing::info!(port, transport = %self.config.transport, "platform server listening");
            let session = match accept_session(&self.listener) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed, stopping server");
                    return Err(e);
                }
            };
            let peer = session.peer();
            if let Err(e) = driver.on_session_start(session.stream()) {
                tracing::warn!(%peer, error = %e, "session setup failed, dropping connection");
                continue;
            }

            let end = Dispatcher::new(&self.config, &mut self.engine, &mut self.responder)
                .serve_session(session.into_stream());
            log_end(peer, &end);
            driver.on_session_end(&end);
        }
        Ok(())
    }
}

/// Logs a finished session at a level matching its cause.
fn log_end(peer: SocketAddr, end: &SessionEnd) {
    match end {
        SessionEnd::Shutdown | SessionEnd::Disconnected => {
            tracing::info!(%peer, ?end, "session closed");
        }
        _ => tracing::warn!(%peer, ?end, "session terminated"),
    }
}
