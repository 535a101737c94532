//! Framed TCP transport for exercising an SPDM responder engine.
//!
//! A [`Server`] accepts one connection at a time and runs a [`Dispatcher`]
//! over it. The dispatcher hands each round to an external
//! [`ProtocolEngine`]; frames the engine declines are answered here:
//! `TEST`, `SHUTDOWN`, `CONTINUE` and unknown commands directly, `NORMAL`
//! payloads through a [`SecondaryResponder`] such as the bundled
//! [`DoeDiscoveryResponder`].
//!
//! # Quick start
//!
//! ```no_run
//! use spdm_sock::{Config, DoeDiscoveryResponder, Forever, NullEngine, Server};
//!
//! let config = Config::default();
//! let engine = NullEngine::init(&config)?;
//! let mut server = Server::bind(config, engine, DoeDiscoveryResponder::default())?;
//!
//! // Blocks for the lifetime of the process.
//! server.serve(Forever)?;
//! # Ok::<(), spdm_sock::Error>(())
//! ```
//!
//! All I/O is blocking and there are no timeouts unless an
//! [`IdleTimeout`] driver is used: a silent peer stalls the responder.

mod client;
mod config;
mod dispatch;
pub mod doe;
mod driver;
mod engine;
mod error;
#[cfg(unix)]
mod listener;
#[cfg(unix)]
mod server;
mod transport;

pub use client::Client;
pub use config::Config;
pub use dispatch::{Dispatcher, SessionEnd};
pub use doe::DoeDiscoveryResponder;
pub use driver::{Forever, IdleTimeout, ServeDriver, SessionLimit};
pub use engine::{DispatchStatus, MessageIo, NullEngine, ProtocolEngine, SecondaryResponder};
pub use error::{Error, Result};
#[cfg(unix)]
pub use listener::{Listener, Session, accept_session, create_listener};
#[cfg(unix)]
pub use server::Server;
pub use spdm_sock_proto::{Command, Frame, TransportType};
pub use transport::FrameTransport;
