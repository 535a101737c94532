//! Error types for the responder harness.

use std::io;

use spdm_sock_proto::Command;

/// Alias for `Result<T, spdm_sock::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by listener, server and client operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Creating, configuring or binding the listening socket failed.
    #[error("{op} failed on port {port}: {source}")]
    Bind {
        /// The socket call that failed.
        op: &'static str,
        /// Port being bound.
        port: u16,
        /// Underlying OS error.
        source: io::Error,
    },

    /// `listen(2)` failed.
    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),

    /// `accept(2)` failed. Fatal to the serve loop.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Connecting to a responder failed.
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),

    /// Frame transport failure.
    #[error(transparent)]
    Frame(#[from] spdm_sock_proto::Error),

    /// The responder answered with a different command than expected.
    #[error("unexpected reply: expected {expected}, got {actual}")]
    UnexpectedReply {
        /// Command the request should have been acknowledged with.
        expected: Command,
        /// Command actually received.
        actual: Command,
    },

    /// A DoE message could not be parsed.
    #[error(transparent)]
    Doe(#[from] crate::doe::DoeError),

    /// The protocol engine could not be initialized. For use by engine
    /// implementations.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other I/O error.
    #[error(transparent)]
    Io(#[from] io::Error),
}
