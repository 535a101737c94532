//! Seams to the external protocol engine and its secondary responder.
//!
//! The SPDM state machine lives outside this crate. It is driven one round
//! at a time and performs its I/O through [`MessageIo`], which the frame
//! transport implements on top of the connected session.

use spdm_sock_proto::Result;

use crate::config::Config;

/// Outcome of one engine dispatch round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DispatchStatus {
    /// The engine consumed and answered the exchange itself.
    Success,
    /// The engine could not send its response. Session-fatal.
    SendFailed,
    /// The engine could not receive a request. Session-fatal.
    ReceiveFailed,
    /// The engine declined the frame; the dispatcher handles it.
    UnsupportedCapability,
}

/// Message send/receive hooks handed to the engine.
pub trait MessageIo {
    /// Receives one frame and returns its payload.
    ///
    /// The frame's command and payload stay buffered for the dispatcher.
    fn receive_message(&mut self) -> Result<&[u8]>;

    /// Sends `message` as a `NORMAL` frame.
    fn send_message(&mut self, message: &[u8]) -> Result<()>;

    /// Process configuration (transport type, handshake flag).
    fn config(&self) -> &Config;
}

/// External protocol engine.
pub trait ProtocolEngine {
    /// Attempts to consume and answer one protocol exchange.
    fn dispatch_one_round(&mut self, io: &mut dyn MessageIo) -> DispatchStatus;

    /// Resets the engine's encapsulated key-update state.
    fn reset_key_update(&mut self) {}
}

/// Handler for `NORMAL` payloads the engine declined.
pub trait SecondaryResponder {
    /// Error reported for requests the responder does not understand.
    type Error: std::error::Error;

    /// Produces the response for `request`.
    fn respond(&mut self, request: &[u8]) -> std::result::Result<Vec<u8>, Self::Error>;
}

/// Engine that understands no protocol messages.
///
/// Each round receives one frame and declines it, leaving control commands
/// and `NORMAL` payloads to the dispatcher and the secondary responder.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl NullEngine {
    /// Initializes the engine for `config`.
    pub fn init(config: &Config) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self)
    }
}

impl ProtocolEngine for NullEngine {
    fn dispatch_one_round(&mut self, io: &mut dyn MessageIo) -> DispatchStatus {
        match io.receive_message() {
            Ok(_) => DispatchStatus::UnsupportedCapability,
            Err(e) => {
                if e.is_disconnect() {
                    tracing::debug!("peer closed connection");
                } else {
                    tracing::warn!(error = %e, "receive failed");
                }
                DispatchStatus::ReceiveFailed
            }
        }
    }
}
