//! Per-session command dispatcher.
//!
//! The engine gets the first look at every incoming frame. When it declines
//! a frame as an unsupported capability, the dispatcher interprets the frame's
//! command itself: control commands are acknowledged here and `NORMAL`
//! payloads go to the secondary responder.

use std::io::{Read, Write};

use spdm_sock_proto::{Command, Frame, TEST_ACK};

use crate::config::Config;
use crate::engine::{DispatchStatus, ProtocolEngine, SecondaryResponder};
use crate::transport::FrameTransport;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEnd {
    /// The peer sent `SHUTDOWN`.
    Shutdown,
    /// The peer closed the connection.
    Disconnected,
    /// The engine reported a send or receive failure.
    TransportFailed(DispatchStatus),
    /// The peer sent a command the dispatcher does not handle.
    UnknownCommand(Command),
    /// The secondary responder rejected a `NORMAL` payload.
    ResponderFailed,
    /// The engine declined a round without receiving a frame.
    NoRequest,
}

/// Dispatcher state.
#[derive(Debug)]
enum State {
    /// Waiting on the engine.
    Dispatching,
    /// Interpreting a frame the engine declined.
    HandlingControl,
    /// Session is over.
    Terminated(SessionEnd),
}

/// Drives one session through the engine and the control-command handlers.
#[derive(Debug)]
pub struct Dispatcher<'a, E, R> {
    /// Immutable process configuration.
    config: &'a Config,
    /// Primary protocol engine.
    engine: &'a mut E,
    /// Handler for declined `NORMAL` payloads.
    responder: &'a mut R,
}

impl<'a, E: ProtocolEngine, R: SecondaryResponder> Dispatcher<'a, E, R> {
    /// Creates a dispatcher sharing the engine and responder across sessions.
    pub const fn new(config: &'a Config, engine: &'a mut E, responder: &'a mut R) -> Self {
        Self {
            config,
            engine,
            responder,
        }
    }

    /// Serves `stream` until the session terminates.
    pub fn serve_session<S: Read + Write>(&mut self, stream: S) -> SessionEnd {
        let mut transport = FrameTransport::new(stream, self.config);
        let mut state = State::Dispatching;
        loop {
            state = match state {
                State::Dispatching => self.dispatch(&mut transport),
                State::HandlingControl => self.handle_control(&mut transport),
                State::Terminated(end) => return end,
            };
        }
    }

    /// Runs one engine round.
    fn dispatch<S: Read + Write>(&mut self, transport: &mut FrameTransport<'_, S>) -> State {
        match self.engine.dispatch_one_round(transport) {
            DispatchStatus::Success => State::Dispatching,
            DispatchStatus::UnsupportedCapability => State::HandlingControl,
            DispatchStatus::ReceiveFailed if transport.peer_closed() => {
                State::Terminated(SessionEnd::Disconnected)
            }
            status @ (DispatchStatus::SendFailed | DispatchStatus::ReceiveFailed) => {
                tracing::warn!(?status, "server critical error, closing session");
                State::Terminated(SessionEnd::TransportFailed(status))
            }
        }
    }

    /// Handles the frame the engine just declined.
    fn handle_control<S: Read + Write>(&mut self, transport: &mut FrameTransport<'_, S>) -> State {
        let Some(Frame {
            command, payload, ..
        }) = transport.take_last()
        else {
            tracing::warn!("engine declined a round without receiving a frame");
            return State::Terminated(SessionEnd::NoRequest);
        };

        match command {
            Command::Test => {
                reply(transport, Command::Test, TEST_ACK);
                State::Dispatching
            }
            #[cfg(feature = "encap-key-update")]
            Command::OobEncapKeyUpdate => {
                self.engine.reset_key_update();
                reply(transport, Command::OobEncapKeyUpdate, &[]);
                State::Dispatching
            }
            #[cfg(not(feature = "encap-key-update"))]
            Command::OobEncapKeyUpdate => {
                tracing::debug!("encapsulated key update not enabled, ignoring");
                State::Dispatching
            }
            Command::Shutdown => {
                reply(transport, Command::Shutdown, &[]);
                State::Terminated(SessionEnd::Shutdown)
            }
            Command::Continue => {
                reply(transport, Command::Continue, &[]);
                State::Dispatching
            }
            Command::Normal => match self.responder.respond(&payload) {
                Ok(response) => {
                    reply(transport, Command::Normal, &response);
                    State::Dispatching
                }
                Err(e) => {
                    tracing::warn!(error = %e, "unrecognized request payload");
                    State::Terminated(SessionEnd::ResponderFailed)
                }
            },
            other => {
                tracing::warn!(command = %other, "unrecognized platform interface command");
                reply(transport, Command::Unknown, &[]);
                State::Terminated(SessionEnd::UnknownCommand(other))
            }
        }
    }
}

/// Sends a control reply. Failures are logged; the caller's transition stands.
fn reply<S: Read + Write>(transport: &mut FrameTransport<'_, S>, command: Command, payload: &[u8]) {
    if let Err(e) = transport.send_frame(command, payload) {
        tracing::warn!(%command, error = %e, "reply send failed");
    }
}
