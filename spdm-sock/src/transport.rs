//! Frame transport bound to one connected session.

use std::io::{Read, Write};

use spdm_sock_proto::{Command, Frame, Result, receive_frame, send_frame};

use crate::config::Config;
use crate::engine::MessageIo;

/// Sends and receives whole frames over `S` using the process configuration.
///
/// Remembers the last received command and payload so the dispatcher can
/// act on a frame the engine declined.
#[derive(Debug)]
pub struct FrameTransport<'a, S> {
    /// Connected stream.
    stream: S,
    /// Immutable process configuration.
    config: &'a Config,
    /// Last frame received through [`FrameTransport::receive_frame`].
    last: Option<Frame>,
    /// Set once a receive observed the peer closing the stream.
    peer_closed: bool,
}

impl<'a, S: Read + Write> FrameTransport<'a, S> {
    /// Wraps a connected stream.
    pub const fn new(stream: S, config: &'a Config) -> Self {
        Self {
            stream,
            config,
            last: None,
            peer_closed: false,
        }
    }

    /// Sends one frame tagged with the configured transport type.
    pub fn send_frame(&mut self, command: Command, payload: &[u8]) -> Result<()> {
        send_frame(&mut self.stream, self.config.transport, command, payload)
    }

    /// Receives one frame of at most `config.max_payload` bytes.
    pub fn receive_frame(&mut self) -> Result<&Frame> {
        self.last = None;
        match receive_frame(&mut self.stream, self.config.transport, self.config.max_payload) {
            Ok(frame) => Ok(&*self.last.insert(frame)),
            Err(e) => {
                self.peer_closed |= e.is_disconnect();
                Err(e)
            }
        }
    }

    /// Command of the last received frame.
    pub fn last_command(&self) -> Option<Command> {
        self.last.as_ref().map(|f| f.command)
    }

    /// Payload of the last received frame.
    pub fn last_request(&self) -> &[u8] {
        self.last.as_ref().map_or(&[][..], |f| f.payload.as_slice())
    }

    /// Removes and returns the last received frame.
    pub fn take_last(&mut self) -> Option<Frame> {
        self.last.take()
    }

    /// Whether the peer has closed the stream.
    pub const fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> MessageIo for FrameTransport<'_, S> {
    fn receive_message(&mut self) -> Result<&[u8]> {
        self.receive_frame().map(|f| f.payload.as_slice())
    }

    fn send_message(&mut self, message: &[u8]) -> Result<()> {
        self.send_frame(Command::Normal, message)
    }

    fn config(&self) -> &Config {
        self.config
    }
}
