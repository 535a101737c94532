//! Requester-side client for a platform responder socket.
//!
//! Speaks the same framing as the server and checks that each reply carries
//! the command the request expects.

use std::net::TcpStream;

use spdm_sock_proto::{Command, Frame, receive_frame, send_frame};

use crate::config::Config;
use crate::doe::{DataObjectProtocol, discovery_request, parse_discovery_response};
use crate::{Error, Result};

/// A connection to a running responder.
#[derive(Debug)]
pub struct Client {
    /// Connected stream.
    stream: TcpStream,
    /// Transport settings shared with the responder.
    config: Config,
}

impl Client {
    /// Connects to `config.peer_addr:config.port`.
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.connect_addr();
        let stream = TcpStream::connect(addr).map_err(Error::Connect)?;
        tracing::info!(%addr, "connected");
        Ok(Self {
            stream,
            config: config.clone(),
        })
    }

    /// Sends `TEST` and returns the acknowledgement payload.
    pub fn test(&mut self) -> Result<Vec<u8>> {
        self.send_expect(Command::Test, &[], Command::Test)
    }

    /// Sends `SHUTDOWN`; the responder closes the session afterwards.
    pub fn shutdown(&mut self) -> Result<()> {
        self.send_expect(Command::Shutdown, &[], Command::Shutdown)
            .map(drop)
    }

    /// Sends `CONTINUE`, keeping the session open.
    pub fn keep_alive(&mut self) -> Result<()> {
        self.send_expect(Command::Continue, &[], Command::Continue)
            .map(drop)
    }

    /// Sends a `NORMAL` payload and returns the response payload.
    pub fn send_normal(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.send_expect(Command::Normal, payload, Command::Normal)
    }

    /// Walks the responder's DoE discovery table.
    pub fn discover(&mut self) -> Result<Vec<DataObjectProtocol>> {
        let mut protocols = Vec::new();
        let mut index = 0u8;
        loop {
            let response = self.send_normal(&discovery_request(index))?;
            let (protocol, next) = parse_discovery_response(&response)?;
            protocols.push(protocol);
            if next == 0 || next <= index {
                return Ok(protocols);
            }
            index = next;
        }
    }

    /// Sends one frame and returns whatever frame comes back.
    pub fn request(&mut self, command: Command, payload: &[u8]) -> Result<Frame> {
        send_frame(&mut self.stream, self.config.transport, command, payload)?;
        let frame = receive_frame(
            &mut self.stream,
            self.config.transport,
            self.config.max_payload,
        )?;
        Ok(frame)
    }

    /// Sends a frame and expects a reply carrying `expected`.
    fn send_expect(
        &mut self,
        command: Command,
        payload: &[u8],
        expected: Command,
    ) -> Result<Vec<u8>> {
        let reply = self.request(command, payload)?;
        if reply.command == expected {
            Ok(reply.payload)
        } else {
            Err(Error::UnexpectedReply {
                expected,
                actual: reply.command,
            })
        }
    }
}
