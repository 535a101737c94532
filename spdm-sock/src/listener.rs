//! Listening socket and sequential session acceptance.
//!
//! The listener is an IPv4 TCP socket with `SO_REUSEADDR` set, so a restarted
//! responder can rebind while the previous socket lingers in `TIME_WAIT`.
//! Sessions are accepted one at a time.

#![cfg(unix)]
#![allow(unsafe_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use crate::config::Config;
use crate::{Error, Result};

/// Pending-connection backlog passed to `listen(2)`.
const BACKLOG: libc::c_int = 3;

/// Process-wide listening socket.
#[derive(Debug)]
pub struct Listener {
    /// Bound and listening socket.
    inner: TcpListener,
}

/// One connected peer.
///
/// Dropping the session closes the connection.
#[derive(Debug)]
pub struct Session {
    /// Connected stream.
    stream: TcpStream,
    /// Remote address.
    peer: SocketAddr,
}

impl Listener {
    /// Binds `addr:port` and starts listening.
    pub fn bind(addr: Ipv4Addr, port: u16) -> Result<Self> {
        let fd = tcp_bind(addr, port)?;
        // SAFETY: listen() on a freshly bound socket we own.
        if unsafe { libc::listen(fd.as_raw_fd(), BACKLOG) } < 0 {
            return Err(Error::Listen(io::Error::last_os_error()));
        }
        tracing::debug!(%addr, port, "listener ready");
        Ok(Self {
            inner: TcpListener::from(fd),
        })
    }

    /// Blocks until a peer connects.
    pub fn accept(&self) -> Result<Session> {
        let (stream, peer) = self.inner.accept().map_err(Error::Accept)?;
        tracing::info!(%peer, "session accepted");
        Ok(Session { stream, peer })
    }

    /// Locally bound address (useful after binding port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl Session {
    /// Remote address.
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Borrows the connected stream.
    pub const fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Takes the connected stream.
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

/// Creates the listener described by `config`.
pub fn create_listener(config: &Config) -> Result<Listener> {
    Listener::bind(config.bind_addr, config.port)
}

/// Accepts the next session on `listener`.
pub fn accept_session(listener: &Listener) -> Result<Session> {
    listener.accept()
}

/// Creates an IPv4 stream socket with `SO_REUSEADDR` bound to `addr:port`.
fn tcp_bind(addr: Ipv4Addr, port: u16) -> Result<OwnedFd> {
    let fail = |op: &'static str| Error::Bind {
        op,
        port,
        source: io::Error::last_os_error(),
    };

    // SAFETY: plain socket(2) call; the result is checked before use.
    let raw = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if raw < 0 {
        return Err(fail("socket"));
    }
    // SAFETY: `raw` is a valid descriptor we exclusively own.
    let sock = unsafe { OwnedFd::from_raw_fd(raw) };

    let on: libc::c_int = 1;
    // SAFETY: `on` outlives the call and its size is passed alongside.
    let ret = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            std::ptr::from_ref(&on).cast(),
            size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(fail("setsockopt(SO_REUSEADDR)"));
    }

    // SAFETY: sockaddr_in is plain old data; all-zero is a valid value.
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_port = port.to_be();
    sin.sin_addr = libc::in_addr {
        s_addr: u32::from(addr).to_be(),
    };

    // SAFETY: `sin` is a fully initialized sockaddr_in of the given length.
    let ret = unsafe {
        libc::bind(
            sock.as_raw_fd(),
            std::ptr::from_ref(&sin).cast(),
            size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(fail("bind"));
    }

    Ok(sock)
}
