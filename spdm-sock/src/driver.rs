//! Serve-loop drivers.
//!
//! The server asks its driver before every accept and reports every session
//! outcome to it. Framing and dispatch do not depend on the driver, so a
//! bounded or timed loop can replace the reference one.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use crate::dispatch::SessionEnd;

/// Controls the accept/serve loop.
pub trait ServeDriver {
    /// Called before each accept; `false` stops the loop.
    fn should_accept(&mut self) -> bool;

    /// Prepares a freshly accepted stream.
    fn on_session_start(&mut self, stream: &TcpStream) -> io::Result<()> {
        let _ = stream;
        Ok(())
    }

    /// Observes how a session ended.
    fn on_session_end(&mut self, end: &SessionEnd) {
        let _ = end;
    }
}

impl<D: ServeDriver + ?Sized> ServeDriver for &mut D {
    fn should_accept(&mut self) -> bool {
        (**self).should_accept()
    }

    fn on_session_start(&mut self, stream: &TcpStream) -> io::Result<()> {
        (**self).on_session_start(stream)
    }

    fn on_session_end(&mut self, end: &SessionEnd) {
        (**self).on_session_end(end);
    }
}

/// Serves sessions until the process exits. A silent peer stalls the loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct Forever;

impl ServeDriver for Forever {
    fn should_accept(&mut self) -> bool {
        true
    }
}

/// Stops after a fixed number of sessions.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimit {
    /// Sessions still to accept.
    remaining: usize,
}

impl SessionLimit {
    /// Accepts at most `sessions` sessions.
    pub const fn new(sessions: usize) -> Self {
        Self {
            remaining: sessions,
        }
    }
}

impl ServeDriver for SessionLimit {
    fn should_accept(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Wraps a driver and applies read/write timeouts to every session.
///
/// A peer that stays silent longer than the timeout ends its session with a
/// receive failure instead of blocking the listener.
#[derive(Debug, Clone, Copy)]
pub struct IdleTimeout<D> {
    /// Wrapped driver.
    inner: D,
    /// Per-operation timeout.
    timeout: Duration,
}

/// Shortest timeout a session gets; sockets reject a zero timeout.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

impl<D: ServeDriver> IdleTimeout<D> {
    /// Applies `timeout` on top of `inner`. A zero timeout is raised to one
    /// millisecond.
    pub const fn new(inner: D, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            MIN_TIMEOUT
        } else {
            timeout
        };
        Self { inner, timeout }
    }
}

impl<D: ServeDriver> ServeDriver for IdleTimeout<D> {
    fn should_accept(&mut self) -> bool {
        self.inner.should_accept()
    }

    fn on_session_start(&mut self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        self.inner.on_session_start(stream)
    }

    fn on_session_end(&mut self, end: &SessionEnd) {
        self.inner.on_session_end(end);
    }
}
