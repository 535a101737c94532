//! Frame-level errors.

use std::io;

/// Alias for `Result<T, spdm_sock_proto::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while moving frames over a stream.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The stream refused bytes before the whole frame was written.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// The stream ended or failed before the whole frame was read.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// The announced payload does not fit the receiver's buffer.
    #[error("buffer too small: frame carries {len} bytes, capacity is {capacity}")]
    BufferTooSmall {
        /// Payload length announced on the wire.
        len: u32,
        /// Receiver capacity.
        capacity: usize,
    },

    /// The frame's transport tag differs from the configured one.
    #[error("transport type mismatch: expected {expected:#x}, got {actual:#x}")]
    TransportMismatch {
        /// Configured transport tag.
        expected: u32,
        /// Tag found on the wire.
        actual: u32,
    },
}

impl Error {
    /// Returns `true` when the peer closed the stream before any byte of the
    /// next frame arrived.
    ///
    /// This is the ordinary end of a session and is not worth a warning. A
    /// frame cut short is a `ConnectionAborted` receive failure instead.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ReceiveFailed(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
