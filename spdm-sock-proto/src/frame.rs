//! One complete command/payload unit on the wire.

use std::fmt;
use std::io::{self, Read, Write};

use crate::codec::{buffer_len, read_buffer, read_u32, send_bytes, write_u32};
use crate::{Command, Error, Result, TransportType};

/// Size of the fixed header: command, transport type, length.
pub const FRAME_HEADER_LEN: usize = 12;

/// A received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Frame {
    /// Command code from the header.
    pub command: Command,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame.
    pub fn new(command: Command, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }
}

/// Writes one frame: command, `transport`, then the length-prefixed payload.
///
/// `transport` is always the locally configured tag, never a value echoed
/// from the peer. A payload too long for the length field fails before any
/// byte is written.
pub fn send_frame<W: Write + ?Sized>(
    w: &mut W,
    transport: TransportType,
    command: Command,
    payload: &[u8],
) -> Result<()> {
    let len = buffer_len(payload.len())?;
    tracing::debug!(%command, len, "transmit frame");
    write_u32(w, command.code())?;
    tracing::trace!(command = %Hex(&command.code().to_be_bytes()), "transmit command");
    write_u32(w, transport.code())?;
    tracing::trace!(transport = %Hex(&transport.code().to_be_bytes()), "transmit transport_type");
    write_u32(w, len)?;
    send_bytes(w, payload)?;
    tracing::trace!(payload = %Hex(payload), "transmit payload");
    w.flush().map_err(Error::SendFailed)
}

/// Reads one frame, checking its transport tag and size.
///
/// Fails with [`Error::TransportMismatch`] before the length field is read
/// and with [`Error::BufferTooSmall`] before any payload byte is read. Only a
/// close before the first header byte counts as [`Error::is_disconnect`];
/// a close anywhere later is a truncated frame.
pub fn receive_frame<R: Read + ?Sized>(
    r: &mut R,
    transport: TransportType,
    max_payload: usize,
) -> Result<Frame> {
    let code = read_u32(r)?;
    tracing::trace!(command = %Hex(&code.to_be_bytes()), "receive command");

    let actual = read_u32(r).map_err(truncated)?;
    tracing::trace!(transport = %Hex(&actual.to_be_bytes()), "receive transport_type");
    if actual != transport.code() {
        return Err(Error::TransportMismatch {
            expected: transport.code(),
            actual,
        });
    }

    let payload = read_buffer(r, max_payload).map_err(truncated)?;
    tracing::trace!(payload = %Hex(&payload), "receive payload");

    let command = Command::from(code);
    tracing::debug!(%command, len = payload.len(), "received frame");
    Ok(Frame { command, payload })
}

/// Reclassifies a close between header fields as a truncated frame.
fn truncated(e: Error) -> Error {
    match e {
        Error::ReceiveFailed(source) if source.kind() == io::ErrorKind::UnexpectedEof => {
            Error::ReceiveFailed(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection closed mid-frame",
            ))
        }
        other => other,
    }
}

/// Space-separated hex rendering for trace output.
struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOE: TransportType = TransportType::PciDoe;
    const TEST_PAYLOAD: &[u8] = &[0x10, 0x84, 0x00];

    #[test]
    fn header_fields_are_big_endian() {
        let mut buf = Vec::new();
        send_frame(&mut buf, DOE, Command::Test, TEST_PAYLOAD).unwrap();
        assert_eq!(&buf[..4], [0x00, 0x00, 0xDE, 0xAD]);
        assert_eq!(&buf[4..8], [0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&buf[8..12], [0x00, 0x00, 0x00, 0x03]);
        assert_eq!(&buf[12..], TEST_PAYLOAD);
    }

    #[test]
    fn roundtrip_preserves_command_and_payload() {
        let payloads: [&[u8]; 3] = [&[], b"x", &[0u8; 64]];
        for payload in payloads {
            let mut buf = Vec::new();
            send_frame(&mut buf, DOE, Command::Normal, payload).unwrap();
            assert_eq!(buf.len(), FRAME_HEADER_LEN + payload.len());

            let frame = receive_frame(&mut io::Cursor::new(&buf), DOE, 64).unwrap();
            assert_eq!(frame, Frame::new(Command::Normal, payload));
        }
    }

    #[test]
    fn unknown_codes_survive_roundtrip() {
        let mut buf = Vec::new();
        send_frame(&mut buf, DOE, Command::Other(0x1234), &[]).unwrap();
        let frame = receive_frame(&mut io::Cursor::new(&buf), DOE, 0).unwrap();
        assert_eq!(frame.command, Command::Other(0x1234));
    }

    #[test]
    fn oversized_frame_stops_after_header() {
        let mut buf = Vec::new();
        send_frame(&mut buf, DOE, Command::Normal, &[7u8; 32]).unwrap();

        let mut cursor = io::Cursor::new(&buf);
        let err = receive_frame(&mut cursor, DOE, 31).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { len: 32, .. }));
        assert_eq!(cursor.position(), FRAME_HEADER_LEN as u64);
    }

    #[test]
    fn transport_mismatch_stops_before_length() {
        let mut buf = Vec::new();
        send_frame(&mut buf, TransportType::Mctp, Command::Normal, b"abc").unwrap();

        let mut cursor = io::Cursor::new(&buf);
        let err = receive_frame(&mut cursor, DOE, 64).unwrap_err();
        assert!(matches!(
            err,
            Error::TransportMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn truncated_payload_is_not_delivered() {
        let mut buf = Vec::new();
        send_frame(&mut buf, DOE, Command::Normal, b"hello").unwrap();
        buf.truncate(buf.len() - 2);

        let err = receive_frame(&mut io::Cursor::new(&buf), DOE, 64).unwrap_err();
        assert!(matches!(err, Error::ReceiveFailed(_)));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn close_between_header_fields_is_not_a_disconnect() {
        let mut buf = Vec::new();
        send_frame(&mut buf, DOE, Command::Test, &[]).unwrap();

        for cut in [4, 8] {
            let err = receive_frame(&mut io::Cursor::new(&buf[..cut]), DOE, 64).unwrap_err();
            assert!(matches!(err, Error::ReceiveFailed(_)));
            assert!(!err.is_disconnect(), "cut at {cut}");
        }
    }

    #[test]
    fn empty_stream_is_a_disconnect() {
        let err = receive_frame(&mut io::Cursor::new(&[][..]), DOE, 64).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn hex_renders_spaced_bytes() {
        assert_eq!(Hex(&[0x00, 0xab, 0x10]).to_string(), "00 ab 10");
        assert_eq!(Hex(&[]).to_string(), "");
    }
}
