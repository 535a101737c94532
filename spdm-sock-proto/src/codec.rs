//! Blocking primitives over any `Read`/`Write` stream.
//!
//! Integers are 4 bytes big-endian. A buffer is `[u32 big-endian length][bytes]`;
//! the bytes themselves are passed through untouched.

use std::io::{self, Read, Write};

use crate::{Error, Result};

/// Writes all of `buf`, re-issuing the remainder after partial writes.
pub fn send_bytes<W: Write + ?Sized>(w: &mut W, buf: &[u8]) -> Result<()> {
    let mut sent = 0;
    while sent < buf.len() {
        match w.write(&buf[sent..]) {
            Ok(0) => {
                return Err(Error::SendFailed(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection refused further bytes",
                )));
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::SendFailed(e)),
        }
    }
    Ok(())
}

/// Fills `buf` completely, blocking until enough bytes arrive.
///
/// A zero-length read before any byte arrived means the peer closed the
/// stream and is reported as [`Error::ReceiveFailed`] with `UnexpectedEof`.
/// A close after part of `buf` was filled uses `ConnectionAborted`.
pub fn receive_bytes<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut received = 0;
    while received < buf.len() {
        match r.read(&mut buf[received..]) {
            Ok(0) if received == 0 => {
                return Err(Error::ReceiveFailed(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            Ok(0) => {
                return Err(Error::ReceiveFailed(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "connection closed mid-field",
                )));
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::ReceiveFailed(e)),
        }
    }
    Ok(())
}

/// Writes `value` as 4 big-endian bytes.
pub fn write_u32<W: Write + ?Sized>(w: &mut W, value: u32) -> Result<()> {
    send_bytes(w, &value.to_be_bytes())
}

/// Reads 4 big-endian bytes.
pub fn read_u32<R: Read + ?Sized>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    receive_bytes(r, &mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Converts a buffer length to its wire field.
pub(crate) fn buffer_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::SendFailed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "payload exceeds u32::MAX",
        ))
    })
}

/// Writes `data` prefixed with its length.
pub fn write_buffer<W: Write + ?Sized>(w: &mut W, data: &[u8]) -> Result<()> {
    write_u32(w, buffer_len(data.len())?)?;
    send_bytes(w, data)
}

/// Reads a length-prefixed buffer of at most `capacity` bytes.
///
/// An oversized length is rejected before any body byte is consumed.
pub fn read_buffer<R: Read + ?Sized>(r: &mut R, capacity: usize) -> Result<Vec<u8>> {
    let len = read_u32(r)?;
    if usize::try_from(len).map_or(true, |n| n > capacity) {
        return Err(Error::BufferTooSmall { len, capacity });
    }
    let mut data = vec![0u8; len as usize];
    if !data.is_empty() {
        receive_bytes(r, &mut data)?;
    }
    Ok(data)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Accepts at most one byte per call and interrupts every other call.
    struct Trickle {
        out: Vec<u8>,
        calls: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(io::ErrorKind::Interrupted.into());
            }
            self.out.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Hands out the input one byte at a time.
    struct Drip<'a>(&'a [u8]);

    impl Read for Drip<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((b, rest)) if !buf.is_empty() => {
                    buf[0] = *b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    /// Refuses every write.
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn u32_is_big_endian() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0x0102_0304).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        let mut cursor = io::Cursor::new(&buf);
        assert_eq!(read_u32(&mut cursor).unwrap(), 0x0102_0304);
    }

    #[test]
    fn partial_writes_are_resumed() {
        let mut w = Trickle {
            out: Vec::new(),
            calls: 0,
        };
        write_buffer(&mut w, b"abc").unwrap();
        assert_eq!(w.out, [0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn partial_reads_are_accumulated() {
        let wire = [0, 0, 0, 2, 0xAA, 0xBB];
        let data = read_buffer(&mut Drip(&wire), 16).unwrap();
        assert_eq!(data, [0xAA, 0xBB]);
    }

    #[test]
    fn broken_writer_fails_send() {
        let err = write_u32(&mut Closed, 1).unwrap_err();
        assert!(matches!(err, Error::SendFailed(_)));
    }

    #[test]
    fn zero_length_buffer_consumes_only_length() {
        let wire = [0, 0, 0, 0, 0xFF];
        let mut cursor = io::Cursor::new(&wire[..]);
        let data = read_buffer(&mut cursor, 8).unwrap();
        assert!(data.is_empty());
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn oversized_buffer_is_rejected_without_reading_body() {
        let wire = [0, 0, 0, 9, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut cursor = io::Cursor::new(&wire[..]);
        let err = read_buffer(&mut cursor, 8).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                len: 9,
                capacity: 8
            }
        ));
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn payload_bytes_are_not_reordered() {
        let mut buf = Vec::new();
        write_buffer(&mut buf, &[0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(&buf[4..], [0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn eof_is_a_disconnect() {
        let err = read_u32(&mut io::Cursor::new(&[][..])).unwrap_err();
        assert!(err.is_disconnect());

        let err = read_u32(&mut io::Cursor::new(&[0u8, 1][..])).unwrap_err();
        assert!(matches!(err, Error::ReceiveFailed(_)));
        assert!(!err.is_disconnect());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn length_past_u32_is_rejected() {
        assert_eq!(buffer_len(0x1_0000).unwrap(), 0x1_0000);
        let err = buffer_len(u32::MAX as usize + 1).unwrap_err();
        assert!(matches!(err, Error::SendFailed(e) if e.kind() == io::ErrorKind::InvalidInput));
    }
}
