use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::codec::{Frame, FrameConfig};
use crate::error::{from_io, FrameError, Result};

/// Reads complete frames from any `Read` stream.
///
/// A frame is read in three stages: opcode, length, payload. Each stage keeps
/// reading until it is full or the stream reports end-of-stream; a stage that
/// comes up short fails the whole frame and nothing is returned.
pub struct FrameReader<T> {
    inner: T,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self { inner, config }
    }

    /// Read the next complete frame (blocking).
    pub fn try_read_frame(&mut self) -> Result<Frame> {
        let mut word = [0u8; 4];

        let read = read_full(&mut self.inner, &mut word)?;
        if read != word.len() {
            warn!(read, "bad opcode");
            return Err(FrameError::BadOpcode { read });
        }
        let opcode = u32::from_le_bytes(word);

        let read = read_full(&mut self.inner, &mut word)?;
        if read != word.len() {
            warn!(read, "bad length");
            return Err(FrameError::BadLength { read });
        }
        let length = u32::from_le_bytes(word) as usize;

        if length > self.config.max_payload_size {
            warn!(length, max = self.config.max_payload_size, "payload too large");
            return Err(FrameError::PayloadTooLarge {
                size: length,
                max: self.config.max_payload_size,
            });
        }

        let mut data = BytesMut::zeroed(length);
        let read = read_full(&mut self.inner, &mut data)?;
        if read != length {
            warn!(expected = length, read, "bad data");
            return Err(FrameError::BadData {
                expected: length,
                read,
            });
        }

        debug!(opcode, len = length, "read frame");
        Ok(Frame::new(opcode, data.freeze()))
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

/// Fill `buf` from `src`, stopping early only at end-of-stream.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(from_io(err)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use discipc_transport::TransportError;

    use super::*;
    use crate::codec::{encode_frame, Opcode, HEADER_SIZE};

    fn wire(opcode: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(opcode, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(1, b"hello")));
        let frame = reader.try_read_frame().unwrap();

        assert_eq!(frame.kind(), Some(Opcode::Frame));
        assert_eq!(frame.data().as_ref(), b"hello");
    }

    #[test]
    fn read_multiple_frames() {
        let mut bytes = wire(0, b"one");
        bytes.extend(wire(1, b"two"));
        bytes.extend(wire(3, b""));

        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.try_read_frame().unwrap();
        let f2 = reader.try_read_frame().unwrap();
        let f3 = reader.try_read_frame().unwrap();

        assert_eq!((f1.opcode(), f1.data().as_ref()), (0, b"one".as_ref()));
        assert_eq!((f2.opcode(), f2.data().as_ref()), (1, b"two".as_ref()));
        assert_eq!((f3.kind(), f3.len()), (Some(Opcode::Ping), 0));
    }

    #[test]
    fn roundtrip_payload_sizes() {
        for len in [0usize, 1, 65_535, 3 * 64 * 1024 + 5] {
            let payload = vec![0xAB; len];
            let mut reader = FrameReader::new(Cursor::new(wire(1, &payload)));
            let frame = reader.try_read_frame().unwrap();
            assert_eq!(frame.len(), len);
            assert_eq!(frame.data().as_ref(), payload.as_slice());
        }
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(4, b"slow"),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.try_read_frame().unwrap();
        assert_eq!(frame.kind(), Some(Opcode::Pong));
        assert_eq!(frame.data().as_ref(), b"slow");
    }

    #[test]
    fn three_bytes_then_eof_is_bad_opcode() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x01, 0x00, 0x00]));
        let err = reader.try_read_frame().unwrap_err();
        assert!(matches!(err, FrameError::BadOpcode { read: 3 }));
    }

    #[test]
    fn empty_stream_is_bad_opcode() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.try_read_frame().unwrap_err();
        assert!(matches!(err, FrameError::BadOpcode { read: 0 }));
    }

    #[test]
    fn truncated_length_is_bad_length() {
        let mut reader = FrameReader::new(Cursor::new(vec![1, 0, 0, 0, 5, 0]));
        let err = reader.try_read_frame().unwrap_err();
        assert!(matches!(err, FrameError::BadLength { read: 2 }));
    }

    #[test]
    fn one_byte_short_payload_is_bad_data() {
        let mut bytes = wire(1, b"hello");
        bytes.pop();

        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.try_read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::BadData {
                expected: 5,
                read: 4
            }
        ));
        assert!(err.breaks_framing());
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(1);
        bytes.put_u32_le(1024);

        let cfg = FrameConfig {
            max_payload_size: 16,
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        let err = reader.try_read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 1024, .. }));
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(7, b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.try_read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(8, b"ok"),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.try_read_frame().unwrap();

        assert_eq!(frame.opcode(), 8);
        assert_eq!(frame.data().as_ref(), b"ok");
    }

    #[test]
    fn not_connected_maps_to_transport_error() {
        let mut framed = FrameReader::new(NotConnectedReader);
        let err = framed.try_read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::NotConnected)
        ));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(vec![0u8; HEADER_SIZE]));
        assert_eq!(reader.get_ref().get_ref().len(), HEADER_SIZE);
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_payload_size, crate::DEFAULT_MAX_PAYLOAD);
        let _inner = reader.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        let payload = vec![0x5A; 200 * 1024];
        let sender = std::thread::spawn(move || {
            writer.send(1, &payload).unwrap();
            writer.send(3, b"ping").unwrap();
        });

        let big = reader.try_read_frame().unwrap();
        let ping = reader.try_read_frame().unwrap();
        sender.join().unwrap();

        assert_eq!(big.len(), 200 * 1024);
        assert_eq!(ping.kind(), Some(Opcode::Ping));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct NotConnectedReader;

    impl Read for NotConnectedReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::NotConnected))
        }
    }
}
