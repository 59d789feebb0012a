//! The wire codec: a tiny framed protocol layered over any async byte
//! stream. Three frame kinds, each introduced by a single tag byte:
//!
//! | kind         | tag    | payload                                   |
//! |--------------|--------|--------------------------------------------|
//! | byte-flag    | `'b'`  | exactly 1 byte                              |
//! | short-string | `'s'`  | 1-byte length `L` (0-255), then `L` bytes   |
//! | stream       | `'B'`  | 8-byte big-endian `i64` length, then N bytes|
//!
//! The tag doubles as a type check: decoding a frame as the wrong kind
//! fails with [`WireError::ProtocolMismatch`] rather than silently
//! misreading a length as payload.
//!
//! All reads use read-full semantics (`AsyncReadExt::read_exact`):
//! partial reads are retried until the requested count is satisfied or
//! the stream hits EOF.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, Take};

const BYTE_TAG: u8 = b'b';
const STRING_TAG: u8 = b's';
const STREAM_TAG: u8 = b'B';

/// Errors produced by the wire codec.
///
/// `Io` is a read/write failure; `ProtocolMismatch` and
/// `NegativeLength` are protocol errors; `StringTooLong` is a
/// value error caught before any bytes are written.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("wire io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire: expected tag {expected:?}, got {got:?}")]
    ProtocolMismatch { expected: u8, got: u8 },

    #[error("wire: string too long ({len} bytes, max 255)")]
    StringTooLong { len: usize },

    #[error("wire: stream length must be >= 0, got {len}")]
    NegativeLength { len: i64 },
}

/// Encodes frames onto an underlying async writer.
pub struct Encoder<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes `['b', b]`.
    pub async fn encode_byte(&mut self, b: u8) -> Result<(), WireError> {
        self.writer.write_all(&[BYTE_TAG, b]).await?;
        Ok(())
    }

    /// Writes `['s', len(s), s...]`. Fails without writing anything if
    /// `s` is longer than 255 bytes.
    pub async fn encode_string(&mut self, s: &str) -> Result<(), WireError> {
        let bytes = s.as_bytes();
        if bytes.len() > 255 {
            return Err(WireError::StringTooLong { len: bytes.len() });
        }
        let mut frame = Vec::with_capacity(2 + bytes.len());
        frame.push(STRING_TAG);
        frame.push(bytes.len() as u8);
        frame.extend_from_slice(bytes);
        self.writer.write_all(&frame).await?;
        Ok(())
    }

    /// Writes `['B', len as i64 BE, ...]` then copies exactly `len`
    /// bytes from `reader`. Fails with [`WireError::NegativeLength`]
    /// (without writing anything) if `len < 0`, or with
    /// [`WireError::Io`] on a short read from `reader` or a short
    /// write to the underlying sink.
    pub async fn encode_stream<R>(&mut self, reader: &mut R, len: i64) -> Result<(), WireError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if len < 0 {
            return Err(WireError::NegativeLength { len });
        }

        self.writer.write_all(&[STREAM_TAG]).await?;
        self.writer.write_all(&len.to_be_bytes()).await?;

        let mut limited = AsyncReadExt::take(reader, len as u64);
        let copied = tokio::io::copy(&mut limited, &mut self.writer).await?;
        if copied != len as u64 {
            return Err(WireError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("stream short read: wanted {len}, got {copied}"),
            )));
        }
        Ok(())
    }
}

/// Decodes frames from an underlying async reader.
pub struct Decoder<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads a byte-flag frame. Fails with
    /// [`WireError::ProtocolMismatch`] if the tag isn't `'b'`.
    pub async fn decode_byte(&mut self) -> Result<u8, WireError> {
        let mut buf = [0u8; 2];
        self.reader.read_exact(&mut buf).await?;
        if buf[0] != BYTE_TAG {
            return Err(WireError::ProtocolMismatch {
                expected: BYTE_TAG,
                got: buf[0],
            });
        }
        Ok(buf[1])
    }

    /// Reads a short-string frame. Fails with
    /// [`WireError::ProtocolMismatch`] if the tag isn't `'s'`, without
    /// reading the payload bytes.
    pub async fn decode_string(&mut self) -> Result<String, WireError> {
        let mut header = [0u8; 2];
        self.reader.read_exact(&mut header).await?;
        if header[0] != STRING_TAG {
            return Err(WireError::ProtocolMismatch {
                expected: STRING_TAG,
                got: header[0],
            });
        }
        let len = header[1] as usize;
        let mut payload = vec![0u8; len];
        self.reader.read_exact(&mut payload).await?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Reads a stream frame's tag and length, returning a bounded
    /// reader that yields exactly the announced number of bytes from
    /// the underlying stream. The returned reader is single-use: it
    /// must be drained before the next `decode_*` call, and it cannot
    /// be rewound.
    pub async fn decode_stream(&mut self) -> Result<Take<&mut R>, WireError> {
        let mut tag = [0u8; 1];
        self.reader.read_exact(&mut tag).await?;
        if tag[0] != STREAM_TAG {
            return Err(WireError::ProtocolMismatch {
                expected: STREAM_TAG,
                got: tag[0],
            });
        }

        let mut len_buf = [0u8; 8];
        self.reader.read_exact(&mut len_buf).await?;
        let len = i64::from_be_bytes(len_buf);
        if len < 0 {
            return Err(WireError::NegativeLength { len });
        }

        Ok(AsyncReadExt::take(&mut self.reader, len as u64))
    }
}
