//! RESP2 (REdis Serialization Protocol) codec
//!
//! Parsing is incremental: an incomplete frame leaves the buffer untouched and
//! yields `Ok(None)` so the caller can read more bytes and retry.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

/// Maximum bulk string size (512MB)
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum array size (1M elements)
const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum number of arrays open around a value
const MAX_DEPTH: usize = 32;

/// RESP data types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// `+OK\r\n`
    SimpleString(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:1000\r\n`
    Integer(i64),
    /// `$6\r\nfoobar\r\n`, or `$-1\r\n` for null
    BulkString(Option<Vec<u8>>),
    /// `*2\r\n...`, or `*-1\r\n` for null
    Array(Option<Vec<RespValue>>),
}

/// Malformed input on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// First byte of a frame is not a RESP type marker
    UnknownType(u8),
    /// Length or integer line is not a valid decimal
    InvalidInteger,
    /// Negative length other than -1
    InvalidLength(i64),
    /// Simple string or error is not UTF-8
    InvalidUtf8,
    /// Bulk payload not followed by `\r\n`
    MissingTerminator,
    /// Declared length exceeds the configured maximum
    TooLarge {
        /// "bulk string" or "array"
        kind: &'static str,
        /// Declared length
        len: usize,
        /// Allowed maximum
        max: usize,
    },
    /// Arrays nested deeper than `MAX_DEPTH`
    TooDeep,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownType(b) => {
                write!(f, "Protocol error: unknown type byte '{}'", b.escape_ascii())
            }
            ProtocolError::InvalidInteger => write!(f, "Protocol error: invalid integer"),
            ProtocolError::InvalidLength(len) => {
                write!(f, "Protocol error: invalid length {}", len)
            }
            ProtocolError::InvalidUtf8 => write!(f, "Protocol error: invalid UTF-8"),
            ProtocolError::MissingTerminator => {
                write!(f, "Protocol error: expected \\r\\n after bulk string")
            }
            ProtocolError::TooLarge { kind, len, max } => {
                write!(f, "Protocol error: {} too large: {} (max {})", kind, len, max)
            }
            ProtocolError::TooDeep => {
                write!(f, "Protocol error: nesting deeper than {}", MAX_DEPTH)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl RespValue {
    /// `+OK`
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Error reply; `msg` should start with an error code such as `ERR`
    pub fn error(msg: impl Into<String>) -> Self {
        RespValue::Error(msg.into())
    }

    /// Encode into `out`
    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(out, b'+', s.as_bytes()),
            RespValue::Error(e) => write_line(out, b'-', e.as_bytes()),
            RespValue::Integer(i) => write_line(out, b':', i.to_string().as_bytes()),
            RespValue::BulkString(None) => out.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                write_line(out, b'$', data.len().to_string().as_bytes());
                out.put_slice(data);
                out.put_slice(b"\r\n");
            }
            RespValue::Array(None) => out.put_slice(b"*-1\r\n"),
            RespValue::Array(Some(items)) => {
                write_line(out, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.write_to(out);
                }
            }
        }
    }

    /// Encode into a fresh buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut out = BytesMut::new();
        self.write_to(&mut out);
        out.to_vec()
    }

    /// Parse one frame from the front of `buf`, consuming it on success
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, ProtocolError> {
        let mut parser = Parser { buf: &buf[..], pos: 0 };
        match parser.value(0)? {
            Some(value) => {
                let consumed = parser.pos;
                buf.advance(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

fn write_line(out: &mut BytesMut, marker: u8, body: &[u8]) {
    out.reserve(body.len() + 3);
    out.put_u8(marker);
    out.put_slice(body);
    out.put_slice(b"\r\n");
}

/// Cursor over a borrowed input buffer
struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    /// `depth` counts the arrays already open around this value
    fn value(&mut self, depth: usize) -> Result<Option<RespValue>, ProtocolError> {
        let Some(&marker) = self.buf.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;

        match marker {
            b'+' => Ok(self.text()?.map(|s| RespValue::SimpleString(s.into()))),
            b'-' => Ok(self.text()?.map(|s| RespValue::Error(s.into()))),
            b':' => Ok(self.integer()?.map(RespValue::Integer)),
            b'$' => self.bulk(),
            b'*' => self.array(depth),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    fn line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        self.pos += end + 2;
        Some(&rest[..end])
    }

    fn text(&mut self) -> Result<Option<&'a str>, ProtocolError> {
        match self.line() {
            Some(line) => std::str::from_utf8(line)
                .map(Some)
                .map_err(|_| ProtocolError::InvalidUtf8),
            None => Ok(None),
        }
    }

    fn integer(&mut self) -> Result<Option<i64>, ProtocolError> {
        match self.line() {
            Some(line) => std::str::from_utf8(line)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .map(Some)
                .ok_or(ProtocolError::InvalidInteger),
            None => Ok(None),
        }
    }

    /// Length header: `Some(None)` for the -1 null marker
    fn length(
        &mut self,
        kind: &'static str,
        max: usize,
    ) -> Result<Option<Option<usize>>, ProtocolError> {
        let Some(len) = self.integer()? else {
            return Ok(None);
        };
        match len {
            -1 => Ok(Some(None)),
            len if len < -1 => Err(ProtocolError::InvalidLength(len)),
            len => {
                let len = len as usize;
                if len > max {
                    return Err(ProtocolError::TooLarge { kind, len, max });
                }
                Ok(Some(Some(len)))
            }
        }
    }

    /// Bulk payload of `len` bytes plus its \r\n, borrowed from the input
    fn payload(&mut self, len: usize) -> Result<Option<&'a [u8]>, ProtocolError> {
        if self.buf.len() - self.pos < len + 2 {
            return Ok(None);
        }

        let data = &self.buf[self.pos..self.pos + len];
        if &self.buf[self.pos + len..self.pos + len + 2] != b"\r\n" {
            return Err(ProtocolError::MissingTerminator);
        }
        self.pos += len + 2;

        Ok(Some(data))
    }

    fn bulk(&mut self) -> Result<Option<RespValue>, ProtocolError> {
        let len = match self.length("bulk string", MAX_BULK_LEN)? {
            None => return Ok(None),
            Some(None) => return Ok(Some(RespValue::BulkString(None))),
            Some(Some(len)) => len,
        };

        Ok(self
            .payload(len)?
            .map(|data| RespValue::BulkString(Some(data.to_vec()))))
    }

    fn array(&mut self, depth: usize) -> Result<Option<RespValue>, ProtocolError> {
        if depth >= MAX_DEPTH {
            return Err(ProtocolError::TooDeep);
        }

        let len = match self.length("array", MAX_ARRAY_LEN)? {
            None => return Ok(None),
            Some(None) => return Ok(Some(RespValue::Array(None))),
            Some(Some(len)) => len,
        };

        let mut items = Vec::with_capacity(len.min(64));
        for _ in 0..len {
            match self.value(depth + 1)? {
                Some(item) => items.push(item),
                None => return Ok(None),
            }
        }

        Ok(Some(RespValue::Array(Some(items))))
    }

    /// Step over one header (and bulk payload) without building a value
    ///
    /// Returns `Some(Some(n))` for an array header announcing `n > 0` items,
    /// `Some(None)` for anything that is a complete value on its own.
    fn skip_token(&mut self, depth: usize) -> Result<Option<Option<usize>>, ProtocolError> {
        let Some(&marker) = self.buf.get(self.pos) else {
            return Ok(None);
        };
        self.pos += 1;

        let complete = match marker {
            b'+' | b'-' => self.text()?.is_some(),
            b':' => self.integer()?.is_some(),
            b'$' => match self.length("bulk string", MAX_BULK_LEN)? {
                None => false,
                Some(None) => true,
                Some(Some(len)) => self.payload(len)?.is_some(),
            },
            b'*' => {
                if depth >= MAX_DEPTH {
                    return Err(ProtocolError::TooDeep);
                }
                match self.length("array", MAX_ARRAY_LEN)? {
                    None => false,
                    Some(Some(len)) if len > 0 => return Ok(Some(Some(len))),
                    Some(_) => true,
                }
            }
            other => return Err(ProtocolError::UnknownType(other)),
        };

        Ok(complete.then_some(None))
    }
}

/// Pulls frames off a connection buffer that fills a few bytes at a time
///
/// Scanning picks up where the previous call stopped, so a frame that trickles
/// in over many reads is walked once. Values are only built once the whole
/// frame is buffered.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Bytes at the front of the buffer already known to be well formed
    scanned: usize,
    /// Items still owed to each open array, innermost last
    pending: Vec<usize>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next complete frame off the front of `buf`
    ///
    /// On error the reader starts over; the caller decides what to do with
    /// the rest of `buf`.
    pub fn next_frame(&mut self, buf: &mut BytesMut) -> Result<Option<RespValue>, ProtocolError> {
        match self.scan(&buf[..]) {
            Ok(true) => {
                self.reset();
                RespValue::parse(buf)
            }
            Ok(false) => Ok(None),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Advance over complete tokens; `true` once a whole frame is buffered
    fn scan(&mut self, buf: &[u8]) -> Result<bool, ProtocolError> {
        let mut parser = Parser {
            buf,
            pos: self.scanned,
        };

        loop {
            let Some(token) = parser.skip_token(self.pending.len())? else {
                return Ok(false);
            };
            self.scanned = parser.pos;

            if let Some(len) = token {
                self.pending.push(len);
                continue;
            }

            // A value finished; close every array it completes
            loop {
                let Some(remaining) = self.pending.last_mut() else {
                    return Ok(true);
                };
                if *remaining > 1 {
                    *remaining -= 1;
                    break;
                }
                self.pending.pop();
            }
        }
    }

    fn reset(&mut self) {
        self.scanned = 0;
        self.pending.clear();
    }
}
