//! RESP (Redis Serialization Protocol) Data Types
//!
//! Every value that crosses the wire, in either direction, is a [`RespValue`].
//! Requests arrive as arrays of bulk strings; replies go out as one of the
//! four reply shapes the server emits (bulk, simple string, null, error).
//!
//! ## Wire Format
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`

use bytes::{BufMut, Bytes, BytesMut};
use std::borrow::Cow;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A single RESP value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+<string>\r\n`, never contains CRLF.
    SimpleString(String),

    /// `-<message>\r\n`
    Error(String),

    /// `:<integer>\r\n`
    Integer(i64),

    /// `$<length>\r\n<data>\r\n`, binary safe.
    BulkString(Bytes),

    /// Null bulk string (`$-1\r\n`) or null array (`*-1\r\n`).
    Null,

    /// `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new bulk string value.
    ///
    /// # Example
    /// ```
    /// use respkv::protocol::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Returns the raw bytes carried by this value.
    ///
    /// Bulk strings are returned without copying. Simple strings, errors and
    /// integers are returned as their textual bytes. Null and arrays have no
    /// byte form and yield an empty buffer; the dispatcher rejects them in
    /// commands before any handler sees them.
    pub fn bytes(&self) -> Bytes {
        match self {
            RespValue::BulkString(b) => b.clone(),
            RespValue::SimpleString(s) | RespValue::Error(s) => Bytes::from(s.clone()),
            RespValue::Integer(n) => Bytes::from(n.to_string()),
            RespValue::Null | RespValue::Array(_) => Bytes::new(),
        }
    }

    /// Returns this value as text, replacing invalid UTF-8 sequences.
    pub fn string(&self) -> Cow<'_, str> {
        match self {
            RespValue::BulkString(b) => String::from_utf8_lossy(b),
            RespValue::SimpleString(s) | RespValue::Error(s) => Cow::Borrowed(s.as_str()),
            RespValue::Integer(n) => Cow::Owned(n.to_string()),
            RespValue::Null | RespValue::Array(_) => Cow::Borrowed(""),
        }
    }

    /// Serializes the value into a fresh buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.serialize_into(&mut buf);
        buf.to_vec()
    }

    /// Appends the wire form of the value to `buf`.
    pub fn serialize_into(&self, buf: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => write_line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.put_slice(data);
                buf.put_slice(CRLF);
            }
            RespValue::Null => write_line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }
}

fn write_line(buf: &mut BytesMut, tag: u8, body: &[u8]) {
    buf.reserve(1 + body.len() + CRLF.len());
    buf.put_u8(tag);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}
