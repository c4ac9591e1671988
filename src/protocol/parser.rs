//! Incremental RESP Request Parser
//!
//! The parser looks at the bytes buffered for one connection and returns:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes long
//! - `Ok(None)` - the value is incomplete, read more and try again
//! - `Err(ParseError)` - the bytes can never form a valid value
//!
//! Nothing is consumed on `Ok(None)`, so the caller can simply retry once
//! more data has arrived. Lines that do not start with a RESP type prefix are
//! treated as inline commands (`PING\r\n`, `SET k v\r\n`), which is what
//! `telnet`-style clients send.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Stateless RESP parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespParser;

impl RespParser {
    pub fn new() -> Self {
        Self
    }

    /// Attempts to parse one value from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
        parse_value(buf, 0)
    }
}

/// Parses a single RESP message from bytes.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

fn parse_value(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(&tag) = buf.first() else {
        return Ok(None);
    };

    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::ProtocolError(format!(
            "maximum nesting depth exceeded: {}",
            MAX_NESTING_DEPTH
        )));
    }

    match tag {
        prefix::SIMPLE_STRING => Ok(read_line(&buf[1..])?
            .map(|(line, used)| (RespValue::SimpleString(line.to_string()), 1 + used))),
        prefix::ERROR => Ok(read_line(&buf[1..])?
            .map(|(line, used)| (RespValue::Error(line.to_string()), 1 + used))),
        prefix::INTEGER => match read_line(&buf[1..])? {
            Some((line, used)) => Ok(Some((RespValue::Integer(parse_int(line)?), 1 + used))),
            None => Ok(None),
        },
        prefix::BULK_STRING => parse_bulk_string(buf),
        prefix::ARRAY => parse_array(buf, depth),
        _ => parse_inline(buf),
    }
}

/// `$<length>\r\n<data>\r\n`
fn parse_bulk_string(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((line, used)) = read_line(&buf[1..])? else {
        return Ok(None);
    };
    let header = 1 + used;

    let length = parse_int(line)?;
    if length == -1 {
        return Ok(Some((RespValue::Null, header)));
    }
    if length < 0 {
        return Err(ParseError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total = header + length + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[header + length..total] != CRLF {
        return Err(ParseError::ProtocolError(
            "bulk string missing trailing CRLF".to_string(),
        ));
    }

    let data = Bytes::copy_from_slice(&buf[header..header + length]);
    Ok(Some((RespValue::BulkString(data), total)))
}

/// `*<count>\r\n<elements...>`
fn parse_array(buf: &[u8], depth: usize) -> ParseResult<Option<(RespValue, usize)>> {
    let Some((line, used)) = read_line(&buf[1..])? else {
        return Ok(None);
    };
    let mut consumed = 1 + used;

    let count = parse_int(line)?;
    if count == -1 {
        return Ok(Some((RespValue::Null, consumed)));
    }
    if count < 0 {
        return Err(ParseError::InvalidArrayLength(count));
    }

    // Cap the preallocation; a bogus count must not reserve gigabytes.
    let mut elements = Vec::with_capacity((count as usize).min(1024));
    for _ in 0..count {
        match parse_value(&buf[consumed..], depth + 1)? {
            Some((value, used)) => {
                elements.push(value);
                consumed += used;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((RespValue::Array(elements), consumed)))
}

/// `SET key value\r\n`
fn parse_inline(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let Some(pos) = find_crlf(buf) else {
        return Ok(None);
    };

    let line =
        std::str::from_utf8(&buf[..pos]).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    let elements: Vec<RespValue> = line
        .split_whitespace()
        .map(|part| RespValue::BulkString(Bytes::copy_from_slice(part.as_bytes())))
        .collect();

    if elements.is_empty() {
        return Err(ParseError::ProtocolError("empty inline command".to_string()));
    }

    Ok(Some((RespValue::Array(elements), pos + CRLF.len())))
}

/// Reads one CRLF-terminated line, returning it with the bytes used
/// including the terminator.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&str, usize)>> {
    match find_crlf(buf) {
        Some(pos) => {
            let line = std::str::from_utf8(&buf[..pos])
                .map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
            Ok(Some((line, pos + CRLF.len())))
        }
        None => Ok(None),
    }
}

fn parse_int(line: &str) -> ParseResult<i64> {
    line.parse()
        .map_err(|e: std::num::ParseIntError| ParseError::InvalidInteger(format!("{line:?}: {e}")))
}

#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}
