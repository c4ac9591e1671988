//! The reply side of a client connection, as seen by command handlers.

use crate::protocol::RespValue;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::net::SocketAddr;

/// Write handle passed to every command handler.
///
/// Replies are encoded into an output buffer; the connection task flushes
/// that buffer to the socket after each command returns, so handlers never
/// block on the network themselves.
#[derive(Debug, Default)]
pub struct Conn {
    peer: Option<SocketAddr>,
    out: BytesMut,
    replies: usize,
}

impl Conn {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer: Some(peer),
            ..Self::default()
        }
    }

    /// A connection with no socket behind it, used to drive handlers directly.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Replies with a bulk string.
    pub fn write_bytes(&mut self, data: impl Into<Bytes>) {
        self.write_value(&RespValue::BulkString(data.into()));
    }

    /// Replies with a null bulk string.
    pub fn write_null(&mut self) {
        self.write_value(&RespValue::Null);
    }

    /// Replies with a simple string.
    ///
    /// CR and LF would end the reply early, so they are replaced by spaces.
    pub fn write_simple_string(&mut self, s: &str) {
        self.write_value(&RespValue::SimpleString(single_line(s)));
    }

    /// Replies with an error.
    pub fn write_error(&mut self, err: impl fmt::Display) {
        self.write_value(&RespValue::Error(single_line(&err.to_string())));
    }

    pub(crate) fn write_value(&mut self, value: &RespValue) {
        value.serialize_into(&mut self.out);
        self.replies += 1;
    }

    /// Number of replies written since the current command started.
    pub fn replies_written(&self) -> usize {
        self.replies
    }

    pub(crate) fn begin_command(&mut self) {
        self.replies = 0;
    }

    /// Takes the encoded replies that have not been sent yet.
    pub fn take_output(&mut self) -> BytesMut {
        self.out.split()
    }

    pub fn has_pending_output(&self) -> bool {
        !self.out.is_empty()
    }
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_writes_encode_resp() {
        let mut conn = Conn::detached();
        conn.write_simple_string("OK");
        conn.write_null();
        conn.write_bytes(Bytes::from_static(b"v\x00"));
        conn.write_error("ERR nope");

        assert_eq!(conn.replies_written(), 4);
        assert_eq!(&conn.take_output()[..], b"+OK\r\n$-1\r\n$2\r\nv\x00\r\n-ERR nope\r\n");
        assert!(!conn.has_pending_output());
    }

    #[test]
    fn test_simple_string_cannot_break_framing() {
        let mut conn = Conn::detached();
        conn.write_simple_string("PONG a\r\nb");
        assert_eq!(&conn.take_output()[..], b"+PONG a  b\r\n");
    }

    #[test]
    fn test_begin_command_resets_reply_count() {
        let mut conn = Conn::new("127.0.0.1:6379".parse().unwrap());
        conn.write_null();
        conn.begin_command();
        assert_eq!(conn.replies_written(), 0);
        assert_eq!(conn.peer_addr(), Some("127.0.0.1:6379".parse().unwrap()));
    }
}
