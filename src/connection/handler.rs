//! Connection Handler Module
//!
//! Each accepted client runs in its own task, looping over
//! read → parse → dispatch → flush until the client goes away.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  Parse buffered commands     │
//!    │  Dispatch each to a handler  │
//!    │  Flush its reply             │
//!    │  Read more bytes             │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / error / handler asks to close
//! ```
//!
//! Commands on one connection are handled strictly one after another, so
//! replies always leave in the order the commands arrived.

use crate::connection::Conn;
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{ParseError, RespParser, RespValue};
use crate::server::Registry;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Largest request we are willing to buffer: one maximal bulk string plus
/// room for the surrounding framing.
const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

const INITIAL_BUFFER_SIZE: usize = 4096;

/// Counters shared by every connection of a server.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    pub connections_accepted: AtomicU64,
    pub active_connections: AtomicU64,
    pub commands_processed: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Drives one client connection.
pub struct ConnectionHandler<S> {
    stream: BufWriter<S>,
    addr: SocketAddr,
    buffer: BytesMut,
    parser: RespParser,
    conn: Conn,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        addr: SocketAddr,
        registry: Arc<Registry>,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            parser: RespParser::new(),
            conn: Conn::new(addr),
            registry,
            stats,
        }
    }

    /// Runs the connection until the client disconnects, an error occurs,
    /// or a handler asks for the connection to be closed.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        debug!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Connection closed by server"),
            Err(ConnectionError::ClientDisconnected) => {
                debug!(client = %self.addr, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(command) = self.try_parse_command()? {
                self.conn.begin_command();
                let keep_open = self.registry.dispatch(&mut self.conn, command);
                self.stats.command_processed();

                if self.conn.replies_written() != 1 {
                    warn!(
                        client = %self.addr,
                        replies = self.conn.replies_written(),
                        "Handler did not write exactly one reply"
                    );
                }

                self.flush_replies().await?;

                if !keep_open {
                    return Ok(());
                }
            }

            self.read_more_data().await?;
        }
    }

    fn try_parse_command(&mut self) -> Result<Option<RespValue>, ConnectionError> {
        match self.parser.parse(&self.buffer) {
            Ok(Some((value, consumed))) => {
                let _ = self.buffer.split_to(consumed);
                trace!(
                    client = %self.addr,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Parse error");
                Err(ConnectionError::ParseError(e))
            }
        }
    }

    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;
        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        trace!(client = %self.addr, bytes = n, "Read data");
        Ok(())
    }

    async fn flush_replies(&mut self) -> Result<(), ConnectionError> {
        if !self.conn.has_pending_output() {
            return Ok(());
        }
        let out = self.conn.take_output();
        self.stream.write_all(&out).await?;
        self.stream.flush().await?;
        trace!(client = %self.addr, bytes = out.len(), "Sent reply");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Client disconnected")]
    ClientDisconnected,

    /// The stream ended in the middle of a command.
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Runs a [`ConnectionHandler`] to completion, logging how it ended.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    registry: Arc<Registry>,
    stats: Arc<ConnectionStats>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, registry, stats);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => debug!(client = %addr, error = %e, "Connection ended with error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::default();
        registry.insert("ping", |conn: &mut Conn, _args: &[RespValue]| {
            conn.write_simple_string("PONG");
            true
        });
        registry.insert("quit", |conn: &mut Conn, _args: &[RespValue]| {
            conn.write_simple_string("OK");
            false
        });
        Arc::new(registry)
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_replies_follow_command_order() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPING\r\n*1\r\n$3\r\nFOO\r\nping\r\n")
            .write(b"+PONG\r\n")
            .write(b"-ERR unknown command 'FOO'\r\n")
            .write(b"+PONG\r\n")
            .build();
        let stats = Arc::new(ConnectionStats::new());

        let handler = ConnectionHandler::new(stream, peer(), registry(), Arc::clone(&stats));
        let result = handler.run().await;

        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_command_split_across_reads() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPI")
            .read(b"NG\r\n")
            .write(b"+PONG\r\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            peer(),
            registry(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ClientDisconnected)
        ));
    }

    #[tokio::test]
    async fn test_handler_can_close_connection() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nQUIT\r\n")
            .write(b"+OK\r\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            peer(),
            registry(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(handler.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_frame_ends_connection() {
        let stream = Builder::new().read(b"*1\r\n$x\r\n").build();

        let handler = ConnectionHandler::new(
            stream,
            peer(),
            registry(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::ParseError(ParseError::InvalidInteger(_)))
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_command() {
        let stream = Builder::new().read(b"*2\r\n$3\r\nGET\r\n").build();

        let handler = ConnectionHandler::new(
            stream,
            peer(),
            registry(),
            Arc::new(ConnectionStats::new()),
        );
        assert!(matches!(
            handler.run().await,
            Err(ConnectionError::UnexpectedEof)
        ));
    }
}
