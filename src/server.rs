//! Command Dispatcher and Accept Loop
//!
//! A [`Server`] is a table of named command handlers plus the loop that
//! accepts TCP clients and hands each one to its own task. Handlers are
//! registered by name before serving starts; lookups ignore ASCII case, so
//! `GET`, `get` and `Get` all reach the handler registered as `"get"`.

use crate::connection::{handle_connection, Conn, ConnectionStats};
use crate::protocol::RespValue;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Signature of a command handler.
///
/// The handler receives the full command, name included, writes exactly one
/// reply to `conn`, and returns whether the connection should stay open.
pub type HandlerFn = dyn Fn(&mut Conn, &[RespValue]) -> bool + Send + Sync;

/// Longest pause between retries of a failing `accept`, in seconds.
const MAX_ACCEPT_BACKOFF_SECS: u64 = 64;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),
}

/// Name → handler table.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<String, Arc<HandlerFn>>,
}

impl Registry {
    /// Registers `handler` under `name`, replacing any previous handler.
    pub fn insert<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Conn, &[RespValue]) -> bool + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_ascii_lowercase(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_ascii_lowercase())
    }

    /// Routes one parsed request to its handler.
    pub fn dispatch(&self, conn: &mut Conn, command: RespValue) -> bool {
        let args = match command.into_array() {
            Some(args) if !args.is_empty() => args,
            Some(_) => {
                conn.write_error("ERR empty command");
                return true;
            }
            None => {
                conn.write_error("ERR invalid command format");
                return true;
            }
        };

        if !args.iter().all(|arg| matches!(arg, RespValue::BulkString(_))) {
            conn.write_error("ERR Protocol error: expected bulk string");
            return true;
        }

        let name = args[0].string();
        match self.handlers.get(&name.to_ascii_lowercase()) {
            Some(handler) => handler(conn, &args),
            None => {
                debug!(command = %name, "Unknown command");
                conn.write_error(format!("ERR unknown command '{}'", name));
                true
            }
        }
    }
}

/// A RESP server: registered handlers plus the accept loop.
#[derive(Default)]
pub struct Server {
    registry: Registry,
    stats: Arc<ConnectionStats>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the command `name`.
    pub fn handle_func<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&mut Conn, &[RespValue]) -> bool + Send + Sync + 'static,
    {
        self.registry.insert(name, handler);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Binds `addr` and serves until accepting fails for good.
    pub async fn listen_and_serve(self, addr: &str) -> Result<Infallible, ServerError> {
        let listener = bind(addr).await?;
        self.serve(listener).await
    }

    /// Serves clients from an already bound listener.
    ///
    /// Only returns on an unrecoverable accept failure.
    pub async fn serve(self, listener: TcpListener) -> Result<Infallible, ServerError> {
        let registry = Arc::new(self.registry);
        let stats = self.stats;

        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "Accepting connections");
        }

        loop {
            let (stream, addr) = accept(&listener).await?;
            let registry = Arc::clone(&registry);
            let stats = Arc::clone(&stats);

            tokio::spawn(async move {
                handle_connection(stream, addr, registry, stats).await;
            });
        }
    }
}

/// Binds a TCP listener, attaching the address to any error.
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accepts one client, retrying transient failures with exponential backoff.
async fn accept(
    listener: &TcpListener,
) -> Result<(tokio::net::TcpStream, std::net::SocketAddr), ServerError> {
    let mut backoff = 1;
    loop {
        match listener.accept().await {
            Ok(accepted) => return Ok(accepted),
            Err(e) => {
                if backoff > MAX_ACCEPT_BACKOFF_SECS {
                    error!(error = %e, "Giving up on accepting connections");
                    return Err(ServerError::Accept(e));
                }
                warn!(error = %e, retry_in_secs = backoff, "Failed to accept connection");
            }
        }

        tokio::time::sleep(Duration::from_secs(backoff)).await;
        backoff *= 2;
    }
}
