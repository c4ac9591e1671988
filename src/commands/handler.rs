//! `PING`, `GET` and `SET`.
//!
//! Every handler checks arity first and replies with an error without
//! touching the store when the count is wrong. Store failures become
//! `-ERR ...` replies; they are never reported as a missing key or as `OK`.

use crate::connection::Conn;
use crate::protocol::RespValue;
use crate::server::Server;
use crate::store::KvStore;
use std::sync::Arc;
use tracing::warn;

/// Command handlers bound to one store.
pub struct CommandHandler<S> {
    store: Arc<S>,
}

impl<S> Clone for CommandHandler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KvStore> CommandHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Registers `ping`, `get` and `set` on `server`.
    pub fn register(&self, server: &mut Server) {
        let handler = self.clone();
        server.handle_func("set", move |conn: &mut Conn, args: &[RespValue]| {
            handler.set(conn, args)
        });

        let handler = self.clone();
        server.handle_func("get", move |conn: &mut Conn, args: &[RespValue]| {
            handler.get(conn, args)
        });

        let handler = self.clone();
        server.handle_func("ping", move |conn: &mut Conn, args: &[RespValue]| {
            handler.ping(conn, args)
        });
    }

    /// PING [message]
    pub fn ping(&self, conn: &mut Conn, args: &[RespValue]) -> bool {
        match args.len() {
            1 => conn.write_simple_string("PONG"),
            2 => conn.write_simple_string(&format!("PONG {}", args[1].string())),
            _ => conn.write_error(wrong_arity("ping")),
        }
        true
    }

    /// GET key
    pub fn get(&self, conn: &mut Conn, args: &[RespValue]) -> bool {
        if args.len() != 2 {
            conn.write_error(wrong_arity("get"));
            return true;
        }

        match self.store.get(&args[1].bytes()) {
            Ok(Some(value)) => conn.write_bytes(value),
            Ok(None) => conn.write_null(),
            Err(e) => {
                warn!(error = %e, "GET failed");
                conn.write_error(format!("ERR {}", e));
            }
        }
        true
    }

    /// SET key value
    pub fn set(&self, conn: &mut Conn, args: &[RespValue]) -> bool {
        if args.len() != 3 {
            conn.write_error(wrong_arity("set"));
            return true;
        }

        match self.store.set(&args[1].bytes(), &args[2].bytes()) {
            Ok(()) => conn.write_simple_string("OK"),
            Err(e) => {
                warn!(error = %e, "SET failed");
                conn.write_error(format!("ERR {}", e));
            }
        }
        true
    }
}

fn wrong_arity(cmd: &str) -> String {
    format!("ERR wrong number of arguments for '{}' command", cmd)
}
