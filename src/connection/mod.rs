//! Connection Handling Module
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    TCP Listener                          │
//! │                    (server.rs)                           │
//! └──────────────────────┬───────────────────────────────────┘
//!                        │ accept() + spawn
//!                        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                        │
//! │                                                          │
//! │  read bytes ──> parse RESP ──> Registry::dispatch        │
//! │                                      │                   │
//! │                                      ▼                   │
//! │                        handler(&mut Conn, &args)         │
//! │                                      │                   │
//! │                                      ▼                   │
//! │                              flush Conn output           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Conn`] is the only part handlers see: typed reply writers plus the
//! peer address.

pub mod conn;
pub mod handler;

pub use conn::Conn;
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
