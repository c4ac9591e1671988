//! Command Handler Module
//!
//! The three commands this server understands, implemented against the
//! [`KvStore`](crate::store::KvStore) trait:
//!
//! - `PING [message]` - liveness check, never touches the store
//! - `GET key` - bulk reply with the value, or null when absent
//! - `SET key value` - upsert, replies `OK`
//!
//! ```text
//! Registry::dispatch ──> CommandHandler::{ping,get,set} ──> KvStore
//!                                  │
//!                                  ▼
//!                          Conn::write_* (one reply)
//! ```

pub mod handler;

pub use handler::CommandHandler;
