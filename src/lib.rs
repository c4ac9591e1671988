//! # respkv - A Persistent, Redis-Compatible Key-Value Server
//!
//! respkv speaks the RESP wire protocol, so `redis-cli` and ordinary Redis
//! client libraries can talk to it, and keeps every key in an embedded
//! [`sled`] database on disk. The command set is deliberately small:
//!
//! - `PING [message]`
//! - `GET key`
//! - `SET key value`
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           respkv                               │
//! │                                                                │
//! │  ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐     │
//! │  │ TCP Server  │──>│ Connection   │──>│ Registry         │     │
//! │  │ (accept)    │   │ Handler      │   │ (name → handler) │     │
//! │  └─────────────┘   └──────────────┘   └────────┬─────────┘     │
//! │                                                │               │
//! │                                                ▼               │
//! │  ┌─────────────┐                      ┌──────────────────┐     │
//! │  │ RESP Parser │                      │ CommandHandler   │     │
//! │  └─────────────┘                      │ PING / GET / SET │     │
//! │                                       └────────┬─────────┘     │
//! │                                                ▼               │
//! │  ┌──────────────┐                     ┌──────────────────┐     │
//! │  │ ShutdownLatch│────── close once ──>│ SledStore        │     │
//! │  └──────────────┘                     └──────────────────┘     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use respkv::{lifecycle, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let running = lifecycle::start(&config).await.unwrap();
//!     let termination = running.run_until(async {
//!         tokio::signal::ctrl_c().await.ok();
//!     }).await;
//!     std::process::exit(termination.exit_status().into());
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values and the request parser
//! - [`connection`]: per-client read/dispatch/reply loop and the [`Conn`] reply writer
//! - [`server`]: handler registry and accept loop
//! - [`commands`]: `PING`, `GET`, `SET`
//! - [`store`]: the [`KvStore`] trait and its `sled` implementation
//! - [`shutdown`]: close-exactly-once latch
//! - [`lifecycle`]: startup and shutdown sequencing
//! - [`config`]: command-line flags

pub mod commands;
pub mod config;
pub mod connection;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod store;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{Conn, ConnectionStats};
pub use protocol::{ParseError, RespParser, RespValue};
pub use server::{Server, ServerError};
pub use shutdown::ShutdownLatch;
pub use store::{KvStore, SledStore, StoreError};

/// Version of respkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
