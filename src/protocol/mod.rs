//! RESP Protocol Implementation
//!
//! The wire layer between clients and the command handlers.
//!
//! - `types`: the [`RespValue`] enum, its accessors and serialization
//! - `parser`: incremental parser for incoming requests
//!
//! ## Example
//!
//! ```
//! use respkv::protocol::{parse_message, RespValue};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (value, consumed) = parse_message(data).unwrap().unwrap();
//! assert_eq!(consumed, data.len());
//!
//! let args = value.into_array().unwrap();
//! assert_eq!(args[1].string(), "name");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_message, ParseError, ParseResult, RespParser};
pub use types::RespValue;
