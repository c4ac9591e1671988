//! Command-line configuration.

use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

/// Default listen address: port 16379 on every interface.
pub const DEFAULT_ADDR: &str = ":16379";

/// Default storage directory, relative to the working directory.
pub const DEFAULT_DIR: &str = "db";

/// Long flags that may also be spelled with a single dash (`-addr`).
const SINGLE_DASH_FLAGS: &[&str] = &["addr", "dir"];

/// Server configuration.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "respkv")]
#[command(about = "Persistent Redis-compatible key-value server")]
#[command(version)]
pub struct Config {
    /// Listening address
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Directory for kv storage
    #[arg(long, default_value = DEFAULT_DIR)]
    pub dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            dir: PathBuf::from(DEFAULT_DIR),
        }
    }
}

impl Config {
    /// Parses the process arguments, exiting with usage on error.
    pub fn from_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Parses an explicit argument list (program name first).
    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args))
    }

    /// The address to hand to the socket layer.
    ///
    /// An empty host (`:16379`) means every IPv4 interface.
    pub fn bind_addr(&self) -> String {
        if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        }
    }
}

/// Rewrites `-addr` / `-dir` (optionally `=value`) to their `--` form.
///
/// An argument that is the value of a preceding flag is left untouched, so
/// `--dir -dir` still names a directory called `-dir`.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut expects_value = false;

    for arg in args {
        let arg: OsString = arg.into();
        if expects_value {
            expects_value = false;
            out.push(arg);
            continue;
        }

        let rewritten = match arg.to_str() {
            Some(s) if is_single_dash_flag(s) => {
                expects_value = !s.contains('=');
                Some(OsString::from(format!("-{}", s)))
            }
            Some(s) => {
                expects_value = s
                    .strip_prefix("--")
                    .is_some_and(|name| SINGLE_DASH_FLAGS.contains(&name));
                None
            }
            None => None,
        };
        out.push(rewritten.unwrap_or(arg));
    }
    out
}

fn is_single_dash_flag(arg: &str) -> bool {
    let Some(rest) = arg.strip_prefix('-') else {
        return false;
    };
    if rest.starts_with('-') {
        return false;
    }
    let name = rest.split('=').next().unwrap_or(rest);
    SINGLE_DASH_FLAGS.contains(&name)
}
