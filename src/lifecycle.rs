//! Process lifecycle: startup, serving and shutdown.
//!
//! ```text
//! Starting ──> Serving ──> ShuttingDown ──> Terminated
//!    │                          ▲
//!    └── open/bind failure ─────┘ (store closed, non-zero exit)
//! ```
//!
//! `Serving` ends when either the shutdown future resolves (SIGINT in the
//! binary) or the accept loop fails. Both paths, plus the drop guard inside
//! [`ShutdownLatch`], funnel into a single store close. Requests already in
//! flight are not drained; any that reach the store after the close get an
//! error reply.

use crate::commands::CommandHandler;
use crate::config::Config;
use crate::server::{bind, Server, ServerError};
use crate::shutdown::{ShutdownLatch, ShutdownReason};
use crate::store::{SledStore, StoreError};
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Lifecycle states, used for logging transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Starting,
    Serving,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Starting => "starting",
            State::Serving => "serving",
            State::ShuttingDown => "shutting down",
            State::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Fatal errors raised before the server starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Listen(#[from] ServerError),
}

/// How a serving process came to an end.
#[derive(Debug)]
pub enum Termination {
    /// The shutdown signal arrived.
    Interrupted,
    /// The accept loop gave up.
    Failed(ServerError),
}

impl Termination {
    /// Process exit status for this outcome.
    pub fn exit_status(&self) -> u8 {
        match self {
            Termination::Interrupted => 0,
            Termination::Failed(_) => 1,
        }
    }
}

/// A started server: store open, handlers registered, listener bound.
pub struct Running {
    server: Server,
    listener: TcpListener,
    latch: ShutdownLatch<SledStore>,
    local_addr: SocketAddr,
}

fn transition(state: State) {
    info!(state = %state, "Lifecycle transition");
}

/// Opens the store, registers the command handlers and binds the listener.
pub async fn start(config: &Config) -> Result<Running, StartupError> {
    transition(State::Starting);

    let store = Arc::new(SledStore::open(&config.dir)?);
    let latch = ShutdownLatch::new(Arc::clone(&store));

    let mut server = Server::new();
    CommandHandler::new(store).register(&mut server);

    let listener = match bind(&config.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to bind listener");
            transition(State::ShuttingDown);
            latch.trigger_blocking(ShutdownReason::StartupFailed).await;
            transition(State::Terminated);
            return Err(e.into());
        }
    };

    let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
        addr: config.bind_addr(),
        source,
    })?;
    info!(addr = %local_addr, dir = %config.dir.display(), "Server listening");

    Ok(Running {
        server,
        listener,
        latch,
        local_addr,
    })
}

impl Running {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A handle on the latch that guards the store close.
    pub fn shutdown_latch(&self) -> ShutdownLatch<SledStore> {
        self.latch.clone()
    }

    /// Serves until `shutdown` resolves or the accept loop fails, then
    /// closes the store.
    pub async fn run_until<F>(self, shutdown: F) -> Termination
    where
        F: Future<Output = ()>,
    {
        let Running {
            server,
            listener,
            latch,
            ..
        } = self;

        transition(State::Serving);

        let (termination, reason) = tokio::select! {
            res = server.serve(listener) => match res {
                Ok(never) => match never {},
                Err(e) => {
                    error!(error = %e, "Server error");
                    (Termination::Failed(e), ShutdownReason::ServeFailed)
                }
            },
            _ = shutdown => {
                info!("Shutdown signal received");
                (Termination::Interrupted, ShutdownReason::Interrupted)
            }
        };

        transition(State::ShuttingDown);
        latch.trigger_blocking(reason).await;
        transition(State::Terminated);

        termination
    }
}

/// Runs the server until SIGINT.
pub async fn run(config: &Config) -> Result<Termination, StartupError> {
    let running = start(config).await?;
    Ok(running.run_until(interrupt()).await)
}

/// Resolves on SIGINT. If the handler cannot be installed the server keeps
/// running and only a serve failure ends it.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for interrupt signal");
        std::future::pending::<()>().await;
    }
}
