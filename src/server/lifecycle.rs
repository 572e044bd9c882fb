//! Server Lifecycle
//!
//! [`WebSocketServer`] owns the listening socket, the cancellation token
//! shared by every session, and the accept task.
//!
//! ## States
//!
//! ```text
//!            start()                      stop() / dispose()
//!  Stopped ───────────> Running ─────────────────────────────> Stopped
//!     │  ▲                 │  ▲
//!     │  └── stop(): warn ─┘  └── start(): warn, no second listener
//!     └── bind failure: error logged, stays Stopped
//! ```
//!
//! Stopping cancels the token, waits for the accept task to hand the
//! listener back, and only then releases the socket. Sessions are not
//! awaited; each one sees the token and closes itself.

use crate::commands::CommandRouter;
use crate::connection::ConnectionStats;
use crate::server::accept::{accept_loop, AcceptContext};
use crate::server::config::ServerConfig;
use crate::server::ServerError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Whether the server currently owns a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
}

/// Resources that exist only while running.
struct Running {
    cancel: CancellationToken,
    accept_task: JoinHandle<TcpListener>,
    local_addr: SocketAddr,
}

/// An embeddable WebSocket command server.
///
/// # Example
///
/// ```no_run
/// use stateport::commands::{CommandRouter, InfoRegistry};
/// use stateport::server::{ServerConfig, WebSocketServer};
///
/// # async fn run() -> Result<(), stateport::server::ServerError> {
/// let router = CommandRouter::new(InfoRegistry::new());
/// let server = WebSocketServer::new(ServerConfig::default(), router);
///
/// let addr = server.start().await?;
/// println!("listening on {}", addr);
///
/// server.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct WebSocketServer {
    config: Arc<ServerConfig>,
    router: CommandRouter,
    stats: Arc<ConnectionStats>,
    running: Mutex<Option<Running>>,
}

impl WebSocketServer {
    /// Creates a stopped server.
    pub fn new(config: ServerConfig, router: CommandRouter) -> Self {
        Self {
            config: Arc::new(config),
            router,
            stats: Arc::new(ConnectionStats::new()),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<ConnectionStats> {
        &self.stats
    }

    pub async fn state(&self) -> ServerState {
        match *self.running.lock().await {
            Some(_) => ServerState::Running,
            None => ServerState::Stopped,
        }
    }

    /// The address the listener is bound to, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.local_addr)
    }

    /// Binds the listener and starts accepting connections.
    ///
    /// Calling this while running only logs a warning and returns the
    /// address already bound. A bind failure is logged and returned; the
    /// server stays stopped.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        let mut running = self.running.lock().await;

        if let Some(current) = running.as_ref() {
            warn!(address = %current.local_addr, "Server is already running");
            return Ok(current.local_addr);
        }

        let address = self.config.bind_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => {
                error!(address = %address, error = %source, "Failed to start server");
                return Err(ServerError::Bind { address, source });
            }
        };

        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                error!(address = %address, error = %source, "Failed to start server");
                return Err(ServerError::Bind { address, source });
            }
        };

        let cancel = CancellationToken::new();
        let ctx = AcceptContext {
            config: Arc::clone(&self.config),
            router: self.router.clone(),
            stats: Arc::clone(&self.stats),
            cancel: cancel.clone(),
        };
        let accept_task = tokio::spawn(accept_loop(listener, ctx));

        *running = Some(Running {
            cancel,
            accept_task,
            local_addr,
        });

        info!(address = %local_addr, path = %self.config.path, "Server started");
        Ok(local_addr)
    }

    /// Cancels all sessions, waits for the accept loop, and releases the
    /// listener. Logs a warning if the server is not running.
    pub async fn stop(&self) {
        self.shutdown(true).await;
    }

    /// Like [`stop`](Self::stop), but silent when already stopped. Used as
    /// the final teardown by the host.
    pub async fn dispose(&self) {
        self.shutdown(false).await;
    }

    async fn shutdown(&self, warn_if_stopped: bool) {
        // Held until the listener is gone so a concurrent start cannot bind
        // while the old accept loop is still winding down.
        let mut running = self.running.lock().await;

        let Some(current) = running.take() else {
            if warn_if_stopped {
                warn!("Server is not running");
            }
            return;
        };

        current.cancel.cancel();

        match current.accept_task.await {
            Ok(listener) => drop(listener),
            Err(e) => error!(error = %e, "Accept loop ended abnormally"),
        }

        info!(address = %current.local_addr, "Server stopped");
    }
}

impl Drop for WebSocketServer {
    fn drop(&mut self) {
        if let Some(current) = self.running.get_mut().take() {
            current.cancel.cancel();
            current.accept_task.abort();
            debug!(address = %current.local_addr, "Server dropped while running");
        }
    }
}
