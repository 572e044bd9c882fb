//! Server Module
//!
//! The listener side of StatePort: configuration, the accept loop with its
//! upgrade handshake, and the start/stop lifecycle that ties them together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      WebSocketServer                         │
//! │                                                              │
//! │   TcpListener ──> accept_loop ──spawn──> serve_connection    │
//! │        ▲               │                       │             │
//! │        └── returned ───┘             upgrade + session       │
//! │            on stop                                           │
//! │                                                              │
//! │   CancellationToken ─────────────> accept loop, every session│
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod accept;
pub mod config;
pub mod lifecycle;

pub use accept::upgrade;
pub use config::{ConfigError, ServerConfig};
pub use lifecycle::{ServerState, WebSocketServer};

/// Errors reported by the server lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
