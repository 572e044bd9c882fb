//! # StatePort - Live Application State over WebSocket
//!
//! StatePort is an embeddable WebSocket server that lets external tools
//! query a running application. Clients send short text commands and get
//! short text responses back, one response per command.
//!
//! ## Features
//!
//! - **Tiny text protocol**: `VERB[:ARGUMENT]` in, `category:payload` or
//!   `error:reason` out
//! - **Pluggable info handlers**: `INFO` queries are routed to functions
//!   registered once at startup
//! - **Clean lifecycle**: idempotent start/stop, one cancellation token for
//!   the accept loop and every session
//! - **Async I/O**: Built on Tokio, one lightweight task per client
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              StatePort                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ WebSocket   │───>│ Connection  │───>│  Command    │                  │
//! │  │ Server      │    │  Session    │    │  Router     │                  │
//! │  └──────┬──────┘    └─────────────┘    └──────┬──────┘                  │
//! │         │                                     │                         │
//! │         ▼                                     ▼                         │
//! │  ┌─────────────┐                       ┌──────────────────────────────┐ │
//! │  │ Accept loop │                       │        InfoRegistry          │ │
//! │  │ + Upgrade   │                       │  TIME  MONEY  LEVEL:FARMING  │ │
//! │  └─────────────┘                       └──────────────┬───────────────┘ │
//! │                                                       │                 │
//! │                                        ┌──────────────┴───────────────┐ │
//! │                                        │   WorldState (host writes)   │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use stateport::commands::CommandRouter;
//! use stateport::server::{ServerConfig, WebSocketServer};
//! use stateport::world::{world_info_registry, WorldSnapshot, WorldState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     // State the host keeps up to date
//!     let world = Arc::new(WorldState::new());
//!
//!     // Route INFO queries to it
//!     let router = CommandRouter::new(world_info_registry(Arc::clone(&world)));
//!     let server = WebSocketServer::new(ServerConfig::default(), router);
//!
//!     // Session loaded: publish state and start serving
//!     world.load(WorldSnapshot::default());
//!     let _ = server.start().await;
//!
//!     // ... later, session ended
//!     server.stop().await;
//!     world.unload();
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING` → `pong`
//! - `HELP` → capability summary
//! - `INFO:<type>` → e.g. `INFO:TIME` → `time:650`
//! - `COMMAND:<name>` → reserved, `error:game_commands_not_implemented`
//!
//! ## Module Overview
//!
//! - [`protocol`]: command grammar, responses, upgrade request parsing
//! - [`commands`]: command router and info handler registry
//! - [`connection`]: per-client session loop
//! - [`server`]: configuration, accept loop, start/stop lifecycle
//! - [`world`]: application state and the info handlers that read it

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod world;

// Re-export commonly used types for convenience
pub use commands::{CommandRouter, HandlerError, InfoRegistry};
pub use connection::{ConnectionSession, ConnectionStats};
pub use protocol::{parse_command, Command, ParseError, Response};
pub use server::{ServerConfig, ServerError, ServerState, WebSocketServer};
pub use world::{WorldSnapshot, WorldState};

pub use server::config::{DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT};

/// Version of StatePort
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
