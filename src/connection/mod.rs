//! Connection Session Module
//!
//! This module manages individual upgraded client connections.
//! Each client connection is handled by its own async task, allowing
//! many clients to query the application concurrently.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Accept Loop + Handshake                     │
//! │                    (server module)                          │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ upgrade
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionSession                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read frame  │───>│ Route text  │───>│ Send resp   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Ordered replies**: One command at a time per connection
//! - **Cooperative shutdown**: Every wait observes a shared cancellation token
//! - **Statistics**: Tracks connection and message metrics

pub mod session;
pub mod stats;

// Re-export commonly used types
pub use session::{
    handle_connection, ConnectionError, ConnectionSession, SessionEnd, SessionState,
};
pub use stats::{ConnectionStats, StatsSnapshot};
