//! Command Routing Module
//!
//! This module implements the command layer of StatePort.
//! It receives the text of one WebSocket message, parses it into a
//! command, and produces the single text response for it.
//!
//! ## Architecture
//!
//! ```text
//! Client Message
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Command Parser  │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandRouter   │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Contain      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  InfoRegistry   │  (pluggable handlers)
//! └─────────────────┘
//! ```
//!
//! ## Supported Verbs
//!
//! - `PING`, `HELP`
//! - `INFO:<type>` (e.g. `INFO:TIME`, `INFO:LEVEL:FARMING`)
//! - `COMMAND:<name>` (reserved)

pub mod registry;
pub mod router;

pub use registry::{HandlerError, InfoHandler, InfoRegistry};
pub use router::{CommandRouter, HELP_TEXT, PONG};
