//! Text Protocol Implementation
//!
//! This module implements both layers of the StatePort wire protocol.
//!
//! ## Overview
//!
//! A session starts with an HTTP/1.1 upgrade request. Once upgraded, each
//! WebSocket text message carries one command of the form `VERB[:ARGUMENT]`
//! and receives exactly one text response, either `category:payload` or
//! `error:reason`.
//!
//! ## Modules
//!
//! - `types`: `Command` and `Response`
//! - `parser`: message to `Command` parsing
//! - `upgrade`: incremental parsing and validation of the upgrade request head
//!
//! ## Example
//!
//! ```
//! use stateport::protocol::{parse_command, Response};
//!
//! let cmd = parse_command("info:time").unwrap();
//! assert_eq!(cmd.verb, "INFO");
//!
//! let response = Response::ok("time", 650);
//! assert_eq!(response.as_str(), "time:650");
//! ```

pub mod parser;
pub mod types;
pub mod upgrade;

// Re-export commonly used types for convenience
pub use parser::{parse_command, ParseError, ParseResult};
pub use types::{reason, Command, Response};
pub use upgrade::{accept_response, parse_request_head, UpgradeError};
