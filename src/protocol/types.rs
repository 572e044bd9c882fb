//! Command and Response Types
//!
//! This module defines the two halves of the text protocol:
//! a [`Command`] parsed from an inbound message and the [`Response`]
//! string sent back on the same connection.
//!
//! ## Message Format
//!
//! ```text
//! VERB[:ARGUMENT]
//! ```
//!
//! Only the first `:` separates the verb from the argument, so the argument
//! may itself contain colons (`info:level:farming`).
//!
//! ## Response Format
//!
//! - Success: `category:payload` (`pong`, `time:650`, `money:1200`)
//! - Failure: `error:reason` where `reason` may be colon-qualified
//!   (`error:unknown_command:FOO`)

use std::fmt;

/// The separator between a verb and its argument, and between the parts
/// of a response.
pub const SEPARATOR: char = ':';

/// Prefix carried by every failure response.
pub const ERROR_CATEGORY: &str = "error";

/// Well-known failure reasons.
pub mod reason {
    pub const EMPTY_MESSAGE: &str = "empty_message";
    pub const MISSING_INFO_TYPE: &str = "missing_info_type";
    pub const UNKNOWN_INFO_TYPE: &str = "unknown_info_type";
    pub const MISSING_COMMAND_NAME: &str = "missing_command_name";
    pub const COMMANDS_NOT_IMPLEMENTED: &str = "game_commands_not_implemented";
    pub const UNKNOWN_COMMAND: &str = "unknown_command";
    pub const WORLD_NOT_READY: &str = "world_not_ready";
}

/// A parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Trimmed, uppercased token before the first separator
    pub verb: String,

    /// Raw remainder after the first separator (possibly empty)
    pub argument: String,
}

impl Command {
    /// Creates a command, normalizing the verb.
    pub fn new(verb: &str, argument: impl Into<String>) -> Self {
        Self {
            verb: verb.trim().to_uppercase(),
            argument: argument.into(),
        }
    }

    /// Returns true if the argument is empty or only whitespace.
    pub fn has_argument(&self) -> bool {
        !self.argument.trim().is_empty()
    }
}

/// A single text response.
///
/// Exactly one response is produced for every text message a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Response(String);

impl Response {
    /// Creates a response from pre-formatted text.
    pub fn text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Creates a `category:payload` success response.
    pub fn ok(category: &str, payload: impl fmt::Display) -> Self {
        Self(format!("{}{}{}", category, SEPARATOR, payload))
    }

    /// Creates an `error:reason` failure response.
    pub fn error(reason: impl fmt::Display) -> Self {
        Self(format!("{}{}{}", ERROR_CATEGORY, SEPARATOR, reason))
    }

    /// Creates an `error:reason:detail` failure response.
    pub fn error_with(reason: &str, detail: impl fmt::Display) -> Self {
        Self(format!(
            "{}{}{}{}{}",
            ERROR_CATEGORY, SEPARATOR, reason, SEPARATOR, detail
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl PartialEq<&str> for Response {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
