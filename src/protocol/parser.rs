//! Command Parser
//!
//! Turns one complete text message into a [`Command`].
//!
//! ## Grammar
//!
//! ```text
//! message  = verb [ ":" argument ]
//! verb     = any text up to the first ":" (trimmed, case-insensitive)
//! argument = the rest of the message, kept verbatim
//! ```
//!
//! The parser never fails on unknown verbs; routing decides what a verb
//! means. The only parse failure is a message with no content at all.

use crate::protocol::types::{Command, SEPARATOR};
use thiserror::Error;

/// Errors that can occur while parsing a message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The message was empty or only whitespace
    #[error("empty message")]
    EmptyMessage,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses a raw message into a command.
///
/// # Example
///
/// ```
/// use stateport::protocol::parse_command;
///
/// let cmd = parse_command("info:level:farming").unwrap();
/// assert_eq!(cmd.verb, "INFO");
/// assert_eq!(cmd.argument, "level:farming");
/// ```
pub fn parse_command(message: &str) -> ParseResult<Command> {
    if message.trim().is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    let (verb, argument) = message.split_once(SEPARATOR).unwrap_or((message, ""));

    Ok(Command::new(verb, argument))
}
