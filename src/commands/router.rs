//! Command Router
//!
//! This module turns one inbound text message into exactly one
//! [`Response`]. It parses the message, dispatches on the verb, and for
//! `INFO` hands the uppercased key to the registered info handler.
//!
//! ## Supported Verbs
//!
//! - `PING` - Connectivity check, answers `pong`
//! - `HELP` - Static capability summary
//! - `INFO:<type>` - Query application state through the [`InfoRegistry`]
//! - `COMMAND:<name>[:<args>]` - Reserved, always answers
//!   `error:game_commands_not_implemented`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandRouter                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   parse()   │───>│  execute()  │───>│ InfoHandler │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router never fails and never panics outward: parse failures,
//! unknown verbs and handler failures all become `error:*` responses.

use crate::commands::registry::{InfoHandler, InfoRegistry};
use crate::protocol::{parse_command, reason, Command, ParseError, Response};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Response to `PING`.
pub const PONG: &str = "pong";

/// Response to `HELP`.
pub const HELP_TEXT: &str = "available_commands:ping,info:{time|money|name|level|level:skill|health|energy},command:{name}:{args},help";

/// Routes parsed commands to their handlers.
///
/// Cloning is cheap; all clones share one immutable registry.
#[derive(Clone, Debug)]
pub struct CommandRouter {
    info: Arc<InfoRegistry>,
}

impl CommandRouter {
    /// Creates a router over the given info handlers.
    pub fn new(info: InfoRegistry) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    /// The info handlers this router dispatches to.
    pub fn info_registry(&self) -> &InfoRegistry {
        &self.info
    }

    /// Parses and executes one raw message.
    pub fn dispatch(&self, message: &str) -> Response {
        let command = match parse_command(message) {
            Ok(command) => command,
            Err(ParseError::EmptyMessage) => return Response::error(reason::EMPTY_MESSAGE),
        };

        let response = self.execute(&command);
        trace!(verb = %command.verb, response = %response, "Dispatched command");
        response
    }

    /// Executes an already-parsed command.
    pub fn execute(&self, command: &Command) -> Response {
        match command.verb.as_str() {
            "PING" => Response::text(PONG),
            "HELP" => Response::text(HELP_TEXT),
            "INFO" => self.cmd_info(command),
            "COMMAND" => self.cmd_command(command),
            verb => Response::error_with(reason::UNKNOWN_COMMAND, verb),
        }
    }

    /// INFO:<type>
    fn cmd_info(&self, command: &Command) -> Response {
        if !command.has_argument() {
            return Response::error(reason::MISSING_INFO_TYPE);
        }

        let info_type = InfoRegistry::normalize_key(&command.argument);
        match self.info.get(&info_type) {
            Some(handler) => run_handler(&info_type, handler),
            None => Response::error_with(reason::UNKNOWN_INFO_TYPE, info_type),
        }
    }

    /// COMMAND:<name>[:<args>]
    ///
    /// Reserved for game actions; no command set is wired up yet.
    fn cmd_command(&self, command: &Command) -> Response {
        if !command.has_argument() {
            return Response::error(reason::MISSING_COMMAND_NAME);
        }

        Response::error(reason::COMMANDS_NOT_IMPLEMENTED)
    }
}

/// Runs an info handler, converting failures and panics into error
/// responses.
fn run_handler(key: &str, handler: &InfoHandler) -> Response {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(key))) {
        Ok(Ok(payload)) => Response::text(payload),
        Ok(Err(e)) => {
            debug!(info_type = %key, error = %e, "Info handler failed");
            Response::error(e)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(info_type = %key, error = %message, "Info handler panicked");
            Response::error(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "internal_error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::HandlerError;

    fn create_router() -> CommandRouter {
        let registry = InfoRegistry::new()
            .with("TIME", |_| Ok("time:650".to_string()))
            .with("MONEY", |_| Ok("money:1200".to_string()))
            .with("LEVEL:FARMING", |key| Ok(format!("level:farming:3 ({})", key)))
            .with("HEALTH", |_| Err(HandlerError::WorldNotReady))
            .with("BROKEN", |_| Err(HandlerError::failed("sensor offline")))
            .with("PANICS", |_| panic!("handler exploded"));
        CommandRouter::new(registry)
    }

    #[test]
    fn test_ping() {
        let router = create_router();
        assert_eq!(router.dispatch("ping"), "pong");
        assert_eq!(router.dispatch("PING"), "pong");
        assert_eq!(router.dispatch("  PiNg  "), "pong");
        assert_eq!(router.dispatch("ping:ignored:argument"), "pong");
    }

    #[test]
    fn test_help() {
        let router = create_router();
        assert_eq!(router.dispatch("help"), HELP_TEXT);
        assert_eq!(router.dispatch("HELP:anything"), HELP_TEXT);
    }

    #[test]
    fn test_empty_message() {
        let router = create_router();
        assert_eq!(router.dispatch(""), "error:empty_message");
        assert_eq!(router.dispatch("   "), "error:empty_message");
    }

    #[test]
    fn test_info_missing_type() {
        let router = create_router();
        assert_eq!(router.dispatch("info"), "error:missing_info_type");
        assert_eq!(router.dispatch("info:"), "error:missing_info_type");
        assert_eq!(router.dispatch("info:   "), "error:missing_info_type");
    }

    #[test]
    fn test_info_unknown_type() {
        let router = create_router();
        assert_eq!(router.dispatch("info:bogus"), "error:unknown_info_type:BOGUS");
        assert_eq!(
            router.dispatch("info:level:unknown"),
            "error:unknown_info_type:LEVEL:UNKNOWN"
        );
    }

    #[test]
    fn test_info_dispatch() {
        let router = create_router();
        assert_eq!(router.dispatch("info:time"), "time:650");
        assert_eq!(router.dispatch("INFO: Money "), "money:1200");
    }

    #[test]
    fn test_info_composite_key() {
        let router = create_router();
        assert_eq!(
            router.dispatch("info:level:farming"),
            "level:farming:3 (LEVEL:FARMING)"
        );
    }

    #[test]
    fn test_info_handler_errors() {
        let router = create_router();
        assert_eq!(router.dispatch("info:health"), "error:world_not_ready");
        assert_eq!(router.dispatch("info:broken"), "error:sensor offline");
    }

    #[test]
    fn test_info_handler_panic_is_contained() {
        let router = create_router();
        assert_eq!(router.dispatch("info:panics"), "error:handler exploded");
        // The router is still usable afterwards
        assert_eq!(router.dispatch("ping"), "pong");
    }

    #[test]
    fn test_command_verb() {
        let router = create_router();
        assert_eq!(router.dispatch("command"), "error:missing_command_name");
        assert_eq!(router.dispatch("command:"), "error:missing_command_name");
        assert_eq!(
            router.dispatch("command:anything"),
            "error:game_commands_not_implemented"
        );
        assert_eq!(
            router.dispatch("COMMAND:warp:farm;10;12"),
            "error:game_commands_not_implemented"
        );
    }

    #[test]
    fn test_unknown_command() {
        let router = create_router();
        assert_eq!(router.dispatch("foo"), "error:unknown_command:FOO");
        assert_eq!(router.dispatch("foo:bar"), "error:unknown_command:FOO");
        assert_eq!(router.dispatch(":time"), "error:unknown_command:");
    }

    #[test]
    fn test_every_message_gets_one_response() {
        let router = create_router();
        let inputs = [
            "", ":", "::", "info::", "\u{0}", "ping\n", "héllo", "command: ", "info:\t",
        ];
        for input in inputs {
            let response = router.dispatch(input);
            assert!(!response.as_str().is_empty(), "input {:?}", input);
        }
    }

    #[test]
    fn test_empty_registry() {
        let router = CommandRouter::new(InfoRegistry::new());
        assert_eq!(router.dispatch("info:time"), "error:unknown_info_type:TIME");
        assert!(router.info_registry().is_empty());
    }
}
