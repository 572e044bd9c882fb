//! Info Handler Registry
//!
//! The `INFO` verb is answered by pluggable handlers. Each handler is a
//! plain function from the uppercased info key to a formatted response
//! payload, registered once before the server starts and shared read-only
//! by every connection afterwards.
//!
//! Keys may be composite (`LEVEL:FARMING`); the registry matches the whole
//! key exactly and does no prefix matching.
//!
//! ## Example
//!
//! ```
//! use stateport::commands::{HandlerError, InfoRegistry};
//!
//! let registry = InfoRegistry::new()
//!     .with("TIME", |_| Ok("time:650".to_string()))
//!     .with("money", |_| Err(HandlerError::WorldNotReady));
//!
//! assert!(registry.contains("MONEY"));
//! assert_eq!(registry.handle("TIME"), Some(Ok("time:650".to_string())));
//! ```

use crate::protocol::reason;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors an info handler can report.
///
/// The router turns these into `error:{message}` responses; they never
/// close the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The application state the handler reads is not available yet
    #[error("{}", reason::WORLD_NOT_READY)]
    WorldNotReady,

    /// Any other handler failure
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// A registered info handler. Receives the uppercased info key.
pub type InfoHandler = Arc<dyn Fn(&str) -> Result<String, HandlerError> + Send + Sync>;

/// Maps uppercased info keys to their handlers.
#[derive(Clone, Default)]
pub struct InfoRegistry {
    handlers: HashMap<String, InfoHandler>,
}

impl InfoRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes a key the same way the router normalizes requests.
    pub fn normalize_key(key: &str) -> String {
        key.trim().to_uppercase()
    }

    /// Registers a handler, replacing any handler already bound to the key.
    pub fn register<F>(&mut self, key: &str, handler: F) -> &mut Self
    where
        F: Fn(&str) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .insert(Self::normalize_key(key), Arc::new(handler));
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<F>(mut self, key: &str, handler: F) -> Self
    where
        F: Fn(&str) -> Result<String, HandlerError> + Send + Sync + 'static,
    {
        self.register(key, handler);
        self
    }

    /// Looks up the handler for an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&InfoHandler> {
        self.handlers.get(key)
    }

    /// Runs the handler for `key`, or returns `None` if none is registered.
    pub fn handle(&self, key: &str) -> Option<Result<String, HandlerError>> {
        self.get(key).map(|handler| handler(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for InfoRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfoRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
