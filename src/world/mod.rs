//! Application State Module
//!
//! The information source behind `INFO` queries. The host process loads a
//! [`WorldSnapshot`] when a session starts, keeps it current, and unloads it
//! when the session ends; the handlers registered by
//! [`register_world_info`] read it concurrently from every connection.
//!
//! ## Example
//!
//! ```
//! use stateport::commands::CommandRouter;
//! use stateport::world::{world_info_registry, WorldSnapshot, WorldState};
//! use std::sync::Arc;
//!
//! let world = Arc::new(WorldState::new());
//! let router = CommandRouter::new(world_info_registry(Arc::clone(&world)));
//!
//! assert_eq!(router.dispatch("info:time").as_str(), "error:world_not_ready");
//!
//! world.load(WorldSnapshot::default());
//! assert_eq!(router.dispatch("info:time").as_str(), "time:600");
//! ```

pub mod info;
pub mod state;

pub use info::{register_world_info, world_info_registry};
pub use state::{Skill, SkillLevels, WorldError, WorldSnapshot, WorldState};
