//! World Info Handlers
//!
//! Registers the `INFO` keys answered from a [`WorldState`]:
//!
//! | Key                | Response                                              |
//! |--------------------|-------------------------------------------------------|
//! | `TIME`             | `time:650`                                            |
//! | `MONEY`            | `money:1200`                                          |
//! | `NAME`             | `name:Robin`                                          |
//! | `LEVEL`            | `level:farming:3,fishing:1,foraging:0,mining:2,combat:0` |
//! | `LEVEL:<SKILL>`    | `level:farming:3`                                     |
//! | `HEALTH`           | `health:80/100`                                       |
//! | `ENERGY`           | `energy:212.5/270`                                    |
//!
//! Every key answers `error:world_not_ready` while no snapshot is loaded.

use crate::commands::{HandlerError, InfoRegistry};
use crate::protocol::Response;
use crate::world::state::{Skill, WorldError, WorldState};
use std::sync::Arc;

impl From<WorldError> for HandlerError {
    fn from(e: WorldError) -> Self {
        match e {
            WorldError::NotReady => HandlerError::WorldNotReady,
            WorldError::Poisoned => HandlerError::failed("world_state_unavailable"),
        }
    }
}

/// Adds the world info handlers to `registry`.
pub fn register_world_info(registry: &mut InfoRegistry, world: Arc<WorldState>) {
    let w = Arc::clone(&world);
    registry.register("TIME", move |_| {
        Ok(w.read(|s| Response::ok("time", s.time_of_day).into_string())?)
    });

    let w = Arc::clone(&world);
    registry.register("MONEY", move |_| {
        Ok(w.read(|s| Response::ok("money", s.money).into_string())?)
    });

    let w = Arc::clone(&world);
    registry.register("NAME", move |_| {
        Ok(w.read(|s| Response::ok("name", &s.name).into_string())?)
    });

    let w = Arc::clone(&world);
    registry.register("LEVEL", move |_| {
        Ok(w.read(|s| {
            let levels: Vec<String> = Skill::ALL
                .iter()
                .map(|&skill| format!("{}:{}", skill.name(), s.skills.get(skill)))
                .collect();
            Response::ok("level", levels.join(",")).into_string()
        })?)
    });

    for skill in Skill::ALL {
        let w = Arc::clone(&world);
        let key = format!("LEVEL:{}", skill.name());
        registry.register(&key, move |_| {
            Ok(w.read(|s| {
                Response::ok("level", format!("{}:{}", skill.name(), s.skills.get(skill)))
                    .into_string()
            })?)
        });
    }

    let w = Arc::clone(&world);
    registry.register("HEALTH", move |_| {
        Ok(w.read(|s| {
            Response::ok("health", format!("{}/{}", s.health, s.max_health)).into_string()
        })?)
    });

    registry.register("ENERGY", move |_| {
        Ok(world.read(|s| {
            Response::ok("energy", format!("{}/{}", s.stamina, s.max_stamina)).into_string()
        })?)
    });
}

/// Creates a registry holding only the world info handlers.
pub fn world_info_registry(world: Arc<WorldState>) -> InfoRegistry {
    let mut registry = InfoRegistry::new();
    register_world_info(&mut registry, world);
    registry
}
