//! Live Application State
//!
//! The host writes a [`WorldSnapshot`] into a shared [`WorldState`] while a
//! session is loaded; info handlers read it from any connection task.
//! Before the first load (and after an unload) every read fails with
//! [`WorldError::NotReady`].

use std::sync::RwLock;
use thiserror::Error;

/// Errors when reading the world.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    /// No session is loaded
    #[error("world not ready")]
    NotReady,

    /// A writer panicked while holding the lock
    #[error("world state unavailable")]
    Poisoned,
}

/// A trainable skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Farming,
    Fishing,
    Foraging,
    Mining,
    Combat,
}

impl Skill {
    pub const ALL: [Skill; 5] = [
        Skill::Farming,
        Skill::Fishing,
        Skill::Foraging,
        Skill::Mining,
        Skill::Combat,
    ];

    /// Lowercase name used in responses.
    pub fn name(self) -> &'static str {
        match self {
            Skill::Farming => "farming",
            Skill::Fishing => "fishing",
            Skill::Foraging => "foraging",
            Skill::Mining => "mining",
            Skill::Combat => "combat",
        }
    }
}

/// Level per skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkillLevels {
    pub farming: u32,
    pub fishing: u32,
    pub foraging: u32,
    pub mining: u32,
    pub combat: u32,
}

impl SkillLevels {
    pub fn get(&self, skill: Skill) -> u32 {
        match skill {
            Skill::Farming => self.farming,
            Skill::Fishing => self.fishing,
            Skill::Foraging => self.foraging,
            Skill::Mining => self.mining,
            Skill::Combat => self.combat,
        }
    }

    pub fn set(&mut self, skill: Skill, level: u32) {
        match skill {
            Skill::Farming => self.farming = level,
            Skill::Fishing => self.fishing = level,
            Skill::Foraging => self.foraging = level,
            Skill::Mining => self.mining = level,
            Skill::Combat => self.combat = level,
        }
    }
}

/// Everything the info handlers can report.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    /// Clock time as `HHMM` (600 = 6:00 am, 2600 = 2:00 am)
    pub time_of_day: u32,
    pub money: u64,
    pub name: String,
    pub skills: SkillLevels,
    pub health: i32,
    pub max_health: i32,
    pub stamina: f32,
    pub max_stamina: i32,
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            time_of_day: 600,
            money: 500,
            name: "Farmer".to_string(),
            skills: SkillLevels::default(),
            health: 100,
            max_health: 100,
            stamina: 270.0,
            max_stamina: 270,
        }
    }
}

/// Latest clock time before the day ends.
pub const END_OF_DAY: u32 = 2600;

impl WorldSnapshot {
    /// Moves the clock forward by `minutes`, stopping at [`END_OF_DAY`].
    pub fn advance_clock(&mut self, minutes: u32) {
        let total = (self.time_of_day / 100) * 60 + self.time_of_day % 100 + minutes;
        self.time_of_day = ((total / 60) * 100 + total % 60).min(END_OF_DAY);
    }
}

/// Shared holder of the current snapshot.
#[derive(Debug, Default)]
pub struct WorldState {
    snapshot: RwLock<Option<WorldSnapshot>>,
}

impl WorldState {
    /// Creates an empty (not ready) world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a world that is already loaded.
    pub fn loaded(snapshot: WorldSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(Some(snapshot)),
        }
    }

    /// Replaces the snapshot; the world becomes ready.
    pub fn load(&self, snapshot: WorldSnapshot) {
        // A whole-value replace is safe even after a writer panicked.
        let mut guard = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(snapshot);
        self.snapshot.clear_poison();
    }

    /// Drops the snapshot; the world is no longer ready.
    pub fn unload(&self) {
        let mut guard = self.snapshot.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
        self.snapshot.clear_poison();
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.snapshot.read(), Ok(guard) if guard.is_some())
    }

    /// Reads from the current snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&WorldSnapshot) -> R) -> Result<R, WorldError> {
        let guard = self.snapshot.read().map_err(|_| WorldError::Poisoned)?;
        guard.as_ref().map(f).ok_or(WorldError::NotReady)
    }

    /// Mutates the current snapshot in place.
    pub fn update(&self, f: impl FnOnce(&mut WorldSnapshot)) -> Result<(), WorldError> {
        let mut guard = self.snapshot.write().map_err(|_| WorldError::Poisoned)?;
        guard.as_mut().map(f).ok_or(WorldError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_not_ready_until_loaded() {
        let world = WorldState::new();
        assert!(!world.is_ready());
        assert_eq!(world.read(|s| s.money), Err(WorldError::NotReady));
        assert_eq!(world.update(|s| s.money = 1), Err(WorldError::NotReady));

        world.load(WorldSnapshot::default());
        assert!(world.is_ready());
        assert_eq!(world.read(|s| s.money), Ok(500));
    }

    #[test]
    fn test_update_and_unload() {
        let world = WorldState::loaded(WorldSnapshot::default());

        world.update(|s| s.skills.set(Skill::Mining, 4)).unwrap();
        assert_eq!(world.read(|s| s.skills.get(Skill::Mining)), Ok(4));

        world.unload();
        assert!(!world.is_ready());
    }

    #[test]
    fn test_poisoned_lock() {
        let world = Arc::new(WorldState::loaded(WorldSnapshot::default()));

        let writer = Arc::clone(&world);
        let result = std::thread::spawn(move || {
            let _ = writer.update(|_| panic!("writer failed"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(world.read(|s| s.money), Err(WorldError::Poisoned));

        // Loading a fresh snapshot recovers
        world.load(WorldSnapshot::default());
        assert_eq!(world.read(|s| s.money), Ok(500));
    }

    #[test]
    fn test_advance_clock() {
        let mut snapshot = WorldSnapshot::default();
        snapshot.advance_clock(10);
        assert_eq!(snapshot.time_of_day, 610);

        snapshot.time_of_day = 1250;
        snapshot.advance_clock(10);
        assert_eq!(snapshot.time_of_day, 1300);

        snapshot.time_of_day = 2550;
        snapshot.advance_clock(30);
        assert_eq!(snapshot.time_of_day, END_OF_DAY);
    }

    #[test]
    fn test_skill_names() {
        let names: Vec<&str> = Skill::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["farming", "fishing", "foraging", "mining", "combat"]);
    }
}
