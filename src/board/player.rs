//! Players and their resources.
//!
//! A player owns territories, spends food and tech, and advances through a
//! small tech-upgrade state machine whose effect lands one settlement later.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::territory::TerritoryId;
use super::unit::STARTING_TECH_LEVEL;

/// Stable player identifier; also the player's index in the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Deferred tech-level transition.
///
/// `Upgrading` is entered when a tech upgrade is paid for and left at the
/// next settlement, which is the only place the level changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TechProgress {
    #[default]
    Stable,
    Upgrading {
        to: u8,
    },
}

/// A participant in the game.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub alive: bool,
    /// Cleared once the player's client disconnects or times out.
    pub connected: bool,
    food: u32,
    tech: u32,
    max_tech_level: u8,
    tech_progress: TechProgress,
    pub(crate) territories: BTreeSet<TerritoryId>,
    pub(crate) allies: BTreeSet<PlayerId>,
}

impl Player {
    /// Creates a live, connected player with no territories.
    pub fn new(id: PlayerId, name: impl Into<String>, food: u32, tech: u32) -> Self {
        Player {
            id,
            name: name.into(),
            alive: true,
            connected: true,
            food,
            tech,
            max_tech_level: STARTING_TECH_LEVEL,
            tech_progress: TechProgress::Stable,
            territories: BTreeSet::new(),
            allies: BTreeSet::new(),
        }
    }

    pub fn food(&self) -> u32 {
        self.food
    }

    pub fn tech(&self) -> u32 {
        self.tech
    }

    pub fn max_tech_level(&self) -> u8 {
        self.max_tech_level
    }

    pub fn tech_progress(&self) -> TechProgress {
        self.tech_progress
    }

    /// Territories this player owns, in id order.
    pub fn territories(&self) -> &BTreeSet<TerritoryId> {
        &self.territories
    }

    pub fn allies(&self) -> &BTreeSet<PlayerId> {
        &self.allies
    }

    pub fn is_allied_with(&self, other: PlayerId) -> bool {
        self.allies.contains(&other)
    }

    /// Deducts food if enough is available. Check and decrement happen
    /// together; on failure nothing changes.
    pub fn spend_food(&mut self, amount: u32) -> bool {
        match self.food.checked_sub(amount) {
            Some(rest) => {
                self.food = rest;
                true
            }
            None => false,
        }
    }

    /// Deducts tech if enough is available; on failure nothing changes.
    pub fn spend_tech(&mut self, amount: u32) -> bool {
        match self.tech.checked_sub(amount) {
            Some(rest) => {
                self.tech = rest;
                true
            }
            None => false,
        }
    }

    /// Adds production to both resource counters.
    pub fn earn(&mut self, food: u32, tech: u32) {
        self.food = self.food.saturating_add(food);
        self.tech = self.tech.saturating_add(tech);
    }

    /// Records a paid tech upgrade to `to`. Returns false if one is
    /// already pending this round.
    pub fn begin_tech_upgrade(&mut self, to: u8) -> bool {
        if self.tech_progress != TechProgress::Stable {
            return false;
        }
        self.tech_progress = TechProgress::Upgrading { to };
        true
    }

    /// Applies a pending tech upgrade, returning the new level if one landed.
    pub fn finish_tech_upgrade(&mut self) -> Option<u8> {
        match self.tech_progress {
            TechProgress::Stable => None,
            TechProgress::Upgrading { to } => {
                self.max_tech_level = self.max_tech_level.max(to);
                self.tech_progress = TechProgress::Stable;
                Some(self.max_tech_level)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_player_starts_at_base_tech_level() {
        let p = Player::new(PlayerId(0), "alice", 10, 20);
        assert!(p.alive);
        assert!(p.connected);
        assert_eq!(p.food(), 10);
        assert_eq!(p.tech(), 20);
        assert_eq!(p.max_tech_level(), STARTING_TECH_LEVEL);
        assert_eq!(p.tech_progress(), TechProgress::Stable);
    }

    #[test]
    fn spend_is_all_or_nothing() {
        let mut p = Player::new(PlayerId(0), "alice", 5, 5);
        assert!(!p.spend_food(6));
        assert_eq!(p.food(), 5);
        assert!(p.spend_food(5));
        assert_eq!(p.food(), 0);
        assert!(!p.spend_tech(9));
        assert!(p.spend_tech(2));
        assert_eq!(p.tech(), 3);
    }

    #[test]
    fn tech_upgrade_waits_for_finish() {
        let mut p = Player::new(PlayerId(0), "alice", 0, 0);
        assert!(p.begin_tech_upgrade(2));
        assert_eq!(p.max_tech_level(), 1);
        assert!(!p.begin_tech_upgrade(2));
        assert_eq!(p.finish_tech_upgrade(), Some(2));
        assert_eq!(p.max_tech_level(), 2);
        assert_eq!(p.finish_tech_upgrade(), None);
    }

    #[test]
    fn earn_saturates() {
        let mut p = Player::new(PlayerId(1), "bob", u32::MAX - 1, 0);
        p.earn(5, 7);
        assert_eq!(p.food(), u32::MAX);
        assert_eq!(p.tech(), 7);
    }
}
