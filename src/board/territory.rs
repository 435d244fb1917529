//! Territories: map nodes with an owner and garrisons.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::PlayerId;
use super::unit::UnitStack;

/// Index of a territory within its map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TerritoryId(pub usize);

impl fmt::Display for TerritoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Mutable per-territory state. Name, size and adjacency come from the map
/// and never change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub size: u32,
    /// Changed only through `GameState::set_owner`, which keeps the
    /// players' territory sets in step.
    pub(crate) owner: Option<PlayerId>,
    /// The owner's garrison.
    pub units: UnitStack,
    /// Units stationed here by the owner's allies.
    pub stationed: BTreeMap<PlayerId, UnitStack>,
}

impl Territory {
    /// Creates an unowned, empty territory.
    pub fn new(id: TerritoryId, name: impl Into<String>, size: u32) -> Self {
        Territory {
            id,
            name: name.into(),
            size,
            owner: None,
            units: UnitStack::new(),
            stationed: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Option<PlayerId> {
        self.owner
    }

    /// Units `player` commands here: the garrison for the owner, stationed
    /// units for anyone else.
    pub fn units_of(&self, player: PlayerId) -> UnitStack {
        if self.owner == Some(player) {
            self.units
        } else {
            self.stationed.get(&player).copied().unwrap_or_default()
        }
    }

    /// Mutable access to the stack `player` commands here, creating an
    /// empty stationed stack if needed.
    pub(crate) fn units_of_mut(&mut self, player: PlayerId) -> &mut UnitStack {
        if self.owner == Some(player) {
            &mut self.units
        } else {
            self.stationed.entry(player).or_default()
        }
    }

    /// Drops stationed entries that have become empty.
    pub(crate) fn prune_stationed(&mut self) {
        self.stationed.retain(|_, stack| !stack.is_empty());
    }
}
