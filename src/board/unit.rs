//! Unit levels and the fixed per-level tables.
//!
//! A unit is identified only by its level. Each level carries a combat
//! bonus and a cumulative upgrade cost; players unlock higher levels by
//! raising their tech level.

/// Number of distinct unit levels (0 through 6).
pub const LEVEL_COUNT: usize = 7;

/// Highest unit level, which is also the highest reachable tech level.
pub const MAX_LEVEL: u8 = 6;

/// Tech level every player starts with.
pub const STARTING_TECH_LEVEL: u8 = 1;

/// Combat bonus added to each d20 roll, indexed by unit level.
pub const COMBAT_BONUS: [u32; LEVEL_COUNT] = [0, 1, 3, 5, 8, 11, 15];

/// Total tech needed to raise one level-0 unit to each level.
pub const CUMULATIVE_UPGRADE_COST: [u32; LEVEL_COUNT] = [0, 3, 11, 30, 55, 90, 140];

/// Tech cost of raising the max tech level, indexed by the current level.
const TECH_UPGRADE_COST: [Option<u32>; LEVEL_COUNT] =
    [None, Some(50), Some(75), Some(125), Some(200), Some(300), None];

/// Returns true if `level` names an existing unit level.
pub const fn is_valid_level(level: u8) -> bool {
    (level as usize) < LEVEL_COUNT
}

/// Returns the combat bonus for a level, or 0 for an unknown level.
pub const fn combat_bonus(level: u8) -> u32 {
    if is_valid_level(level) {
        COMBAT_BONUS[level as usize]
    } else {
        0
    }
}

/// Tech cost of upgrading `count` units from `from` to `to`.
///
/// Returns `None` for downgrades, same-level upgrades, unknown levels, or
/// a total that overflows.
pub fn upgrade_cost(from: u8, to: u8, count: u32) -> Option<u32> {
    if !is_valid_level(from) || !is_valid_level(to) || to <= from {
        return None;
    }
    let per_unit = CUMULATIVE_UPGRADE_COST[to as usize] - CUMULATIVE_UPGRADE_COST[from as usize];
    per_unit.checked_mul(count)
}

/// Tech cost of raising the max tech level by one from `current`.
///
/// Returns `None` once the ceiling is reached.
pub fn tech_upgrade_cost(current: u8) -> Option<u32> {
    TECH_UPGRADE_COST.get(current as usize).copied().flatten()
}

/// Per-level unit counts held by one player in one territory.
///
/// Uses a fixed-size array indexed by level, so copies are cheap and
/// counts can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnitStack([u32; LEVEL_COUNT]);

impl UnitStack {
    /// Creates an empty stack.
    pub const fn new() -> Self {
        UnitStack([0; LEVEL_COUNT])
    }

    /// Creates a stack holding `count` units of a single level.
    pub fn of(level: u8, count: u32) -> Self {
        let mut stack = UnitStack::new();
        stack.add(level, count);
        stack
    }

    /// Number of units at `level`; 0 for unknown levels.
    pub fn count(&self, level: u8) -> u32 {
        self.0.get(level as usize).copied().unwrap_or(0)
    }

    /// Adds units at `level`. Unknown levels are ignored.
    pub fn add(&mut self, level: u8, count: u32) {
        if let Some(slot) = self.0.get_mut(level as usize) {
            *slot = slot.saturating_add(count);
        }
    }

    /// Removes units at `level`. Returns false, leaving the stack
    /// untouched, if fewer than `count` are present.
    pub fn remove(&mut self, level: u8, count: u32) -> bool {
        match self.0.get_mut(level as usize) {
            Some(slot) if *slot >= count => {
                *slot -= count;
                true
            }
            _ => false,
        }
    }

    /// Total units across all levels.
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&c| c == 0)
    }

    /// Adds every unit of `other` into this stack.
    pub fn merge(&mut self, other: &UnitStack) {
        for (level, count) in other.levels() {
            self.add(level, count);
        }
    }

    /// Iterates over `(level, count)` pairs with a nonzero count, lowest level first.
    pub fn levels(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(level, &c)| (level as u8, c))
    }

    /// Highest level with at least one unit.
    pub fn highest_level(&self) -> Option<u8> {
        self.levels().last().map(|(level, _)| level)
    }
}
