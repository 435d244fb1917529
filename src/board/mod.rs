//! World representation.
//!
//! Contains the map graph, territories, players, orders, unit tables and
//! the session state that ties them together.

pub mod map;
pub mod order;
pub mod player;
pub mod state;
pub mod territory;
pub mod unit;

pub use map::{Map, MapError};
pub use order::{Order, OrderKind, STAGES};
pub use player::{Player, PlayerId, TechProgress};
pub use state::GameState;
pub use territory::{Territory, TerritoryId};
pub use unit::{
    combat_bonus, tech_upgrade_cost, upgrade_cost, UnitStack, COMBAT_BONUS,
    CUMULATIVE_UPGRADE_COST, LEVEL_COUNT, MAX_LEVEL, STARTING_TECH_LEVEL,
};
