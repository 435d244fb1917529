//! Order resolution.
//!
//! Executes a round's orders in fixed stages, fights attacks with the
//! combat resolver, and settles production and reinforcement at the end of
//! the turn.

pub mod combat;
pub mod executor;
pub mod movement;
pub mod settlement;

pub use combat::{fight, resolve_attack, Casualties, CombatReport, Dice, Group, RngDice, ScriptedDice};
pub use executor::{execute_orders, OrderResult, RejectReason, ResolvedOrder, RoundReport};
pub use movement::{move_cost, path_cost};
pub use settlement::{settle, Settlement};
