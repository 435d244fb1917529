//! Client protocol handling.
//!
//! Parses order and placement lines from clients and produces the map
//! snapshots sent back to them.

pub mod parser;
pub mod snapshot;

pub use parser::{parse_instruction, parse_placement, Instruction, ParseError};
pub use snapshot::{MapSnapshot, PlayerSnapshot, TerritorySnapshot};
