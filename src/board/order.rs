//! Order types issued by players each round.
//!
//! Orders reference territories and players by name exactly as the client
//! typed them; names are resolved only when the order executes, so an
//! order naming something unknown is accepted here and dropped later.
//! `Display` renders the textual command grammar.

use std::fmt;

use super::player::PlayerId;

/// The five order categories, listed in execution stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Move,
    Attack,
    Alliance,
    UpgradeUnit,
    TechUpgrade,
}

/// Fixed order in which the executor runs each category.
pub const STAGES: [OrderKind; 5] = [
    OrderKind::Move,
    OrderKind::Attack,
    OrderKind::Alliance,
    OrderKind::UpgradeUnit,
    OrderKind::TechUpgrade,
];

/// A single player order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Order {
    /// Move: `M <source> <dest> <level> <count>`
    Move {
        player: PlayerId,
        source: String,
        dest: String,
        level: u8,
        count: u32,
    },

    /// Attack: `A <source> <dest> <level> <count>`
    Attack {
        player: PlayerId,
        source: String,
        dest: String,
        level: u8,
        count: u32,
    },

    /// Unit upgrade: `U <territory> <from> <to> <count>`
    UpgradeUnit {
        player: PlayerId,
        territory: String,
        from_level: u8,
        to_level: u8,
        count: u32,
    },

    /// Tech level upgrade: `T`
    TechUpgrade { player: PlayerId },

    /// Alliance request: `FA <player name>`
    Alliance { player: PlayerId, target: String },
}

impl Order {
    /// The player who issued this order.
    pub fn player(&self) -> PlayerId {
        match self {
            Order::Move { player, .. }
            | Order::Attack { player, .. }
            | Order::UpgradeUnit { player, .. }
            | Order::TechUpgrade { player }
            | Order::Alliance { player, .. } => *player,
        }
    }

    pub fn kind(&self) -> OrderKind {
        match self {
            Order::Move { .. } => OrderKind::Move,
            Order::Attack { .. } => OrderKind::Attack,
            Order::UpgradeUnit { .. } => OrderKind::UpgradeUnit,
            Order::TechUpgrade { .. } => OrderKind::TechUpgrade,
            Order::Alliance { .. } => OrderKind::Alliance,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Move { source, dest, level, count, .. } => {
                write!(f, "M {} {} {} {}", source, dest, level, count)
            }
            Order::Attack { source, dest, level, count, .. } => {
                write!(f, "A {} {} {} {}", source, dest, level, count)
            }
            Order::UpgradeUnit { territory, from_level, to_level, count, .. } => {
                write!(f, "U {} {} {} {}", territory, from_level, to_level, count)
            }
            Order::TechUpgrade { .. } => write!(f, "T"),
            Order::Alliance { target, .. } => write!(f, "FA {}", target),
        }
    }
}
