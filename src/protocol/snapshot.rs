//! Map-state snapshots.
//!
//! A `MapSnapshot` is a read-only copy of the board handed to clients at
//! the start of each phase. It serializes with serde for machine clients
//! and renders to a stable line format for text clients:
//!
//! ```text
//! round 3
//! territory Ashford owner alice size 2 neighbors Brackwater,Coldharbour units 0:4,1:2
//! stationed Ashford carol 0:1
//! player 0 alice alive true food 12 tech 40 level 2 allies carol
//! ```

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::board::{GameState, PlayerId, UnitStack};

/// Board state as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub round: u32,
    pub territories: Vec<TerritorySnapshot>,
    pub players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritorySnapshot {
    pub name: String,
    pub owner: Option<String>,
    pub size: u32,
    pub neighbors: Vec<String>,
    /// `(level, count)` pairs for the garrison, ascending by level.
    pub units: Vec<(u8, u32)>,
    /// Allied units kept here, by player name.
    pub stationed: Vec<(String, Vec<(u8, u32)>)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: usize,
    pub name: String,
    pub alive: bool,
    pub food: u32,
    pub tech: u32,
    pub max_tech_level: u8,
    pub allies: Vec<String>,
}

impl MapSnapshot {
    /// Copies the current board.
    pub fn capture(state: &GameState) -> Self {
        let name_of = |id: PlayerId| {
            state
                .player(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let territories = state
            .territories()
            .iter()
            .map(|t| TerritorySnapshot {
                name: t.name.clone(),
                owner: t.owner().map(name_of),
                size: t.size,
                neighbors: state
                    .map()
                    .neighbors(t.id)
                    .iter()
                    .map(|&n| state.map().name(n).to_string())
                    .collect(),
                units: levels(&t.units),
                stationed: t
                    .stationed
                    .iter()
                    .filter(|(_, stack)| !stack.is_empty())
                    .map(|(&p, stack)| (name_of(p), levels(stack)))
                    .collect(),
            })
            .collect();

        let players = state
            .players()
            .iter()
            .filter_map(|p| state.player_stats(p.id))
            .collect();

        MapSnapshot {
            round: state.round,
            territories,
            players,
        }
    }

    pub fn territory(&self, name: &str) -> Option<&TerritorySnapshot> {
        self.territories.iter().find(|t| t.name == name)
    }

    pub fn player(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Renders the line format shown in the module docs.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "round {}", self.round);

        for t in &self.territories {
            let _ = writeln!(
                out,
                "territory {} owner {} size {} neighbors {} units {}",
                t.name,
                t.owner.as_deref().unwrap_or("-"),
                t.size,
                list_or_dash(&t.neighbors),
                render_levels(&t.units),
            );
        }
        for t in &self.territories {
            for (player, units) in &t.stationed {
                let _ = writeln!(out, "stationed {} {} {}", t.name, player, render_levels(units));
            }
        }
        for p in &self.players {
            let _ = writeln!(
                out,
                "player {} {} alive {} food {} tech {} level {} allies {}",
                p.id,
                p.name,
                p.alive,
                p.food,
                p.tech,
                p.max_tech_level,
                list_or_dash(&p.allies),
            );
        }
        out
    }
}

impl GameState {
    /// Resource and tech summary for one player.
    pub fn player_stats(&self, id: PlayerId) -> Option<PlayerSnapshot> {
        let p = self.player(id)?;
        Some(PlayerSnapshot {
            id: id.0,
            name: p.name.clone(),
            alive: p.alive,
            food: p.food(),
            tech: p.tech(),
            max_tech_level: p.max_tech_level(),
            allies: p
                .allies()
                .iter()
                .filter_map(|&a| self.player(a).map(|ally| ally.name.clone()))
                .collect(),
        })
    }
}

fn levels(stack: &UnitStack) -> Vec<(u8, u32)> {
    stack.levels().collect()
}

fn render_levels(units: &[(u8, u32)]) -> String {
    if units.is_empty() {
        return "-".to_string();
    }
    units
        .iter()
        .map(|(level, count)| format!("{}:{}", level, count))
        .collect::<Vec<_>>()
        .join(",")
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}
