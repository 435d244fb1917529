//! Random bot client.
//!
//! A `PlayerLink` that answers prompts itself with random but mostly
//! sensible orders: attack or reinforce from every garrison, upgrade
//! units and tech when it can afford to, and offer an alliance now and
//! then. Used for batch simulation and for filling seats in local games.

use std::collections::VecDeque;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::board::{tech_upgrade_cost, upgrade_cost, PlayerId, MAX_LEVEL};
use crate::protocol::{MapSnapshot, PlayerSnapshot, TerritorySnapshot};
use crate::resolve::executor::ALLIANCE_MIN_PLAYERS;
use crate::turn::{LinkError, PlayerLink};

/// Chance that a garrison attacks a neighbour it can reach.
const ATTACK_CHANCE: f64 = 0.5;
/// Chance that a garrison that did not attack reinforces a neighbour.
const MOVE_CHANCE: f64 = 0.3;
const TECH_CHANCE: f64 = 0.5;
const ALLIANCE_CHANCE: f64 = 0.2;

/// A client that plays random orders.
pub struct RandomBot {
    rng: SmallRng,
    pending: VecDeque<String>,
}

impl RandomBot {
    pub fn new(seed: u64) -> Self {
        RandomBot {
            rng: SmallRng::seed_from_u64(seed),
            pending: VecDeque::new(),
        }
    }

    fn plan_placement(&mut self, player: PlayerId, snapshot: &MapSnapshot, units: u32) {
        let Some(me) = me(snapshot, player) else {
            return;
        };
        let owned = owned_by(snapshot, &me.name).count() as u32;
        if owned < 2 {
            return;
        }
        let share = units / owned;
        for _ in 1..owned {
            self.pending.push_back(share.to_string());
        }
    }

    fn plan_round(&mut self, player: PlayerId, snapshot: &MapSnapshot) {
        let Some(me) = me(snapshot, player).cloned() else {
            self.pending.push_back("D".to_string());
            return;
        };
        let mut food = me.food;
        let mut tech = me.tech;

        let owned: Vec<&TerritorySnapshot> = owned_by(snapshot, &me.name).collect();
        for territory in &owned {
            let Some(&(level, available)) = territory.units.last() else {
                continue;
            };

            let targets: Vec<&String> = territory
                .neighbors
                .iter()
                .filter(|n| {
                    snapshot.territory(n).is_some_and(|t| {
                        t.owner.as_deref() != Some(me.name.as_str())
                            && !t.owner.as_ref().is_some_and(|o| me.allies.contains(o))
                    })
                })
                .collect();
            let friends: Vec<&String> = territory
                .neighbors
                .iter()
                .filter(|n| snapshot.territory(n).and_then(|t| t.owner.as_deref()) == Some(me.name.as_str()))
                .collect();

            if !targets.is_empty() && food > 0 && self.rng.gen_bool(ATTACK_CHANCE) {
                let count = self.rng.gen_range(1..=available).min(food);
                let dest = targets[self.rng.gen_range(0..targets.len())];
                food -= count;
                self.pending
                    .push_back(format!("A {} {} {} {}", territory.name, dest, level, count));
            } else if !friends.is_empty() && self.rng.gen_bool(MOVE_CHANCE) {
                let dest = friends[self.rng.gen_range(0..friends.len())];
                let count = available.div_ceil(2);
                self.pending
                    .push_back(format!("M {} {} {} {}", territory.name, dest, level, count));
            }
        }

        if me.max_tech_level > 0 {
            if let Some(territory) = owned.choose(&mut self.rng) {
                let base = territory.units.iter().find(|(level, _)| *level == 0).map(|&(_, c)| c);
                let each = upgrade_cost(0, me.max_tech_level, 1);
                if let (Some(base), Some(each)) = (base, each) {
                    let count = base.min(tech / each.max(1));
                    if count > 0 {
                        tech -= count * each;
                        self.pending.push_back(format!(
                            "U {} 0 {} {}",
                            territory.name, me.max_tech_level, count
                        ));
                    }
                }
            }
        }

        if me.max_tech_level < MAX_LEVEL {
            if let Some(cost) = tech_upgrade_cost(me.max_tech_level) {
                if tech >= cost && self.rng.gen_bool(TECH_CHANCE) {
                    self.pending.push_back("T".to_string());
                }
            }
        }

        if snapshot.players.len() >= ALLIANCE_MIN_PLAYERS && self.rng.gen_bool(ALLIANCE_CHANCE) {
            let candidates: Vec<&PlayerSnapshot> = snapshot
                .players
                .iter()
                .filter(|p| p.alive && p.id != me.id && !me.allies.contains(&p.name))
                .collect();
            if let Some(target) = candidates.choose(&mut self.rng) {
                self.pending.push_back(format!("FA {}", target.name));
            }
        }

        self.pending.push_back("D".to_string());
    }
}

impl PlayerLink for RandomBot {
    fn begin_placement(&mut self, player: PlayerId, snapshot: &MapSnapshot, units: u32) {
        self.pending.clear();
        self.plan_placement(player, snapshot, units);
    }

    fn begin_round(&mut self, player: PlayerId, snapshot: &MapSnapshot) {
        self.pending.clear();
        self.plan_round(player, snapshot);
    }

    fn next_line(&mut self) -> Result<String, LinkError> {
        self.pending.pop_front().ok_or(LinkError::Disconnected)
    }

    fn send(&mut self, _line: &str) {}
}

fn me(snapshot: &MapSnapshot, player: PlayerId) -> Option<&PlayerSnapshot> {
    snapshot.players.iter().find(|p| p.id == player.0 && p.alive)
}

fn owned_by<'a>(snapshot: &'a MapSnapshot, name: &'a str) -> impl Iterator<Item = &'a TerritorySnapshot> + 'a {
    snapshot
        .territories
        .iter()
        .filter(move |t| t.owner.as_deref() == Some(name))
}
