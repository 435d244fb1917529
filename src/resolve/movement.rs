//! Movement cost.
//!
//! Moving units costs food proportional to the cheapest route between the
//! two territories. A route may only pass through territories the mover or
//! its allies own, and its cost is the sum of the sizes of every territory
//! on it, the source included.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::board::{GameState, Map, PlayerId, TerritoryId};

/// Cheapest route cost from `source` to `dest` over territories accepted by
/// `passable`. Returns `None` if no such route exists.
pub fn path_cost(
    map: &Map,
    source: TerritoryId,
    dest: TerritoryId,
    passable: impl Fn(TerritoryId) -> bool,
) -> Option<u32> {
    if !passable(source) || !passable(dest) {
        return None;
    }

    let mut best = vec![u32::MAX; map.len()];
    let mut heap = BinaryHeap::new();
    best[source.0] = map.size(source);
    heap.push(Reverse((best[source.0], source)));

    while let Some(Reverse((cost, at))) = heap.pop() {
        if at == dest {
            return Some(cost);
        }
        if cost > best[at.0] {
            continue;
        }
        for &next in map.neighbors(at) {
            if !passable(next) {
                continue;
            }
            let through = cost.saturating_add(map.size(next));
            if through < best[next.0] {
                best[next.0] = through;
                heap.push(Reverse((through, next)));
            }
        }
    }

    None
}

/// Route cost for `player`, passing through its own and its allies'
/// territories.
pub fn move_cost(state: &GameState, player: PlayerId, source: TerritoryId, dest: TerritoryId) -> Option<u32> {
    path_cost(state.map(), source, dest, |t| state.controls(player, t))
}
