//! End-of-turn settlement.
//!
//! Applies deferred tech upgrades, then production and reinforcement for
//! every owned territory, then liveness and the win check. Runs once per
//! round after all orders have executed.

use crate::board::{GameState, PlayerId, TerritoryId};

/// Level given to reinforcement units.
pub const REINFORCEMENT_LEVEL: u8 = 0;

/// What changed during settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settlement {
    /// Players whose tech level rose, with the new level.
    pub upgraded: Vec<(PlayerId, u8)>,
    /// Players who lost their last territory this round.
    pub eliminated: Vec<PlayerId>,
    pub winner: Option<PlayerId>,
}

/// Settles the round and advances the round counter.
pub fn settle(state: &mut GameState) -> Settlement {
    let mut settlement = Settlement::default();
    let live: Vec<PlayerId> = state.live_players().collect();

    for player in live {
        let Some(p) = state.player_mut(player) else {
            continue;
        };
        if let Some(level) = p.finish_tech_upgrade() {
            settlement.upgraded.push((player, level));
        }

        let owned: Vec<TerritoryId> = p.territories().iter().copied().collect();
        let yield_total: u32 = owned.iter().map(|&t| state.territory(t).size).sum();
        if let Some(p) = state.player_mut(player) {
            p.earn(yield_total, yield_total);
        }
        for t in owned {
            state.territory_mut(t).units.add(REINFORCEMENT_LEVEL, 1);
        }
    }

    settlement.eliminated = state.refresh_liveness();
    settlement.winner = state.winner();
    state.round += 1;

    tracing::info!(
        round = state.round,
        eliminated = settlement.eliminated.len(),
        winner = ?settlement.winner,
        "round settled"
    );
    settlement
}
