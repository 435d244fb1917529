//! Order execution.
//!
//! Runs one round's orders against the world state in fixed stages:
//! moves, attacks, alliances, unit upgrades, then tech upgrades. Within a
//! stage orders run in the order they were queued. Every attack of the
//! round is paid for and leaves its source before the first battle is
//! fought. An order that fails validation is dropped with a
//! `RejectReason`; nothing it would have changed is touched, and the round
//! carries on.

use thiserror::Error;

use crate::board::{
    tech_upgrade_cost, upgrade_cost, GameState, Order, OrderKind, PlayerId, TechProgress,
    TerritoryId, STAGES,
};

use super::combat::{resolve_attack, CombatReport, Dice};
use super::movement::move_cost;

/// Minimum roster size for alliances to be considered.
pub const ALLIANCE_MIN_PLAYERS: usize = 3;

/// Why an order was dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("player is out of the game")]
    Eliminated,

    #[error("unknown territory '{0}'")]
    UnknownTerritory(String),

    #[error("no player named '{0}'")]
    UnknownPlayerName(String),

    #[error("{0} is not under your control")]
    NotControlled(String),

    #[error("you already own {0}")]
    AlreadyOwned(String),

    #[error("{0} and {1} are not adjacent")]
    NotAdjacent(String, String),

    #[error("source and destination are both {0}")]
    SameTerritory(String),

    #[error("no route through friendly territory from {0} to {1}")]
    Unreachable(String, String),

    #[error("unit count must be positive")]
    NoUnits,

    #[error("{territory} has only {available} level {level} unit(s)")]
    InsufficientUnits {
        territory: String,
        level: u8,
        available: u32,
    },

    #[error("needs {needed} food, have {available}")]
    InsufficientFood { needed: u32, available: u32 },

    #[error("needs {needed} tech, have {available}")]
    InsufficientTech { needed: u32, available: u32 },

    #[error("level {level} is above your tech level {max}")]
    AboveTechLevel { level: u8, max: u8 },

    #[error("cannot upgrade from level {from} to level {to}")]
    InvalidUpgrade { from: u8, to: u8 },

    #[error("tech level is already at its maximum")]
    MaxTechLevel,

    #[error("a tech upgrade is already under way this round")]
    AlreadyUpgrading,

    #[error("alliances need at least three players")]
    AlliancesDisabled,

    #[error("cannot ally with yourself")]
    SelfAlliance,

    #[error("{0} is out of the game")]
    TargetEliminated(String),

    #[error("already allied with {0}")]
    AlreadyAllied(String),

    #[error("{0} did not ask for an alliance this round")]
    NotReciprocated(String),
}

/// The outcome of one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderResult {
    Applied,
    Rejected(RejectReason),
}

/// An order paired with its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub order: Order,
    pub result: OrderResult,
}

/// Everything that happened while executing one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Orders in execution order.
    pub orders: Vec<ResolvedOrder>,
    /// Battles in the order they were fought.
    pub battles: Vec<CombatReport>,
}

impl RoundReport {
    /// Dropped orders issued by `player`.
    pub fn rejections_for(&self, player: PlayerId) -> impl Iterator<Item = (&Order, &RejectReason)> + '_ {
        self.orders.iter().filter_map(move |r| match &r.result {
            OrderResult::Rejected(reason) if r.order.player() == player => Some((&r.order, reason)),
            _ => None,
        })
    }

    /// Number of orders that took effect.
    pub fn applied(&self) -> usize {
        self.orders
            .iter()
            .filter(|r| r.result == OrderResult::Applied)
            .count()
    }

    fn push(&mut self, order: &Order, result: Result<(), RejectReason>) {
        let result = match result {
            Ok(()) => OrderResult::Applied,
            Err(reason) => {
                tracing::debug!(player = %order.player(), %order, %reason, "order dropped");
                OrderResult::Rejected(reason)
            }
        };
        self.orders.push(ResolvedOrder {
            order: order.clone(),
            result,
        });
    }
}

/// Executes a round of orders. `orders` is the closed queue for the round.
pub fn execute_orders(state: &mut GameState, orders: &[Order], dice: &mut impl Dice) -> RoundReport {
    let mut report = RoundReport::default();

    for stage in STAGES {
        match stage {
            OrderKind::Attack => resolve_attacks(state, orders, dice, &mut report),
            OrderKind::Alliance => resolve_alliances(state, orders, &mut report),
            _ => {
                for order in orders.iter().filter(|o| o.kind() == stage) {
                    let result = apply_order(state, order);
                    report.push(order, result);
                }
            }
        }
    }

    report
}

/// Applies a move, unit upgrade or tech upgrade.
fn apply_order(state: &mut GameState, order: &Order) -> Result<(), RejectReason> {
    active_player(state, order.player())?;
    match order {
        Order::Move { player, source, dest, level, count } => {
            apply_move(state, *player, source, dest, *level, *count)
        }
        Order::UpgradeUnit { player, territory, from_level, to_level, count } => {
            apply_unit_upgrade(state, *player, territory, *from_level, *to_level, *count)
        }
        Order::TechUpgrade { player } => apply_tech_upgrade(state, *player),
        Order::Attack { .. } | Order::Alliance { .. } => Ok(()),
    }
}

/// Commits every attack in queue order, then fights them in the same
/// order. Units sent out never defend their source, whoever attacks it
/// later in the stage.
fn resolve_attacks(state: &mut GameState, orders: &[Order], dice: &mut impl Dice, report: &mut RoundReport) {
    let mut committed = Vec::new();
    for order in orders {
        let Order::Attack { player, source, dest, level, count } = order else {
            continue;
        };
        let result = active_player(state, *player)
            .and_then(|()| commit_attack(state, *player, source, dest, *level, *count));
        match result {
            Ok(attack) => {
                committed.push(attack);
                report.push(order, Ok(()));
            }
            Err(reason) => report.push(order, Err(reason)),
        }
    }

    for attack in &committed {
        if let Some(battle) = fight_attack(state, attack, dice) {
            report.battles.push(battle);
        }
    }
}

fn active_player(state: &GameState, player: PlayerId) -> Result<(), RejectReason> {
    match state.player(player) {
        None => Err(RejectReason::UnknownPlayer(player)),
        Some(p) if !p.alive => Err(RejectReason::Eliminated),
        Some(_) => Ok(()),
    }
}

fn territory_named(state: &GameState, name: &str) -> Result<TerritoryId, RejectReason> {
    state
        .find_territory(name)
        .ok_or_else(|| RejectReason::UnknownTerritory(name.to_string()))
}

fn require_units(
    state: &GameState,
    player: PlayerId,
    territory: TerritoryId,
    level: u8,
    count: u32,
) -> Result<(), RejectReason> {
    if count == 0 {
        return Err(RejectReason::NoUnits);
    }
    let available = state.territory(territory).units_of(player).count(level);
    if available < count {
        return Err(RejectReason::InsufficientUnits {
            territory: state.territory(territory).name.clone(),
            level,
            available,
        });
    }
    Ok(())
}

fn spend_food(state: &mut GameState, player: PlayerId, amount: u32) -> Result<(), RejectReason> {
    let p = state
        .player_mut(player)
        .ok_or(RejectReason::UnknownPlayer(player))?;
    let available = p.food();
    if p.spend_food(amount) {
        Ok(())
    } else {
        Err(RejectReason::InsufficientFood { needed: amount, available })
    }
}

fn spend_tech(state: &mut GameState, player: PlayerId, amount: u32) -> Result<(), RejectReason> {
    let p = state
        .player_mut(player)
        .ok_or(RejectReason::UnknownPlayer(player))?;
    let available = p.tech();
    if p.spend_tech(amount) {
        Ok(())
    } else {
        Err(RejectReason::InsufficientTech { needed: amount, available })
    }
}

/// Moves units between two territories the player controls, paying
/// route cost × count in food.
pub fn apply_move(
    state: &mut GameState,
    player: PlayerId,
    source: &str,
    dest: &str,
    level: u8,
    count: u32,
) -> Result<(), RejectReason> {
    let from = territory_named(state, source)?;
    let to = territory_named(state, dest)?;
    if from == to {
        return Err(RejectReason::SameTerritory(source.to_string()));
    }
    if !state.controls(player, from) {
        return Err(RejectReason::NotControlled(source.to_string()));
    }
    if !state.controls(player, to) {
        return Err(RejectReason::NotControlled(dest.to_string()));
    }
    require_units(state, player, from, level, count)?;

    let route = move_cost(state, player, from, to)
        .ok_or_else(|| RejectReason::Unreachable(source.to_string(), dest.to_string()))?;
    spend_food(state, player, route.saturating_mul(count))?;

    state.relocate(player, from, to, level, count);
    Ok(())
}

/// Units on their way to an attack, already paid for and out of their
/// source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedAttack {
    pub player: PlayerId,
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub level: u8,
    pub count: u32,
}

/// Sends units from an owned territory toward an adjacent one the player
/// does not own. Costs one food per unit. The units leave the source now;
/// the fight happens in `fight_attack`.
pub fn commit_attack(
    state: &mut GameState,
    player: PlayerId,
    source: &str,
    dest: &str,
    level: u8,
    count: u32,
) -> Result<CommittedAttack, RejectReason> {
    let from = territory_named(state, source)?;
    let to = territory_named(state, dest)?;
    if state.territory(from).owner() != Some(player) {
        return Err(RejectReason::NotControlled(source.to_string()));
    }
    if state.territory(to).owner() == Some(player) {
        return Err(RejectReason::AlreadyOwned(dest.to_string()));
    }
    if !state.map().is_adjacent(from, to) {
        return Err(RejectReason::NotAdjacent(source.to_string(), dest.to_string()));
    }
    require_units(state, player, from, level, count)?;
    spend_food(state, player, count)?;

    state.territory_mut(from).units.remove(level, count);
    break_alliance_with_owner(state, player, to);

    Ok(CommittedAttack { player, from, to, level, count })
}

/// Fights a committed attack against whoever holds the target now. If the
/// attacker took the target earlier in the stage, the units join its
/// garrison and no battle is fought.
pub fn fight_attack(state: &mut GameState, attack: &CommittedAttack, dice: &mut impl Dice) -> Option<CombatReport> {
    if state.territory(attack.to).owner() == Some(attack.player) {
        state.territory_mut(attack.to).units.add(attack.level, attack.count);
        tracing::debug!(
            player = %attack.player,
            territory = %state.territory(attack.to).name,
            units = attack.count,
            "attackers joined garrison"
        );
        return None;
    }
    break_alliance_with_owner(state, attack.player, attack.to);
    Some(resolve_attack(state, attack.to, attack.player, attack.level, attack.count, dice))
}

fn break_alliance_with_owner(state: &mut GameState, attacker: PlayerId, territory: TerritoryId) {
    if let Some(defender) = state.territory(territory).owner() {
        if state.are_allied(attacker, defender) {
            tracing::info!(attacker = %attacker, defender = %defender, "alliance broken by attack");
            state.break_alliance(attacker, defender);
        }
    }
}

/// Moves units up the level ladder inside one territory, paying the
/// cumulative-cost difference per unit in tech.
pub fn apply_unit_upgrade(
    state: &mut GameState,
    player: PlayerId,
    territory: &str,
    from_level: u8,
    to_level: u8,
    count: u32,
) -> Result<(), RejectReason> {
    let at = territory_named(state, territory)?;
    if state.territory(at).owner() != Some(player) {
        return Err(RejectReason::NotControlled(territory.to_string()));
    }
    let max = state
        .player(player)
        .map(|p| p.max_tech_level())
        .ok_or(RejectReason::UnknownPlayer(player))?;
    if to_level > max {
        return Err(RejectReason::AboveTechLevel { level: to_level, max });
    }
    if to_level <= from_level {
        return Err(RejectReason::InvalidUpgrade { from: from_level, to: to_level });
    }
    require_units(state, player, at, from_level, count)?;
    let cost = upgrade_cost(from_level, to_level, count)
        .ok_or(RejectReason::InvalidUpgrade { from: from_level, to: to_level })?;
    spend_tech(state, player, cost)?;

    let units = &mut state.territory_mut(at).units;
    units.remove(from_level, count);
    units.add(to_level, count);
    Ok(())
}

/// Pays for the next tech level. The level itself changes at settlement.
pub fn apply_tech_upgrade(state: &mut GameState, player: PlayerId) -> Result<(), RejectReason> {
    let p = state
        .player(player)
        .ok_or(RejectReason::UnknownPlayer(player))?;
    if p.tech_progress() != TechProgress::Stable {
        return Err(RejectReason::AlreadyUpgrading);
    }
    let current = p.max_tech_level();
    let cost = tech_upgrade_cost(current).ok_or(RejectReason::MaxTechLevel)?;
    spend_tech(state, player, cost)?;

    if let Some(p) = state.player_mut(player) {
        p.begin_tech_upgrade(current + 1);
    }
    Ok(())
}

/// Checks an alliance request and returns the target's id.
fn validate_alliance(state: &GameState, player: PlayerId, target: &str) -> Result<PlayerId, RejectReason> {
    active_player(state, player)?;
    if !holds_territory(state, player) {
        return Err(RejectReason::Eliminated);
    }
    if state.players().len() < ALLIANCE_MIN_PLAYERS {
        return Err(RejectReason::AlliancesDisabled);
    }
    let other = state
        .find_player(target)
        .ok_or_else(|| RejectReason::UnknownPlayerName(target.to_string()))?;
    if other == player {
        return Err(RejectReason::SelfAlliance);
    }
    if !holds_territory(state, other) {
        return Err(RejectReason::TargetEliminated(target.to_string()));
    }
    if state.are_allied(player, other) {
        return Err(RejectReason::AlreadyAllied(target.to_string()));
    }
    Ok(other)
}

// `alive` only changes at settlement; a player whose last territory fell
// earlier this round is already out for alliance purposes.
fn holds_territory(state: &GameState, player: PlayerId) -> bool {
    state
        .player(player)
        .is_some_and(|p| p.alive && !p.territories().is_empty())
}

/// Turns matching pairs of alliance requests into mutual alliances. A
/// request only counts if its target asked for the same alliance in this
/// round's queue.
fn resolve_alliances(state: &mut GameState, orders: &[Order], report: &mut RoundReport) {
    let requests: Vec<(&Order, Result<PlayerId, RejectReason>)> = orders
        .iter()
        .filter_map(|order| match order {
            Order::Alliance { player, target } => Some((order, validate_alliance(state, *player, target))),
            _ => None,
        })
        .collect();

    let asked: Vec<(PlayerId, PlayerId)> = requests
        .iter()
        .filter_map(|(order, checked)| checked.as_ref().ok().map(|&to| (order.player(), to)))
        .collect();

    for (order, checked) in requests {
        let result = match checked {
            Ok(to) if asked.contains(&(to, order.player())) => {
                state.form_alliance(order.player(), to);
                tracing::info!(a = %order.player(), b = %to, "alliance formed");
                OrderResult::Applied
            }
            Ok(to) => {
                let name = state.player(to).map(|p| p.name.clone()).unwrap_or_default();
                OrderResult::Rejected(RejectReason::NotReciprocated(name))
            }
            Err(reason) => OrderResult::Rejected(reason),
        };
        report.orders.push(ResolvedOrder {
            order: order.clone(),
            result,
        });
    }
}
