//! Combat resolution.
//!
//! An attack is fought as a series of pairings between unit groups. Each
//! pairing both sides roll a d20 and add their group's level bonus; the
//! lower total loses one unit, and a tie goes to the defender. Pairings
//! alternate between (attacker strongest vs defender weakest) and
//! (attacker weakest vs defender strongest), re-selecting groups every
//! time, until one side is gone.

use rand::Rng;

use crate::board::{combat_bonus, GameState, PlayerId, TerritoryId, UnitStack};

/// Number of faces on the combat die.
pub const DIE_SIDES: u32 = 20;

/// Source of combat rolls, each in `1..=DIE_SIDES`.
pub trait Dice {
    fn roll(&mut self) -> u32;
}

/// Dice backed by any random number generator.
#[derive(Debug, Clone)]
pub struct RngDice<R>(pub R);

impl<R: Rng> Dice for RngDice<R> {
    fn roll(&mut self) -> u32 {
        self.0.gen_range(1..=DIE_SIDES)
    }
}

/// Replays a fixed list of rolls, cycling when it runs out.
///
/// Rolls are consumed attacker first, then defender, for each pairing.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: Vec<u32>,
    next: usize,
}

impl ScriptedDice {
    pub fn new(rolls: Vec<u32>) -> Self {
        ScriptedDice { rolls, next: 0 }
    }

    /// Dice where the attacker always rolls `attacker` and the defender
    /// always rolls `defender`.
    pub fn fixed(attacker: u32, defender: u32) -> Self {
        ScriptedDice::new(vec![attacker, defender])
    }

    /// Number of rolls consumed so far.
    pub fn rolls_used(&self) -> usize {
        self.next
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> u32 {
        if self.rolls.is_empty() {
            return 1;
        }
        let value = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        value
    }
}

/// Units of one level fighting together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group {
    pub level: u8,
    pub bonus: u32,
    pub count: u32,
}

impl Group {
    pub fn new(level: u8, count: u32) -> Self {
        Group {
            level,
            bonus: combat_bonus(level),
            count,
        }
    }
}

/// Splits a unit stack into one group per occupied level.
pub fn groups_of(stack: &UnitStack) -> Vec<Group> {
    stack.levels().map(|(level, count)| Group::new(level, count)).collect()
}

fn stack_of(groups: &[Group]) -> UnitStack {
    let mut stack = UnitStack::new();
    for g in groups {
        stack.add(g.level, g.count);
    }
    stack
}

/// Units each side lost in a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Casualties {
    pub attacker: u32,
    pub defender: u32,
}

fn strongest(groups: &[Group]) -> usize {
    let mut best = 0;
    for (i, g) in groups.iter().enumerate() {
        if g.bonus > groups[best].bonus {
            best = i;
        }
    }
    best
}

fn weakest(groups: &[Group]) -> usize {
    let mut best = 0;
    for (i, g) in groups.iter().enumerate() {
        if g.bonus < groups[best].bonus {
            best = i;
        }
    }
    best
}

/// Fights until one side has no units. Both vectors are left holding
/// their survivors (empty groups removed).
pub fn fight(attackers: &mut Vec<Group>, defenders: &mut Vec<Group>, dice: &mut impl Dice) -> Casualties {
    let mut casualties = Casualties::default();
    attackers.retain(|g| g.count > 0);
    defenders.retain(|g| g.count > 0);

    let mut attacker_leads_strong = true;
    while !attackers.is_empty() && !defenders.is_empty() {
        let (a, d) = if attacker_leads_strong {
            (strongest(attackers), weakest(defenders))
        } else {
            (weakest(attackers), strongest(defenders))
        };

        let attack_total = dice.roll() + attackers[a].bonus;
        let defend_total = dice.roll() + defenders[d].bonus;
        if attack_total > defend_total {
            defenders[d].count -= 1;
            casualties.defender += 1;
            if defenders[d].count == 0 {
                defenders.remove(d);
            }
        } else {
            attackers[a].count -= 1;
            casualties.attacker += 1;
            if attackers[a].count == 0 {
                attackers.remove(a);
            }
        }

        attacker_leads_strong = !attacker_leads_strong;
    }

    casualties
}

/// Result of one attack, as broadcast to the players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatReport {
    pub territory: TerritoryId,
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub level: u8,
    pub committed: u32,
    pub casualties: Casualties,
    /// True if the attacker took the territory.
    pub conquered: bool,
    /// Units left in the territory after the fight, whoever holds it.
    pub survivors: UnitStack,
}

/// Resolves an attack of `count` level-`level` units by `attacker` on
/// `territory`. The units must already have been removed from their source.
///
/// If the defenders are wiped out the territory changes hands, guests
/// stationed there are recalled and the attackers' survivors become the
/// new garrison. Otherwise the defenders keep it with their survivors.
pub fn resolve_attack(
    state: &mut GameState,
    territory: TerritoryId,
    attacker: PlayerId,
    level: u8,
    count: u32,
    dice: &mut impl Dice,
) -> CombatReport {
    let target = state.territory(territory);
    let defender = target.owner();
    let mut defenders = groups_of(&target.units);
    let mut attackers = vec![Group::new(level, count)];

    let casualties = fight(&mut attackers, &mut defenders, dice);
    let conquered = defenders.is_empty();

    let survivors = if conquered {
        stack_of(&attackers)
    } else {
        stack_of(&defenders)
    };

    if conquered {
        state.recall_stationed(territory);
        state.set_owner(territory, Some(attacker));
    }
    state.territory_mut(territory).units = survivors;

    tracing::debug!(
        territory = %state.territory(territory).name,
        attacker = %attacker,
        conquered,
        attacker_losses = casualties.attacker,
        defender_losses = casualties.defender,
        "attack resolved"
    );

    CombatReport {
        territory,
        attacker,
        defender,
        level,
        committed: count,
        casualties,
        conquered,
        survivors,
    }
}
