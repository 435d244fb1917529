//! Game session state.
//!
//! `GameState` owns the map, every territory and every player. Ownership
//! changes go through `set_owner`, which updates both the territory and the
//! players' territory sets, so the sets always partition the owned
//! territories.

use super::map::Map;
use super::player::{Player, PlayerId};
use super::territory::{Territory, TerritoryId};
use super::unit::UnitStack;

/// Complete world state of one session.
#[derive(Debug, Clone)]
pub struct GameState {
    /// Rounds completed so far; the round being played is `round + 1`.
    pub round: u32,
    map: Map,
    territories: Vec<Territory>,
    players: Vec<Player>,
}

impl GameState {
    /// Creates a state with every territory unowned and no players.
    pub fn new(map: Map) -> Self {
        let territories = map
            .ids()
            .map(|id| Territory::new(id, map.name(id), map.size(id)))
            .collect();
        GameState {
            round: 0,
            map,
            territories,
            players: Vec::new(),
        }
    }

    /// Adds a player and returns its id.
    pub fn add_player(&mut self, name: impl Into<String>, food: u32, tech: u32) -> PlayerId {
        let id = PlayerId(self.players.len());
        self.players.push(Player::new(id, name, food, tech));
        id
    }

    /// Hands each player the map's starting group with the same index.
    /// Groups without a player stay unowned.
    pub fn assign_starting_territories(&mut self) {
        let groups = self.map.starting_groups().to_vec();
        for (index, group) in groups.into_iter().enumerate() {
            if index >= self.players.len() {
                break;
            }
            for territory in group {
                self.set_owner(territory, Some(PlayerId(index)));
            }
        }
    }

    pub fn map(&self) -> &Map {
        &self.map
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn territory(&self, id: TerritoryId) -> &Territory {
        &self.territories[id.0]
    }

    pub(crate) fn territory_mut(&mut self, id: TerritoryId) -> &mut Territory {
        &mut self.territories[id.0]
    }

    /// Adds units to a territory's garrison.
    pub fn place_units(&mut self, territory: TerritoryId, level: u8, count: u32) {
        self.territories[territory.0].units.add(level, count);
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id.0)
    }

    pub fn find_player(&self, name: &str) -> Option<PlayerId> {
        self.players.iter().find(|p| p.name == name).map(|p| p.id)
    }

    pub fn find_territory(&self, name: &str) -> Option<TerritoryId> {
        self.map.find(name)
    }

    /// Ids of players still in the game.
    pub fn live_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().filter(|p| p.alive).map(|p| p.id)
    }

    pub fn are_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        self.player(a).is_some_and(|p| p.is_allied_with(b))
    }

    /// True if `player` may keep units in `territory`: it owns it or an ally does.
    pub fn controls(&self, player: PlayerId, territory: TerritoryId) -> bool {
        match self.territory(territory).owner {
            Some(owner) => owner == player || self.are_allied(player, owner),
            None => false,
        }
    }

    /// Moves a territory to a new owner, keeping both players' sets in step.
    pub fn set_owner(&mut self, territory: TerritoryId, owner: Option<PlayerId>) {
        let previous = self.territories[territory.0].owner;
        if previous == owner {
            return;
        }
        if let Some(old) = previous.and_then(|p| self.players.get_mut(p.0)) {
            old.territories.remove(&territory);
        }
        if let Some(new) = owner.and_then(|p| self.players.get_mut(p.0)) {
            new.territories.insert(territory);
        }
        self.territories[territory.0].owner = owner;
    }

    /// Lowest-id territory a player owns; recalled units go here.
    pub fn home_territory(&self, player: PlayerId) -> Option<TerritoryId> {
        self.player(player)
            .and_then(|p| p.territories.iter().next().copied())
    }

    /// Makes `a` and `b` mutual allies.
    pub fn form_alliance(&mut self, a: PlayerId, b: PlayerId) {
        if a == b {
            return;
        }
        if let Some(p) = self.players.get_mut(a.0) {
            p.allies.insert(b);
        }
        if let Some(p) = self.players.get_mut(b.0) {
            p.allies.insert(a);
        }
    }

    /// Dissolves an alliance in both directions and sends each side's units
    /// stationed with the other back home.
    pub fn break_alliance(&mut self, a: PlayerId, b: PlayerId) {
        if let Some(p) = self.players.get_mut(a.0) {
            p.allies.remove(&b);
        }
        if let Some(p) = self.players.get_mut(b.0) {
            p.allies.remove(&a);
        }
        for id in self.map.ids().collect::<Vec<_>>() {
            match self.territories[id.0].owner {
                Some(owner) if owner == a => self.recall(id, b),
                Some(owner) if owner == b => self.recall(id, a),
                _ => {}
            }
        }
    }

    /// Sends every guest stationed in `territory` back home.
    pub fn recall_stationed(&mut self, territory: TerritoryId) {
        let guests: Vec<PlayerId> = self.territories[territory.0].stationed.keys().copied().collect();
        for guest in guests {
            self.recall(territory, guest);
        }
    }

    /// Returns `guest`'s units in `territory` to its home territory, or
    /// disbands them if it has none.
    fn recall(&mut self, territory: TerritoryId, guest: PlayerId) {
        let Some(stack) = self.territories[territory.0].stationed.remove(&guest) else {
            return;
        };
        match self.home_territory(guest) {
            Some(home) if home != territory => self.territories[home.0].units.merge(&stack),
            _ => tracing::debug!(player = %guest, units = stack.total(), "stationed units disbanded"),
        }
    }

    /// Moves units between two territories `player` controls. The caller
    /// has already checked that the source holds enough.
    pub(crate) fn relocate(
        &mut self,
        player: PlayerId,
        source: TerritoryId,
        dest: TerritoryId,
        level: u8,
        count: u32,
    ) -> bool {
        let from = &mut self.territories[source.0];
        if !from.units_of_mut(player).remove(level, count) {
            from.prune_stationed();
            return false;
        }
        from.prune_stationed();
        self.territories[dest.0].units_of_mut(player).add(level, count);
        true
    }

    /// Marks players with no territories as out of the game, drops any
    /// units they still had stationed abroad and ends their alliances.
    /// Returns the newly eliminated.
    pub fn refresh_liveness(&mut self) -> Vec<PlayerId> {
        let mut eliminated = Vec::new();
        for player in &mut self.players {
            if player.alive && player.territories.is_empty() {
                player.alive = false;
                eliminated.push(player.id);
            }
        }
        for &id in &eliminated {
            for territory in &mut self.territories {
                territory.stationed.remove(&id);
            }
            for player in &mut self.players {
                player.allies.remove(&id);
            }
            if let Some(p) = self.players.get_mut(id.0) {
                p.allies.clear();
            }
        }
        eliminated
    }

    /// The winner, if exactly one player is left or a live player owns
    /// every territory.
    pub fn winner(&self) -> Option<PlayerId> {
        let live: Vec<&Player> = self.players.iter().filter(|p| p.alive).collect();
        if let [only] = live.as_slice() {
            return Some(only.id);
        }
        live.iter()
            .find(|p| p.territories.len() == self.territories.len())
            .map(|p| p.id)
    }

    pub fn has_winner(&self) -> bool {
        self.winner().is_some()
    }

    /// Total units a player has on the board, garrisoned or stationed.
    pub fn unit_total(&self, player: PlayerId) -> u32 {
        self.territories
            .iter()
            .map(|t| {
                let own = if t.owner == Some(player) { t.units.total() } else { 0 };
                own + t.stationed.get(&player).map_or(0, UnitStack::total)
            })
            .sum()
    }

    /// Checks that every owned territory appears in exactly its owner's set
    /// and no set lists a territory its player does not own.
    pub fn ownership_is_consistent(&self) -> bool {
        let listed: usize = self.players.iter().map(|p| p.territories.len()).sum();
        let owned = self.territories.iter().filter(|t| t.owner.is_some()).count();
        listed == owned
            && self.territories.iter().all(|t| match t.owner {
                Some(owner) => self
                    .player(owner)
                    .is_some_and(|p| p.territories.contains(&t.id)),
                None => true,
            })
    }
}
