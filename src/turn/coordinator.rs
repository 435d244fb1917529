//! Turn coordinator.
//!
//! Drives a session through its phases:
//!
//! ```text
//! AwaitingPlayers -> InitialPlacement -> IssueOrders -> ExecuteOrders
//!     -> EndTurn -> (IssueOrders | GameOver)
//! ```
//!
//! Placement and order collection talk to every client at once, one scoped
//! thread per client. Leaving the scope is the barrier: the next phase
//! starts only when every client has finished. All changes to the board
//! happen on the coordinator's own thread.

use std::sync::mpsc::Receiver;
use std::thread;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::board::{GameState, Map, MapError, PlayerId, TerritoryId};
use crate::config::GameConfig;
use crate::protocol::{parse_instruction, parse_placement, Instruction, MapSnapshot};
use crate::resolve::{execute_orders, settle, Dice, RngDice, RoundReport, Settlement};

use super::link::{LinkError, PlayerLink};
use super::queue::OrderQueue;

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingPlayers,
    InitialPlacement,
    IssueOrders,
    ExecuteOrders,
    EndTurn,
    GameOver,
}

/// Session-level misuse.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("the session is full")]
    SessionFull,

    #[error("name '{0}' is already taken")]
    NameTaken(String),

    #[error("'{0}' is not a valid player name")]
    InvalidName(String),

    #[error("joining closed with {missing} seat(s) still empty")]
    NotEnoughPlayers { missing: usize },

    #[error("cannot do that during {0:?}")]
    WrongPhase(TurnPhase),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Final result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOutcome {
    pub winner: Option<PlayerId>,
    pub winner_name: Option<String>,
    /// Rounds played.
    pub rounds: u32,
}

/// Runs one game session.
pub struct Coordinator<D: Dice = RngDice<SmallRng>> {
    config: GameConfig,
    state: GameState,
    /// `links[i]` belongs to `PlayerId(i)`.
    links: Vec<Box<dyn PlayerLink>>,
    queue: OrderQueue,
    dice: D,
    phase: TurnPhase,
}

impl Coordinator {
    /// Creates a session with random dice, seeded from the config if it
    /// names a seed.
    pub fn new(config: GameConfig) -> Result<Self, SessionError> {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Coordinator::with_dice(config, RngDice(rng))
    }
}

impl<D: Dice> Coordinator<D> {
    pub fn with_dice(config: GameConfig, dice: D) -> Result<Self, SessionError> {
        let map = Map::for_players(config.player_count)?;
        Ok(Coordinator {
            config,
            state: GameState::new(map),
            links: Vec::new(),
            queue: OrderQueue::new(),
            dice,
            phase: TurnPhase::AwaitingPlayers,
        })
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Current board as clients see it.
    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot::capture(&self.state)
    }

    /// Seats a player. When the last seat fills, starting territories are
    /// handed out and the session moves to initial placement.
    pub fn join(&mut self, name: &str, mut link: Box<dyn PlayerLink>) -> Result<PlayerId, SessionError> {
        if self.phase != TurnPhase::AwaitingPlayers {
            return Err(if self.links.len() >= self.config.player_count {
                SessionError::SessionFull
            } else {
                SessionError::WrongPhase(self.phase)
            });
        }
        self.check_name(name)?;

        let id = self
            .state
            .add_player(name, self.config.initial_food, self.config.initial_tech);
        link.send(&format!("welcome {} {}", name, id.0));
        self.links.push(link);
        tracing::info!(player = %id, name, "player joined");

        if self.links.len() == self.config.player_count {
            self.state.assign_starting_territories();
            self.phase = TurnPhase::InitialPlacement;
            tracing::info!(players = self.links.len(), "session full");
        }
        Ok(id)
    }

    /// Seats players arriving on `joins` until the session is full.
    /// Rejected joins are told why and the session keeps waiting.
    pub fn admit(&mut self, joins: &Receiver<(String, Box<dyn PlayerLink>)>) -> Result<(), SessionError> {
        while self.phase == TurnPhase::AwaitingPlayers {
            let Ok((name, mut link)) = joins.recv() else {
                return Err(SessionError::NotEnoughPlayers {
                    missing: self.config.player_count - self.links.len(),
                });
            };
            if let Err(err) = self.check_name(&name) {
                link.send(&format!("join rejected: {}", err));
                tracing::debug!(name, %err, "join rejected");
                continue;
            }
            self.join(&name, link)?;
        }
        Ok(())
    }

    /// Names must be non-empty, unique and free of whitespace and commas,
    /// and must not be the `-` placeholder used for unowned territory.
    fn check_name(&self, name: &str) -> Result<(), SessionError> {
        if name.is_empty() || name == "-" || name.contains(|c: char| c.is_whitespace() || c == ',') {
            return Err(SessionError::InvalidName(name.to_string()));
        }
        if self.state.find_player(name).is_some() {
            return Err(SessionError::NameTaken(name.to_string()));
        }
        Ok(())
    }

    /// Lets every player distribute `initial_units` level-0 units over its
    /// starting territories.
    pub fn place_initial_units(&mut self) -> Result<(), SessionError> {
        self.expect_phase(TurnPhase::InitialPlacement)?;
        tracing::info!("initial placement");

        let snapshot = self.snapshot();
        let units = self.config.initial_units;
        let holdings: Vec<Vec<(TerritoryId, String)>> = self
            .state
            .players()
            .iter()
            .map(|p| {
                p.territories()
                    .iter()
                    .map(|&t| (t, self.state.territory(t).name.clone()))
                    .collect()
            })
            .collect();

        let results: Vec<(PlayerId, Placement)> = thread::scope(|s| {
            let handles: Vec<_> = self
                .links
                .iter_mut()
                .zip(&holdings)
                .enumerate()
                .map(|(index, (link, owned))| {
                    let player = PlayerId(index);
                    let snapshot = &snapshot;
                    let handle = s.spawn(move || collect_placement(link.as_mut(), player, snapshot, owned, units));
                    (player, handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(player, handle)| {
                    let placement = handle.join().unwrap_or_else(|_| Placement {
                        allocations: Vec::new(),
                        lost: Some(LinkError::Disconnected),
                    });
                    (player, placement)
                })
                .collect()
        });

        for (player, placement) in results {
            for (territory, count) in placement.allocations {
                self.state.place_units(territory, 0, count);
            }
            if let Some(err) = placement.lost {
                self.disconnect(player, err);
            }
        }

        self.phase = TurnPhase::IssueOrders;
        Ok(())
    }

    /// Collects orders from every live, connected player until each has
    /// sent `D`, disconnected or timed out.
    pub fn collect_orders(&mut self) -> Result<(), SessionError> {
        self.expect_phase(TurnPhase::IssueOrders)?;
        tracing::info!(round = self.state.round + 1, "collecting orders");

        let snapshot = self.snapshot();
        let active: Vec<bool> = self
            .state
            .players()
            .iter()
            .map(|p| p.alive && p.connected)
            .collect();
        let queue = &self.queue;

        let failures: Vec<(PlayerId, LinkError)> = thread::scope(|s| {
            let handles: Vec<_> = self
                .links
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| active[*index])
                .map(|(index, link)| {
                    let player = PlayerId(index);
                    let snapshot = &snapshot;
                    let handle = s.spawn(move || collect_player_orders(link.as_mut(), player, snapshot, queue));
                    (player, handle)
                })
                .collect();
            handles
                .into_iter()
                .filter_map(|(player, handle)| match handle.join() {
                    Ok(Ok(())) => None,
                    Ok(Err(err)) => Some((player, err)),
                    Err(_) => Some((player, LinkError::Disconnected)),
                })
                .collect()
        });

        for (player, err) in failures {
            let withdrawn = self.queue.withdraw(player);
            tracing::debug!(player = %player, withdrawn, "orders withdrawn");
            self.disconnect(player, err);
        }

        self.phase = TurnPhase::ExecuteOrders;
        Ok(())
    }

    /// Executes the queued orders and reports battles and dropped orders.
    pub fn execute(&mut self) -> Result<RoundReport, SessionError> {
        self.expect_phase(TurnPhase::ExecuteOrders)?;
        let orders = self.queue.drain();
        tracing::info!(round = self.state.round + 1, orders = orders.len(), "executing orders");

        let report = execute_orders(&mut self.state, &orders, &mut self.dice);

        for battle in &report.battles {
            let line = format!(
                "battle {} attacker {} defender {} lost {}/{} {}",
                self.state.territory(battle.territory).name,
                self.name_of(Some(battle.attacker)),
                self.name_of(battle.defender),
                battle.casualties.attacker,
                battle.casualties.defender,
                if battle.conquered { "conquered" } else { "held" },
            );
            self.broadcast(&line);
        }
        for index in 0..self.links.len() {
            let player = PlayerId(index);
            let lines: Vec<String> = report
                .rejections_for(player)
                .map(|(order, reason)| format!("dropped '{}': {}", order, reason))
                .collect();
            for line in lines {
                self.links[index].send(&line);
            }
        }

        self.phase = TurnPhase::EndTurn;
        Ok(report)
    }

    /// Settles the round and decides whether the game continues.
    pub fn end_turn(&mut self) -> Result<Settlement, SessionError> {
        self.expect_phase(TurnPhase::EndTurn)?;
        let settlement = settle(&mut self.state);
        self.queue.clear();

        for &player in &settlement.eliminated {
            let line = format!("eliminated {}", self.name_of(Some(player)));
            self.broadcast(&line);
        }

        let out_of_rounds = self.config.max_rounds > 0 && self.state.round >= self.config.max_rounds;
        let nobody_left = !self.state.players().iter().any(|p| p.alive && p.connected);

        if settlement.winner.is_some() || out_of_rounds || nobody_left {
            self.phase = TurnPhase::GameOver;
            let line = match settlement.winner {
                Some(winner) => format!("gameover winner {}", self.name_of(Some(winner))),
                None => "gameover draw".to_string(),
            };
            self.broadcast(&line);
            tracing::info!(
                rounds = self.state.round,
                winner = ?settlement.winner,
                out_of_rounds,
                nobody_left,
                "game over"
            );
        } else {
            self.phase = TurnPhase::IssueOrders;
        }
        Ok(settlement)
    }

    /// Plays one full round: collection, execution and settlement.
    pub fn play_round(&mut self) -> Result<RoundReport, SessionError> {
        self.collect_orders()?;
        let report = self.execute()?;
        self.end_turn()?;
        Ok(report)
    }

    /// Plays from the current phase until the game is over. The session
    /// must already be full.
    pub fn run(&mut self) -> Result<GameOutcome, SessionError> {
        if self.phase == TurnPhase::AwaitingPlayers {
            return Err(SessionError::NotEnoughPlayers {
                missing: self.config.player_count - self.links.len(),
            });
        }
        if self.phase == TurnPhase::InitialPlacement {
            self.place_initial_units()?;
        }
        while self.phase != TurnPhase::GameOver {
            match self.phase {
                TurnPhase::IssueOrders => {
                    self.play_round()?;
                }
                TurnPhase::ExecuteOrders => {
                    self.execute()?;
                }
                TurnPhase::EndTurn => {
                    self.end_turn()?;
                }
                other => return Err(SessionError::WrongPhase(other)),
            }
        }
        Ok(self.outcome())
    }

    /// Result so far; `winner` is set once someone has won.
    pub fn outcome(&self) -> GameOutcome {
        let winner = self.state.winner();
        GameOutcome {
            winner,
            winner_name: winner.and_then(|w| self.state.player(w)).map(|p| p.name.clone()),
            rounds: self.state.round,
        }
    }

    fn expect_phase(&self, phase: TurnPhase) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase(self.phase))
        }
    }

    fn disconnect(&mut self, player: PlayerId, err: LinkError) {
        if let Some(p) = self.state.player_mut(player) {
            if p.connected {
                tracing::warn!(player = %player, name = %p.name, %err, "player dropped");
            }
            p.connected = false;
        }
    }

    fn broadcast(&mut self, line: &str) {
        for (index, link) in self.links.iter_mut().enumerate() {
            let connected = self
                .state
                .player(PlayerId(index))
                .is_some_and(|p| p.connected);
            if connected {
                link.send(line);
            }
        }
    }

    fn name_of(&self, player: Option<PlayerId>) -> String {
        player
            .and_then(|p| self.state.player(p))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// One player's placement result.
struct Placement {
    allocations: Vec<(TerritoryId, u32)>,
    /// Set if the client went away before finishing.
    lost: Option<LinkError>,
}

/// Asks for a count for every owned territory but the last, which gets
/// whatever remains.
fn collect_placement(
    link: &mut dyn PlayerLink,
    player: PlayerId,
    snapshot: &MapSnapshot,
    owned: &[(TerritoryId, String)],
    units: u32,
) -> Placement {
    let mut placement = Placement {
        allocations: Vec::with_capacity(owned.len()),
        lost: None,
    };
    let Some(((last, last_name), rest)) = owned.split_last() else {
        return placement;
    };

    link.begin_placement(player, snapshot, units);
    let mut remaining = units;

    'territories: for (territory, name) in rest {
        loop {
            link.send(&format!("place {} remaining {}", name, remaining));
            let line = match link.next_line() {
                Ok(line) => line,
                Err(err) => {
                    placement.lost = Some(err);
                    break 'territories;
                }
            };
            match parse_placement(&line, remaining) {
                Ok(count) => {
                    placement.allocations.push((*territory, count));
                    remaining -= count;
                    break;
                }
                Err(err) => link.send(&format!("rejected '{}': {}", line.trim(), err)),
            }
        }
    }

    placement.allocations.push((*last, remaining));
    link.send(&format!("placed {} in {}", remaining, last_name));
    placement
}

/// Reads order lines until `D`. Malformed lines are answered and skipped.
fn collect_player_orders(
    link: &mut dyn PlayerLink,
    player: PlayerId,
    snapshot: &MapSnapshot,
    queue: &OrderQueue,
) -> Result<(), LinkError> {
    link.begin_round(player, snapshot);
    loop {
        let line = link.next_line()?;
        match parse_instruction(&line, player) {
            Ok(None) => {}
            Ok(Some(Instruction::Done)) => return Ok(()),
            Ok(Some(Instruction::Order(order))) => queue.push(order),
            Err(err) => link.send(&format!("rejected '{}': {}", line.trim(), err)),
        }
    }
}
