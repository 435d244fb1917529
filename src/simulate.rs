//! Batch bot games.
//!
//! Plays complete sessions between `RandomBot`s, either one after another or
//! concurrently on a rayon pool. Each game runs through the normal
//! coordinator, so every phase, thread barrier and rule is exercised.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::board::PlayerId;
use crate::bot::RandomBot;
use crate::config::GameConfig;
use crate::resolve::RngDice;
use crate::turn::{Coordinator, SessionError};

/// Round cap applied to bot games whose config leaves rounds unlimited.
pub const BOT_ROUND_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("cannot build thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Settings for a batch of bot games.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub games: usize,
    /// Worker threads; 1 plays the games sequentially.
    pub threads: usize,
    /// Base seed; game `i` uses `seed + i`. `None` picks one at random.
    pub seed: Option<u64>,
    pub game: GameConfig,
    pub quiet: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            games: 10,
            threads: 4,
            seed: None,
            game: GameConfig::default(),
            quiet: false,
        }
    }
}

/// Result of one bot game.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub game_id: usize,
    pub seed: u64,
    pub winner: Option<String>,
    pub rounds: u32,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub name: String,
    pub alive: bool,
    pub territories: usize,
    pub units: u32,
    pub max_tech_level: u8,
}

/// Plays one game between bots named `bot0`, `bot1`, ...
pub fn play_bot_game(config: &GameConfig, game_id: usize, seed: u64) -> Result<GameSummary, SessionError> {
    let mut config = config.clone();
    if config.max_rounds == 0 {
        config.max_rounds = BOT_ROUND_LIMIT;
    }
    let players = config.player_count;

    let mut coordinator = Coordinator::with_dice(config, RngDice(SmallRng::seed_from_u64(seed)))?;
    for i in 0..players {
        let bot = RandomBot::new(seed.wrapping_add(i as u64 + 1));
        coordinator.join(&format!("bot{}", i), Box::new(bot))?;
    }
    let outcome = coordinator.run()?;

    let state = coordinator.state();
    let players = state
        .players()
        .iter()
        .map(|p| PlayerSummary {
            name: p.name.clone(),
            alive: p.alive,
            territories: p.territories().len(),
            units: state.unit_total(p.id),
            max_tech_level: p.max_tech_level(),
        })
        .collect();

    Ok(GameSummary {
        game_id,
        seed,
        winner: outcome.winner_name,
        rounds: outcome.rounds,
        players,
    })
}

/// Plays every game in the batch and returns the summaries in completion
/// order.
pub fn run_bot_games(config: &SimulationConfig) -> Result<Vec<GameSummary>, SimulationError> {
    let mut games = Vec::with_capacity(config.games);
    run_bot_games_with_callback(config, |game| games.push(game))?;
    Ok(games)
}

/// Plays every game in the batch, handing each summary to `on_game` as
/// soon as it finishes.
pub fn run_bot_games_with_callback<F>(config: &SimulationConfig, on_game: F) -> Result<(), SimulationError>
where
    F: FnMut(GameSummary) + Send,
{
    let base_seed = config.seed.unwrap_or_else(rand::random);
    if config.threads > 1 {
        run_parallel(config, base_seed, on_game)
    } else {
        run_sequential(config, base_seed, on_game)
    }
}

fn run_sequential<F>(config: &SimulationConfig, base_seed: u64, mut on_game: F) -> Result<(), SimulationError>
where
    F: FnMut(GameSummary),
{
    for i in 0..config.games {
        let started = Instant::now();
        let game = play_bot_game(&config.game, i, base_seed.wrapping_add(i as u64))?;
        if !config.quiet {
            log_game(&game, i + 1, config.games, started);
        }
        on_game(game);
    }
    Ok(())
}

fn run_parallel<F>(config: &SimulationConfig, base_seed: u64, mut on_game: F) -> Result<(), SimulationError>
where
    F: FnMut(GameSummary) + Send,
{
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;
    let completed = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<Result<GameSummary, SessionError>>();

    std::thread::scope(|s| {
        let pool = &pool;
        let completed = &completed;
        s.spawn(move || {
            pool.install(|| {
                (0..config.games).into_par_iter().for_each_with(tx, |tx, i| {
                    let started = Instant::now();
                    let result = play_bot_game(&config.game, i, base_seed.wrapping_add(i as u64));
                    if let (Ok(game), false) = (&result, config.quiet) {
                        let n = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        log_game(game, n, config.games, started);
                    }
                    let _ = tx.send(result);
                });
            });
        });

        for result in rx {
            on_game(result?);
        }
        Ok(())
    })
}

fn log_game(game: &GameSummary, n: usize, total: usize, started: Instant) {
    tracing::info!(
        game = game.game_id,
        progress = %format!("{}/{}", n, total),
        winner = game.winner.as_deref().unwrap_or("draw"),
        rounds = game.rounds,
        secs = started.elapsed().as_secs_f64(),
        "bot game finished"
    );
}

/// Writes summaries as JSON lines.
pub fn write_jsonl<W: Write>(games: &[GameSummary], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Wins per player seat, for a quick balance check.
pub fn win_counts(games: &[GameSummary], players: usize) -> Vec<usize> {
    let mut wins = vec![0; players];
    for game in games {
        let Some(winner) = &game.winner else {
            continue;
        };
        if let Some(seat) = game.players.iter().position(|p| &p.name == winner) {
            if let Some(count) = wins.get_mut(seat) {
                *count += 1;
            }
        }
    }
    wins
}

impl GameSummary {
    pub fn winner_seat(&self) -> Option<PlayerId> {
        let winner = self.winner.as_ref()?;
        self.players.iter().position(|p| &p.name == winner).map(PlayerId)
    }
}
