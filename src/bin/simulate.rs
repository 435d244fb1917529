//! Batch bot-game CLI.
//!
//! Plays many games between random bots and writes one JSON summary per
//! game, as JSONL. Useful for balance checks and soak-testing the turn
//! machinery.
//!
//! Usage:
//!   cargo run --release --bin simulate -- --games 100 --players 3

use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hegemon::config::GameConfig;
use hegemon::simulate::{self, SimulationConfig};

/// Batch bot games
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Play games between random bots and write JSONL summaries")]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 10)]
    games: usize,

    /// Parallel worker threads (1 plays sequentially)
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Base seed; game i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Seats per game
    #[arg(long)]
    players: Option<usize>,

    /// Round cap per game
    #[arg(long)]
    max_rounds: Option<u32>,

    /// TOML config file for the game settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Suppress progress and summary output
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut game = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(players) = args.players {
        game.player_count = players;
    }
    if let Some(max_rounds) = args.max_rounds {
        game.max_rounds = max_rounds;
    }
    game.validate()?;

    let config = SimulationConfig {
        games: args.games,
        threads: args.threads,
        seed: args.seed,
        game,
        quiet: args.quiet,
    };

    let start = Instant::now();
    let games = simulate::run_bot_games(&config)?;
    let elapsed = start.elapsed();

    if !args.quiet {
        let wins = simulate::win_counts(&games, config.game.player_count);
        let draws = games.iter().filter(|g| g.winner.is_none()).count();
        tracing::info!(
            games = games.len(),
            secs = elapsed.as_secs_f64(),
            ?wins,
            draws,
            "batch finished"
        );
    }

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            simulate::write_jsonl(&games, &mut writer)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            simulate::write_jsonl(&games, &mut writer)?;
        }
    }
    Ok(())
}
