//! Hegemon -- a turn-based territory-conquest game server.
//!
//! Runs one session on the terminal. With `--human NAME` the first seat is
//! played over stdin/stdout using the line protocol; every other seat is
//! filled with a random bot.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hegemon::bot::RandomBot;
use hegemon::config::GameConfig;
use hegemon::turn::{ChannelLink, Coordinator};

/// Play a session of Hegemon
#[derive(Parser, Debug)]
#[command(name = "hegemon")]
#[command(about = "Play a territory-conquest session against random bots")]
struct Cli {
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of seats
    #[arg(long)]
    players: Option<usize>,

    /// Dice and bot seed
    #[arg(long)]
    seed: Option<u64>,

    /// End the game without a winner after this many rounds
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Seconds a human may stay silent before being dropped
    #[arg(long)]
    timeout: Option<u64>,

    /// Play the first seat yourself under this name
    #[arg(long)]
    human: Option<String>,

    /// Print the final board as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hegemon=warn")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(players) = cli.players {
        config.player_count = players;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.max_rounds = max_rounds;
    }
    if cli.timeout.is_some() {
        config.order_timeout_secs = cli.timeout;
    }
    config.validate()?;

    let bot_seed = config.seed.unwrap_or_else(rand::random);
    let mut coordinator = Coordinator::new(config.clone())?;
    let mut printer = None;

    if let Some(name) = &cli.human {
        let (link, client) = ChannelLink::pair(config.order_timeout());
        coordinator.join(name, Box::new(link))?;

        let lines = client.lines;
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if lines.send(line).is_err() {
                    break;
                }
            }
        });
        let replies = client.replies;
        printer = Some(thread::spawn(move || {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for reply in replies {
                if writeln!(out, "{}", reply).and_then(|_| out.flush()).is_err() {
                    break;
                }
            }
        }));
    }

    let seated = coordinator.state().players().len();
    for seat in seated..config.player_count {
        let bot = RandomBot::new(bot_seed.wrapping_add(seat as u64 + 1));
        coordinator.join(&format!("bot{}", seat), Box::new(bot))?;
    }

    let outcome = coordinator.run()?;
    tracing::info!(winner = ?outcome.winner_name, rounds = outcome.rounds, "session finished");
    let final_board = coordinator.snapshot();

    // Dropping the coordinator closes the human's reply channel.
    drop(coordinator);
    if let Some(printer) = printer {
        let _ = printer.join();
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        serde_json::to_writer(&mut out, &final_board)?;
        writeln!(out)?;
    } else if cli.human.is_none() {
        match &outcome.winner_name {
            Some(name) => writeln!(out, "winner {} after {} rounds", name, outcome.rounds)?,
            None => writeln!(out, "draw after {} rounds", outcome.rounds)?,
        }
    }
    Ok(())
}
