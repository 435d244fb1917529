//! Session configuration.
//!
//! Loaded from a TOML file; every field is optional and falls back to the
//! default. Command-line flags override individual fields afterwards.
//!
//! ```toml
//! player_count = 3
//! initial_units = 12
//! order_timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("a session needs at least two players, got {0}")]
    TooFewPlayers(usize),
}

/// Settings for one game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of players the session waits for before starting.
    pub player_count: usize,
    /// Level-0 units each player distributes during initial placement.
    pub initial_units: u32,
    pub initial_food: u32,
    pub initial_tech: u32,
    /// Rounds after which the game ends without a winner (0 = unlimited).
    pub max_rounds: u32,
    /// How long a client may stay silent during placement or order
    /// collection before it is treated as disconnected.
    pub order_timeout_secs: Option<u64>,
    /// Dice seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            player_count: 2,
            initial_units: 10,
            initial_food: 50,
            initial_tech: 50,
            max_rounds: 0,
            order_timeout_secs: None,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.player_count < 2 {
            return Err(ConfigError::TooFewPlayers(self.player_count));
        }
        Ok(())
    }

    pub fn order_timeout(&self) -> Option<Duration> {
        self.order_timeout_secs.map(Duration::from_secs)
    }
}
