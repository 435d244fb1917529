//! Order line parser.
//!
//! Turns one line of client input into an `Instruction`. The grammar is:
//!
//! ```text
//! M <source> <dest> <level> <count>
//! A <source> <dest> <level> <count>
//! U <territory> <currentLevel> <targetLevel> <count>
//! T
//! FA <player>
//! D
//! ```
//!
//! Only syntax is checked here. Whether the named territories exist or the
//! order makes sense is decided when the order executes.

use thiserror::Error;

use crate::board::{Order, PlayerId};

/// Errors for syntactically bad input lines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),

    #[error("'{verb}' takes {expected} argument(s), got {found}")]
    WrongArity {
        verb: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("'{0}' is not a valid number")]
    NotANumber(String),

    #[error("cannot place {requested} units, only {remaining} left")]
    TooManyUnits { requested: u32, remaining: u32 },
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Order(Order),
    /// `D`: the player is done for this round.
    Done,
}

/// Parses one order line for `player`.
///
/// Returns `Ok(None)` for blank lines. Verbs are case-insensitive.
pub fn parse_instruction(line: &str, player: PlayerId) -> Result<Option<Instruction>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let instruction = match verb.to_ascii_uppercase().as_str() {
        "M" => {
            let [source, dest, level, count] = arity::<4>("M", args)?;
            Instruction::Order(Order::Move {
                player,
                source: source.to_string(),
                dest: dest.to_string(),
                level: number(level)?,
                count: number(count)?,
            })
        }
        "A" => {
            let [source, dest, level, count] = arity::<4>("A", args)?;
            Instruction::Order(Order::Attack {
                player,
                source: source.to_string(),
                dest: dest.to_string(),
                level: number(level)?,
                count: number(count)?,
            })
        }
        "U" => {
            let [territory, from, to, count] = arity::<4>("U", args)?;
            Instruction::Order(Order::UpgradeUnit {
                player,
                territory: territory.to_string(),
                from_level: number(from)?,
                to_level: number(to)?,
                count: number(count)?,
            })
        }
        "T" => {
            arity::<0>("T", args)?;
            Instruction::Order(Order::TechUpgrade { player })
        }
        "FA" => {
            let [target] = arity::<1>("FA", args)?;
            Instruction::Order(Order::Alliance {
                player,
                target: target.to_string(),
            })
        }
        "D" => {
            arity::<0>("D", args)?;
            Instruction::Done
        }
        _ => return Err(ParseError::UnknownInstruction(verb.to_string())),
    };

    Ok(Some(instruction))
}

/// Parses an initial-placement reply: a single unit count no larger than
/// `remaining`.
pub fn parse_placement(line: &str, remaining: u32) -> Result<u32, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let [count] = arity::<1>("placement", &tokens)?;
    let requested: u32 = number(count)?;
    if requested > remaining {
        return Err(ParseError::TooManyUnits { requested, remaining });
    }
    Ok(requested)
}

fn arity<'a, const N: usize>(verb: &'static str, args: &[&'a str]) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(args).map_err(|_| ParseError::WrongArity {
        verb,
        expected: N,
        found: args.len(),
    })
}

fn number<T: std::str::FromStr>(token: &str) -> Result<T, ParseError> {
    token
        .parse()
        .map_err(|_| ParseError::NotANumber(token.to_string()))
}
