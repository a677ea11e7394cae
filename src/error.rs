use serde::Serialize;
use thiserror::Error;

/// Contract violations reported by the engine.
///
/// An operation that returns one of these has left the game untouched, so the
/// caller can simply prompt again.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GameError {
    #[error("invalid transition: {0}")]
    InvalidTransition(String),
    #[error("insufficient troops: requested {requested}, available {available}")]
    InsufficientTroops { requested: u16, available: u16 },
    #[error("invalid target: {0}")]
    InvalidTarget(String),
    #[error("the main deck is empty")]
    EmptyDeck,
    #[error("illegal set selection: {0}")]
    IllegalSetSelection(String),
    #[error("unknown territory '{0}'")]
    UnknownTerritory(String),
    #[error("unknown player {0}")]
    UnknownPlayer(usize),
    #[error("{value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: u16, min: u16, max: u16 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read game data: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse game data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid game data: {0}")]
    Invalid(String),
}
