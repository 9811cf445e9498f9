//////////////////////////
// error.rs
//////////////////////////

use crate::types::{GameId, Position};

/// Why the engine refused a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("no piece at {0}")]
    NoPieceAtSource(Position),

    #[error("it is not that piece's turn")]
    WrongTurn,

    #[error("illegal move")]
    IllegalMove,

    #[error("game is already over")]
    GameOver,
}

/// Failures reported by the identity and game-persistence collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid auth token")]
    Unauthorized,

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("{0} seat is already taken")]
    SeatTaken(crate::types::Color),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Everything a single inbound command can fail with. All of these are
/// reported to the sender only and leave shared state untouched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid move: {0}")]
    InvalidMove(#[from] MoveError),

    #[error("game {0} not found")]
    NotFound(GameId),

    #[error("bad command: {0}")]
    Protocol(String),

    #[error("server problem: {0}")]
    Store(String),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized => SessionError::Unauthorized(err.to_string()),
            StoreError::GameNotFound(id) => SessionError::NotFound(id),
            StoreError::SeatTaken(_) | StoreError::Unavailable(_) => {
                SessionError::Store(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Protocol(err.to_string())
    }
}
