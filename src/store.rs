//////////////////////////
// store.rs
//////////////////////////

//! Interfaces to the identity and game-persistence collaborators, plus an
//! in-memory implementation of both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::StoreError;
use crate::game::Game;
use crate::types::{Color, GameId};

pub trait IdentityResolver: Send + Sync {
    fn resolve_identity(&self, auth_token: &str) -> Result<String, StoreError>;
}

pub trait GameStore: Send + Sync {
    fn load_game(&self, game_id: GameId) -> Result<GameRecord, StoreError>;

    fn save_game(&self, game_id: GameId, game: &Game) -> Result<(), StoreError>;

    /// Frees whichever seat `username` holds in the game. A no-op for observers.
    fn clear_seat(&self, game_id: GameId, username: &str) -> Result<(), StoreError>;
}

/// A stored match: who sits where, plus the engine state. This is also the
/// payload of `LOAD_GAME`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    #[serde(rename = "whiteUsername")]
    pub white_username: Option<String>,
    #[serde(rename = "blackUsername")]
    pub black_username: Option<String>,
    #[serde(rename = "gameName")]
    pub game_name: String,
    pub game: Game,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Color),
    Observer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player(color) => write!(f, "{}", color),
            Role::Observer => write!(f, "observer"),
        }
    }
}

impl GameRecord {
    pub fn new(game_id: GameId, game_name: impl Into<String>) -> Self {
        GameRecord {
            game_id,
            white_username: None,
            black_username: None,
            game_name: game_name.into(),
            game: Game::new(),
        }
    }

    pub fn seat(&self, color: Color) -> Option<&str> {
        match color {
            Color::White => self.white_username.as_deref(),
            Color::Black => self.black_username.as_deref(),
        }
    }

    /// Roles are derived from the recorded seats on every lookup.
    pub fn role_of(&self, username: &str) -> Role {
        if self.white_username.as_deref() == Some(username) {
            Role::Player(Color::White)
        } else if self.black_username.as_deref() == Some(username) {
            Role::Player(Color::Black)
        } else {
            Role::Observer
        }
    }

    /// Name to show for a side: the seated player, or the color when empty.
    pub fn display_name(&self, color: Color) -> String {
        self.seat(color)
            .map(str::to_string)
            .unwrap_or_else(|| color.to_string())
    }
}

#[derive(Default)]
struct Tables {
    tokens: HashMap<String, String>,
    games: HashMap<GameId, GameRecord>,
    next_game_id: GameId,
}

/// Process-local store used by the binary and by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Issues a fresh auth token for `username`.
    pub fn register(&self, username: &str) -> Result<String, StoreError> {
        let token = Uuid::new_v4().to_string();
        self.write()?
            .tokens
            .insert(token.clone(), username.to_string());
        Ok(token)
    }

    pub fn create_game(&self, game_name: &str) -> Result<GameId, StoreError> {
        let mut tables = self.write()?;
        tables.next_game_id += 1;
        let game_id = tables.next_game_id;
        tables
            .games
            .insert(game_id, GameRecord::new(game_id, game_name));
        Ok(game_id)
    }

    /// Seats `username` as `color`. Re-joining your own seat is allowed.
    pub fn join_game(&self, game_id: GameId, color: Color, username: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let record = tables
            .games
            .get_mut(&game_id)
            .ok_or(StoreError::GameNotFound(game_id))?;
        let seat = match color {
            Color::White => &mut record.white_username,
            Color::Black => &mut record.black_username,
        };
        if matches!(seat.as_deref(), Some(existing) if existing != username) {
            return Err(StoreError::SeatTaken(color));
        }
        *seat = Some(username.to_string());
        Ok(())
    }
}

impl IdentityResolver for MemoryStore {
    fn resolve_identity(&self, auth_token: &str) -> Result<String, StoreError> {
        self.read()?
            .tokens
            .get(auth_token)
            .cloned()
            .ok_or(StoreError::Unauthorized)
    }
}

impl GameStore for MemoryStore {
    fn load_game(&self, game_id: GameId) -> Result<GameRecord, StoreError> {
        self.read()?
            .games
            .get(&game_id)
            .cloned()
            .ok_or(StoreError::GameNotFound(game_id))
    }

    fn save_game(&self, game_id: GameId, game: &Game) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let record = tables
            .games
            .get_mut(&game_id)
            .ok_or(StoreError::GameNotFound(game_id))?;
        record.game = game.clone();
        Ok(())
    }

    fn clear_seat(&self, game_id: GameId, username: &str) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let record = tables
            .games
            .get_mut(&game_id)
            .ok_or(StoreError::GameNotFound(game_id))?;
        if record.white_username.as_deref() == Some(username) {
            record.white_username = None;
        } else if record.black_username.as_deref() == Some(username) {
            record.black_username = None;
        }
        Ok(())
    }
}
