//////////////////////////
// types.rs
//////////////////////////

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::GameRecord;

pub type GameId = i32;

// ----- Basic Chess Types -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceType {
    King,
    Queen,
    Bishop,
    Knight,
    Rook,
    Pawn,
}

impl PieceType {
    /// Kinds a pawn may turn into on the last rank.
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row delta a pawn of this color advances by.
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub fn pawn_start_row(&self) -> u8 {
        match self {
            Color::White => 2,
            Color::Black => 7,
        }
    }

    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 8,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    #[serde(rename = "kind")]
    pub piece_type: PieceType,
}

impl Piece {
    pub const fn new(color: Color, piece_type: PieceType) -> Self {
        Piece { color, piece_type }
    }
}

/// A square on the board. Rows and columns both run 1..=8; row 1 is white's
/// back rank and column 1 is the a-file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    row: u8,
    column: u8,
}

#[derive(Deserialize)]
struct RawPosition {
    row: i32,
    column: i32,
}

#[derive(Debug, thiserror::Error)]
#[error("square ({row}, {column}) is off the board")]
pub struct OffBoard {
    row: i32,
    column: i32,
}

impl TryFrom<RawPosition> for Position {
    type Error = OffBoard;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Position::new(raw.row, raw.column).ok_or(OffBoard {
            row: raw.row,
            column: raw.column,
        })
    }
}

impl Position {
    pub fn new(row: i32, column: i32) -> Option<Self> {
        if (1..=8).contains(&row) && (1..=8).contains(&column) {
            Some(Position {
                row: row as u8,
                column: column as u8,
            })
        } else {
            None
        }
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn column(&self) -> u8 {
        self.column
    }

    /// The square `dr` rows and `dc` columns away, if it is still on the board.
    pub fn offset(&self, dr: i8, dc: i8) -> Option<Self> {
        Position::new(self.row as i32 + dr as i32, self.column as i32 + dc as i32)
    }

    /// Every square, row by row starting at row 1.
    pub fn all() -> impl Iterator<Item = Position> {
        (1..=8u8).flat_map(|row| (1..=8u8).map(move |column| Position { row, column }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = (b'a' + self.column - 1) as char;
        write!(f, "{}{}", file, self.row)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChessMove {
    #[serde(alias = "startPosition")]
    pub from: Position,
    #[serde(alias = "endPosition")]
    pub to: Position,
    #[serde(default, alias = "promotionPiece", skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
}

impl ChessMove {
    pub fn new(from: Position, to: Position) -> Self {
        ChessMove { from, to, promotion: None }
    }

    pub fn promoting(from: Position, to: Position, promotion: PieceType) -> Self {
        ChessMove {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

impl fmt::Display for ChessMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, " ({:?})", kind)?;
        }
        Ok(())
    }
}

// Types for WebSocket communication

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Connect,
    MakeMove,
    Leave,
    Resign,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserGameCommand {
    pub command_type: CommandType,
    #[serde(default)]
    pub auth_token: String,
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub chess_move: Option<ChessMove>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "serverMessageType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    LoadGame {
        game: GameRecord,
    },
    Notification {
        message: String,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl ServerMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        ServerMessage::Notification {
            message: message.into(),
        }
    }

    pub fn error(err: &impl fmt::Display) -> Self {
        ServerMessage::Error {
            error_message: format!("Error: {}", err),
        }
    }
}
