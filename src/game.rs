//////////////////////////
// game.rs
//////////////////////////

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::Board;
use crate::error::MoveError;
use crate::moves;
use crate::types::*;

/// What a successful move did to the opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Normal,
    Check(Color),
    Checkmate(Color),
    Stalemate(Color),
}

impl MoveOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MoveOutcome::Checkmate(_) | MoveOutcome::Stalemate(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    turn: Color,
    over: bool,
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.board)?;
        if self.over {
            write!(f, "Game over")
        } else {
            write!(f, "Turn: {}", self.turn)
        }
    }
}

impl Game {
    pub fn new() -> Self {
        Game {
            board: Board::standard(),
            turn: Color::White,
            over: false,
        }
    }

    pub fn with_board(board: Board, turn: Color) -> Self {
        Game {
            board,
            turn,
            over: false,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Legal moves for the piece on `from`, or `None` if the square is empty.
    pub fn legal_moves(&self, from: Position) -> Option<Vec<ChessMove>> {
        let piece = self.board.piece_at(from)?;
        let candidates = moves::moves_for(&self.board, from)?;
        Some(
            candidates
                .into_iter()
                .filter(|mv| {
                    let mut test_board = self.board.clone();
                    apply(&mut test_board, mv);
                    !king_in_danger(&test_board, piece.color)
                })
                .collect(),
        )
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        king_in_danger(&self.board, color)
    }

    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_any_legal_move(color)
    }

    fn has_any_legal_move(&self, color: Color) -> bool {
        self.board
            .pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(pos, _)| {
                self.legal_moves(pos)
                    .map(|moves| !moves.is_empty())
                    .unwrap_or(false)
            })
    }

    /// Applies `mv` for the side to move and flips the turn. This is the only
    /// way the board changes.
    pub fn make_move(&mut self, mv: ChessMove) -> Result<MoveOutcome, MoveError> {
        if self.over {
            return Err(MoveError::GameOver);
        }
        let piece = self
            .board
            .piece_at(mv.from)
            .ok_or(MoveError::NoPieceAtSource(mv.from))?;
        if piece.color != self.turn {
            return Err(MoveError::WrongTurn);
        }
        let legal = self.legal_moves(mv.from).unwrap_or_default();
        if !legal.contains(&mv) {
            return Err(MoveError::IllegalMove);
        }

        apply(&mut self.board, &mv);
        self.turn = self.turn.opposite();

        let opponent = self.turn;
        let outcome = if self.is_in_checkmate(opponent) {
            MoveOutcome::Checkmate(opponent)
        } else if self.is_in_stalemate(opponent) {
            MoveOutcome::Stalemate(opponent)
        } else if self.is_in_check(opponent) {
            MoveOutcome::Check(opponent)
        } else {
            MoveOutcome::Normal
        };
        if outcome.is_terminal() {
            self.over = true;
        }
        Ok(outcome)
    }

    /// Ends the game. The board and turn are left as they are.
    pub fn resign(&mut self) {
        self.over = true;
    }
}

fn apply(board: &mut Board, mv: &ChessMove) {
    let Some(moving) = board.piece_at(mv.from) else {
        return;
    };
    let placed = match mv.promotion {
        Some(kind) => Piece::new(moving.color, kind),
        None => moving,
    };
    board.set(mv.from, None);
    board.set(mv.to, Some(placed));
}

// A side without a king counts as permanently in check.
fn king_in_danger(board: &Board, color: Color) -> bool {
    match board.king_position(color) {
        Some(king) => moves::is_square_attacked(board, king, color.opposite()),
        None => true,
    }
}
