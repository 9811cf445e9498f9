//////////////////////////
// board.rs
//////////////////////////

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::*;

/// An 8x8 grid of optional pieces. `squares[row - 1][column - 1]` holds the
/// piece on a square, so row 1 (white's back rank) comes first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    squares: [[Option<Piece>; 8]; 8],
}

impl Board {
    pub fn new() -> Self {
        Board {
            squares: [[None; 8]; 8],
        }
    }

    pub fn standard() -> Self {
        let mut board = Board::new();
        board.setup_initial_position();
        board
    }

    pub fn setup_initial_position(&mut self) {
        const BACK_RANK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        self.squares = [[None; 8]; 8];
        for (col, kind) in BACK_RANK.iter().enumerate() {
            self.squares[0][col] = Some(Piece::new(Color::White, *kind));
            self.squares[1][col] = Some(Piece::new(Color::White, PieceType::Pawn));
            self.squares[6][col] = Some(Piece::new(Color::Black, PieceType::Pawn));
            self.squares[7][col] = Some(Piece::new(Color::Black, *kind));
        }
    }

    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.squares[pos.row() as usize - 1][pos.column() as usize - 1]
    }

    /// Places `piece` on `pos`, or clears the square when `piece` is `None`.
    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        self.squares[pos.row() as usize - 1][pos.column() as usize - 1] = piece;
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.piece_at(pos).is_none()
    }

    /// Every occupied square with its piece.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |pos| self.piece_at(pos).map(|piece| (pos, piece)))
    }

    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, piece)| piece.color == color && piece.piece_type == PieceType::King)
            .map(|(pos, _)| pos)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  a b c d e f g h")?;
        for row in (1..=8).rev() {
            write!(f, "{} ", row)?;
            for column in 1..=8 {
                let glyph = match Position::new(row, column).and_then(|pos| self.piece_at(pos)) {
                    Some(p) => match (p.piece_type, p.color) {
                        (PieceType::Pawn, Color::White) => "♙",
                        (PieceType::Pawn, Color::Black) => "♟",
                        (PieceType::Knight, Color::White) => "♘",
                        (PieceType::Knight, Color::Black) => "♞",
                        (PieceType::Bishop, Color::White) => "♗",
                        (PieceType::Bishop, Color::Black) => "♝",
                        (PieceType::Rook, Color::White) => "♖",
                        (PieceType::Rook, Color::Black) => "♜",
                        (PieceType::Queen, Color::White) => "♕",
                        (PieceType::Queen, Color::Black) => "♛",
                        (PieceType::King, Color::White) => "♔",
                        (PieceType::King, Color::Black) => "♚",
                    },
                    None => "·",
                };
                write!(f, "{} ", glyph)?;
            }
            writeln!(f, "{}", row)?;
        }
        write!(f, "  a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: i32, column: i32) -> Position {
        Position::new(row, column).unwrap()
    }

    #[test]
    fn standard_setup_places_both_armies() {
        let board = Board::standard();
        assert_eq!(board.pieces().count(), 32);
        assert_eq!(
            board.piece_at(pos(1, 5)),
            Some(Piece::new(Color::White, PieceType::King))
        );
        assert_eq!(
            board.piece_at(pos(8, 4)),
            Some(Piece::new(Color::Black, PieceType::Queen))
        );
        assert_eq!(board.king_position(Color::Black), Some(pos(8, 5)));
        assert!(board.is_empty_at(pos(4, 4)));
    }

    #[test]
    fn clones_do_not_share_squares() {
        let original = Board::standard();
        let mut copy = original.clone();
        copy.set(pos(2, 5), None);
        copy.set(pos(4, 5), Some(Piece::new(Color::White, PieceType::Pawn)));

        assert!(original.piece_at(pos(2, 5)).is_some());
        assert!(original.is_empty_at(pos(4, 5)));
        assert_ne!(original, copy);
    }

    #[test]
    fn missing_king_is_reported() {
        let mut board = Board::new();
        assert_eq!(board.king_position(Color::White), None);
        board.set(pos(3, 3), Some(Piece::new(Color::White, PieceType::King)));
        assert_eq!(board.king_position(Color::White), Some(pos(3, 3)));
    }
}
