//////////////////////////
// moves.rs
//////////////////////////

//! Pseudo-legal move generation. Nothing here looks at whether the mover's
//! king ends up attacked; `Game` filters that out.

use crate::board::Board;
use crate::types::*;

const KING_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

/// Pseudo-legal moves for whatever stands on `from`.
///
/// Returns `None` when the square is empty, which callers must keep distinct
/// from a piece that has no moves (`Some` of an empty vec).
pub fn moves_for(board: &Board, from: Position) -> Option<Vec<ChessMove>> {
    let piece = board.piece_at(from)?;
    let mut moves = Vec::new();
    match piece.piece_type {
        PieceType::King => step_moves(board, from, piece.color, &KING_STEPS, &mut moves),
        PieceType::Knight => step_moves(board, from, piece.color, &KNIGHT_STEPS, &mut moves),
        PieceType::Rook => slide_moves(board, from, piece.color, &ROOK_RAYS, &mut moves),
        PieceType::Bishop => slide_moves(board, from, piece.color, &BISHOP_RAYS, &mut moves),
        PieceType::Queen => {
            slide_moves(board, from, piece.color, &ROOK_RAYS, &mut moves);
            slide_moves(board, from, piece.color, &BISHOP_RAYS, &mut moves);
        }
        PieceType::Pawn => pawn_moves(board, from, piece.color, &mut moves),
    }
    Some(moves)
}

/// True if the piece on `from` has a pseudo-legal move landing on `target`.
pub fn attacks(board: &Board, from: Position, target: Position) -> bool {
    moves_for(board, from)
        .map(|moves| moves.iter().any(|mv| mv.to == target))
        .unwrap_or(false)
}

/// True if any `by_color` piece attacks `target`.
pub fn is_square_attacked(board: &Board, target: Position, by_color: Color) -> bool {
    board
        .pieces()
        .filter(|(_, piece)| piece.color == by_color)
        .any(|(from, _)| attacks(board, from, target))
}

fn step_moves(
    board: &Board,
    from: Position,
    color: Color,
    steps: &[(i8, i8)],
    moves: &mut Vec<ChessMove>,
) {
    for &(dr, dc) in steps {
        let Some(to) = from.offset(dr, dc) else {
            continue;
        };
        match board.piece_at(to) {
            Some(other) if other.color == color => {}
            _ => moves.push(ChessMove::new(from, to)),
        }
    }
}

fn slide_moves(
    board: &Board,
    from: Position,
    color: Color,
    rays: &[(i8, i8)],
    moves: &mut Vec<ChessMove>,
) {
    for &(dr, dc) in rays {
        let mut cursor = from.offset(dr, dc);
        while let Some(to) = cursor {
            match board.piece_at(to) {
                None => moves.push(ChessMove::new(from, to)),
                Some(other) => {
                    if other.color != color {
                        moves.push(ChessMove::new(from, to));
                    }
                    break;
                }
            }
            cursor = to.offset(dr, dc);
        }
    }
}

fn pawn_moves(board: &Board, from: Position, color: Color, moves: &mut Vec<ChessMove>) {
    let forward = color.forward();

    // Single and double step, both need empty squares
    if let Some(one) = from.offset(forward, 0) {
        if board.is_empty_at(one) {
            push_pawn_move(from, one, color, moves);
            if from.row() == color.pawn_start_row() {
                if let Some(two) = one.offset(forward, 0) {
                    if board.is_empty_at(two) {
                        push_pawn_move(from, two, color, moves);
                    }
                }
            }
        }
    }

    // Diagonal captures only; no en passant
    for dc in [-1, 1] {
        let Some(to) = from.offset(forward, dc) else {
            continue;
        };
        if let Some(target) = board.piece_at(to) {
            if target.color != color {
                push_pawn_move(from, to, color, moves);
            }
        }
    }
}

fn push_pawn_move(from: Position, to: Position, color: Color, moves: &mut Vec<ChessMove>) {
    if to.row() == color.promotion_row() {
        moves.extend(
            PieceType::PROMOTIONS
                .iter()
                .map(|kind| ChessMove::promoting(from, to, *kind)),
        );
    } else {
        moves.push(ChessMove::new(from, to));
    }
}
