use crate::board::{Board, Color, PieceKind, Square};

// ============================================================================
// Offset and direction tables
// ============================================================================

pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

pub const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

pub const ROOK_DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub const QUEEN_DIRECTIONS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

// ============================================================================
// Attack oracle
// ============================================================================

/// Could a piece of `by` capture on `sq`? The occupant of `sq` itself is
/// not consulted; only attacker placement and blockers matter.
pub fn attacked(board: &Board, sq: Square, by: Color) -> bool {
    // Pawns: probe the two squares an attacking pawn would capture from,
    // one rank back along the attacker's direction of travel.
    let pawn_dir = by.forward();
    for file_delta in [-1i8, 1] {
        if let Some(origin) = sq.offset(file_delta, -pawn_dir) {
            if board.piece_at(origin).is(PieceKind::Pawn, by) {
                return true;
            }
        }
    }

    // Knights
    for (df, dr) in KNIGHT_OFFSETS {
        if let Some(origin) = sq.offset(df, dr) {
            if board.piece_at(origin).is(PieceKind::Knight, by) {
                return true;
            }
        }
    }

    // Enemy king adjacency
    for (df, dr) in KING_OFFSETS {
        if let Some(origin) = sq.offset(df, dr) {
            if board.piece_at(origin).is(PieceKind::King, by) {
                return true;
            }
        }
    }

    // Diagonal rays: bishop or queen
    for (df, dr) in BISHOP_DIRECTIONS {
        if ray_attacked(board, sq, df, dr, by, PieceKind::Bishop) {
            return true;
        }
    }

    // Orthogonal rays: rook or queen
    for (df, dr) in ROOK_DIRECTIONS {
        if ray_attacked(board, sq, df, dr, by, PieceKind::Rook) {
            return true;
        }
    }

    false
}

/// Walk one ray from `sq`; the first occupied square ends it. Attacked if
/// that piece belongs to `by` and is a queen or the given slider kind.
fn ray_attacked(
    board: &Board,
    sq: Square,
    file_dir: i8,
    rank_dir: i8,
    by: Color,
    slider: PieceKind,
) -> bool {
    let mut current = sq.offset(file_dir, rank_dir);
    while let Some(s) = current {
        let piece = board.piece_at(s);
        if !piece.is_empty() {
            return piece.color() == by
                && (piece.kind() == slider || piece.kind() == PieceKind::Queen);
        }
        current = s.offset(file_dir, rank_dir);
    }
    false
}

// ============================================================================
// Tests
// ============================================================================
