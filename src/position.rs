use crate::attacks;
use crate::board::{Board, Color, Piece, PieceKind, Square};
use crate::movegen;
use crate::moves::{Move, MoveFlag};
use crate::search::zobrist;
use crate::ChessError;
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::error;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Castling-rights bits, KQkq order.
pub const WHITE_KING_SIDE: u8 = 1;
pub const WHITE_QUEEN_SIDE: u8 = 2;
pub const BLACK_KING_SIDE: u8 = 4;
pub const BLACK_QUEEN_SIDE: u8 = 8;

/// Per-move undo record. Only the delta is kept; `unmake` inverts the
/// board mutation explicitly and restores the copied scalars.
#[derive(Clone, Copy)]
struct Undo {
    mv: Move,
    captured: Piece,
    captured_sq: Square,
    castling: u8,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    key: u64,
}

// ============================================================================
// Position
// ============================================================================

/// Full game state: mailbox board, side to move, castling rights,
/// en-passant target, clocks, cached king squares, and the incrementally
/// maintained Zobrist key. Mutation goes exclusively through
/// `make`/`unmake` (and their null-move variants), each of which pushes or
/// pops one undo record, so any sequence of makes can be unwound exactly.
#[derive(Clone)]
pub struct Position {
    board: Board,
    side_to_move: Color,
    castling: u8,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
    king_squares: [Square; 2],
    key: u64,
    /// Keys of every earlier position in make-order, for repetition checks.
    key_history: Vec<u64>,
    undo_stack: Vec<Undo>,
    /// Null moves currently on the stack; repetition scans are meaningless
    /// across a null boundary and are suppressed while nonzero.
    null_moves: u8,
}

impl Position {
    /// The standard starting position.
    pub fn starting() -> Position {
        Position::from_fen(START_FEN).expect("start position FEN parses")
    }

    // ------------------------------------------------------------------
    // FEN
    // ------------------------------------------------------------------

    /// Parse a six-field FEN string.
    pub fn from_fen(fen: &str) -> Result<Position, ChessError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ChessError::InvalidFen(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        }

        let mut board = Board::empty();
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ChessError::InvalidFen(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u32;
            for c in rank_str.chars() {
                if let Some(d) = c.to_digit(10) {
                    if !(1..=8).contains(&d) {
                        return Err(ChessError::InvalidFen(format!("bad skip count '{c}'")));
                    }
                    file += d;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or_else(|| {
                        ChessError::InvalidFen(format!("bad piece character '{c}'"))
                    })?;
                    if file >= 8 {
                        return Err(ChessError::InvalidFen(format!("rank {} overflows", rank + 1)));
                    }
                    board.set(Square::from_file_rank(file as u8, rank), piece);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(ChessError::InvalidFen(format!(
                    "rank {} has {} files",
                    rank + 1,
                    file
                )));
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(ChessError::InvalidFen(format!("bad side to move '{other}'")));
            }
        };

        let mut castling = 0u8;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                castling |= match c {
                    'K' => WHITE_KING_SIDE,
                    'Q' => WHITE_QUEEN_SIDE,
                    'k' => BLACK_KING_SIDE,
                    'q' => BLACK_QUEEN_SIDE,
                    _ => {
                        return Err(ChessError::InvalidFen(format!(
                            "bad castling character '{c}'"
                        )));
                    }
                };
            }
        }

        let en_passant = match fields[3] {
            "-" => None,
            s => {
                let sq = Square::from_algebraic(s).ok_or_else(|| {
                    ChessError::InvalidFen(format!("bad en passant square '{s}'"))
                })?;
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(ChessError::InvalidFen(format!(
                        "en passant target '{s}' not on rank 3 or 6"
                    )));
                }
                Some(sq)
            }
        };

        let halfmove_clock: u16 = fields[4]
            .parse()
            .map_err(|_| ChessError::InvalidFen(format!("bad halfmove clock '{}'", fields[4])))?;
        let fullmove_number: u16 = fields[5]
            .parse()
            .map_err(|_| ChessError::InvalidFen(format!("bad fullmove number '{}'", fields[5])))?;
        if fullmove_number == 0 {
            return Err(ChessError::InvalidFen("fullmove number must be positive".into()));
        }

        for color in [Color::White, Color::Black] {
            let king = Piece::new(PieceKind::King, color);
            let count = board.pieces().filter(|&(_, p)| p == king).count();
            if count != 1 {
                return Err(ChessError::InvalidFen(format!(
                    "expected exactly one {color:?} king, found {count}"
                )));
            }
        }
        let king_squares = [
            board.find_king(Color::White).unwrap_or(Square::E1),
            board.find_king(Color::Black).unwrap_or(Square::E8),
        ];

        let mut pos = Position {
            board,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
            king_squares,
            key: 0,
            key_history: Vec::with_capacity(128),
            undo_stack: Vec::with_capacity(128),
            null_moves: 0,
        };
        pos.key = zobrist::compute_key(&pos);
        Ok(pos)
    }

    /// Serialize back to FEN. Round-trips anything `from_fen` accepts as
    /// well as any position reached through `make`.
    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(80);
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                let piece = self.board.piece_at(Square::from_file_rank(file, rank));
                if piece.is_empty() {
                    empty_run += 1;
                } else {
                    if empty_run > 0 {
                        fen.push(char::from_digit(empty_run, 10).unwrap_or('0'));
                        empty_run = 0;
                    }
                    fen.push(piece.to_fen_char());
                }
            }
            if empty_run > 0 {
                fen.push(char::from_digit(empty_run, 10).unwrap_or('0'));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling == 0 {
            fen.push('-');
        } else {
            for (bit, c) in [
                (WHITE_KING_SIDE, 'K'),
                (WHITE_QUEEN_SIDE, 'Q'),
                (BLACK_KING_SIDE, 'k'),
                (BLACK_QUEEN_SIDE, 'q'),
            ] {
                if self.castling & bit != 0 {
                    fen.push(c);
                }
            }
        }

        fen.push(' ');
        match self.en_passant {
            Some(sq) => fen.push_str(&sq.to_string()),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.board.piece_at(sq)
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_squares[color.index()]
    }

    #[inline]
    pub fn castling_rights(&self) -> u8 {
        self.castling
    }

    #[inline]
    pub fn has_castling_right(&self, bit: u8) -> bool {
        self.castling & bit != 0
    }

    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// The Zobrist key, maintained incrementally across make/unmake.
    #[inline]
    pub fn key(&self) -> u64 {
        self.key
    }

    #[inline]
    pub fn in_check(&self, color: Color) -> bool {
        attacks::attacked(&self.board, self.king_square(color), color.opponent())
    }

    // ------------------------------------------------------------------
    // Make / unmake
    // ------------------------------------------------------------------

    /// Make a move after validating it against the legal move set.
    /// The position is untouched when `Err` is returned.
    pub fn make(&mut self, mv: Move) -> Result<(), ChessError> {
        if mv.is_null() || !self.legal(mv) {
            return Err(ChessError::IllegalMove(mv.to_uci()));
        }
        self.make_unchecked(mv);
        Ok(())
    }

    /// Is `mv` pseudo-legal here and does making it leave the mover's king
    /// unattacked? Castling safety was already handled at generation time.
    pub fn legal(&mut self, mv: Move) -> bool {
        let pseudo = movegen::generate_all(self);
        if !pseudo.iter().any(|m| m.same_action(mv)) {
            return false;
        }
        let mover = self.side_to_move;
        self.make_unchecked(mv);
        let safe = !self.in_check(mover);
        self.unmake();
        safe
    }

    /// Apply a pseudo-legal move without legality checks. Search and the
    /// generators use this; external callers go through [`Position::make`].
    pub(crate) fn make_unchecked(&mut self, mv: Move) {
        let us = self.side_to_move;
        let moving = self.board.piece_at(mv.from);
        debug_assert!(moving.is_color(us), "no {us:?} piece on {}", mv.from);

        let (captured, captured_sq) = match mv.flags {
            MoveFlag::EnPassant => {
                let sq = Square::from_file_rank(mv.to.file(), mv.from.rank());
                (self.board.piece_at(sq), sq)
            }
            f if f.is_capture() => (self.board.piece_at(mv.to), mv.to),
            _ => (Piece::EMPTY, mv.to),
        };

        self.undo_stack.push(Undo {
            mv,
            captured,
            captured_sq,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            key: self.key,
        });
        self.key_history.push(self.key);

        // Board mutation, mirrored into the key piece by piece.
        self.key ^= zobrist::piece_key(moving, mv.from);
        self.board.remove(mv.from);
        if !captured.is_empty() {
            self.key ^= zobrist::piece_key(captured, captured_sq);
            self.board.remove(captured_sq);
        }
        let placed = match mv.flags.promotion_kind() {
            Some(kind) => Piece::new(kind, us),
            None => moving,
        };
        self.board.set(mv.to, placed);
        self.key ^= zobrist::piece_key(placed, mv.to);

        // Castling relocates the rook to the square the king crossed.
        match mv.flags {
            MoveFlag::KingCastle => self.move_castle_rook(mv.from.rank(), 7, 5),
            MoveFlag::QueenCastle => self.move_castle_rook(mv.from.rank(), 0, 3),
            _ => {}
        }

        if moving.kind() == PieceKind::King {
            self.king_squares[us.index()] = mv.to;
        }

        // Castling rights: king moves drop both bits for the mover; any
        // move touching a corner square drops that corner's bit, which
        // also covers captures of a rook still on its home square.
        let old_castling = self.castling;
        if moving.kind() == PieceKind::King {
            self.castling &= match us {
                Color::White => !(WHITE_KING_SIDE | WHITE_QUEEN_SIDE),
                Color::Black => !(BLACK_KING_SIDE | BLACK_QUEEN_SIDE),
            };
        }
        for (corner, bit) in [
            (Square::A1, WHITE_QUEEN_SIDE),
            (Square::H1, WHITE_KING_SIDE),
            (Square::A8, BLACK_QUEEN_SIDE),
            (Square::H8, BLACK_KING_SIDE),
        ] {
            if mv.from == corner || mv.to == corner {
                self.castling &= !bit;
            }
        }
        self.key ^= zobrist::castling_key(old_castling) ^ zobrist::castling_key(self.castling);

        // En-passant target follows a double push, otherwise clears.
        if let Some(ep) = self.en_passant {
            self.key ^= zobrist::en_passant_key(ep);
        }
        self.en_passant = match mv.flags {
            MoveFlag::DoublePawnPush => mv.from.offset(0, us.forward()),
            _ => None,
        };
        if let Some(ep) = self.en_passant {
            self.key ^= zobrist::en_passant_key(ep);
        }

        if moving.kind() == PieceKind::Pawn || !captured.is_empty() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }
        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.side_to_move = us.opponent();
        self.key ^= zobrist::SIDE_TO_MOVE;

        self.check_consistency();
    }

    /// Invert the most recent `make`. Restores the position byte for byte,
    /// clocks and key included.
    pub fn unmake(&mut self) {
        let Some(undo) = self.undo_stack.pop() else {
            error!("unmake called with nothing to undo");
            return;
        };
        debug_assert!(!undo.mv.is_null(), "null moves are undone by unmake_null");
        self.key_history.pop();

        let mv = undo.mv;
        let us = self.side_to_move.opponent();

        let placed = self.board.piece_at(mv.to);
        let moving = if mv.flags.is_promotion() {
            Piece::new(PieceKind::Pawn, us)
        } else {
            placed
        };
        self.board.remove(mv.to);
        self.board.set(mv.from, moving);
        if !undo.captured.is_empty() {
            self.board.set(undo.captured_sq, undo.captured);
        }
        match mv.flags {
            MoveFlag::KingCastle => self.move_castle_rook(mv.from.rank(), 5, 7),
            MoveFlag::QueenCastle => self.move_castle_rook(mv.from.rank(), 3, 0),
            _ => {}
        }
        if moving.kind() == PieceKind::King {
            self.king_squares[us.index()] = mv.from;
        }

        self.castling = undo.castling;
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
        self.side_to_move = us;
        self.key = undo.key;

        self.check_consistency();
    }

    /// Pass the move to the opponent: flip side, clear the en-passant
    /// target, bump the halfmove clock. Search-only.
    pub fn make_null(&mut self) {
        self.undo_stack.push(Undo {
            mv: Move::NULL,
            captured: Piece::EMPTY,
            captured_sq: Square::A1,
            castling: self.castling,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            key: self.key,
        });
        self.key_history.push(self.key);

        if let Some(ep) = self.en_passant {
            self.key ^= zobrist::en_passant_key(ep);
        }
        self.en_passant = None;
        self.halfmove_clock += 1;
        self.side_to_move = self.side_to_move.opponent();
        self.key ^= zobrist::SIDE_TO_MOVE;
        self.null_moves += 1;

        self.check_consistency();
    }

    pub fn unmake_null(&mut self) {
        let Some(undo) = self.undo_stack.pop() else {
            error!("unmake_null called with nothing to undo");
            return;
        };
        debug_assert!(undo.mv.is_null(), "top of undo stack is a real move");
        self.key_history.pop();

        self.side_to_move = self.side_to_move.opponent();
        self.en_passant = undo.en_passant;
        self.halfmove_clock = undo.halfmove_clock;
        self.key = undo.key;
        self.null_moves -= 1;
    }

    fn move_castle_rook(&mut self, rank: u8, from_file: u8, to_file: u8) {
        let from = Square::from_file_rank(from_file, rank);
        let to = Square::from_file_rank(to_file, rank);
        let rook = self.board.piece_at(from);
        self.key ^= zobrist::piece_key(rook, from) ^ zobrist::piece_key(rook, to);
        self.board.remove(from);
        self.board.set(to, rook);
    }

    /// Key and king-cache invariants, verified after every mutation:
    /// a violation panics in debug builds and is logged in release
    /// builds, where play continues on the recomputed state.
    fn check_consistency(&mut self) {
        let recomputed = zobrist::compute_key(self);
        if self.key != recomputed {
            debug_assert_eq!(
                self.key, recomputed,
                "incremental key diverged from recomputed key"
            );
            error!(
                key = self.key,
                recomputed, "incremental key diverged from recomputed key"
            );
            self.key = recomputed;
        }
        for color in [Color::White, Color::Black] {
            let cached = self.king_square(color);
            if !self.board.piece_at(cached).is(PieceKind::King, color) {
                debug_assert!(false, "king cache for {color:?} points at {cached}");
                error!(?color, %cached, "king cache points at the wrong square");
                if let Some(actual) = self.board.find_king(color) {
                    self.king_squares[color.index()] = actual;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Repetition
    // ------------------------------------------------------------------

    /// Has the current position occurred before since the last irreversible
    /// move? Used by search to score shuffling lines as draws. Always false
    /// while a null move is on the stack.
    pub fn is_repetition(&self) -> bool {
        if self.null_moves > 0 {
            return false;
        }
        self.prior_occurrences().next().is_some()
    }

    /// Threefold repetition: the current position has occurred at least
    /// twice before.
    pub fn is_draw_by_repetition(&self) -> bool {
        self.prior_occurrences().count() >= 2
    }

    /// Earlier keys equal to the current one, scanning same-side positions
    /// within the halfmove-clock window.
    fn prior_occurrences(&self) -> impl Iterator<Item = u64> + '_ {
        let window = self.halfmove_clock as usize;
        let key = self.key;
        self.key_history
            .iter()
            .rev()
            .take(window)
            .skip(1)
            .step_by(2)
            .copied()
            .filter(move |&k| k == key)
    }

    // ------------------------------------------------------------------
    // Perft
    // ------------------------------------------------------------------

    /// Count leaf nodes of the legal move tree to `depth`.
    pub fn perft(&mut self, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = movegen::generate_all(self);
        let us = self.side_to_move;
        let mut nodes = 0;
        for m in moves {
            self.make_unchecked(m);
            if !self.in_check(us) {
                nodes += if depth == 1 { 1 } else { self.perft(depth - 1) };
            }
            self.unmake();
        }
        nodes
    }

    /// Per-root-move perft counts, keyed by UCI notation.
    pub fn perft_divide(&mut self, depth: u32) -> FxHashMap<String, u64> {
        let mut counts = FxHashMap::default();
        for m in movegen::generate_legal(self) {
            self.make_unchecked(m);
            let nodes = if depth <= 1 { 1 } else { self.perft(depth - 1) };
            self.unmake();
            counts.insert(m.to_uci(), nodes);
        }
        counts
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  a b c d e f g h")?;
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let piece = self.board.piece_at(Square::from_file_rank(file, rank));
                if piece.is_empty() {
                    write!(f, ". ")?;
                } else {
                    write!(f, "{} ", piece.to_fen_char())?;
                }
            }
            writeln!(f, "{}", rank + 1)?;
        }
        writeln!(f, "  a b c d e f g h")?;
        write!(f, "FEN: {}", self.to_fen())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn uci(pos: &mut Position, s: &str) -> Move {
        Move::from_uci(s, pos).unwrap_or_else(|| panic!("{s} should be legal"))
    }

    #[test]
    fn test_start_fen_roundtrip() {
        let pos = Position::starting();
        assert_eq!(pos.to_fen(), START_FEN);
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.castling_rights(), 0b1111);
        assert_eq!(pos.king_square(Color::White), Square::E1);
        assert_eq!(pos.king_square(Color::Black), Square::E8);
    }

    #[test]
    fn test_fen_roundtrip_arbitrary_positions() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "7k/5Q2/6K1/8/8/8/8/8 b - - 12 34",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        ] {
            let pos = Position::from_fen(fen).unwrap();
            assert_eq!(pos.to_fen(), fen);
        }
    }

    #[test]
    fn test_invalid_fens_rejected() {
        for fen in [
            "",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KXkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e5 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - x 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 0",
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "kk6/8/8/8/8/8/8/K7 w - - 0 1",
        ] {
            assert!(Position::from_fen(fen).is_err(), "{fen:?} should fail");
        }
    }

    #[test]
    fn test_make_unmake_restores_everything() {
        let mut pos = Position::starting();
        let before_fen = pos.to_fen();
        let before_key = pos.key();

        for s in ["e2e4", "g1f3", "b1c3"] {
            let m = uci(&mut pos, s);
            pos.make_unchecked(m);
            pos.unmake();
            assert_eq!(pos.to_fen(), before_fen, "after {s}");
            assert_eq!(pos.key(), before_key, "after {s}");
        }
    }

    #[test]
    fn test_make_unmake_special_moves() {
        // Castle, en passant, capture promotion
        for (fen, mv) in [
            (
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                "e1g1",
            ),
            (
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                "e1c1",
            ),
            (
                "rnbqkbnr/1pp1pppp/p7/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3",
                "e5d6",
            ),
            ("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", "d7c8q"),
        ] {
            let mut pos = Position::from_fen(fen).unwrap();
            let before = pos.to_fen();
            let key = pos.key();
            let m = uci(&mut pos, mv);
            pos.make_unchecked(m);
            pos.unmake();
            assert_eq!(pos.to_fen(), before, "{mv} on {fen}");
            assert_eq!(pos.key(), key, "{mv} on {fen}");
        }
    }

    #[test]
    fn test_castling_execution() {
        let mut pos = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        let m = uci(&mut pos, "e1g1");
        pos.make_unchecked(m);
        assert!(pos
            .piece_at(Square::G1)
            .is(PieceKind::King, Color::White));
        assert!(pos
            .piece_at(Square::F1)
            .is(PieceKind::Rook, Color::White));
        assert!(pos.piece_at(Square::H1).is_empty());
        assert_eq!(pos.king_square(Color::White), Square::G1);
        assert_eq!(pos.castling_rights() & (WHITE_KING_SIDE | WHITE_QUEEN_SIDE), 0);
    }

    #[test]
    fn test_en_passant_execution() {
        // 1. e4 a6 2. e5 d5 leaves the d-pawn capturable in passing
        let mut pos = Position::starting();
        for s in ["e2e4", "a7a6", "e4e5", "d7d5"] {
            let m = uci(&mut pos, s);
            pos.make_unchecked(m);
        }
        let ep = uci(&mut pos, "e5d6");
        assert_eq!(ep.flags, MoveFlag::EnPassant);
        pos.make_unchecked(ep);
        assert_eq!(
            pos.to_fen(),
            "rnbqkbnr/1pp1pppp/p2P4/8/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 3"
        );
    }

    #[test]
    fn test_halfmove_clock_rules() {
        let mut pos = Position::starting();
        let m = uci(&mut pos, "g1f3");
        pos.make_unchecked(m);
        assert_eq!(pos.halfmove_clock(), 1);
        let m = uci(&mut pos, "e7e5");
        pos.make_unchecked(m);
        assert_eq!(pos.halfmove_clock(), 0);
        let m = uci(&mut pos, "f3e5");
        pos.make_unchecked(m);
        assert_eq!(pos.halfmove_clock(), 0);
    }

    #[test]
    fn test_fullmove_counter() {
        let mut pos = Position::starting();
        assert_eq!(pos.fullmove_number(), 1);
        let m = uci(&mut pos, "e2e4");
        pos.make_unchecked(m);
        assert_eq!(pos.fullmove_number(), 1);
        let m = uci(&mut pos, "e7e5");
        pos.make_unchecked(m);
        assert_eq!(pos.fullmove_number(), 2);
        pos.unmake();
        assert_eq!(pos.fullmove_number(), 1);
    }

    #[test]
    fn test_rook_capture_clears_castling_right() {
        let mut pos =
            Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let m = uci(&mut pos, "a1a8");
        pos.make_unchecked(m);
        // Both queen-side rights are gone: white moved its a-rook, black lost its
        assert!(!pos.has_castling_right(WHITE_QUEEN_SIDE));
        assert!(!pos.has_castling_right(BLACK_QUEEN_SIDE));
        assert!(pos.has_castling_right(WHITE_KING_SIDE));
        assert!(pos.has_castling_right(BLACK_KING_SIDE));
    }

    #[test]
    fn test_null_move_roundtrip() {
        let mut pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        )
        .unwrap();
        let fen = pos.to_fen();
        let key = pos.key();

        pos.make_null();
        assert_eq!(pos.side_to_move(), Color::White);
        assert_eq!(pos.en_passant(), None);
        assert_ne!(pos.key(), key);

        pos.unmake_null();
        assert_eq!(pos.to_fen(), fen);
        assert_eq!(pos.key(), key);
    }

    #[test]
    fn test_make_rejects_illegal_moves() {
        let mut pos = Position::starting();
        let before = pos.to_fen();

        // Not pseudo-legal at all
        let bogus = Move::new(Square::E1, Square::E8, MoveFlag::Quiet, Piece::EMPTY);
        assert!(matches!(pos.make(bogus), Err(ChessError::IllegalMove(_))));
        // The null sentinel
        assert!(pos.make(Move::NULL).is_err());
        assert_eq!(pos.to_fen(), before);

        // Pseudo-legal but leaves the king in check
        let mut pinned =
            Position::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let m = Move::new(
            Square::from_algebraic("e2").unwrap(),
            Square::from_algebraic("c3").unwrap(),
            MoveFlag::Quiet,
            Piece::EMPTY,
        );
        assert!(pinned.make(m).is_err());
    }

    #[test]
    fn test_key_differs_by_side_and_en_passant() {
        let a = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let b = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(a.key(), b.key());

        let c = Position::from_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
        )
        .unwrap();
        let d = Position::from_fen(
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2",
        )
        .unwrap();
        assert_ne!(c.key(), d.key());
    }

    #[test]
    fn test_repetition_detection() {
        let mut pos = Position::starting();
        assert!(!pos.is_repetition());

        // Shuffle knights out and back twice: the start position recurs
        for s in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = uci(&mut pos, s);
            pos.make_unchecked(m);
        }
        assert!(pos.is_repetition());
        assert!(!pos.is_draw_by_repetition());

        for s in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = uci(&mut pos, s);
            pos.make_unchecked(m);
        }
        assert!(pos.is_draw_by_repetition());
    }

    #[test]
    fn test_display_shows_diagram_and_fen() {
        let pos = Position::starting();
        let s = pos.to_string();
        assert!(s.contains("a b c d e f g h"));
        assert!(s.contains("FEN: "));
        assert!(s.contains("R N B Q K B N R"));
    }
}
