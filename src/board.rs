use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Square
// ============================================================================

/// A board square, encoded as `rank * 8 + file` with file 0 = a and
/// rank 0 = the first rank. Arithmetic that would leave the board yields
/// `None` from [`Square::offset`] rather than a wrapped index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Square(u8);

impl Square {
    pub const COUNT: usize = 64;

    pub const A1: Square = Square(0);
    pub const B1: Square = Square(1);
    pub const C1: Square = Square(2);
    pub const D1: Square = Square(3);
    pub const E1: Square = Square(4);
    pub const F1: Square = Square(5);
    pub const G1: Square = Square(6);
    pub const H1: Square = Square(7);
    pub const A8: Square = Square(56);
    pub const B8: Square = Square(57);
    pub const C8: Square = Square(58);
    pub const D8: Square = Square(59);
    pub const E8: Square = Square(60);
    pub const F8: Square = Square(61);
    pub const G8: Square = Square(62);
    pub const H8: Square = Square(63);

    #[inline]
    pub const fn new(index: u8) -> Self {
        debug_assert!(index < 64);
        Square(index)
    }

    #[inline]
    pub const fn from_file_rank(file: u8, rank: u8) -> Self {
        debug_assert!(file < 8 && rank < 8);
        Square(rank * 8 + file)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// File 0..7, a through h.
    #[inline]
    pub const fn file(self) -> u8 {
        self.0 & 7
    }

    /// Rank 0..7, first rank through eighth.
    #[inline]
    pub const fn rank(self) -> u8 {
        self.0 >> 3
    }

    /// Step by file/rank deltas, `None` when the result leaves the board.
    #[inline]
    pub fn offset(self, file_delta: i8, rank_delta: i8) -> Option<Square> {
        let file = self.file() as i8 + file_delta;
        let rank = self.rank() as i8 + rank_delta;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Some(Square::from_file_rank(file as u8, rank as u8))
        } else {
            None
        }
    }

    /// Parse algebraic notation like `e4`.
    pub fn from_algebraic(s: &str) -> Option<Square> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file < 8 && rank < 8 {
            Some(Square::from_file_rank(file, rank))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

// ============================================================================
// Color
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    #[inline]
    pub const fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Rank direction pawns of this color advance in.
    #[inline]
    pub const fn forward(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    #[inline]
    pub const fn home_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }

    #[inline]
    pub const fn pawn_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    #[inline]
    pub const fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

// ============================================================================
// PieceKind
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const COUNT: usize = 6;

    #[inline]
    pub const fn from_u8(v: u8) -> Self {
        debug_assert!(v < 6);
        unsafe { std::mem::transmute(v) }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    pub const fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

// ============================================================================
// Piece - packed representation (1 byte)
// ============================================================================

/// A piece or the empty marker, packed into one byte.
///
/// Encoding: `0` is empty, otherwise `1 + color * 6 + kind`, giving the
/// twelve real pieces the values 1..=12.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Piece(u8);

impl Piece {
    pub const EMPTY: Piece = Piece(0);

    #[inline]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Piece(1 + (color as u8) * 6 + kind as u8)
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Kind of a non-empty piece.
    #[inline]
    pub const fn kind(self) -> PieceKind {
        debug_assert!(self.0 != 0);
        PieceKind::from_u8((self.0 - 1) % 6)
    }

    /// Color of a non-empty piece.
    #[inline]
    pub const fn color(self) -> Color {
        debug_assert!(self.0 != 0);
        if self.0 <= 6 {
            Color::White
        } else {
            Color::Black
        }
    }

    #[inline]
    pub fn is_color(self, color: Color) -> bool {
        !self.is_empty() && self.color() == color
    }

    #[inline]
    pub fn is(self, kind: PieceKind, color: Color) -> bool {
        self == Piece::new(kind, color)
    }

    /// Index 0..11 used by the Zobrist piece-square table.
    #[inline]
    pub const fn table_index(self) -> usize {
        debug_assert!(self.0 != 0);
        (self.0 - 1) as usize
    }

    /// Parse a FEN placement character.
    pub fn from_fen_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(kind, color))
    }

    pub fn to_fen_char(self) -> char {
        let c = self.kind().to_char();
        match self.color() {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Piece(empty)")
        } else {
            write!(f, "Piece({:?} {:?})", self.color(), self.kind())
        }
    }
}

// ============================================================================
// Board
// ============================================================================

/// The 64-entry mailbox. Pure piece storage; game state (side to move,
/// rights, clocks, king caches) lives in `Position`.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Piece; 64],
}

impl Board {
    pub fn empty() -> Self {
        Board {
            squares: [Piece::EMPTY; 64],
        }
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.squares[sq.index()]
    }

    #[inline]
    pub fn set(&mut self, sq: Square, piece: Piece) {
        self.squares[sq.index()] = piece;
    }

    #[inline]
    pub fn remove(&mut self, sq: Square) {
        self.squares[sq.index()] = Piece::EMPTY;
    }

    /// Occupied squares with their pieces.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_empty())
            .map(|(i, p)| (Square::new(i as u8), *p))
    }

    /// Locate the king of `color` by scanning. `Position` caches this;
    /// the scan exists for construction and consistency checks.
    pub fn find_king(&self, color: Color) -> Option<Square> {
        let king = Piece::new(PieceKind::King, color);
        Square::all().find(|&sq| self.piece_at(sq) == king)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_encoding() {
        let e4 = Square::from_algebraic("e4").unwrap();
        assert_eq!(e4.file(), 4);
        assert_eq!(e4.rank(), 3);
        assert_eq!(e4.index(), 28);
        assert_eq!(e4.to_string(), "e4");

        assert_eq!(Square::A1.index(), 0);
        assert_eq!(Square::H8.index(), 63);
        assert_eq!(Square::E1, Square::from_file_rank(4, 0));
    }

    #[test]
    fn test_square_offset_leaves_board() {
        assert_eq!(Square::A1.offset(-1, 0), None);
        assert_eq!(Square::H8.offset(0, 1), None);
        assert_eq!(Square::A1.offset(1, 1), Some(Square::from_file_rank(1, 1)));
        // A knight probe from a corner must not wrap around the board edge
        assert_eq!(Square::H1.offset(2, 1), None);
        assert_eq!(Square::H1.offset(-2, 1), Some(Square::from_file_rank(5, 1)));
    }

    #[test]
    fn test_square_from_algebraic_rejects_garbage() {
        assert_eq!(Square::from_algebraic("i4"), None);
        assert_eq!(Square::from_algebraic("a9"), None);
        assert_eq!(Square::from_algebraic("e"), None);
        assert_eq!(Square::from_algebraic("e44"), None);
    }

    #[test]
    fn test_piece_packing_roundtrip() {
        for color in [Color::White, Color::Black] {
            for kind in [
                PieceKind::Pawn,
                PieceKind::Knight,
                PieceKind::Bishop,
                PieceKind::Rook,
                PieceKind::Queen,
                PieceKind::King,
            ] {
                let piece = Piece::new(kind, color);
                assert!(!piece.is_empty());
                assert_eq!(piece.kind(), kind);
                assert_eq!(piece.color(), color);
            }
        }
    }

    #[test]
    fn test_piece_size() {
        assert_eq!(std::mem::size_of::<Piece>(), 1);
        assert_eq!(std::mem::size_of::<Square>(), 1);
    }

    #[test]
    fn test_piece_table_indices_distinct() {
        let mut seen = [false; 12];
        for color in [Color::White, Color::Black] {
            for k in 0..6 {
                let idx = Piece::new(PieceKind::from_u8(k), color).table_index();
                assert!(idx < 12);
                assert!(!seen[idx]);
                seen[idx] = true;
            }
        }
    }

    #[test]
    fn test_piece_fen_chars() {
        assert_eq!(
            Piece::from_fen_char('K'),
            Some(Piece::new(PieceKind::King, Color::White))
        );
        assert_eq!(
            Piece::from_fen_char('q'),
            Some(Piece::new(PieceKind::Queen, Color::Black))
        );
        assert_eq!(Piece::from_fen_char('x'), None);
        assert_eq!(
            Piece::new(PieceKind::Knight, Color::White).to_fen_char(),
            'N'
        );
        assert_eq!(Piece::new(PieceKind::Pawn, Color::Black).to_fen_char(), 'p');
    }

    #[test]
    fn test_board_set_get_remove() {
        let mut board = Board::empty();
        let rook = Piece::new(PieceKind::Rook, Color::White);

        board.set(Square::A1, rook);
        assert_eq!(board.piece_at(Square::A1), rook);
        assert_eq!(board.pieces().count(), 1);

        board.remove(Square::A1);
        assert!(board.piece_at(Square::A1).is_empty());
        assert_eq!(board.pieces().count(), 0);
    }

    #[test]
    fn test_board_find_king() {
        let mut board = Board::empty();
        board.set(Square::E1, Piece::new(PieceKind::King, Color::White));
        board.set(Square::E8, Piece::new(PieceKind::King, Color::Black));
        assert_eq!(board.find_king(Color::White), Some(Square::E1));
        assert_eq!(board.find_king(Color::Black), Some(Square::E8));
    }
}
