//! ferrochess: a classic chess engine core.
//!
//! The crate is the reasoning stack of a chess-playing service: a mailbox
//! [`Position`] with full make/unmake, legal move generation, a tapered
//! static evaluation, and an iterative-deepening alpha-beta [`Engine`]
//! with a Zobrist-keyed transposition table, principal-variation search,
//! null-move pruning, late-move reductions, and capture-only quiescence.
//!
//! ```
//! use ferrochess::{Engine, Move, Position};
//!
//! let mut pos = Position::starting();
//! let opening = Move::from_uci("e2e4", &mut pos).unwrap();
//! pos.make(opening).unwrap();
//!
//! let mut engine = Engine::new();
//! if let Some(reply) = engine.find_best_move(&mut pos, Some(4), Some(1000)) {
//!     pos.make(reply).unwrap();
//! }
//! ```

use thiserror::Error;

pub mod attacks;
pub mod board;
pub mod evaluation;
pub mod movegen;
pub mod moves;
pub mod position;
pub mod search;

pub use board::{Board, Color, Piece, PieceKind, Square};
pub use evaluation::{evaluate, piece_value};
pub use movegen::{
    game_outcome, generate_all, generate_captures, generate_legal, is_checkmate, is_draw,
    is_draw_by_material, is_stalemate, GameOutcome,
};
pub use moves::{Move, MoveFlag, MoveList};
pub use position::{Position, START_FEN};
pub use search::{CancelHandle, Engine, EngineConfig, SearchReport};

/// Errors surfaced to callers of the core.
#[derive(Debug, Error)]
pub enum ChessError {
    /// A FEN string failed to parse; the position is unchanged.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    /// `make` was called with a move outside the legal set; the position
    /// is unchanged.
    #[error("illegal move: {0}")]
    IllegalMove(String),
}
