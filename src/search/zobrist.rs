//! Zobrist position keys.
//!
//! Every hashable feature gets a fixed 64-bit word generated at compile
//! time from one seed, so keys are stable across builds and platforms.
//! `Position` maintains its key incrementally through make/unmake;
//! [`compute_key`] rebuilds it from scratch for construction and for
//! consistency checks.

use crate::board::{Color, Piece, Square};
use crate::position::Position;

const PIECE_COUNT: usize = 12;

struct Keys {
    piece_square: [[u64; 64]; PIECE_COUNT],
    castling: [u64; 16],
    en_passant_file: [u64; 8],
    side_to_move: u64,
}

const fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

static KEYS: Keys = {
    let mut keys = Keys {
        piece_square: [[0; 64]; PIECE_COUNT],
        castling: [0; 16],
        en_passant_file: [0; 8],
        side_to_move: 0,
    };
    let mut seed = 0xC001_D00D_0BAD_5EEDu64;

    let mut p = 0;
    while p < PIECE_COUNT {
        let mut s = 0;
        while s < 64 {
            seed = splitmix64(seed);
            keys.piece_square[p][s] = seed;
            s += 1;
        }
        p += 1;
    }
    let mut i = 0;
    while i < 16 {
        seed = splitmix64(seed);
        keys.castling[i] = seed;
        i += 1;
    }
    let mut f = 0;
    while f < 8 {
        seed = splitmix64(seed);
        keys.en_passant_file[f] = seed;
        f += 1;
    }
    keys.side_to_move = splitmix64(seed);
    keys
};

/// XORed into the key when black is to move.
pub const SIDE_TO_MOVE: u64 = KEYS.side_to_move;

/// Key word for a piece standing on a square.
#[inline]
pub fn piece_key(piece: Piece, sq: Square) -> u64 {
    KEYS.piece_square[piece.table_index()][sq.index()]
}

/// Key word for a castling-rights bitfield (0..16).
#[inline]
pub fn castling_key(rights: u8) -> u64 {
    KEYS.castling[(rights & 0xF) as usize]
}

/// Key word for an en-passant target; only the file matters.
#[inline]
pub fn en_passant_key(sq: Square) -> u64 {
    KEYS.en_passant_file[sq.file() as usize]
}

/// Rebuild a position's key from scratch.
pub fn compute_key(pos: &Position) -> u64 {
    let mut key = 0u64;
    for (sq, piece) in pos.board().pieces() {
        key ^= piece_key(piece, sq);
    }
    key ^= castling_key(pos.castling_rights());
    if let Some(ep) = pos.en_passant() {
        key ^= en_passant_key(ep);
    }
    if pos.side_to_move() == Color::Black {
        key ^= SIDE_TO_MOVE;
    }
    key
}
