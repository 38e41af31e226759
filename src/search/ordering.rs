//! Move ordering.
//!
//! Moves are scored into bands so that tactically forcing moves are
//! searched first: the hash move, then winning and equal captures,
//! promotions, killers, castling, quiet moves lifted by the history
//! table, and losing captures last. Better ordering means earlier beta
//! cutoffs, which is where alpha-beta earns its keep.

use crate::board::{Color, PieceKind, Square};
use crate::evaluation::piece_value;
use crate::moves::{Move, MoveFlag, MoveList};
use crate::position::Position;

use super::see;
use super::MAX_PLY;

const WINNING_CAPTURE_SCORE: i32 = 8000;
const EQUAL_CAPTURE_SCORE: i32 = 7000;
const PROMOTION_SCORE: i32 = 6000;
const QUEEN_PROMOTION_BONUS: i32 = 1000;
const KILLER_MOVE_SCORE: i32 = 5000;
const CASTLE_SCORE: i32 = 4000;
const LOSING_CAPTURE_SCORE: i32 = 1000;
const HISTORY_LIMIT: i32 = 10_000;

const HISTORY_SIZE: usize = 2 * 64 * 64 * PieceKind::COUNT;

// ============================================================================
// MoveOrderer
// ============================================================================

pub struct MoveOrderer {
    /// Two killer slots per ply; quiet moves that caused a beta cutoff at
    /// the same distance from root.
    killers: [[Move; 2]; MAX_PLY],
    /// Cutoff history indexed by (color, from, to, piece kind), flat.
    history: Box<[i32]>,
}

impl MoveOrderer {
    pub fn new() -> Self {
        MoveOrderer {
            killers: [[Move::NULL; 2]; MAX_PLY],
            history: vec![0; HISTORY_SIZE].into_boxed_slice(),
        }
    }

    #[inline]
    fn history_index(color: Color, from: Square, to: Square, kind: PieceKind) -> usize {
        ((color.index() * 64 + from.index()) * 64 + to.index()) * PieceKind::COUNT + kind.index()
    }

    /// Sort `moves` for the search: the hash move is swapped to the front
    /// unconditionally, the rest descend by score.
    pub fn sort_moves(
        &self,
        pos: &mut Position,
        moves: &mut MoveList,
        ply: usize,
        hash_move: Option<Move>,
    ) {
        let mut start = 0;
        if let Some(hm) = hash_move {
            if let Some(i) = moves.iter().position(|m| m.same_action(hm)) {
                moves.swap(0, i);
                start = 1;
            }
        }

        let tail = &moves[start..];
        let mut scored: Vec<(i32, Move)> = tail
            .iter()
            .map(|&m| (self.score_move(pos, m, ply), m))
            .collect();
        scored.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        for (slot, (_, m)) in moves[start..].iter_mut().zip(scored) {
            *slot = m;
        }
    }

    /// Score one move. Additive: a capturing promotion collects both the
    /// capture band and the promotion bonus.
    pub fn score_move(&self, pos: &mut Position, m: Move, ply: usize) -> i32 {
        let mut score = 0;
        let mover = pos.piece_at(m.from);

        if m.flags == MoveFlag::EnPassant {
            score += EQUAL_CAPTURE_SCORE;
        } else if m.flags.is_capture() {
            let victim = piece_value(m.captured.kind());
            let attacker = piece_value(mover.kind());
            score += if victim > attacker {
                WINNING_CAPTURE_SCORE + victim - attacker
            } else if victim == attacker {
                EQUAL_CAPTURE_SCORE
            } else if see::capture_is_safe(pos, m) {
                EQUAL_CAPTURE_SCORE + victim - attacker
            } else {
                LOSING_CAPTURE_SCORE + victim - attacker
            };
        }

        if let Some(kind) = m.flags.promotion_kind() {
            score += PROMOTION_SCORE;
            if kind == PieceKind::Queen {
                score += QUEEN_PROMOTION_BONUS;
            }
        }

        if m.flags.is_castle() {
            score += CASTLE_SCORE;
        }

        let killers = &self.killers[ply.min(MAX_PLY - 1)];
        if killers[0].same_action(m) || killers[1].same_action(m) {
            score += KILLER_MOVE_SCORE;
        }

        let color = pos.side_to_move();
        score += self.history[Self::history_index(color, m.from, m.to, mover.kind())] / 10;

        score += positional_bias(pos, m, mover.kind(), color);

        score
    }

    /// A quiet move refuted the opponent at `ply`: remember it in the
    /// killer slots and bump its history cell by depth squared. History is
    /// halved globally once any cell passes the limit, so old patterns
    /// fade instead of saturating.
    pub fn record_cutoff(&mut self, pos: &Position, m: Move, depth: i32, ply: usize) {
        if m.flags.is_capture() {
            return;
        }

        let killers = &mut self.killers[ply.min(MAX_PLY - 1)];
        if !killers[0].same_action(m) {
            killers[1] = killers[0];
            killers[0] = m;
        }

        let kind = pos.piece_at(m.from).kind();
        let idx = Self::history_index(pos.side_to_move(), m.from, m.to, kind);
        self.history[idx] += depth * depth;
        if self.history[idx] > HISTORY_LIMIT {
            for cell in self.history.iter_mut() {
                *cell /= 2;
            }
        }
    }

    /// Forget killers between searches. History is kept; it ages through
    /// the halving rule.
    pub fn reset_killers(&mut self) {
        self.killers = [[Move::NULL; 2]; MAX_PLY];
    }

    pub fn clear(&mut self) {
        self.reset_killers();
        self.history.fill(0);
    }
}

impl Default for MoveOrderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Small positional nudges, capped around 30: destinations near the
/// center, minor pieces leaving the back rank, and moves landing next to
/// an enemy piece.
fn positional_bias(pos: &Position, m: Move, kind: PieceKind, color: Color) -> i32 {
    let mut score = 0;

    // Manhattan distance to the board center, doubled file/rank units so
    // the half-square center works in integers; 0..12 bonus.
    let center_distance =
        (2 * m.to.file() as i32 - 7).abs() + (2 * m.to.rank() as i32 - 7).abs();
    score += 14 - center_distance;

    if matches!(kind, PieceKind::Knight | PieceKind::Bishop) && m.from.rank() == color.home_rank()
    {
        score += 10;
    }

    let enemy = color.opponent();
    let attacks_enemy = crate::attacks::KING_OFFSETS.iter().any(|&(df, dr)| {
        m.to.offset(df, dr)
            .is_some_and(|sq| pos.piece_at(sq).is_color(enemy))
    });
    if attacks_enemy {
        score += 8;
    }

    score
}

// ============================================================================
// Tests
// ============================================================================
