//! Iterative-deepening alpha-beta search.
//!
//! The driver deepens one ply at a time inside an aspiration window
//! around the previous score, re-searching full-width when the window
//! fails. Each node runs negamax with transposition-table cutoffs,
//! null-move pruning, principal-variation search on the first move, a
//! light late-move reduction on deep quiet moves, and a capture-only
//! quiescence at the horizon. Time is checked at every node; on expiry
//! the recursion unwinds without storing partial results and the driver
//! keeps the last fully completed depth's best move.

use crate::evaluation;
use crate::movegen;
use crate::moves::Move;
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

pub mod zobrist;

mod ordering;
mod see;
mod tt;

pub use ordering::MoveOrderer;
pub use tt::{Bound, TranspositionTable, TtHit, TT_ENTRIES};

pub const MAX_PLY: usize = 64;
pub const INFINITY: i32 = 1_000_000;
/// Mate scores are `MATE_VALUE - ply`, so shorter mates score higher.
pub const MATE_VALUE: i32 = 20_000;
/// Scores beyond this are treated as forced mates by the driver.
pub const MATE_THRESHOLD: i32 = 19_000;

const ASPIRATION_WINDOW: i32 = 50;
const NULL_MOVE_REDUCTION: i32 = 2;
const QUIESCENCE_DEPTH: i32 = 4;

const MAX_DEPTH: u8 = 20;
const MIN_TIME_MS: u64 = 100;

// ============================================================================
// Configuration and reporting
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    pub max_depth: u8,
    pub max_time_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_depth: 6,
            max_time_ms: 5000,
        }
    }
}

/// Statistics for one completed search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Deepest fully completed iteration.
    pub depth: u8,
    pub score: i32,
    pub best_move: Option<String>,
    pub nodes: u64,
    pub tt_hits: u64,
    pub cutoffs: u64,
    pub elapsed_ms: u64,
    pub nps: u64,
}

/// Cooperative cancellation flag for an in-flight search. Cloneable and
/// cheap; `cancel` makes the search unwind at its next node.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The search facade: owns the transposition table, move orderer, and
/// per-search bookkeeping. One engine instance serves one game at a time;
/// the table persists across searches until [`Engine::clear_tables`].
pub struct Engine {
    searcher: Searcher,
    config: EngineConfig,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            searcher: Searcher::new(),
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Handle for cancelling the current or next search from outside.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.searcher.cancel.clone()
    }

    /// Drop all learned state: transposition table, killers, history.
    pub fn clear_tables(&mut self) {
        self.searcher.tt.clear();
        self.searcher.orderer.clear();
    }

    /// Best move under the given limits, or `None` when the side to move
    /// has no legal moves. `depth` and `time_ms` default to the engine
    /// configuration; depth is clamped to 1..=20 and time to at least
    /// 100 ms.
    pub fn find_best_move(
        &mut self,
        pos: &mut Position,
        depth: Option<u8>,
        time_ms: Option<u64>,
    ) -> Option<Move> {
        self.find_best_move_with_report(pos, depth, time_ms).0
    }

    /// Like [`Engine::find_best_move`], also returning search statistics.
    pub fn find_best_move_with_report(
        &mut self,
        pos: &mut Position,
        depth: Option<u8>,
        time_ms: Option<u64>,
    ) -> (Option<Move>, SearchReport) {
        let depth_limit = depth.unwrap_or(self.config.max_depth).clamp(1, MAX_DEPTH);
        let budget_ms = time_ms.unwrap_or(self.config.max_time_ms).max(MIN_TIME_MS);
        self.searcher.new_search(budget_ms);

        let mut best: Option<Move> = None;
        let mut score = 0;
        let mut completed_depth = 0u8;

        for d in 1..=depth_limit {
            if self.searcher.check_time() {
                break;
            }
            let (m, s) = self.searcher.search_root(pos, i32::from(d), score);
            if !self.searcher.stopped && m.is_some() {
                best = m;
                score = s;
                completed_depth = d;
                debug!(
                    depth = d,
                    score,
                    best = %m.map(Move::to_uci).unwrap_or_default(),
                    nodes = self.searcher.nodes,
                    "iteration complete"
                );
            }
            if score.abs() > MATE_THRESHOLD {
                break;
            }
        }

        let elapsed_ms = self.searcher.start.elapsed().as_millis() as u64;
        let report = SearchReport {
            depth: completed_depth,
            score,
            best_move: best.map(Move::to_uci),
            nodes: self.searcher.nodes,
            tt_hits: self.searcher.tt_hits,
            cutoffs: self.searcher.cutoffs,
            elapsed_ms,
            nps: if elapsed_ms > 0 {
                self.searcher.nodes * 1000 / elapsed_ms
            } else {
                0
            },
        };
        debug!(
            nodes = report.nodes,
            tt_hits = report.tt_hits,
            cutoffs = report.cutoffs,
            elapsed_ms = report.elapsed_ms,
            nps = report.nps,
            "search finished"
        );
        (best, report)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Searcher
// ============================================================================

struct Searcher {
    tt: TranspositionTable,
    orderer: MoveOrderer,
    nodes: u64,
    tt_hits: u64,
    cutoffs: u64,
    start: Instant,
    budget_ms: u64,
    stopped: bool,
    cancel: CancelHandle,
}

impl Searcher {
    fn new() -> Self {
        Searcher {
            tt: TranspositionTable::new(),
            orderer: MoveOrderer::new(),
            nodes: 0,
            tt_hits: 0,
            cutoffs: 0,
            start: Instant::now(),
            budget_ms: 0,
            stopped: false,
            cancel: CancelHandle::default(),
        }
    }

    fn new_search(&mut self, budget_ms: u64) {
        self.nodes = 0;
        self.tt_hits = 0;
        self.cutoffs = 0;
        self.start = Instant::now();
        self.budget_ms = budget_ms;
        self.stopped = false;
        self.cancel.reset();
        self.orderer.reset_killers();
    }

    /// Wall-clock and external-cancel check, run at every node. Once the
    /// flag trips the whole recursion unwinds.
    #[inline]
    fn check_time(&mut self) -> bool {
        if !self.stopped
            && (self.cancel.is_cancelled()
                || self.start.elapsed().as_millis() as u64 >= self.budget_ms)
        {
            self.stopped = true;
        }
        self.stopped
    }

    /// One iteration at `depth`: search a narrow window around the
    /// previous score, fall back to full width when the result lands
    /// outside it.
    fn search_root(&mut self, pos: &mut Position, depth: i32, prev_score: i32) -> (Option<Move>, i32) {
        let alpha = (prev_score - ASPIRATION_WINDOW).max(-INFINITY);
        let beta = (prev_score + ASPIRATION_WINDOW).min(INFINITY);

        let (m, s) = self.negamax(pos, depth, 0, alpha, beta, true);
        if !self.stopped && (s <= alpha || s >= beta) {
            trace!(depth, score = s, "aspiration window failed, re-searching");
            return self.negamax(pos, depth, 0, -INFINITY, INFINITY, true);
        }
        (m, s)
    }

    fn negamax(
        &mut self,
        pos: &mut Position,
        depth: i32,
        ply: i32,
        mut alpha: i32,
        beta: i32,
        allow_null: bool,
    ) -> (Option<Move>, i32) {
        self.nodes += 1;
        if self.check_time() {
            return (None, 0);
        }

        let key = pos.key();
        if let Some(hit) = self.tt.probe(key) {
            if i32::from(hit.depth) >= depth {
                let usable = match hit.bound {
                    Bound::Exact => true,
                    Bound::Lower => hit.score >= beta,
                    Bound::Upper => hit.score <= alpha,
                };
                if usable {
                    self.tt_hits += 1;
                    return (hit.mv, hit.score);
                }
            }
        }

        if depth <= 0 {
            return (None, self.quiescence(pos, alpha, beta, QUIESCENCE_DEPTH, ply));
        }

        let mut moves = movegen::generate_legal(pos);
        if moves.is_empty() {
            let score = if pos.in_check(pos.side_to_move()) {
                -MATE_VALUE + ply
            } else {
                0
            };
            return (None, score);
        }

        // Checkmate ends the game before any draw claim, so rule draws
        // below the root score zero only once the side to move is known
        // to have a reply.
        if ply > 0 && (pos.halfmove_clock() >= 100 || pos.is_repetition()) {
            return (None, 0);
        }

        // Null move: hand the opponent a free tempo; if a reduced search
        // still cannot reach beta, this node will not either.
        if allow_null && depth >= 3 && !pos.in_check(pos.side_to_move()) {
            pos.make_null();
            let (_, reply) = self.negamax(
                pos,
                depth - 1 - NULL_MOVE_REDUCTION,
                ply + 1,
                -beta,
                -beta + 1,
                false,
            );
            pos.unmake_null();
            if self.stopped {
                return (None, 0);
            }
            if -reply >= beta {
                self.cutoffs += 1;
                return (None, beta);
            }
        }

        let hash_move = self.tt.best_move(key);
        self.orderer.sort_moves(pos, &mut moves, ply as usize, hash_move);

        let original_alpha = alpha;
        let mut best_move: Option<Move> = None;
        let mut best_score = -INFINITY;

        for (i, &m) in moves.iter().enumerate() {
            if self.stopped {
                break;
            }

            pos.make_unchecked(m);
            let score = if i == 0 {
                // Principal variation: full window
                -self.negamax(pos, depth - 1, ply + 1, -beta, -alpha, true).1
            } else {
                // Late quiet moves get one ply shaved; anything that beats
                // alpha on the null window is re-searched at full depth
                // and width.
                let reduction =
                    i32::from(depth >= 3 && !m.flags.is_capture() && i > 3);
                let mut s = -self
                    .negamax(pos, depth - 1 - reduction, ply + 1, -alpha - 1, -alpha, true)
                    .1;
                if s > alpha && s < beta {
                    s = -self.negamax(pos, depth - 1, ply + 1, -beta, -alpha, true).1;
                }
                s
            };
            pos.unmake();

            if score > best_score {
                best_score = score;
                best_move = Some(m);
            }
            alpha = alpha.max(best_score);
            if alpha >= beta {
                self.cutoffs += 1;
                self.orderer.record_cutoff(pos, m, depth, ply as usize);
                break;
            }
        }

        // A cancelled node's partial result must not poison the table.
        if !self.stopped {
            let bound = if best_score <= original_alpha {
                Bound::Upper
            } else if best_score >= beta {
                Bound::Lower
            } else {
                Bound::Exact
            };
            self.tt.store(key, depth as u8, best_score, bound, best_move);
        }

        (best_move, best_score)
    }

    /// Capture-only search at the horizon. Stand pat on the static
    /// evaluation, then try legal captures (promotions included) until
    /// the position is quiet or the depth cap runs out.
    fn quiescence(
        &mut self,
        pos: &mut Position,
        mut alpha: i32,
        beta: i32,
        depth: i32,
        ply: i32,
    ) -> i32 {
        self.nodes += 1;
        if self.check_time() {
            return 0;
        }

        let stand_pat = evaluation::evaluate(pos);
        if depth == 0 {
            return stand_pat;
        }
        if stand_pat >= beta {
            return beta;
        }
        alpha = alpha.max(stand_pat);

        let mut captures = movegen::generate_captures(pos);
        self.orderer.sort_moves(pos, &mut captures, ply as usize, None);

        for &m in &captures {
            if self.stopped {
                break;
            }
            pos.make_unchecked(m);
            let score = -self.quiescence(pos, -beta, -alpha, depth - 1, ply + 1);
            pos.unmake();

            if score >= beta {
                return beta;
            }
            alpha = alpha.max(score);
        }

        alpha
    }
}

// ============================================================================
// Tests
// ============================================================================
