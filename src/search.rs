use std::sync::Arc;

use log::{debug, trace};
use rayon::prelude::*;

use crate::board::{Board, Side};
use crate::error::EngineError;
use crate::evaluation::{Evaluator, Score, WeightTables};
use crate::movegen::{Move, MoveGenerator};

/// Stands in for minus infinity; far below any reachable evaluation.
pub const LOWER_BOUND: Score = -5_000_000;
/// Stands in for plus infinity.
pub const UPPER_BOUND: Score = 5_000_000;
pub const DEFAULT_MAX_CHUNKS: usize = 32;
pub const DEFAULT_DEPTH: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub depth: u32,
    pub mode: SearchMode,
    /// Plain minimax when false. Results are identical, only slower.
    pub alpha_beta: bool,
    /// Upper bound on the number of root chunks in parallel mode.
    pub max_chunks: usize,
    /// Threads in the worker pool.
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            mode: SearchMode::Parallel,
            alpha_beta: true,
            max_chunks: DEFAULT_MAX_CHUNKS,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// `None` when the side has no pseudo-legal move at all.
    pub best: Option<Move>,
    pub value: Score,
    pub nodes: u64,
}

pub struct SearchEngine {
    evaluator: Evaluator,
    move_generator: MoveGenerator,
    config: SearchConfig,
    pool: rayon::ThreadPool,
}

impl SearchEngine {
    pub fn new(weights: Arc<WeightTables>, config: SearchConfig) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("search-worker-{}", i))
            .build()?;
        Ok(Self {
            evaluator: Evaluator::new(weights),
            move_generator: MoveGenerator::new(),
            config,
            pool,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Searches with the configured depth and mode.
    pub fn best_move(&self, board: &mut Board, side: Side) -> SearchOutcome {
        match self.config.mode {
            SearchMode::Sequential => self.search(board, side, self.config.depth),
            SearchMode::Parallel => self.search_parallel(board, side, self.config.depth),
        }
    }

    pub fn gen_best_for(&self, board: &mut Board, side: Side, depth: u32) -> Option<Move> {
        self.search(board, side, depth).best
    }

    pub fn gen_best_for_parallel(&self, board: &Board, side: Side, depth: u32) -> Option<Move> {
        self.search_parallel(board, side, depth).best
    }

    /// Minimax value of `board` searched `depth` plies deep. The maximizing
    /// player is the lower side.
    pub fn min_max(
        &self,
        board: &mut Board,
        depth: u32,
        alpha: Score,
        beta: Score,
        maximizing: bool,
    ) -> Score {
        let mut nodes = 0;
        self.min_max_counted(board, depth, alpha, beta, maximizing, &mut nodes)
    }

    fn min_max_counted(
        &self,
        board: &mut Board,
        depth: u32,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
        nodes: &mut u64,
    ) -> Score {
        *nodes += 1;

        if depth == 0 {
            return self.evaluator.evaluate(board);
        }

        let side = if maximizing { Side::Lower } else { Side::Upper };
        let moves = self.move_generator.gen_moves_for_one_side(board, side);

        let mut best = if maximizing { LOWER_BOUND } else { UPPER_BOUND };
        for mv in moves {
            board.make_move(mv);
            let value = self.min_max_counted(board, depth - 1, alpha, beta, !maximizing, nodes);
            board.undo();

            if maximizing {
                best = best.max(value);
                alpha = alpha.max(best);
            } else {
                best = best.min(value);
                beta = beta.min(best);
            }

            // Alpha-beta pruning
            if self.config.alpha_beta && alpha >= beta {
                break;
            }
        }

        best
    }

    /// Scores each root move with a full window and keeps the extremal one.
    /// Among equal values the later move wins. The first move is always
    /// taken, so a non-empty list never yields `None`.
    fn search_root(
        &self,
        board: &mut Board,
        side: Side,
        moves: &[Move],
        depth: u32,
        nodes: &mut u64,
    ) -> (Option<Move>, Score) {
        let maximizing = side == Side::Lower;
        let child_depth = depth.saturating_sub(1);

        let mut best_move = None;
        let mut best_value = if maximizing { LOWER_BOUND } else { UPPER_BOUND };
        for &mv in moves {
            board.make_move(mv);
            let value = self.min_max_counted(
                board,
                child_depth,
                LOWER_BOUND,
                UPPER_BOUND,
                !maximizing,
                nodes,
            );
            board.undo();

            if best_move.is_none() || prefer(maximizing, value, best_value) {
                best_value = value;
                best_move = Some(mv);
            }
        }
        (best_move, best_value)
    }

    /// Sequential root search on the caller's board, which is returned to
    /// its starting state.
    pub fn search(&self, board: &mut Board, side: Side, depth: u32) -> SearchOutcome {
        let moves = self.move_generator.gen_moves_for_one_side(board, side);
        let mut nodes = 0;
        let (best, value) = self.search_root(board, side, &moves, depth, &mut nodes);
        debug!(
            "sequential search: side={} depth={} candidates={} nodes={} value={} best={}",
            side,
            depth,
            moves.len(),
            nodes,
            value,
            describe(best)
        );
        SearchOutcome { best, value, nodes }
    }

    /// Splits the root moves into contiguous chunks, searches each chunk on a
    /// private copy of the board inside the worker pool, then reduces the
    /// chunk winners with the same tie rule as the sequential search.
    pub fn search_parallel(&self, board: &Board, side: Side, depth: u32) -> SearchOutcome {
        let moves = self.move_generator.gen_moves_for_one_side(board, side);
        let maximizing = side == Side::Lower;
        if moves.is_empty() {
            return SearchOutcome {
                best: None,
                value: if maximizing { LOWER_BOUND } else { UPPER_BOUND },
                nodes: 0,
            };
        }

        let chunks = split_chunks(&moves, self.config.max_chunks);
        let results: Vec<(Option<Move>, Score, u64)> = self.pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map(|(i, chunk)| {
                    let mut local = board.clone();
                    let mut nodes = 0;
                    let (best, value) = self.search_root(&mut local, side, chunk, depth, &mut nodes);
                    trace!(
                        "chunk {}: moves={} nodes={} value={} best={}",
                        i,
                        chunk.len(),
                        nodes,
                        value,
                        describe(best)
                    );
                    (best, value, nodes)
                })
                .collect()
        });

        let mut outcome = SearchOutcome {
            best: None,
            value: if maximizing { LOWER_BOUND } else { UPPER_BOUND },
            nodes: 0,
        };
        for (best, value, nodes) in results {
            outcome.nodes += nodes;
            let better = outcome.best.is_none() || prefer(maximizing, value, outcome.value);
            if best.is_some() && better {
                outcome.best = best;
                outcome.value = value;
            }
        }

        debug!(
            "parallel search: side={} depth={} candidates={} chunks={} nodes={} value={} best={}",
            side,
            depth,
            moves.len(),
            chunks.len(),
            outcome.nodes,
            outcome.value,
            describe(outcome.best)
        );
        outcome
    }
}

/// `>=` for the maximizer and `<=` for the minimizer: last encountered wins.
fn prefer(maximizing: bool, value: Score, best: Score) -> bool {
    if maximizing {
        value >= best
    } else {
        value <= best
    }
}

/// At most `max_chunks` contiguous chunks; all but the last hold
/// `len / count` moves and the last takes the remainder.
fn split_chunks(moves: &[Move], max_chunks: usize) -> Vec<&[Move]> {
    let count = max_chunks.max(1).min(moves.len());
    if count == 0 {
        return Vec::new();
    }
    let chunk_len = moves.len() / count;
    let (head, tail) = moves.split_at(chunk_len * (count - 1));
    let mut chunks: Vec<&[Move]> = head.chunks(chunk_len).collect();
    chunks.push(tail);
    chunks
}

fn describe(mv: Option<Move>) -> String {
    mv.map(|mv| mv.to_string())
        .unwrap_or_else(|| "(none)".to_string())
}
