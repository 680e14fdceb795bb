use std::path::PathBuf;
use thiserror::Error;

use crate::board::Side;

/// Failure to build the weight tables from their external resources.
///
/// These are fatal at startup; every message names the offending resource.
#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("cannot open weight resource {}: {source}", resource.display())]
    Io {
        resource: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("weight resource {} is malformed: {detail}", resource.display())]
    Malformed { resource: PathBuf, detail: String },
    #[error("weight resource {} is truncated: expected {expected} values, found {found}", resource.display())]
    Truncated {
        resource: PathBuf,
        expected: usize,
        found: usize,
    },
}

/// A requested move that cannot be played by the acting side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("'{0}' is not a move, expected something like e2e4")]
    Malformed(String),
    #[error("the piece on {square} does not belong to the acting side")]
    NotYourPiece { square: String },
    #[error("'{0}' does not fit the movement rules")]
    Illegal(String),
    #[error("it is not your turn")]
    OutOfTurn,
    #[error("the engine has no move to play, undo or start a new game")]
    NoReply,
    #[error("the game is over, {0} won")]
    GameOver(Side),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("expected 8 rows, found {0}")]
    RowCount(usize),
    #[error("row {row} has {found} cells, expected 8")]
    RowWidth { row: usize, found: usize },
    #[error("unknown piece symbol '{symbol}' in row {row}")]
    Symbol { row: usize, symbol: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to build search worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
