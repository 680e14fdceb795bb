pub mod board;
pub mod error;
pub mod evaluation;
pub mod game;
pub mod movegen;
pub mod search;

pub use board::{Board, Piece, PieceKind, Pos, Side};
pub use error::{EngineError, LayoutError, MoveError, WeightsError};
pub use evaluation::{Evaluator, Score, WeightTables};
pub use game::{Game, TurnReport};
pub use movegen::{Move, MoveGenerator, MoveKind};
pub use search::{SearchConfig, SearchEngine, SearchMode, SearchOutcome, LOWER_BOUND, UPPER_BOUND};
