use log::debug;

use crate::board::{Board, Side};
use crate::error::MoveError;
use crate::movegen::{Move, MoveGenerator};
use crate::search::SearchEngine;

/// What happened during one call to [`Game::play`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    pub user_move: Move,
    /// `None` when the user's move ended the game or the engine had no move.
    pub reply: Option<Move>,
    pub winner: Option<Side>,
}

/// A human playing one side against the engine on a single board.
///
/// The lower side always moves first, so the side to move follows from the
/// number of plies played.
pub struct Game {
    board: Board,
    engine: SearchEngine,
    move_generator: MoveGenerator,
    user: Side,
}

impl Game {
    pub fn new(engine: SearchEngine, user: Side) -> Self {
        Self::with_board(engine, user, Board::new())
    }

    pub fn with_board(engine: SearchEngine, user: Side, board: Board) -> Self {
        Self {
            board,
            engine,
            move_generator: MoveGenerator::new(),
            user,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn user_side(&self) -> Side {
        self.user
    }

    pub fn engine_side(&self) -> Side {
        self.user.opposite()
    }

    pub fn side_to_move(&self) -> Side {
        if self.board.history_len() % 2 == 0 {
            Side::Lower
        } else {
            Side::Upper
        }
    }

    pub fn winner(&self) -> Option<Side> {
        self.board.winner()
    }

    /// Applies the user's move and lets the engine answer it.
    pub fn play(&mut self, text: &str) -> Result<TurnReport, MoveError> {
        if let Some(winner) = self.board.winner() {
            return Err(MoveError::GameOver(winner));
        }
        if self.side_to_move() != self.user {
            if self.engine_is_stuck() {
                return Err(MoveError::NoReply);
            }
            return Err(MoveError::OutOfTurn);
        }

        let user_move = self.move_generator.resolve(&self.board, self.user, text)?;
        self.board.make_move(user_move);
        debug!("user played {}", user_move);

        let reply = self.engine_move();
        Ok(TurnReport {
            user_move,
            reply,
            winner: self.board.winner(),
        })
    }

    /// Lets the engine play for its side if the game is still running and it
    /// is the engine's turn.
    pub fn engine_move(&mut self) -> Option<Move> {
        if self.board.winner().is_some() || self.side_to_move() != self.engine_side() {
            return None;
        }
        let side = self.engine_side();
        let outcome = self.engine.best_move(&mut self.board, side);
        if let Some(mv) = outcome.best {
            self.board.make_move(mv);
            debug!(
                "engine played {} (value {}, {} nodes)",
                mv, outcome.value, outcome.nodes
            );
        }
        outcome.best
    }

    /// True when the engine is to move in a running game but has no
    /// pseudo-legal move left. Only `undo_turn` or `reset` continue the game.
    pub fn engine_is_stuck(&self) -> bool {
        self.board.winner().is_none()
            && self.side_to_move() == self.engine_side()
            && self
                .move_generator
                .gen_moves_for_one_side(&self.board, self.engine_side())
                .is_empty()
    }

    /// The move the engine would play in the user's place.
    pub fn advice(&mut self) -> Option<Move> {
        self.engine.best_move(&mut self.board, self.user).best
    }

    /// Rewinds to the user's previous turn: the engine reply and the user move
    /// before it, or only the user move when that move ended the game.
    /// Returns false when there is nothing to take back.
    pub fn undo_turn(&mut self) -> bool {
        let plies = if self.side_to_move() == self.user { 2 } else { 1 };
        if self.board.history_len() < plies {
            return false;
        }
        for _ in 0..plies {
            self.board.undo();
        }
        true
    }

    /// Back to the standard initial layout.
    pub fn reset(&mut self) {
        self.board = Board::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Piece, PieceKind, Pos};
    use crate::evaluation::WeightTables;
    use crate::search::{SearchConfig, SearchMode};
    use std::sync::Arc;

    fn sq(square: &str) -> Pos {
        Pos::from_square(square).unwrap()
    }

    fn engine() -> SearchEngine {
        let config = SearchConfig {
            depth: 2,
            mode: SearchMode::Sequential,
            workers: 1,
            ..SearchConfig::default()
        };
        SearchEngine::new(Arc::new(WeightTables::standard()), config).unwrap()
    }

    #[test]
    fn test_play_applies_move_and_reply() {
        let mut game = Game::new(engine(), Side::Lower);
        let report = game.play("e2e4").unwrap();

        assert_eq!(report.user_move.to_string(), "e2e4");
        assert!(report.reply.is_some());
        assert_eq!(report.winner, None);
        assert_eq!(game.board().history_len(), 2);
        assert_eq!(game.board().get(sq("e4")), Piece::Lower(PieceKind::Pawn));
        assert_eq!(game.side_to_move(), Side::Lower);
    }

    #[test]
    fn test_rejected_moves_leave_board_untouched() {
        let mut game = Game::new(engine(), Side::Lower);

        assert!(matches!(game.play("e2"), Err(MoveError::Malformed(_))));
        assert!(matches!(
            game.play("e7e5"),
            Err(MoveError::NotYourPiece { .. })
        ));
        assert!(matches!(game.play("e2e5"), Err(MoveError::Illegal(_))));
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn test_undo_turn_takes_back_both_plies() {
        let mut game = Game::new(engine(), Side::Lower);
        assert!(!game.undo_turn());

        game.play("g1f3").unwrap();
        game.play("b1c3").unwrap();
        assert!(game.undo_turn());
        assert_eq!(game.board().history_len(), 2);
        assert!(game.undo_turn());
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn test_reset_restores_initial_layout() {
        let mut game = Game::new(engine(), Side::Lower);
        game.play("d2d4").unwrap();
        game.reset();
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn test_advice_is_a_user_move() {
        let mut game = Game::new(engine(), Side::Lower);
        let advice = game.advice().unwrap();
        let candidates = MoveGenerator::new().gen_moves_for_one_side(game.board(), Side::Lower);
        assert!(candidates.contains(&advice));
        assert_eq!(game.board(), &Board::new());
    }

    #[test]
    fn test_engine_opens_for_upper_user() {
        let mut game = Game::new(engine(), Side::Upper);
        assert!(matches!(game.play("e7e5"), Err(MoveError::OutOfTurn)));

        let opening = game.engine_move().unwrap();
        assert_eq!(game.board().get(opening.to).side(), Some(Side::Lower));
        assert_eq!(game.side_to_move(), Side::Upper);
        assert_eq!(game.engine_move(), None);

        game.play("e7e5").unwrap();
        assert_eq!(game.board().history_len(), 3);
        assert!(game.undo_turn());
        assert_eq!(game.board().history_len(), 1);
        assert!(!game.undo_turn());
    }

    #[test]
    fn test_king_capture_ends_the_game() {
        let board = Board::from_layout(
            "
            . . . . K . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . q . . k
            ",
        )
        .unwrap();
        let mut game = Game::with_board(engine(), Side::Lower, board);

        let report = game.play("e1e8").unwrap();
        assert_eq!(report.winner, Some(Side::Lower));
        assert_eq!(report.reply, None);
        assert_eq!(game.winner(), Some(Side::Lower));
        assert!(matches!(
            game.play("h1g1"),
            Err(MoveError::GameOver(Side::Lower))
        ));

        assert!(game.undo_turn());
        assert_eq!(game.board().history_len(), 0);
        assert_eq!(game.winner(), None);
    }

    #[test]
    fn test_engine_without_moves_is_reported() {
        // Upper king and pawns on rank 1 and 2 block each other completely.
        let board = Board::from_layout(
            "
            . . . . . . . k
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            P P . . . . . .
            K P . . . . . .
            ",
        )
        .unwrap();
        let mut game = Game::with_board(engine(), Side::Lower, board);
        assert!(!game.engine_is_stuck());

        let report = game.play("h8g8").unwrap();
        assert_eq!(report.reply, None);
        assert_eq!(report.winner, None);
        assert!(game.engine_is_stuck());
        assert!(matches!(game.play("g8h8"), Err(MoveError::NoReply)));

        assert!(game.undo_turn());
        assert_eq!(game.board().history_len(), 0);
        assert!(!game.engine_is_stuck());
    }
}
