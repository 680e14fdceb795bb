use std::fmt;

use crate::board::{Board, Piece, PieceKind, Pos, Side, LINE_BEGIN, LINE_END};
use crate::error::MoveError;

const CROSS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (2, -1), (2, 1), (1, -2), (1, 2),
    (-1, -2), (-1, 2), (-2, -1), (-2, 1),
];
const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];
const PROMOTION_CHOICES: [PieceKind; 4] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Normal,
    EnPassant,
    LongCastle,
    ShortCastle,
    Promotion,
    PawnDoubleStep,
}

/// A pseudo-legal move. Two moves compare equal when they share source and
/// destination, whatever their kind or promotion piece.
#[derive(Debug, Clone, Copy)]
pub struct Move {
    pub from: Pos,
    pub to: Pos,
    pub kind: MoveKind,
    pub promotion: Option<Piece>,
}

impl Move {
    pub fn new(from: Pos, to: Pos, kind: MoveKind) -> Self {
        Self {
            from,
            to,
            kind,
            promotion: None,
        }
    }

    pub fn promote(from: Pos, to: Pos, piece: Piece) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Promotion,
            promotion: Some(piece),
        }
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl Eq for Move {}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion.and_then(|piece| piece.kind()) {
            write!(f, "{}", Piece::Lower(kind).symbol())?;
        }
        Ok(())
    }
}

/// Enumerates pseudo-legal moves. The mover's king safety is never checked.
#[derive(Debug, Default, Clone, Copy)]
pub struct MoveGenerator;

impl MoveGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Moves of whatever piece stands on `from`; empty for empty or
    /// off-board cells.
    pub fn gen_moves_at(&self, board: &Board, from: Pos) -> Vec<Move> {
        let mut moves = Vec::with_capacity(32);
        let piece = board.get(from);
        if let (Some(side), Some(kind)) = (piece.side(), piece.kind()) {
            self.gen_piece_moves(board, from, side, kind, &mut moves);
        }
        moves
    }

    /// All moves of `side`, in row-major scan order of the playing area.
    pub fn gen_moves_for_one_side(&self, board: &Board, side: Side) -> Vec<Move> {
        let mut moves = Vec::with_capacity(256);
        for row in LINE_BEGIN..=LINE_END {
            for col in LINE_BEGIN..=LINE_END {
                let from = Pos::new(row, col);
                let piece = board.get(from);
                if piece.side() != Some(side) {
                    continue;
                }
                if let Some(kind) = piece.kind() {
                    self.gen_piece_moves(board, from, side, kind, &mut moves);
                }
            }
        }
        moves
    }

    fn gen_piece_moves(
        &self,
        board: &Board,
        from: Pos,
        side: Side,
        kind: PieceKind,
        moves: &mut Vec<Move>,
    ) {
        match kind {
            PieceKind::Pawn => self.gen_pawn_moves(board, from, side, moves),
            PieceKind::Rook => self.gen_rays(board, from, side, &CROSS, moves),
            PieceKind::Bishop => self.gen_rays(board, from, side, &DIAGONAL, moves),
            PieceKind::Queen => {
                self.gen_rays(board, from, side, &CROSS, moves);
                self.gen_rays(board, from, side, &DIAGONAL, moves);
            }
            PieceKind::Knight => self.gen_steps(board, from, side, &KNIGHT_OFFSETS, moves),
            PieceKind::King => {
                self.gen_steps(board, from, side, &KING_OFFSETS, moves);
                self.gen_castling(board, from, side, moves);
            }
        }
    }

    /// Adds a normal move onto `to` when it is empty or holds an enemy.
    /// Returns whether a ray may continue past `to`.
    fn try_add(&self, board: &Board, from: Pos, to: Pos, side: Side, moves: &mut Vec<Move>) -> bool {
        match board.get(to) {
            Piece::OffBoard => false,
            Piece::Empty => {
                moves.push(Move::new(from, to, MoveKind::Normal));
                true
            }
            target => {
                if target.side() != Some(side) {
                    moves.push(Move::new(from, to, MoveKind::Normal));
                }
                false
            }
        }
    }

    fn gen_rays(
        &self,
        board: &Board,
        from: Pos,
        side: Side,
        directions: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for &(d_row, d_col) in directions {
            let mut to = from.offset(d_row, d_col);
            while self.try_add(board, from, to, side, moves) {
                to = to.offset(d_row, d_col);
            }
        }
    }

    fn gen_steps(
        &self,
        board: &Board,
        from: Pos,
        side: Side,
        offsets: &[(i32, i32)],
        moves: &mut Vec<Move>,
    ) {
        for &(d_row, d_col) in offsets {
            self.try_add(board, from, from.offset(d_row, d_col), side, moves);
        }
    }

    fn gen_castling(&self, board: &Board, from: Pos, side: Side, moves: &mut Vec<Move>) {
        if !board.castling_allowed(side) || from != side.king_start() {
            return;
        }
        let rook = Piece::new(side, PieceKind::Rook);
        let empty = |cols: &[i32]| cols.iter().all(|&d_col| board.get(from.offset(0, d_col)).is_empty());

        if empty(&[1, 2]) && board.get(from.offset(0, 3)) == rook {
            moves.push(Move::new(from, from.offset(0, 2), MoveKind::ShortCastle));
        }
        if empty(&[-1, -2, -3]) && board.get(from.offset(0, -4)) == rook {
            moves.push(Move::new(from, from.offset(0, -2), MoveKind::LongCastle));
        }
    }

    fn gen_pawn_moves(&self, board: &Board, from: Pos, side: Side, moves: &mut Vec<Move>) {
        let forward = side.forward();

        if let Some(target) = board.en_passant_target() {
            // The double-stepped pawn sits beside us, one step past the target.
            let victim = Pos::new(from.row, target.col);
            if target.row == from.row + forward
                && (target.col - from.col).abs() == 1
                && board.get(victim) == Piece::new(side.opposite(), PieceKind::Pawn)
            {
                moves.push(Move::new(from, target, MoveKind::EnPassant));
            }
        }

        let one = from.offset(forward, 0);
        if board.get(one).is_empty() {
            let two = from.offset(2 * forward, 0);
            if from.row == side.pawn_start_row() && board.get(two).is_empty() {
                moves.push(Move::new(from, two, MoveKind::PawnDoubleStep));
            }
            self.push_pawn_move(from, one, side, moves);
        }

        for d_col in [1, -1] {
            let to = from.offset(forward, d_col);
            if board.get(to).side() == Some(side.opposite()) {
                self.push_pawn_move(from, to, side, moves);
            }
        }
    }

    fn push_pawn_move(&self, from: Pos, to: Pos, side: Side, moves: &mut Vec<Move>) {
        if to.row == side.promotion_row() {
            for kind in PROMOTION_CHOICES {
                moves.push(Move::promote(from, to, Piece::new(side, kind)));
            }
        } else {
            moves.push(Move::new(from, to, MoveKind::Normal));
        }
    }

    /// Translates text such as `e2e4` (or `e7e8n` for an under-promotion)
    /// into one of the moves `side` may play. A promotion without suffix
    /// picks the queen. The board is left untouched.
    pub fn resolve(&self, board: &Board, side: Side, text: &str) -> Result<Move, MoveError> {
        let text = text.trim();
        let malformed = || MoveError::Malformed(text.to_string());

        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(malformed());
        }
        let from = Pos::from_square(&text[0..2]).ok_or_else(malformed)?;
        let to = Pos::from_square(&text[2..4]).ok_or_else(malformed)?;
        let suffix = match text[4..].chars().next() {
            None => None,
            Some(letter) => Some(
                PROMOTION_CHOICES
                    .iter()
                    .copied()
                    .find(|kind| Piece::Lower(*kind).symbol() == letter)
                    .ok_or_else(malformed)?,
            ),
        };

        if board.get(from).side() != Some(side) {
            return Err(MoveError::NotYourPiece {
                square: from.to_string(),
            });
        }

        let wanted = Move::new(from, to, MoveKind::Normal);
        let candidates: Vec<Move> = self
            .gen_moves_at(board, from)
            .into_iter()
            .filter(|mv| *mv == wanted)
            .collect();

        let chosen = match candidates.first() {
            None => None,
            Some(first) if first.kind != MoveKind::Promotion => {
                if suffix.is_some() {
                    return Err(MoveError::Illegal(text.to_string()));
                }
                Some(*first)
            }
            Some(_) => {
                let kind = suffix.unwrap_or(PieceKind::Queen);
                candidates
                    .iter()
                    .copied()
                    .find(|mv| mv.promotion.and_then(|piece| piece.kind()) == Some(kind))
            }
        };
        chosen.ok_or_else(|| MoveError::Illegal(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(square: &str) -> Pos {
        Pos::from_square(square).unwrap()
    }

    fn board(layout: &str) -> Board {
        Board::from_layout(layout).unwrap()
    }

    fn targets(moves: &[Move]) -> Vec<String> {
        let mut squares: Vec<String> = moves.iter().map(|mv| mv.to.to_string()).collect();
        squares.sort();
        squares
    }

    #[test]
    fn test_initial_position_counts() {
        let board = Board::new();
        let generator = MoveGenerator::new();
        assert_eq!(generator.gen_moves_for_one_side(&board, Side::Lower).len(), 20);
        assert_eq!(generator.gen_moves_for_one_side(&board, Side::Upper).len(), 20);
    }

    #[test]
    fn test_rook_alone_in_the_centre() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . r . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        let moves = MoveGenerator::new().gen_moves_at(&board, sq("d5"));
        assert_eq!(moves.len(), 14);
        assert!(moves.iter().all(|mv| mv.kind == MoveKind::Normal));
    }

    #[test]
    fn test_sliding_pieces_stop_at_blockers() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . P . . . . .
            . . . . . . . .
            b . . . r . . .
            ",
        );
        let generator = MoveGenerator::new();
        // Capture on c3 ends the ray; b2 is the only square before it.
        assert_eq!(targets(&generator.gen_moves_at(&board, sq("a1"))), ["b2", "c3"]);

        // The friendly bishop on a1 stops the rook on b1.
        let moves = generator.gen_moves_at(&board, sq("e1"));
        assert!(moves.iter().all(|mv| mv.to.is_playable()));
        assert_eq!(moves.len(), 7 + 3 + 3);
    }

    #[test]
    fn test_queen_covers_both_ray_sets() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . q . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        assert_eq!(MoveGenerator::new().gen_moves_at(&board, sq("d4")).len(), 27);
    }

    #[test]
    fn test_knight_in_corner_and_centre() {
        let corner = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . p . . . . .
            n . . . . . . .
            ",
        );
        let generator = MoveGenerator::new();
        // c2 is friendly.
        assert_eq!(targets(&generator.gen_moves_at(&corner, sq("a1"))), ["b3"]);

        let centre = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . N . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        assert_eq!(generator.gen_moves_at(&centre, sq("d4")).len(), 8);
    }

    #[test]
    fn test_king_steps_include_all_eight_neighbours() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . k . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        let moves = MoveGenerator::new().gen_moves_at(&board, sq("e4"));
        assert_eq!(
            targets(&moves),
            ["d3", "d4", "d5", "e3", "e5", "f3", "f4", "f5"]
        );
    }

    #[test]
    fn test_pawn_pushes_and_captures() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . N . B . .
            . . . . p . . .
            . . . . . . . .
            ",
        );
        let moves = MoveGenerator::new().gen_moves_at(&board, sq("e2"));
        assert_eq!(targets(&moves), ["d3", "e3", "e4", "f3"]);
        let double = moves.iter().find(|mv| mv.to == sq("e4")).unwrap();
        assert_eq!(double.kind, MoveKind::PawnDoubleStep);
    }

    #[test]
    fn test_blocked_pawn_has_no_push() {
        let board = board(
            "
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . P . . .
            . . . . . . . .
            . . . . p . . .
            . . . . . . . .
            ",
        );
        let moves = MoveGenerator::new().gen_moves_at(&board, sq("e2"));
        assert_eq!(targets(&moves), ["e3"]);

        let upper = MoveGenerator::new().gen_moves_at(&board, sq("e4"));
        assert_eq!(targets(&upper), ["e3"]);
    }

    #[test]
    fn test_promotion_offers_four_pieces() {
        let board = board(
            "
            . . . . . N . .
            . . . . p . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        let moves = MoveGenerator::new().gen_moves_at(&board, sq("e7"));
        // Four for the push onto e8, four for the capture on f8.
        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|mv| mv.kind == MoveKind::Promotion));
        assert!(moves
            .iter()
            .all(|mv| mv.promotion.and_then(|piece| piece.side()) == Some(Side::Lower)));
    }

    #[test]
    fn test_castling_requires_flag_path_and_rook() {
        let layout = "
            . . . . K . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            r . . . k . . r
            ";
        let generator = MoveGenerator::new();
        let castles = |board: &Board| -> Vec<MoveKind> {
            generator
                .gen_moves_at(board, sq("e1"))
                .into_iter()
                .map(|mv| mv.kind)
                .filter(|kind| matches!(kind, MoveKind::ShortCastle | MoveKind::LongCastle))
                .collect()
        };

        let open = board(layout);
        assert_eq!(castles(&open), [MoveKind::ShortCastle, MoveKind::LongCastle]);

        let revoked = board(layout).with_castling(Side::Lower, false);
        assert!(castles(&revoked).is_empty());

        let blocked = board(&layout.replace("r . . . k . . r", "r n . . k . b r"));
        assert!(castles(&blocked).is_empty());

        let no_rook = board(&layout.replace("r . . . k . . r", ". . . . k . . R"));
        assert!(castles(&no_rook).is_empty());
    }

    #[test]
    fn test_castling_only_from_the_king_start_square() {
        let board = board(
            "
            . . . . K . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . k . . r .
            ",
        );
        assert!(board.castling_allowed(Side::Lower));
        let generator = MoveGenerator::new();
        assert!(generator
            .gen_moves_at(&board, sq("d1"))
            .iter()
            .all(|mv| !matches!(mv.kind, MoveKind::ShortCastle | MoveKind::LongCastle)));
        assert_eq!(Side::Lower.king_start(), sq("e1"));
        assert_eq!(Side::Upper.king_start(), sq("e8"));
    }

    #[test]
    fn test_en_passant_only_on_the_following_half_move() {
        let mut board = board(
            "
            . . . . K . . .
            . . . P . . . .
            . . . . . . . .
            . . . . p . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . k . . .
            ",
        );
        let generator = MoveGenerator::new();
        let en_passant = |board: &Board| {
            generator
                .gen_moves_for_one_side(board, Side::Lower)
                .into_iter()
                .filter(|mv| mv.kind == MoveKind::EnPassant)
                .collect::<Vec<_>>()
        };
        assert!(en_passant(&board).is_empty());

        board.make_move(Move::new(sq("d7"), sq("d5"), MoveKind::PawnDoubleStep));
        let captures = en_passant(&board);
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].from, sq("e5"));
        assert_eq!(captures[0].to, sq("d6"));

        board.make_move(Move::new(sq("e1"), sq("f1"), MoveKind::Normal));
        board.make_move(Move::new(sq("e8"), sq("f8"), MoveKind::Normal));
        assert!(en_passant(&board).is_empty());
    }

    #[test]
    fn test_move_equality_ignores_kind() {
        let a = Move::new(sq("e2"), sq("e4"), MoveKind::PawnDoubleStep);
        let b = Move::new(sq("e2"), sq("e4"), MoveKind::Normal);
        assert_eq!(a, b);
        assert_ne!(a, Move::new(sq("e2"), sq("e3"), MoveKind::Normal));
        assert_eq!(a.to_string(), "e2e4");
        assert_eq!(
            Move::promote(sq("a7"), sq("a8"), Piece::Lower(PieceKind::Knight)).to_string(),
            "a7a8n"
        );
    }

    #[test]
    fn test_resolve_text_moves() {
        let board = Board::new();
        let generator = MoveGenerator::new();

        let mv = generator.resolve(&board, Side::Lower, "e2e4").unwrap();
        assert_eq!(mv.kind, MoveKind::PawnDoubleStep);

        assert_eq!(
            generator.resolve(&board, Side::Lower, "e2e5"),
            Err(MoveError::Illegal("e2e5".to_string()))
        );
        assert_eq!(
            generator.resolve(&board, Side::Lower, "e7e5"),
            Err(MoveError::NotYourPiece {
                square: "e7".to_string()
            })
        );
        assert!(matches!(
            generator.resolve(&board, Side::Lower, "hello"),
            Err(MoveError::Malformed(_))
        ));
        assert!(matches!(
            generator.resolve(&board, Side::Lower, "z2e4"),
            Err(MoveError::Malformed(_))
        ));
    }

    #[test]
    fn test_resolve_picks_promotion_piece() {
        let board = board(
            "
            . . . . . . . .
            . . . . p . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
            ",
        );
        let generator = MoveGenerator::new();
        let queen = generator.resolve(&board, Side::Lower, "e7e8").unwrap();
        assert_eq!(queen.promotion, Some(Piece::Lower(PieceKind::Queen)));
        let knight = generator.resolve(&board, Side::Lower, "e7e8n").unwrap();
        assert_eq!(knight.promotion, Some(Piece::Lower(PieceKind::Knight)));
        assert!(matches!(
            generator.resolve(&board, Side::Lower, "e7e8k"),
            Err(MoveError::Malformed(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_suffix_without_promotion() {
        let board = Board::new();
        let generator = MoveGenerator::new();
        assert_eq!(
            generator.resolve(&board, Side::Lower, "e2e4q"),
            Err(MoveError::Illegal("e2e4q".to_string()))
        );
        assert_eq!(
            generator.resolve(&board, Side::Lower, "g1f3n"),
            Err(MoveError::Illegal("g1f3n".to_string()))
        );
    }
}
