use std::fmt;

use crate::error::LayoutError;
use crate::movegen::{Move, MoveKind};

/// Width of the padded grid. The 8x8 playing area is surrounded by two
/// lines of off-board cells on every edge, so knight offsets and ray scans
/// always land on a real cell.
pub const EDGE_LEN: usize = 12;
/// First playable row/column index.
pub const LINE_BEGIN: i32 = 2;
/// Last playable row/column index (inclusive).
pub const LINE_END: i32 = 9;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Cells of the initial position: upper on ranks 8 and 7, lower on 2 and 1.
const STANDARD_CELLS: [[Piece; EDGE_LEN]; EDGE_LEN] = standard_cells();

const fn standard_cells() -> [[Piece; EDGE_LEN]; EDGE_LEN] {
    let begin = LINE_BEGIN as usize;
    let mut cells = [[Piece::OffBoard; EDGE_LEN]; EDGE_LEN];
    let mut row = begin;
    while row <= LINE_END as usize {
        let mut col = begin;
        while col <= LINE_END as usize {
            cells[row][col] = match row - begin {
                0 => Piece::Upper(BACK_RANK[col - begin]),
                1 => Piece::Upper(PieceKind::Pawn),
                6 => Piece::Lower(PieceKind::Pawn),
                7 => Piece::Lower(BACK_RANK[col - begin]),
                _ => Piece::Empty,
            };
            col += 1;
        }
        row += 1;
    }
    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Starts on ranks 8 and 7 and moves down the board. Minimizes the score.
    Upper,
    /// Starts on ranks 1 and 2 and moves up the board. Maximizes the score.
    Lower,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Upper, Side::Lower];

    pub fn opposite(&self) -> Side {
        match self {
            Side::Upper => Side::Lower,
            Side::Lower => Side::Upper,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Side::Upper => 0,
            Side::Lower => 1,
        }
    }

    /// Row delta of a single pawn step.
    pub fn forward(&self) -> i32 {
        match self {
            Side::Upper => 1,
            Side::Lower => -1,
        }
    }

    pub fn pawn_start_row(&self) -> i32 {
        match self {
            Side::Upper => LINE_BEGIN + 1,
            Side::Lower => LINE_END - 1,
        }
    }

    pub fn promotion_row(&self) -> i32 {
        match self {
            Side::Upper => LINE_END,
            Side::Lower => LINE_BEGIN,
        }
    }

    /// The e-file square the king starts on. Castling only happens from here.
    pub fn king_start(&self) -> Pos {
        match self {
            Side::Upper => Pos::new(LINE_BEGIN, LINE_BEGIN + 4),
            Side::Lower => Pos::new(LINE_END, LINE_BEGIN + 4),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::Upper => write!(f, "upper"),
            Side::Lower => write!(f, "lower"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
    ];

    pub fn index(&self) -> usize {
        match self {
            PieceKind::Pawn => 0,
            PieceKind::Rook => 1,
            PieceKind::Knight => 2,
            PieceKind::Bishop => 3,
            PieceKind::Queen => 4,
            PieceKind::King => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Rook => "rook",
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
        }
    }

    fn letter(&self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Rook => 'r',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    fn from_letter(letter: char) -> Option<PieceKind> {
        PieceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.letter() == letter)
    }
}

/// Content of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Piece {
    Upper(PieceKind),
    Lower(PieceKind),
    Empty,
    OffBoard,
}

impl Piece {
    pub fn new(side: Side, kind: PieceKind) -> Piece {
        match side {
            Side::Upper => Piece::Upper(kind),
            Side::Lower => Piece::Lower(kind),
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Piece::Upper(_) => Some(Side::Upper),
            Piece::Lower(_) => Some(Side::Lower),
            Piece::Empty | Piece::OffBoard => None,
        }
    }

    pub fn kind(&self) -> Option<PieceKind> {
        match self {
            Piece::Upper(kind) | Piece::Lower(kind) => Some(*kind),
            Piece::Empty | Piece::OffBoard => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Piece::Empty
    }

    /// Upper pieces print in capitals, lower pieces in lowercase.
    pub fn symbol(&self) -> char {
        match self {
            Piece::Upper(kind) => kind.letter().to_ascii_uppercase(),
            Piece::Lower(kind) => kind.letter(),
            Piece::Empty => '.',
            Piece::OffBoard => '#',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Piece> {
        match symbol {
            '.' => Some(Piece::Empty),
            '#' => Some(Piece::OffBoard),
            c if c.is_ascii_uppercase() => {
                PieceKind::from_letter(c.to_ascii_lowercase()).map(Piece::Upper)
            }
            c => PieceKind::from_letter(c).map(Piece::Lower),
        }
    }
}

/// A cell of the padded grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(&self, d_row: i32, d_col: i32) -> Pos {
        Pos::new(self.row + d_row, self.col + d_col)
    }

    pub fn is_playable(&self) -> bool {
        (LINE_BEGIN..=LINE_END).contains(&self.row) && (LINE_BEGIN..=LINE_END).contains(&self.col)
    }

    /// Parses a square such as `e2`.
    pub fn from_square(square: &str) -> Option<Pos> {
        let bytes = square.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return None;
        }
        Some(Pos::new(
            LINE_BEGIN + (b'8' - rank) as i32,
            LINE_BEGIN + (file - b'a') as i32,
        ))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.is_playable() {
            return write!(f, "({}, {})", self.row, self.col);
        }
        let file = (b'a' + (self.col - LINE_BEGIN) as u8) as char;
        let rank = (b'8' - (self.row - LINE_BEGIN) as u8) as char;
        write!(f, "{}{}", file, rank)
    }
}

/// Everything needed to reverse one `make_move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub from: Pos,
    pub to: Pos,
    pub kind: MoveKind,
    pub moved: Piece,
    pub captured: Piece,
    pub castling: [bool; 2],
    pub en_passant: Option<Pos>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Piece; EDGE_LEN]; EDGE_LEN],
    castling: [bool; 2], // indexed by Side::index
    en_passant: Option<Pos>,
    history: Vec<HistoryEntry>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// The standard initial layout, upper side on ranks 8 and 7.
    pub fn new() -> Self {
        Self {
            cells: STANDARD_CELLS,
            castling: [true, true],
            en_passant: None,
            history: Vec::new(),
        }
    }

    /// A board with no pieces at all.
    pub fn empty() -> Self {
        let mut cells = [[Piece::OffBoard; EDGE_LEN]; EDGE_LEN];
        for row in LINE_BEGIN..=LINE_END {
            for col in LINE_BEGIN..=LINE_END {
                cells[row as usize][col as usize] = Piece::Empty;
            }
        }
        Self {
            cells,
            castling: [true, true],
            en_passant: None,
            history: Vec::new(),
        }
    }

    /// Builds a board from 8 rows of 8 whitespace-separated symbols, rank 8
    /// first. Blank lines are ignored. Both sides start with castling allowed.
    pub fn from_layout(layout: &str) -> Result<Self, LayoutError> {
        let rows: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.len() != 8 {
            return Err(LayoutError::RowCount(rows.len()));
        }

        let mut board = Board::empty();
        for (r, line) in rows.iter().enumerate() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != 8 {
                return Err(LayoutError::RowWidth {
                    row: r + 1,
                    found: tokens.len(),
                });
            }
            for (c, token) in tokens.iter().enumerate() {
                let piece = single_char(token)
                    .and_then(Piece::from_symbol)
                    .filter(|piece| *piece != Piece::OffBoard)
                    .ok_or_else(|| LayoutError::Symbol {
                        row: r + 1,
                        symbol: token.to_string(),
                    })?;
                board.set(Pos::new(LINE_BEGIN + r as i32, LINE_BEGIN + c as i32), piece);
            }
        }
        Ok(board)
    }

    pub fn with_castling(mut self, side: Side, allowed: bool) -> Self {
        self.castling[side.index()] = allowed;
        self
    }

    /// Cells outside the padded grid read as off-board as well.
    pub fn get(&self, pos: Pos) -> Piece {
        if pos.row < 0 || pos.col < 0 || pos.row >= EDGE_LEN as i32 || pos.col >= EDGE_LEN as i32 {
            return Piece::OffBoard;
        }
        self.cells[pos.row as usize][pos.col as usize]
    }

    fn set(&mut self, pos: Pos, piece: Piece) {
        debug_assert!(pos.is_playable(), "border cell {pos} is never written");
        self.cells[pos.row as usize][pos.col as usize] = piece;
    }

    pub fn castling_allowed(&self, side: Side) -> bool {
        self.castling[side.index()]
    }

    /// The square skipped by the last double step, if an enemy pawn can take it.
    pub fn en_passant_target(&self) -> Option<Pos> {
        self.en_passant
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn make_move(&mut self, mv: Move) {
        let moved = self.get(mv.from);
        self.history.push(HistoryEntry {
            from: mv.from,
            to: mv.to,
            kind: mv.kind,
            moved,
            captured: self.get(mv.to),
            castling: self.castling,
            en_passant: self.en_passant,
        });
        self.en_passant = None;

        if mv.kind == MoveKind::Promotion {
            let promoted = mv
                .promotion
                .or_else(|| moved.side().map(|side| Piece::new(side, PieceKind::Queen)))
                .unwrap_or(moved);
            self.set(mv.to, promoted);
            self.set(mv.from, Piece::Empty);
            return;
        }

        self.set(mv.to, moved);
        self.set(mv.from, Piece::Empty);

        if moved.kind() == Some(PieceKind::King) {
            if let Some(side) = moved.side() {
                self.castling[side.index()] = false;
            }
        }

        match mv.kind {
            MoveKind::LongCastle => {
                let rook_from = mv.from.offset(0, -4);
                let rook_to = mv.from.offset(0, -1);
                self.set(rook_to, self.get(rook_from));
                self.set(rook_from, Piece::Empty);
            }
            MoveKind::ShortCastle => {
                let rook_from = mv.from.offset(0, 3);
                let rook_to = mv.from.offset(0, 1);
                self.set(rook_to, self.get(rook_from));
                self.set(rook_from, Piece::Empty);
            }
            MoveKind::EnPassant => {
                self.set(Pos::new(mv.from.row, mv.to.col), Piece::Empty);
            }
            MoveKind::PawnDoubleStep => {
                if let Some(side) = moved.side() {
                    let enemy_pawn = Piece::new(side.opposite(), PieceKind::Pawn);
                    if self.get(mv.to.offset(0, -1)) == enemy_pawn
                        || self.get(mv.to.offset(0, 1)) == enemy_pawn
                    {
                        self.en_passant =
                            Some(Pos::new((mv.from.row + mv.to.row) / 2, mv.from.col));
                    }
                }
            }
            MoveKind::Normal | MoveKind::Promotion => {}
        }
    }

    /// Reverses the most recent `make_move`. Does nothing on a fresh board.
    pub fn undo(&mut self) {
        let Some(entry) = self.history.pop() else {
            return;
        };

        self.set(entry.from, entry.moved);
        self.set(entry.to, entry.captured);

        match entry.kind {
            MoveKind::LongCastle => {
                let rook_home = entry.from.offset(0, -4);
                let rook_now = entry.from.offset(0, -1);
                self.set(rook_home, self.get(rook_now));
                self.set(rook_now, Piece::Empty);
            }
            MoveKind::ShortCastle => {
                let rook_home = entry.from.offset(0, 3);
                let rook_now = entry.from.offset(0, 1);
                self.set(rook_home, self.get(rook_now));
                self.set(rook_now, Piece::Empty);
            }
            MoveKind::EnPassant => {
                if let Some(side) = entry.moved.side() {
                    self.set(
                        Pos::new(entry.from.row, entry.to.col),
                        Piece::new(side.opposite(), PieceKind::Pawn),
                    );
                }
            }
            MoveKind::Normal | MoveKind::Promotion | MoveKind::PawnDoubleStep => {}
        }

        self.castling = entry.castling;
        self.en_passant = entry.en_passant;
    }

    /// The side whose king is still standing once the other king has been
    /// captured. `None` while both kings (or neither) are on the board.
    pub fn winner(&self) -> Option<Side> {
        let mut kings = [false; 2];
        for row in LINE_BEGIN..=LINE_END {
            for col in LINE_BEGIN..=LINE_END {
                let piece = self.get(Pos::new(row, col));
                if piece.kind() == Some(PieceKind::King) {
                    if let Some(side) = piece.side() {
                        kings[side.index()] = true;
                    }
                }
            }
        }
        match kings {
            [true, false] => Some(Side::Upper),
            [false, true] => Some(Side::Lower),
            _ => None,
        }
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = String::new();
        for row in LINE_BEGIN..=LINE_END {
            result.push_str(&format!(" {}  ", 8 - (row - LINE_BEGIN)));
            for col in LINE_BEGIN..=LINE_END {
                result.push(self.get(Pos::new(row, col)).symbol());
                if col < LINE_END {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        result.push_str("\n    a b c d e f g h\n");
        write!(f, "{}", result)
    }
}
