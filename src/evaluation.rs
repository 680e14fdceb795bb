use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::board::{Board, Piece, PieceKind, Pos, Side, EDGE_LEN, LINE_BEGIN, LINE_END};
use crate::error::WeightsError;

pub type Score = i32;

/// Per-cell bonus over the padded grid; zero outside the playing area.
pub type PlacementGrid = [[Score; EDGE_LEN]; EDGE_LEN];

/// An 8x8 table written rank 8 first, the way the resource files are laid out.
pub type Table8 = [[Score; 8]; 8];

pub const MATERIAL_RESOURCE: &str = "pvalues.txt";

/// Largest magnitude accepted for a single loaded weight. With material and
/// placement both at this limit on all 64 cells the sum still stays inside
/// the search bounds of +-5_000_000.
pub const MAX_WEIGHT: Score = 39_000;

// Material and placement values for the lower side. The upper side uses the
// same tables mirrored top to bottom and negated, so higher scores always
// favour the lower side.
const PAWN_VALUE: Score = 100;
const ROOK_VALUE: Score = 500;
const KNIGHT_VALUE: Score = 320;
const BISHOP_VALUE: Score = 330;
const QUEEN_VALUE: Score = 900;
const KING_VALUE: Score = 20000;

const PAWN_PLACEMENT: Table8 = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [50, 50, 50, 50, 50, 50, 50, 50],
    [10, 10, 20, 30, 30, 20, 10, 10],
    [5, 5, 10, 25, 25, 10, 5, 5],
    [0, 0, 0, 20, 20, 0, 0, 0],
    [5, -5, -10, 0, 0, -10, -5, 5],
    [5, 10, 10, -20, -20, 10, 10, 5],
    [0, 0, 0, 0, 0, 0, 0, 0],
];

const KNIGHT_PLACEMENT: Table8 = [
    [-50, -40, -30, -30, -30, -30, -40, -50],
    [-40, -20, 0, 0, 0, 0, -20, -40],
    [-30, 0, 10, 15, 15, 10, 0, -30],
    [-30, 5, 15, 20, 20, 15, 5, -30],
    [-30, 0, 15, 20, 20, 15, 0, -30],
    [-30, 5, 10, 15, 15, 10, 5, -30],
    [-40, -20, 0, 5, 5, 0, -20, -40],
    [-50, -40, -30, -30, -30, -30, -40, -50],
];

const BISHOP_PLACEMENT: Table8 = [
    [-20, -10, -10, -10, -10, -10, -10, -20],
    [-10, 0, 0, 0, 0, 0, 0, -10],
    [-10, 0, 5, 10, 10, 5, 0, -10],
    [-10, 5, 5, 10, 10, 5, 5, -10],
    [-10, 0, 10, 10, 10, 10, 0, -10],
    [-10, 10, 10, 10, 10, 10, 10, -10],
    [-10, 5, 0, 0, 0, 0, 5, -10],
    [-20, -10, -10, -10, -10, -10, -10, -20],
];

const ROOK_PLACEMENT: Table8 = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [5, 10, 10, 10, 10, 10, 10, 5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [-5, 0, 0, 0, 0, 0, 0, -5],
    [0, 0, 0, 5, 5, 0, 0, 0],
];

const QUEEN_PLACEMENT: Table8 = [
    [-20, -10, -10, -5, -5, -10, -10, -20],
    [-10, 0, 0, 0, 0, 0, 0, -10],
    [-10, 0, 5, 5, 5, 5, 0, -10],
    [-5, 0, 5, 5, 5, 5, 0, -5],
    [0, 0, 5, 5, 5, 5, 0, -5],
    [-10, 5, 5, 5, 5, 5, 0, -10],
    [-10, 0, 5, 0, 0, 0, 0, -10],
    [-20, -10, -10, -5, -5, -10, -10, -20],
];

const KING_PLACEMENT: Table8 = [
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-30, -40, -40, -50, -50, -40, -40, -30],
    [-20, -30, -30, -40, -40, -30, -30, -20],
    [-10, -20, -20, -20, -20, -20, -20, -10],
    [20, 20, 0, 0, 0, 0, 20, 20],
    [20, 30, 10, 0, 0, 10, 30, 20],
];

/// Material and placement weights for every piece, built once and shared
/// read-only between the evaluator and all search workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightTables {
    material: [[Score; 6]; 2],
    placement: [[PlacementGrid; 6]; 2],
}

impl Default for WeightTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl WeightTables {
    /// Builds tables from per-side material values and 8x8 placement tables,
    /// both indexed by `Side::index` then `PieceKind::index`.
    pub fn new(material: [[Score; 6]; 2], tables: [[Table8; 6]; 2]) -> Self {
        let mut placement = [[[[0; EDGE_LEN]; EDGE_LEN]; 6]; 2];
        for side in 0..2 {
            for kind in 0..6 {
                placement[side][kind] = pad(&tables[side][kind]);
            }
        }
        Self {
            material,
            placement,
        }
    }

    pub fn standard() -> Self {
        let values = [
            PAWN_VALUE,
            ROOK_VALUE,
            KNIGHT_VALUE,
            BISHOP_VALUE,
            QUEEN_VALUE,
            KING_VALUE,
        ];
        let lower_tables = [
            PAWN_PLACEMENT,
            ROOK_PLACEMENT,
            KNIGHT_PLACEMENT,
            BISHOP_PLACEMENT,
            QUEEN_PLACEMENT,
            KING_PLACEMENT,
        ];

        let mut material = [[0; 6]; 2];
        let mut tables = [[[[0; 8]; 8]; 6]; 2];
        for kind in 0..6 {
            material[Side::Lower.index()][kind] = values[kind];
            material[Side::Upper.index()][kind] = -values[kind];
            tables[Side::Lower.index()][kind] = lower_tables[kind];
            tables[Side::Upper.index()][kind] = mirror_negated(&lower_tables[kind]);
        }
        Self::new(material, tables)
    }

    /// Reads `pvalues.txt` and the twelve `pos_value_*.txt` files from `dir`.
    ///
    /// Values are whitespace-separated numbers. Decimals are accepted and
    /// rounded to the nearest integer; anything beyond [`MAX_WEIGHT`] in
    /// magnitude is rejected as malformed.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, WeightsError> {
        let dir = dir.as_ref();

        let resource = dir.join(MATERIAL_RESOURCE);
        let values = parse_values(&resource, &read_resource(&resource)?, 12)?;
        let mut material = [[0; 6]; 2];
        for side in Side::BOTH {
            for kind in PieceKind::ALL {
                material[side.index()][kind.index()] = values[side.index() * 6 + kind.index()];
            }
        }

        let mut tables = [[[[0; 8]; 8]; 6]; 2];
        for side in Side::BOTH {
            for kind in PieceKind::ALL {
                let resource = dir.join(placement_resource(side, kind));
                let values = parse_values(&resource, &read_resource(&resource)?, 64)?;
                let table = &mut tables[side.index()][kind.index()];
                for (i, value) in values.into_iter().enumerate() {
                    table[i / 8][i % 8] = value;
                }
            }
        }

        info!("loaded weight tables from {}", dir.display());
        Ok(Self::new(material, tables))
    }

    /// Material value of a piece; zero for empty and off-board cells.
    pub fn material(&self, piece: Piece) -> Score {
        match (piece.side(), piece.kind()) {
            (Some(side), Some(kind)) => self.material[side.index()][kind.index()],
            _ => 0,
        }
    }

    /// Placement bonus of a piece standing on `pos`.
    pub fn placement(&self, piece: Piece, pos: Pos) -> Score {
        match (piece.side(), piece.kind()) {
            (Some(side), Some(kind)) if pos.is_playable() => {
                self.placement[side.index()][kind.index()][pos.row as usize][pos.col as usize]
            }
            _ => 0,
        }
    }
}

/// File name of the placement table for one piece.
pub fn placement_resource(side: Side, kind: PieceKind) -> String {
    let side = match side {
        Side::Upper => "upper",
        Side::Lower => "down",
    };
    format!("pos_value_{}_{}.txt", side, kind.name())
}

fn pad(table: &Table8) -> PlacementGrid {
    let mut grid = [[0; EDGE_LEN]; EDGE_LEN];
    for (r, row) in table.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            grid[LINE_BEGIN as usize + r][LINE_BEGIN as usize + c] = *value;
        }
    }
    grid
}

fn mirror_negated(table: &Table8) -> Table8 {
    let mut mirrored = [[0; 8]; 8];
    for r in 0..8 {
        for c in 0..8 {
            mirrored[r][c] = -table[7 - r][c];
        }
    }
    mirrored
}

fn read_resource(resource: &Path) -> Result<String, WeightsError> {
    fs::read_to_string(resource).map_err(|source| WeightsError::Io {
        resource: resource.to_path_buf(),
        source,
    })
}

fn parse_values(resource: &Path, text: &str, expected: usize) -> Result<Vec<Score>, WeightsError> {
    let values = text
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            let malformed = |reason: &str| WeightsError::Malformed {
                resource: PathBuf::from(resource),
                detail: format!("value #{} '{}' {}", i + 1, token, reason),
            };
            let value = token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| malformed("is not a number"))?
                .round();
            if value.abs() > f64::from(MAX_WEIGHT) {
                return Err(malformed(&format!("exceeds the limit of {}", MAX_WEIGHT)));
            }
            Ok(value as Score)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() < expected {
        return Err(WeightsError::Truncated {
            resource: resource.to_path_buf(),
            expected,
            found: values.len(),
        });
    }
    if values.len() > expected {
        return Err(WeightsError::Malformed {
            resource: resource.to_path_buf(),
            detail: format!("expected {} values, found {}", expected, values.len()),
        });
    }
    Ok(values)
}

/// Static evaluation. Higher scores favour the lower side, lower scores the
/// upper side, whichever side is to move.
#[derive(Debug, Clone)]
pub struct Evaluator {
    weights: Arc<WeightTables>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(Arc::new(WeightTables::standard()))
    }
}

impl Evaluator {
    pub fn new(weights: Arc<WeightTables>) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightTables {
        &self.weights
    }

    pub fn evaluate(&self, board: &Board) -> Score {
        let mut score = 0;
        for row in LINE_BEGIN..=LINE_END {
            for col in LINE_BEGIN..=LINE_END {
                let pos = Pos::new(row, col);
                let piece = board.get(pos);
                if piece.is_empty() {
                    continue;
                }
                score += self.weights.material(piece) + self.weights.placement(piece, pos);
            }
        }
        score
    }
}
