//! The sketch board activity: a fixed grid of colored cells.

use serde::{Deserialize, Serialize};
use sketchboard_protocol::{Color, Stroke};

use crate::{Activity, SessionConfig, SessionError, BOARD_HEIGHT, BOARD_WIDTH};

/// A row-major grid of colors, `BOARD_HEIGHT` rows of `BOARD_WIDTH`
/// cells. Serialized as nested arrays of `#rrggbb` strings.
///
/// `board.get(x, y)` reads row `x`, column `y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    rows: Vec<Vec<Color>>,
}

impl Board {
    /// A board with every cell set to `color`.
    pub fn filled(color: Color) -> Self {
        Self {
            rows: vec![vec![color; BOARD_WIDTH]; BOARD_HEIGHT],
        }
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        self.rows.get(x).and_then(|row| row.get(y)).copied()
    }

    pub fn rows(&self) -> &[Vec<Color>] {
        &self.rows
    }

    /// `true` when every cell holds `color`.
    pub fn is_filled_with(&self, color: Color) -> bool {
        self.rows.iter().flatten().all(|c| *c == color)
    }

    fn contains(&self, x: usize, y: usize) -> bool {
        self.rows.get(x).is_some_and(|row| y < row.len())
    }

    fn fill(&mut self, color: Color) {
        for cell in self.rows.iter_mut().flatten() {
            *cell = color;
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::filled(Color::WHITE)
    }
}

/// Shared drawing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SketchBoard {
    board: Board,
    background_color: Color,
}

impl SketchBoard {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }
}

impl Default for SketchBoard {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl Activity for SketchBoard {
    type Edit = Vec<Stroke>;

    fn new(config: &SessionConfig) -> Self {
        Self {
            board: Board::filled(config.background_color),
            background_color: config.background_color,
        }
    }

    /// Writes every stroke in order. Later strokes win on the same cell.
    ///
    /// All coordinates are checked first; one bad stroke rejects the
    /// whole edit with `OutOfBounds` and nothing is written.
    fn apply_edit(&mut self, strokes: Vec<Stroke>) -> Result<(), SessionError> {
        if let Some(bad) = strokes.iter().find(|s| !self.board.contains(s.x, s.y)) {
            return Err(SessionError::OutOfBounds { x: bad.x, y: bad.y });
        }
        for stroke in strokes {
            self.board.rows[stroke.x][stroke.y] = stroke.color;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.board.fill(self.background_color);
    }
}
