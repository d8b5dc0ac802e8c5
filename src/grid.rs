//! Playfield grid: 6×12 matrix of puyo cells, placement check and column gravity.

use crate::piece::Piece;

/// Playfield height in cells. Row 0 is the top.
pub const ROWS: usize = 12;
/// Playfield width in cells.
pub const COLS: usize = 6;

/// Any occupied cell in this row after a landing ends the game.
pub const GAME_OVER_ROW: usize = 1;

/// Puyo colours. Only equality matters for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PuyoColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl PuyoColor {
    pub const ALL: [Self; 4] = [Self::Red, Self::Green, Self::Blue, Self::Yellow];

    /// Palette slot used by the theme (0..4).
    pub const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Yellow => 3,
        }
    }
}

/// Single cell: either empty or holding a puyo of some colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Puyo(PuyoColor),
}

impl Cell {
    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    #[inline]
    pub const fn color(self) -> Option<PuyoColor> {
        match self {
            Self::Empty => None,
            Self::Puyo(c) => Some(c),
        }
    }
}

/// Cell coordinate. Signed so that candidate positions outside the grid can be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub col: i32,
    pub row: i32,
}

impl Position {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub const fn offset(self, dcol: i32, drow: i32) -> Self {
        Self {
            col: self.col + dcol,
            row: self.row + drow,
        }
    }

    /// Grid indices `(col, row)` when inside `[0, COLS) × [0, ROWS)`.
    #[inline]
    pub fn to_index(self) -> Option<(usize, usize)> {
        let col = usize::try_from(self.col).ok()?;
        let row = usize::try_from(self.row).ok()?;
        (col < COLS && row < ROWS).then_some((col, row))
    }
}

/// Fixed-size playfield. Dimensions never change; only cell contents do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// `cells[row][col]`; `cells[0]` is the top row.
    cells: [[Cell; COLS]; ROWS],
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    /// Grid with every cell empty.
    pub const fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; COLS]; ROWS],
        }
    }

    #[inline]
    pub fn get(&self, pos: Position) -> Option<Cell> {
        let (col, row) = pos.to_index()?;
        Some(self.cells[row][col])
    }

    /// Writes a cell; positions outside the grid are ignored.
    #[inline]
    pub fn set(&mut self, pos: Position, cell: Cell) {
        if let Some((col, row)) = pos.to_index() {
            self.cells[row][col] = cell;
        }
    }

    /// Rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell; COLS]> + '_ {
        self.cells.iter()
    }

    /// True if the position is inside the grid and empty.
    #[inline]
    pub fn is_free(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(Cell::is_empty)
    }

    /// Movement validator: both cells of the piece must be in bounds and empty.
    /// Moves and rotations all go through this one check; there are no wall kicks.
    pub fn can_place(&self, piece: &Piece) -> bool {
        self.is_free(piece.anchor) && self.is_free(piece.second_cell())
    }

    /// Writes both cells of the piece at its current position.
    pub fn fill_piece(&mut self, piece: &Piece) {
        for (pos, color) in piece.cells() {
            self.set(pos, Cell::Puyo(color));
        }
    }

    /// Compacts every column downward, keeping the vertical order of the puyos.
    /// Returns true if anything moved.
    pub fn apply_gravity(&mut self) -> bool {
        let mut moved = false;
        for col in 0..COLS {
            let mut write = ROWS;
            for row in (0..ROWS).rev() {
                let cell = self.cells[row][col];
                if cell.is_empty() {
                    continue;
                }
                write -= 1;
                if write != row {
                    self.cells[write][col] = cell;
                    self.cells[row][col] = Cell::Empty;
                    moved = true;
                }
            }
        }
        moved
    }

    pub fn row_occupied(&self, row: usize) -> bool {
        self.cells
            .get(row)
            .is_some_and(|r| r.iter().any(|c| !c.is_empty()))
    }

    pub fn occupied_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|c| !c.is_empty())
            .count()
    }

    /// Builds a grid from text rows aligned to the bottom: `.` empty, `R G B Y` puyos.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let mut grid = Self::empty();
        let top = ROWS - rows.len();
        for (i, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let cell = match ch {
                    'R' => Cell::Puyo(PuyoColor::Red),
                    'G' => Cell::Puyo(PuyoColor::Green),
                    'B' => Cell::Puyo(PuyoColor::Blue),
                    'Y' => Cell::Puyo(PuyoColor::Yellow),
                    _ => Cell::Empty,
                };
                grid.cells[top + i][col] = cell;
            }
        }
        grid
    }
}
