//! Falling pair: two colours, an anchor position and an orientation; plus the colour source.

use crate::grid::{Position, PuyoColor};
use rand::{Rng, SeedableRng as _};
use rand_pcg::Pcg32;
use std::fmt;
use thiserror::Error;

/// Anchor column of a freshly spawned pair.
pub const SPAWN_COLUMN: i32 = 2;
/// Anchor row of a freshly spawned pair.
pub const SPAWN_ROW: i32 = 0;

/// Where the second puyo sits relative to the anchor (0..4: up, right, down, left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Up,
    Right,
    Down,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrientationError {
    #[error("orientation {0} is out of range (expected 0..=3)")]
    OutOfRange(u8),
}

impl TryFrom<u8> for Orientation {
    type Error = OrientationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Up),
            1 => Ok(Self::Right),
            2 => Ok(Self::Down),
            3 => Ok(Self::Left),
            n => Err(OrientationError::OutOfRange(n)),
        }
    }
}

impl From<Orientation> for u8 {
    fn from(o: Orientation) -> Self {
        match o {
            Orientation::Up => 0,
            Orientation::Right => 1,
            Orientation::Down => 2,
            Orientation::Left => 3,
        }
    }
}

impl Orientation {
    pub const ALL: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// `(dcol, drow)` of the second cell; row grows downward.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    pub const fn rotated_cw(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    pub const fn rotated_ccw(self) -> Self {
        match self {
            Self::Up => Self::Left,
            Self::Right => Self::Up,
            Self::Down => Self::Right,
            Self::Left => Self::Down,
        }
    }
}

/// Position of the second puyo for an anchor and orientation.
pub const fn second_cell_position(anchor: Position, orientation: Orientation) -> Position {
    let (dcol, drow) = orientation.offset();
    anchor.offset(dcol, drow)
}

/// Falling pair. `color1` sits on the anchor, `color2` on the second cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub color1: PuyoColor,
    pub color2: PuyoColor,
    pub anchor: Position,
    pub orientation: Orientation,
}

impl Piece {
    /// New pair at the spawn column, anchor on row 0 with the second puyo below it
    /// so both cells start inside the grid.
    pub const fn spawn(color1: PuyoColor, color2: PuyoColor) -> Self {
        Self {
            color1,
            color2,
            anchor: Position::new(SPAWN_COLUMN, SPAWN_ROW),
            orientation: Orientation::Down,
        }
    }

    #[inline]
    pub const fn second_cell(&self) -> Position {
        second_cell_position(self.anchor, self.orientation)
    }

    pub const fn cells(&self) -> [(Position, PuyoColor); 2] {
        [(self.anchor, self.color1), (self.second_cell(), self.color2)]
    }

    pub fn shifted(&self, dcol: i32, drow: i32) -> Self {
        Self {
            anchor: self.anchor.offset(dcol, drow),
            ..*self
        }
    }

    pub fn rotated_cw(&self) -> Self {
        Self {
            orientation: self.orientation.rotated_cw(),
            ..*self
        }
    }

    pub fn rotated_ccw(&self) -> Self {
        Self {
            orientation: self.orientation.rotated_ccw(),
            ..*self
        }
    }
}

/// Supplies puyo colours for new pairs. Seedable implementations make games reproducible.
pub trait ColorSource: fmt::Debug {
    fn next_color(&mut self) -> PuyoColor;

    /// Draws `color1` then `color2` and spawns the pair.
    fn next_piece(&mut self) -> Piece {
        let color1 = self.next_color();
        let color2 = self.next_color();
        Piece::spawn(color1, color2)
    }
}

/// Uniform colours, independent per cell.
#[derive(Debug, Clone)]
pub struct RandomColors {
    rng: Pcg32,
}

impl Default for RandomColors {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomColors {
    /// Seeded from the thread-local generator; use [`Self::with_seed`] for replays and tests.
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl ColorSource for RandomColors {
    fn next_color(&mut self) -> PuyoColor {
        PuyoColor::ALL[self.rng.random_range(0..PuyoColor::ALL.len())]
    }
}

/// Repeats a fixed colour sequence. Test helper.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ScriptedColors {
    colors: Vec<PuyoColor>,
    next: usize,
}

#[cfg(test)]
impl ScriptedColors {
    pub(crate) fn new(colors: Vec<PuyoColor>) -> Self {
        assert!(!colors.is_empty());
        Self { colors, next: 0 }
    }
}

#[cfg(test)]
impl ColorSource for ScriptedColors {
    fn next_color(&mut self) -> PuyoColor {
        let c = self.colors[self.next % self.colors.len()];
        self.next += 1;
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_second_cell_is_orthogonally_adjacent() {
        for col in 0..6 {
            for row in 0..12 {
                let anchor = Position::new(col, row);
                let mut seen = HashSet::new();
                for o in Orientation::ALL {
                    let p = second_cell_position(anchor, o);
                    let dist = (p.col - anchor.col).abs() + (p.row - anchor.row).abs();
                    assert_eq!(dist, 1);
                    seen.insert(p);
                }
                assert_eq!(seen.len(), 4);
            }
        }
    }

    #[test]
    fn test_orientation_offsets() {
        let anchor = Position::new(2, 5);
        assert_eq!(second_cell_position(anchor, Orientation::Up), Position::new(2, 4));
        assert_eq!(second_cell_position(anchor, Orientation::Right), Position::new(3, 5));
        assert_eq!(second_cell_position(anchor, Orientation::Down), Position::new(2, 6));
        assert_eq!(second_cell_position(anchor, Orientation::Left), Position::new(1, 5));
    }

    #[test]
    fn test_orientation_try_from() {
        for raw in 0..4u8 {
            let o = Orientation::try_from(raw).unwrap();
            assert_eq!(u8::from(o), raw);
        }
        assert_eq!(Orientation::try_from(4), Err(OrientationError::OutOfRange(4)));
        assert_eq!(
            Orientation::try_from(255),
            Err(OrientationError::OutOfRange(255))
        );
    }

    #[test]
    fn test_rotation_cycles() {
        for o in Orientation::ALL {
            assert_eq!(o.rotated_cw().rotated_ccw(), o);
            assert_eq!(o.rotated_cw().rotated_cw().rotated_cw().rotated_cw(), o);
        }
        assert_eq!(Orientation::Up.rotated_cw(), Orientation::Right);
        assert_eq!(Orientation::Up.rotated_ccw(), Orientation::Left);
    }

    #[test]
    fn test_spawn_position() {
        let p = Piece::spawn(PuyoColor::Red, PuyoColor::Green);
        assert_eq!(p.anchor, Position::new(SPAWN_COLUMN, SPAWN_ROW));
        assert_eq!(p.second_cell(), Position::new(SPAWN_COLUMN, SPAWN_ROW + 1));
        assert_eq!(
            p.cells(),
            [
                (Position::new(2, 0), PuyoColor::Red),
                (Position::new(2, 1), PuyoColor::Green)
            ]
        );
    }

    #[test]
    fn test_seeded_colours_are_reproducible() {
        let mut a = RandomColors::with_seed(42);
        let mut b = RandomColors::with_seed(42);
        for _ in 0..50 {
            assert_eq!(a.next_piece(), b.next_piece());
        }
    }

    #[test]
    fn test_random_colours_cover_palette() {
        let mut source = RandomColors::with_seed(7);
        let seen: HashSet<_> = (0..200).map(|_| source.next_color()).collect();
        assert_eq!(seen.len(), PuyoColor::ALL.len());
    }
}
