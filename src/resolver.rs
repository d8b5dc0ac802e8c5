//! Chain resolution: group discovery, simultaneous clears, scoring and cascading gravity.

use crate::grid::{COLS, Cell, Grid, Position, ROWS};

/// Groups this size or larger are cleared.
pub const MIN_GROUP_SIZE: usize = 4;

const BASE_POINTS_PER_PUYO: u64 = 10;
const GROUP_BONUS_PER_PUYO: u64 = 5;

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// One cascade iteration that cleared something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPass {
    /// 1-based chain index.
    pub chain: u32,
    /// Cells emptied by this pass (before gravity).
    pub cleared: Vec<Position>,
    pub points: u64,
}

/// Stabilised grid plus what it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub grid: Grid,
    pub score_delta: u64,
    pub chain_depth: u32,
    pub passes: Vec<ChainPass>,
}

impl Resolution {
    pub fn cleared_total(&self) -> usize {
        self.passes.iter().map(|p| p.cleared.len()).sum()
    }
}

/// Every same-colour 4-connected group on the grid, discovered in row-major order.
/// Empty cells belong to no group.
pub fn find_groups(grid: &Grid) -> Vec<Vec<Position>> {
    let mut visited = [[false; COLS]; ROWS];
    let mut groups = Vec::new();
    let mut stack = Vec::with_capacity(ROWS * COLS);

    for row in 0..ROWS {
        for col in 0..COLS {
            if visited[row][col] {
                continue;
            }
            let start = Position::new(col as i32, row as i32);
            let Some(color) = grid.get(start).and_then(Cell::color) else {
                continue;
            };

            let mut group = Vec::new();
            visited[row][col] = true;
            stack.push(start);
            while let Some(pos) = stack.pop() {
                group.push(pos);
                for (dcol, drow) in NEIGHBOURS_4 {
                    let next = pos.offset(dcol, drow);
                    let Some((ncol, nrow)) = next.to_index() else {
                        continue;
                    };
                    if !visited[nrow][ncol] && grid.get(next) == Some(Cell::Puyo(color)) {
                        visited[nrow][ncol] = true;
                        stack.push(next);
                    }
                }
            }
            groups.push(group);
        }
    }
    groups
}

/// Points for a pass: `cleared * 10 * 2^(chain-1) + max(0, cleared-4) * 5`.
pub fn pass_points(cleared: usize, chain: u32) -> u64 {
    let cleared = cleared as u64;
    let multiplier = 2u64.saturating_pow(chain.saturating_sub(1));
    let base = cleared
        .saturating_mul(BASE_POINTS_PER_PUYO)
        .saturating_mul(multiplier);
    let bonus = cleared.saturating_sub(MIN_GROUP_SIZE as u64) * GROUP_BONUS_PER_PUYO;
    base.saturating_add(bonus)
}

/// Clears qualifying groups, applies gravity and repeats until a pass clears nothing.
///
/// Each pass collects every qualifying group before touching the grid, so the
/// clear is simultaneous and independent of discovery order.
pub fn resolve_chains(mut grid: Grid) -> Resolution {
    let mut passes = Vec::new();
    let mut score_delta = 0u64;
    let mut chain = 0u32;

    loop {
        let cleared: Vec<Position> = find_groups(&grid)
            .into_iter()
            .filter(|g| g.len() >= MIN_GROUP_SIZE)
            .flatten()
            .collect();
        if cleared.is_empty() {
            break;
        }
        chain += 1;
        for &pos in &cleared {
            grid.set(pos, Cell::Empty);
        }
        let points = pass_points(cleared.len(), chain);
        score_delta = score_delta.saturating_add(points);
        log::debug!(
            "chain {chain}: cleared {} puyos for {points} points",
            cleared.len()
        );
        passes.push(ChainPass {
            chain,
            cleared,
            points,
        });
        grid.apply_gravity();
    }

    Resolution {
        grid,
        score_delta,
        chain_depth: chain,
        passes,
    }
}
