//! Game state: grid, falling and next pair, score, phase transitions and the fall timer.

use crate::grid::{GAME_OVER_ROW, Grid, Position};
use crate::piece::{ColorSource, Piece, RandomColors};
use crate::resolver::{Resolution, resolve_chains};
use crate::timer::FallTimer;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Title,
    Active,
    Paused,
    Over,
}

/// Things collaborators (feedback, persistence, logging) may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    Started,
    Moved,
    Rotated,
    Landed { cells: [Position; 2] },
    Chain { depth: u32, cleared: usize, points: u64 },
    HighScore(u64),
    Paused,
    Resumed,
    GameOver { score: u64 },
}

/// Game session. Owns everything the engine mutates; handlers run to completion.
#[derive(Debug)]
pub struct GameState {
    grid: Grid,
    piece: Option<Piece>,
    next: Option<Piece>,
    score: u64,
    high_score: u64,
    /// Chain depth of the resolution in progress; 0 between landings.
    chain: u32,
    last_resolution: Option<Resolution>,
    phase: Phase,
    fall_timer: FallTimer,
    colors: Box<dyn ColorSource>,
    split_drop: bool,
    events: Vec<GameEvent>,
}

impl GameState {
    pub fn new(config: &crate::GameConfig, high_score: u64) -> Self {
        let colors: Box<dyn ColorSource> = match config.seed {
            Some(seed) => Box::new(RandomColors::with_seed(seed)),
            None => Box::new(RandomColors::new()),
        };
        Self::with_colors(config, high_score, colors)
    }

    pub fn with_colors(
        config: &crate::GameConfig,
        high_score: u64,
        colors: Box<dyn ColorSource>,
    ) -> Self {
        Self {
            grid: Grid::empty(),
            piece: None,
            next: None,
            score: 0,
            high_score,
            chain: 0,
            last_resolution: None,
            phase: Phase::Title,
            fall_timer: FallTimer::new(Duration::from_millis(config.fall_interval_ms)),
            colors,
            split_drop: config.split_drop,
            events: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn next_piece(&self) -> Option<&Piece> {
        self.next.as_ref()
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    pub fn chain(&self) -> u32 {
        self.chain
    }

    /// Chain depth reached by the most recent landing, for display.
    pub fn last_chain(&self) -> u32 {
        self.last_resolution.as_ref().map_or(0, |r| r.chain_depth)
    }

    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last_resolution.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn fall_timer(&self) -> &FallTimer {
        &self.fall_timer
    }

    /// Active and not paused: the only condition in which input and gravity apply.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fresh grid, zero score, two new pairs, fall timer armed. Also used for restart.
    pub fn start_game(&mut self, now: Instant) {
        self.grid = Grid::empty();
        self.score = 0;
        self.chain = 0;
        self.last_resolution = None;
        self.piece = Some(self.colors.next_piece());
        self.next = Some(self.colors.next_piece());
        self.phase = Phase::Active;
        self.fall_timer.arm(now);
        self.events.push(GameEvent::Started);
        log::info!("game started (high score {})", self.high_score);
    }

    /// Starts a new game from the title or game-over screen; ignored mid-game.
    pub fn restart(&mut self, now: Instant) {
        if matches!(self.phase, Phase::Title | Phase::Over) {
            self.start_game(now);
        }
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        match self.phase {
            Phase::Active => {
                self.phase = Phase::Paused;
                self.fall_timer.cancel();
                self.events.push(GameEvent::Paused);
            }
            Phase::Paused => {
                self.phase = Phase::Active;
                self.fall_timer.arm(now);
                self.events.push(GameEvent::Resumed);
            }
            Phase::Title | Phase::Over => {}
        }
    }

    /// Fall timer handler: one implicit move down per elapsed interval.
    /// Returns true if the timer fired.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_running() || !self.fall_timer.poll(now) {
            return false;
        }
        self.move_down();
        true
    }

    pub fn move_left(&mut self) {
        self.try_replace(|p| p.shifted(-1, 0), GameEvent::Moved);
    }

    pub fn move_right(&mut self) {
        self.try_replace(|p| p.shifted(1, 0), GameEvent::Moved);
    }

    pub fn rotate_left(&mut self) {
        self.try_replace(Piece::rotated_ccw, GameEvent::Rotated);
    }

    pub fn rotate_right(&mut self) {
        self.try_replace(Piece::rotated_cw, GameEvent::Rotated);
    }

    /// Moves the pair down one row, or lands it where it is if the row below is blocked.
    pub fn move_down(&mut self) {
        if !self.is_running() {
            return;
        }
        if !self.try_replace(|p| p.shifted(0, 1), GameEvent::Moved) {
            self.land();
        }
    }

    /// Validates the candidate and swaps it in. Illegal candidates leave the piece untouched.
    fn try_replace(&mut self, candidate: impl FnOnce(&Piece) -> Piece, event: GameEvent) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(piece) = self.piece else {
            return false;
        };
        let moved = candidate(&piece);
        if !self.grid.can_place(&moved) {
            return false;
        }
        log::trace!("{event:?} to {:?}/{:?}", moved.anchor, moved.orientation);
        self.piece = Some(moved);
        self.events.push(event);
        true
    }

    /// Commits the falling pair at its current position, resolves chains, promotes the
    /// next pair and checks for game over.
    fn land(&mut self) {
        let Some(piece) = self.piece.take() else {
            return;
        };
        self.grid.fill_piece(&piece);
        self.events.push(GameEvent::Landed {
            cells: [piece.anchor, piece.second_cell()],
        });
        log::debug!("landed at {:?}/{:?}", piece.anchor, piece.second_cell());

        if self.split_drop {
            self.grid.apply_gravity();
        }

        let resolution = resolve_chains(self.grid);
        if resolution.chain_depth > 0 {
            log::debug!(
                "{} puyos cleared in a {}-chain for {} points, {} left",
                resolution.cleared_total(),
                resolution.chain_depth,
                resolution.score_delta,
                resolution.grid.occupied_count()
            );
        }
        for pass in &resolution.passes {
            self.chain = pass.chain;
            self.events.push(GameEvent::Chain {
                depth: pass.chain,
                cleared: pass.cleared.len(),
                points: pass.points,
            });
        }
        self.grid = resolution.grid;
        self.add_score(resolution.score_delta);
        self.last_resolution = Some(resolution);

        self.piece = self.next.take();
        self.next = Some(self.colors.next_piece());
        self.chain = 0;

        let spawn_blocked = self.piece.is_some_and(|p| !self.grid.can_place(&p));
        if self.grid.row_occupied(GAME_OVER_ROW) || spawn_blocked {
            self.game_over();
        }
    }

    fn add_score(&mut self, points: u64) {
        if points == 0 {
            return;
        }
        self.score = self.score.saturating_add(points);
        if self.score > self.high_score {
            self.high_score = self.score;
            self.events.push(GameEvent::HighScore(self.score));
        }
    }

    fn game_over(&mut self) {
        self.phase = Phase::Over;
        self.fall_timer.cancel();
        self.events.push(GameEvent::GameOver { score: self.score });
        log::info!("game over with score {}", self.score);
    }

    #[cfg(test)]
    pub(crate) fn set_grid_for_test(&mut self, grid: Grid) {
        self.grid = grid;
    }

    #[cfg(test)]
    pub(crate) fn set_piece_for_test(&mut self, piece: Piece) {
        self.piece = Some(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::grid::{COLS, Cell, PuyoColor};
    use crate::piece::{Orientation, SPAWN_COLUMN, ScriptedColors};

    const INTERVAL: Duration = Duration::from_millis(500);

    fn config() -> GameConfig {
        GameConfig {
            fall_interval_ms: 500,
            seed: None,
            split_drop: false,
        }
    }

    fn scripted(colors: &[PuyoColor]) -> GameState {
        GameState::with_colors(
            &config(),
            0,
            Box::new(ScriptedColors::new(colors.to_vec())),
        )
    }

    fn started(colors: &[PuyoColor]) -> (GameState, Instant) {
        let mut state = scripted(colors);
        let now = Instant::now();
        state.start_game(now);
        state.drain_events();
        (state, now)
    }

    fn pair(c1: PuyoColor, c2: PuyoColor, col: i32, row: i32, o: Orientation) -> Piece {
        Piece {
            color1: c1,
            color2: c2,
            anchor: Position::new(col, row),
            orientation: o,
        }
    }

    use PuyoColor::{Blue as B, Green as G, Red as R, Yellow as Y};

    /// Fills `col` from `top_row` to the floor with alternating blue/yellow, which never groups.
    fn stack_column(grid: &mut Grid, col: i32, top_row: i32) {
        for row in top_row..crate::grid::ROWS as i32 {
            let color = if row % 2 == 0 { B } else { Y };
            grid.set(Position::new(col, row), Cell::Puyo(color));
        }
    }

    #[test]
    fn test_starts_on_title() {
        let state = scripted(&[R]);
        assert_eq!(state.phase(), Phase::Title);
        assert!(state.piece().is_none());
        assert!(!state.fall_timer().is_armed());
    }

    #[test]
    fn test_input_ignored_outside_active() {
        let mut state = scripted(&[R]);
        let now = Instant::now();
        state.move_left();
        state.move_down();
        state.rotate_right();
        assert!(!state.tick(now + INTERVAL * 10));
        assert!(state.piece().is_none());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_start_game_spawns_two_pairs() {
        let (state, _) = started(&[R, G, B, Y]);
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.piece(), Some(&Piece::spawn(R, G)));
        assert_eq!(state.next_piece(), Some(&Piece::spawn(B, Y)));
        assert_eq!(state.score(), 0);
        assert_eq!(state.chain(), 0);
        assert!(state.fall_timer().is_armed());
    }

    #[test]
    fn test_lateral_moves_stop_at_walls() {
        let (mut state, _) = started(&[R, G]);
        for _ in 0..10 {
            state.move_left();
        }
        assert_eq!(state.piece().unwrap().anchor.col, 0);
        for _ in 0..10 {
            state.move_right();
        }
        assert_eq!(state.piece().unwrap().anchor.col, COLS as i32 - 1);
    }

    #[test]
    fn test_rotation_blocked_by_wall_is_ignored() {
        let (mut state, _) = started(&[R, G]);
        state.set_piece_for_test(pair(R, G, 0, 5, Orientation::Up));
        // Up -> Left would put the second cell at column -1.
        state.rotate_left();
        assert_eq!(state.piece().unwrap().orientation, Orientation::Up);
        assert!(state.drain_events().is_empty());
        state.rotate_right();
        assert_eq!(state.piece().unwrap().orientation, Orientation::Right);
        assert_eq!(state.drain_events(), vec![GameEvent::Rotated]);
    }

    #[test]
    fn test_blocked_down_lands_at_current_position() {
        let (mut state, _) = started(&[B, Y]);
        let mut grid = Grid::empty();
        stack_column(&mut grid, 2, 6);
        state.set_grid_for_test(grid);
        state.set_piece_for_test(pair(R, G, 2, 5, Orientation::Up));
        let next_before = *state.next_piece().unwrap();

        state.move_down();

        assert_eq!(state.grid().get(Position::new(2, 5)), Some(Cell::Puyo(R)));
        assert_eq!(state.grid().get(Position::new(2, 4)), Some(Cell::Puyo(G)));
        assert_eq!(state.grid().get(Position::new(2, 6)), Some(Cell::Puyo(B)));
        assert_eq!(state.piece(), Some(&next_before));
        assert_eq!(state.phase(), Phase::Active);
        assert!(state.drain_events().contains(&GameEvent::Landed {
            cells: [Position::new(2, 5), Position::new(2, 4)]
        }));
    }

    #[test]
    fn test_down_moves_when_free() {
        let (mut state, _) = started(&[R, G]);
        state.move_down();
        assert_eq!(state.piece().unwrap().anchor.row, 1);
        assert_eq!(state.drain_events(), vec![GameEvent::Moved]);
    }

    #[test]
    fn test_fall_tick_moves_piece_down() {
        let (mut state, now) = started(&[R, G]);
        assert!(!state.tick(now + INTERVAL / 2));
        assert_eq!(state.piece().unwrap().anchor.row, 0);
        assert!(state.tick(now + INTERVAL));
        assert_eq!(state.piece().unwrap().anchor.row, 1);
    }

    #[test]
    fn test_pause_suspends_input_and_timer() {
        let (mut state, now) = started(&[R, G]);
        state.toggle_pause(now);
        assert_eq!(state.phase(), Phase::Paused);
        assert!(!state.fall_timer().is_armed());

        state.move_left();
        state.move_down();
        assert!(!state.tick(now + INTERVAL * 4));
        assert_eq!(state.piece().unwrap().anchor, Position::new(SPAWN_COLUMN, 0));

        let resume = now + INTERVAL * 4;
        state.toggle_pause(resume);
        assert_eq!(state.phase(), Phase::Active);
        // Fresh interval from resume, no catch-up tick.
        assert!(!state.tick(resume + INTERVAL / 2));
        assert!(state.tick(resume + INTERVAL));
        assert_eq!(state.piece().unwrap().anchor.row, 1);
        assert!(!state.tick(resume + INTERVAL));
    }

    #[test]
    fn test_pause_is_ignored_outside_game() {
        let mut state = scripted(&[R]);
        state.toggle_pause(Instant::now());
        assert_eq!(state.phase(), Phase::Title);
    }

    #[test]
    fn test_landing_clears_and_scores() {
        // Three reds on the floor; a red pair lands vertically on column 3.
        let (mut state, _) = started(&[G, B]);
        state.set_grid_for_test(Grid::from_rows(&["RRR..."]));
        state.set_piece_for_test(pair(R, Y, 3, 11, Orientation::Up));
        state.move_down();

        assert_eq!(state.score(), 40);
        assert_eq!(state.last_chain(), 1);
        assert_eq!(state.chain(), 0);
        assert_eq!(state.grid(), &Grid::from_rows(&["...Y.."]));
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::Chain {
            depth: 1,
            cleared: 4,
            points: 40
        }));
        assert!(events.contains(&GameEvent::HighScore(40)));
    }

    #[test]
    fn test_landing_cascade_reaches_chain_two() {
        let (mut state, _) = started(&[B, Y]);
        state.set_grid_for_test(Grid::from_rows(&[
            "G.....", //
            "R.....", //
            "R.....", //
            "RGGG..",
        ]));
        // Yellow lands on the greens at (1,10); its red partner at (1,9) completes the reds.
        state.set_piece_for_test(pair(Y, R, 1, 10, Orientation::Up));
        state.move_down();
        assert_eq!(state.last_chain(), 2);
        assert_eq!(state.score(), 40 + 80);
    }

    /// Blue/red/blue under column 0 and three yellows beside it. A green/yellow pair
    /// landing on column 0 leaves its yellow hanging over (1,9) and (1,10).
    fn overhang_setup(state: &mut GameState) {
        state.set_grid_for_test(Grid::from_rows(&[
            "B.....", //
            "R.Y...", //
            "BYY...",
        ]));
        state.set_piece_for_test(pair(G, Y, 0, 8, Orientation::Right));
        state.move_down();
    }

    #[test]
    fn test_hanging_half_stays_where_it_landed() {
        let (mut state, _) = started(&[B, R]);
        overhang_setup(&mut state);
        assert_eq!(state.grid().get(Position::new(0, 8)), Some(Cell::Puyo(G)));
        assert_eq!(state.grid().get(Position::new(1, 8)), Some(Cell::Puyo(Y)));
        assert_eq!(state.grid().get(Position::new(1, 10)), Some(Cell::Empty));
        assert_eq!(state.score(), 0);
        assert_eq!(state.last_chain(), 0);
    }

    #[test]
    fn test_split_drop_settles_hanging_half_before_matching() {
        let cfg = GameConfig {
            split_drop: true,
            ..config()
        };
        let mut state =
            GameState::with_colors(&cfg, 0, Box::new(ScriptedColors::new(vec![B, R])));
        state.start_game(Instant::now());
        overhang_setup(&mut state);
        // The yellow drops to (1,10) and completes a square of four.
        assert_eq!(state.score(), 40);
        assert_eq!(state.last_chain(), 1);
        assert_eq!(state.grid().get(Position::new(1, 8)), Some(Cell::Empty));
        assert_eq!(state.grid().get(Position::new(2, 11)), Some(Cell::Empty));
    }

    #[test]
    fn test_puyo_in_second_row_ends_game() {
        let (mut state, _) = started(&[R, G, B, Y]);
        let mut grid = Grid::empty();
        stack_column(&mut grid, 4, 2);
        state.set_grid_for_test(grid);
        state.set_piece_for_test(pair(R, G, 4, 1, Orientation::Up));
        state.move_down();

        assert_eq!(state.phase(), Phase::Over);
        assert!(state.grid().row_occupied(GAME_OVER_ROW));
        assert!(!state.fall_timer().is_armed());
        assert!(
            state
                .drain_events()
                .contains(&GameEvent::GameOver { score: 0 })
        );
        let piece = state.piece().copied();
        state.move_left();
        assert_eq!(state.piece().copied(), piece);
    }

    #[test]
    fn test_second_row_cleared_by_chain_keeps_game_alive() {
        let (mut state, _) = started(&[G, B]);
        let mut grid = Grid::empty();
        stack_column(&mut grid, 0, 2);
        stack_column(&mut grid, 1, 2);
        grid.set(Position::new(0, 2), Cell::Puyo(R));
        grid.set(Position::new(1, 2), Cell::Puyo(R));
        state.set_grid_for_test(grid);
        state.set_piece_for_test(pair(R, R, 0, 1, Orientation::Right));
        state.move_down();

        assert_eq!(state.score(), 40);
        assert!(!state.grid().row_occupied(GAME_OVER_ROW));
        assert_eq!(state.phase(), Phase::Active);
    }

    #[test]
    fn test_restart_from_over_resets_everything() {
        let (mut state, now) = started(&[R, G, B, Y]);
        state.set_grid_for_test(Grid::from_rows(&["RRR..."]));
        state.set_piece_for_test(pair(R, R, 3, 11, Orientation::Up));
        state.move_down();
        assert!(state.score() > 0);

        let mut tall = *state.grid();
        stack_column(&mut tall, 5, 1);
        state.set_grid_for_test(tall);
        state.set_piece_for_test(pair(G, G, 0, 11, Orientation::Up));
        state.move_down();
        assert_eq!(state.phase(), Phase::Over);

        let later = now + INTERVAL;
        state.restart(later);
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.score(), 0);
        assert_eq!(state.chain(), 0);
        assert_eq!(state.last_chain(), 0);
        assert_eq!(state.grid(), &Grid::empty());
        // Two landings drew four colours, so the script is back at its start.
        assert_eq!(state.piece(), Some(&Piece::spawn(R, G)));
        assert_eq!(state.next_piece(), Some(&Piece::spawn(B, Y)));
        assert!(state.fall_timer().is_armed());
        assert!(state.high_score() > 0);
    }

    #[test]
    fn test_restart_ignored_mid_game() {
        let (mut state, now) = started(&[R, G]);
        state.move_down();
        state.restart(now);
        assert_eq!(state.piece().unwrap().anchor.row, 1);
    }

    #[test]
    fn test_high_score_event_only_when_exceeded() {
        let mut state = GameState::with_colors(
            &config(),
            1000,
            Box::new(ScriptedColors::new(vec![G, B])),
        );
        let now = Instant::now();
        state.start_game(now);
        state.set_grid_for_test(Grid::from_rows(&["RRR..."]));
        state.set_piece_for_test(pair(R, Y, 3, 11, Orientation::Up));
        state.move_down();
        assert_eq!(state.score(), 40);
        assert_eq!(state.high_score(), 1000);
        assert!(
            !state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::HighScore(_)))
        );
    }

    #[test]
    fn test_score_never_decreases_over_a_game() {
        let mut state = GameState::new(
            &GameConfig {
                seed: Some(99),
                ..config()
            },
            0,
        );
        let mut now = Instant::now();
        state.start_game(now);
        let mut last = 0;
        for step in 0..2000 {
            now += INTERVAL;
            match step % 5 {
                0 => state.move_left(),
                1 => state.rotate_right(),
                2 => state.move_right(),
                _ => {}
            }
            state.tick(now);
            assert!(state.score() >= last);
            last = state.score();
            if state.phase() == Phase::Over {
                break;
            }
        }
    }
}
