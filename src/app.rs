//! App: terminal init, main loop, fall timer and key handling, event fan-out.

use crate::feedback::Feedback;
use crate::game::{GameEvent, GameState};
use crate::highscores::HighScoreStore;
use crate::input::{Command, key_to_command};
use crate::theme::Theme;
use crate::ui::ClearFlash;
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

pub struct App {
    theme: Theme,
    state: GameState,
    store: HighScoreStore,
    feedback: Feedback,
    flash: Option<ClearFlash>,
    frame_interval: Duration,
    no_menu: bool,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let store = args
            .high_score_file
            .map(HighScoreStore::new)
            .unwrap_or_default();
        let high_score = store.load();
        log::debug!(
            "high score {high_score} from {}, config {config:?}",
            store.path().display()
        );
        let rate = if args.frame_rate.is_finite() && args.frame_rate > 0.0 {
            args.frame_rate
        } else {
            30.0
        };
        Ok(Self {
            theme,
            state: GameState::new(&config, high_score),
            store,
            feedback: Feedback::new(!args.no_animation, args.bell),
            flash: None,
            frame_interval: Duration::from_secs_f64(1.0 / rate),
            no_menu: args.no_menu,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();
        if self.no_menu {
            self.state.start_game(Instant::now());
        }
        let result = self.run_loop(&mut terminal);
        ratatui::restore();
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    &self.feedback,
                    &mut self.flash,
                    now,
                )
            })?;
            if self.flash.as_ref().is_some_and(ClearFlash::is_done) {
                self.flash = None;
            }

            let elapsed_ms = now.saturating_duration_since(last_frame).as_millis();
            self.feedback.tick(elapsed_ms.min(u32::MAX as u128) as u32);
            last_frame = now;

            let timeout = self.frame_interval.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    // Held keys arrive as repeats on terminals that report them.
                    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                        continue;
                    }
                    if self.apply_command(key_to_command(key), Instant::now()) {
                        return Ok(());
                    }
                    self.dispatch_events();
                }
            }

            self.state.tick(Instant::now());
            self.dispatch_events();
        }
    }

    /// Returns true when the player asked to quit.
    fn apply_command(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::Quit => return true,
            Command::Start => self.state.restart(now),
            Command::TogglePause => self.state.toggle_pause(now),
            Command::MoveLeft => self.state.move_left(),
            Command::MoveRight => self.state.move_right(),
            Command::MoveDown => self.state.move_down(),
            Command::RotateLeft => self.state.rotate_left(),
            Command::RotateRight => self.state.rotate_right(),
            Command::None => {}
        }
        false
    }

    /// Hands drained engine events to feedback and persistence.
    fn dispatch_events(&mut self) {
        for event in self.state.drain_events() {
            self.feedback.observe(&event, self.state.last_resolution());
            match event {
                GameEvent::HighScore(score) => {
                    if let Err(e) = self.store.save(score) {
                        log::warn!(
                            "could not save high score to {}: {e:#}",
                            self.store.path().display()
                        );
                    }
                }
                GameEvent::Paused | GameEvent::Resumed => log::debug!("{event:?}"),
                _ => {}
            }
        }

        let cells = self.feedback.take_flash();
        if !cells.is_empty() {
            self.flash = Some(ClearFlash::new(cells));
        }
        if self.feedback.take_bell() {
            ring_bell();
        }
    }
}

fn ring_bell() {
    use crossterm::{execute, style::Print};
    if let Err(e) = execute!(std::io::stdout(), Print('\x07')) {
        log::warn!("could not ring bell: {e}");
    }
}
