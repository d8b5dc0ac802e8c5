//! Puyotui: Puyo Puyo-style falling pair puzzle game in the terminal.

mod app;
mod feedback;
mod game;
mod grid;
mod highscores;
mod input;
mod piece;
mod resolver;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub fall_interval_ms: u64,
    pub seed: Option<u64>,
    /// Settle unsupported puyos of a landed pair before chains are resolved.
    pub split_drop: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("falling back to default theme: {e}");
            theme::Theme::default()
        }
    };
    let config = GameConfig {
        fall_interval_ms: args.fall_interval_ms.max(1),
        seed: args.seed,
        split_drop: args.split,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()?;
    Ok(())
}

/// Logs go to a file since the terminal belongs to the game. With no `--log-file`,
/// logging is only enabled when `RUST_LOG` is set.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let path = match log_file {
        Some(p) => p.to_path_buf(),
        None if std::env::var_os("RUST_LOG").is_some() => {
            highscores::config_dir().join("puyotui.log")
        }
        None => return Ok(()),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Puyo Puyo-style puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "puyotui",
    version,
    about = "Puyo Puyo-style falling pair puzzle in the terminal. Connect four or more of a colour to clear them and build chains.",
    long_about = "Puyotui is a terminal puzzle game inspired by Puyo Puyo.\n\n\
        Pairs of coloured puyos fall into a 6x12 well. Four or more same-coloured puyos \
        touching edge-to-edge pop; everything above falls and may pop again, building a chain. \
        Each chain step doubles the points. The game ends when the stack reaches the second row.\n\n\
        CONTROLS (normal):\n  Left/Right  Move    Up / x    Rotate CW   z          Rotate CCW\n  Down        Soft drop  P          Pause      Q / Esc    Quit\n\n\
        CONTROLS (vim):\n  h/l         Move    k or i     Rotate CW   u          Rotate CCW\n  j           Soft drop  p          Pause      q          Quit\n\n\
        Enter or R starts a game from the title or game-over screen. Use --theme to load a \
        btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Milliseconds between automatic one-row falls.
    #[arg(long, default_value = "500", value_name = "MS")]
    pub fall_interval_ms: u64,

    /// Seed for the colour generator (reproducible games).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Let the half of a landed pair that overhangs empty space fall before matching.
    #[arg(long)]
    pub split: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Skip the title screen and start a game immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable the clear flash and score popups.
    #[arg(long)]
    pub no_animation: bool,

    /// Ring the terminal bell on chains of two or more.
    #[arg(long)]
    pub bell: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// High score file. Defaults to $XDG_CONFIG_HOME/puyotui/highscore.
    #[arg(long, value_name = "FILE")]
    pub high_score_file: Option<PathBuf>,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::try_parse_from(["puyotui"]).unwrap();
        assert_eq!(args.fall_interval_ms, 500);
        assert!(!args.split);
        assert!(args.seed.is_none());
        assert_eq!(args.palette, Palette::Normal);
    }

    #[test]
    fn test_palette_aliases() {
        let args = Args::try_parse_from(["puyotui", "--palette", "contrast", "--seed", "7"]).unwrap();
        assert_eq!(args.palette, Palette::HighContrast);
        assert_eq!(args.seed, Some(7));
    }

    #[test]
    fn test_split_drop_is_opt_in() {
        let args = Args::try_parse_from(["puyotui", "--split"]).unwrap();
        assert!(args.split);
    }
}
