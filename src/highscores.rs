//! Persist the high score to disk (XDG config or ~/.config/puyotui).

use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const FILENAME: &str = "highscore";

/// Config directory for puyotui (high score, default log file).
pub fn config_dir() -> PathBuf {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".")),
    };
    base.join("puyotui")
}

/// Single decimal high score in a text file.
#[derive(Debug, Clone)]
pub struct HighScoreStore {
    path: PathBuf,
}

impl Default for HighScoreStore {
    fn default() -> Self {
        Self::new(config_dir().join(FILENAME))
    }
}

impl HighScoreStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored high score; 0 on missing file or parse error.
    pub fn load(&self) -> u64 {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return 0,
        };
        match content.trim().parse::<u64>() {
            Ok(n) => n,
            Err(e) => {
                log::warn!("ignoring unreadable high score in {}: {e}", self.path.display());
                0
            }
        }
    }

    /// Writes the score, creating the config directory if needed.
    pub fn save(&self, score: u64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = fs::File::create(&self.path)?;
        writeln!(f, "{score}")?;
        Ok(())
    }
}
