//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Command from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    MoveDown,
    RotateLeft,
    RotateRight,
    TogglePause,
    Start,
    Quit,
    None,
}

/// Map key event to a command. Supports both normal (arrows, z/x) and vim (hjkl, u/i).
pub fn key_to_command(key: KeyEvent) -> Command {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Command::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Command::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char('p' | 'P') => Command::TogglePause,
        KeyCode::Enter | KeyCode::Char('r' | 'R') => Command::Start,
        KeyCode::Left | KeyCode::Char('h') => Command::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Command::MoveRight,
        KeyCode::Down | KeyCode::Char('j') => Command::MoveDown,
        KeyCode::Char('z' | 'Z' | 'u') => Command::RotateLeft,
        KeyCode::Up | KeyCode::Char('x' | 'X' | 'k' | 'i') => Command::RotateRight,
        _ => Command::None,
    }
}
