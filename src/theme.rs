//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::grid::PuyoColor;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

// One Dark values from onedark.theme.
const ONEDARK_RED: Color = rgb(0xE0_6C_75);
const ONEDARK_GREEN: Color = rgb(0x98_C3_79);
const ONEDARK_BLUE: Color = rgb(0x61_AF_EF);
const ONEDARK_YELLOW: Color = rgb(0xE5_C0_7B);
const ONEDARK_BG: Color = rgb(0x31_35_3F);
const ONEDARK_DIV_LINE: Color = rgb(0x3F_44_4F);
const ONEDARK_MAIN_FG: Color = rgb(0xAB_B2_BF);
const ONEDARK_INACTIVE_FG: Color = rgb(0x5C_63_70);

/// Puyo palette and UI colours loaded from a theme file.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Puyo colours indexed by [`PuyoColor::index`]: red, green, blue, yellow.
    pub puyo: [Color; 4],
    /// Playfield background.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, chain).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Hints and secondary text.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults.
    pub fn onedark_default() -> Self {
        Self {
            puyo: [ONEDARK_RED, ONEDARK_GREEN, ONEDARK_BLUE, ONEDARK_YELLOW],
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV_LINE,
            main_fg: ONEDARK_MAIN_FG,
            title: ONEDARK_YELLOW,
            inactive_fg: ONEDARK_INACTIVE_FG,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or the file does not exist.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Default theme for a palette when no file is loaded.
    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::onedark_default();
        t.apply_palette(palette);
        t
    }

    /// Override puyo colours for high-contrast or colorblind.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.puyo = [
                    rgb(0xFF_00_00), // red
                    rgb(0x00_FF_00), // green
                    rgb(0x00_88_FF), // blue
                    rgb(0xFF_FF_00), // yellow
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito style: red/green replaced with vermillion/bluish green.
                self.puyo = [
                    rgb(0xCC_33_11), // vermillion
                    rgb(0x00_99_88), // teal
                    rgb(0x00_77_BB), // blue
                    rgb(0xEE_77_33), // orange
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys match onedark.theme; fallbacks are the same file's hex values.
        Self {
            puyo: [
                get("cpu_end")
                    .or_else(|| get("temp_end"))
                    .unwrap_or(ONEDARK_RED),
                get("mem_box")
                    .or_else(|| get("cpu_start"))
                    .unwrap_or(ONEDARK_GREEN),
                get("cpu_box").unwrap_or(ONEDARK_BLUE),
                get("title")
                    .or_else(|| get("cpu_mid"))
                    .unwrap_or(ONEDARK_YELLOW),
            ],
            bg: get("meter_bg").unwrap_or(ONEDARK_BG),
            div_line: get("div_line").unwrap_or(ONEDARK_DIV_LINE),
            main_fg: get("main_fg").unwrap_or(ONEDARK_MAIN_FG),
            title: get("title").unwrap_or(ONEDARK_YELLOW),
            inactive_fg: get("inactive_fg").unwrap_or(ONEDARK_INACTIVE_FG),
        }
    }

    #[inline]
    pub fn puyo_color(&self, color: PuyoColor) -> Color {
        self.puyo[color.index()]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(eq) = rest.find('=') {
            let value = rest[eq + 1..]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string();
            if !value.is_empty() {
                map.insert(key.to_string(), value);
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(invalid()),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#31353F""##);
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
    }

    #[test]
    fn test_theme_keys_map_to_puyo_colours() {
        let map = parse_theme_file(
            r##"
            # comment
            theme[cpu_end]="#110000"
            theme[mem_box]='#001100'
            "##,
        );
        let theme = Theme::from_map(&map);
        assert_eq!(theme.puyo_color(PuyoColor::Red), Color::Rgb(0x11, 0, 0));
        assert_eq!(theme.puyo_color(PuyoColor::Green), Color::Rgb(0, 0x11, 0));
        assert_eq!(theme.puyo_color(PuyoColor::Blue), ONEDARK_BLUE);
    }

    #[test]
    fn test_missing_theme_file_uses_defaults() {
        let theme = Theme::load(
            Some(Path::new("/definitely/not/here.theme")),
            crate::Palette::Normal,
        )
        .unwrap();
        assert_eq!(theme.puyo, Theme::onedark_default().puyo);
    }
}
