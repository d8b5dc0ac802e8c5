//! Layout and drawing: title, board, next preview, score, pause, game over, clear flash.

use crate::feedback::Feedback;
use crate::game::{GameState, Phase};
use crate::grid::{self, COLS, Cell, GAME_OVER_ROW, PuyoColor, ROWS};
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// One puyo is two terminal columns wide so the board looks square.
const CELL_WIDTH: u16 = 2;
const PUYO: &str = "██";
const SIDEBAR_WIDTH: u16 = 18;
const CLEAR_FLASH_MS: u32 = 300;

/// Board size in terminal cells including the border.
const BOARD_WIDTH: u16 = COLS as u16 * CELL_WIDTH + 2;
const BOARD_HEIGHT: u16 = ROWS as u16 + 2;

/// Flash over the cells removed by the latest landing. The effect is built lazily on
/// the first frame, once the board position is known.
pub struct ClearFlash {
    cells: Vec<grid::Position>,
    effect: Option<Effect>,
    last_process: Option<Instant>,
}

impl ClearFlash {
    pub fn new(cells: Vec<grid::Position>) -> Self {
        Self {
            cells,
            effect: None,
            last_process: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.effect.as_ref().is_some_and(Effect::done)
    }
}

/// Draw the screen for the current phase. The flash is advanced by the time since the
/// previous frame.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    feedback: &Feedback,
    flash: &mut Option<ClearFlash>,
    now: Instant,
) {
    let area = frame.area();
    match state.phase() {
        Phase::Title => draw_title(frame.buffer_mut(), state, theme, area),
        Phase::Active | Phase::Paused | Phase::Over => {
            let (board, sidebar) = game_layout(area);
            draw_board(frame.buffer_mut(), state, theme, board);
            draw_popups(frame.buffer_mut(), feedback, theme, board);
            draw_sidebar(frame.buffer_mut(), state, theme, sidebar);
            if let Some(flash) = flash {
                apply_clear_flash(frame, board_inner(board), flash, now);
            }
            match state.phase() {
                Phase::Paused => draw_pause_overlay(frame.buffer_mut(), theme, board),
                Phase::Over => draw_game_over(frame.buffer_mut(), state, theme, board),
                _ => {}
            }
        }
    }
}

/// Board and sidebar, centred in `area`.
fn game_layout(area: Rect) -> (Rect, Rect) {
    let total_w = BOARD_WIDTH + SIDEBAR_WIDTH;
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    (inner[0], inner[1])
}

fn board_inner(board: Rect) -> Rect {
    Rect {
        x: board.x + 1,
        y: board.y + 1,
        width: board.width.saturating_sub(2),
        height: board.height.saturating_sub(2),
    }
}

/// Terminal position of a grid cell's left half, if it is on screen.
fn cell_origin(inner: Rect, pos: grid::Position) -> Option<(u16, u16)> {
    let (col, row) = pos.to_index()?;
    let x = inner.x + col as u16 * CELL_WIDTH;
    let y = inner.y + row as u16;
    (x + CELL_WIDTH <= inner.right() && y < inner.bottom()).then_some((x, y))
}

/// Writes `s` at (x, y), clipped to the buffer. Positions outside it are skipped.
fn put(buf: &mut Buffer, x: u16, y: u16, s: &str, style: Style) {
    if buf.area.contains(Position { x, y }) {
        let max = (buf.area.right() - x) as usize;
        buf.set_stringn(x, y, s, max, style);
    }
}

fn fill(buf: &mut Buffer, rect: Rect, bg: Color) {
    let rect = rect.intersection(buf.area);
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            if let Some(c) = buf.cell_mut((x, y)) {
                c.set_symbol(" ").set_style(Style::default().bg(bg));
            }
        }
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn puyo_style(theme: &Theme, color: PuyoColor) -> Style {
    let c = theme.puyo_color(color);
    Style::default().fg(c).bg(theme.bg)
}

fn draw_title(buf: &mut Buffer, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered(area, 44, 18);
    let key = Style::default().fg(theme.title);
    let fg = Style::default().fg(theme.main_fg);
    let title = Line::from(
        "PUYOTUI"
            .chars()
            .zip(PuyoColor::ALL.iter().cycle())
            .map(|(ch, c)| Span::styled(format!("{ch} "), Style::default().fg(theme.puyo_color(*c)).bold()))
            .collect::<Vec<_>>(),
    );
    let control = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("{keys:>14} "), key),
            Span::styled(format!("{what:<14}"), fg),
        ])
    };
    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            "Pop four of a colour. Chain for more.",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Best: ", key),
            Span::styled(state.high_score().to_string(), fg),
        ]),
        Line::from(""),
        control("←/→  h/l", "Move"),
        control("↓  j", "Drop"),
        control("↑ x  k i", "Rotate CW"),
        control("z  u", "Rotate CCW"),
        control("P", "Pause"),
        control("Q  Esc", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            " ENTER to start ",
            Style::default().fg(theme.bg).bg(theme.title).bold(),
        )),
    ];
    fill(buf, popup, theme.bg);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, buf);
}

fn draw_board(buf: &mut Buffer, state: &GameState, theme: &Theme, board: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Puyotui ", Style::default().fg(theme.title)));
    let inner = block.inner(board);
    block.render(board, buf);
    fill(buf, inner, theme.bg);

    for (row, cells) in state.grid().rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let pos = grid::Position::new(col as i32, row as i32);
            let Some((x, y)) = cell_origin(inner, pos) else {
                continue;
            };
            match cell {
                Cell::Puyo(color) => put(buf, x, y, PUYO, puyo_style(theme, *color)),
                // Mark the row that ends the game when filled.
                Cell::Empty if row == GAME_OVER_ROW => put(
                    buf,
                    x,
                    y,
                    "··",
                    Style::default().fg(theme.inactive_fg).bg(theme.bg),
                ),
                Cell::Empty => {}
            }
        }
    }

    if let Some(piece) = state.piece() {
        for (pos, color) in piece.cells() {
            if let Some((x, y)) = cell_origin(inner, pos) {
                put(buf, x, y, PUYO, puyo_style(theme, color));
            }
        }
    }
}

fn draw_popups(buf: &mut Buffer, feedback: &Feedback, theme: &Theme, board: Rect) {
    let inner = board_inner(board);
    for popup in feedback.popups() {
        let Some((x, y)) = cell_origin(inner, grid::Position::new(popup.col, popup.row)) else {
            continue;
        };
        let label = if popup.chain > 1 {
            format!("+{} x{}", popup.points, popup.chain)
        } else {
            format!("+{}", popup.points)
        };
        put(buf, x, y, &label, Style::default().fg(theme.title).bg(theme.bg).bold());
    }
}

fn draw_sidebar(buf: &mut Buffer, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Next (border + title + pair)
            Constraint::Length(3), // Colours
            Constraint::Length(5), // Score, best, chain
            Constraint::Fill(1),
        ])
        .split(area);

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Next", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], buf);
    if let Some(next) = state.next_piece() {
        draw_next_preview(buf, next, theme, next_inner);
    }

    let colours_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let colours_inner = colours_block.inner(chunks[1]);
    colours_block.render(chunks[1], buf);
    draw_colour_strip(buf, theme, colours_inner);

    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], buf);
    let chain = state.last_chain();
    let chain_style = if chain >= 2 {
        Style::default().fg(theme.title).bold()
    } else {
        fg_style
    };
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(state.high_score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Chain: ", title_style),
            Span::styled(chain.to_string(), chain_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, buf);
}

/// Next pair drawn in its spawn orientation, centred.
fn draw_next_preview(buf: &mut Buffer, next: &Piece, theme: &Theme, area: Rect) {
    let cells = next.cells();
    let min_col = cells.iter().map(|(p, _)| p.col).min().unwrap_or(0);
    let min_row = cells.iter().map(|(p, _)| p.row).min().unwrap_or(0);
    let off_x = area.width.saturating_sub(2 * CELL_WIDTH) / 2;
    for (pos, color) in cells {
        let x = area.x + off_x + (pos.col - min_col) as u16 * CELL_WIDTH;
        let y = area.y + (pos.row - min_row) as u16;
        if y < area.bottom() {
            put(buf, x, y, PUYO, puyo_style(theme, color));
        }
    }
}

/// A row of the four puyo colours in the active palette.
fn draw_colour_strip(buf: &mut Buffer, theme: &Theme, area: Rect) {
    let block_w = (area.width / PuyoColor::ALL.len() as u16).max(1);
    for (i, color) in PuyoColor::ALL.iter().enumerate() {
        let x = area.x + i as u16 * block_w + block_w.saturating_sub(CELL_WIDTH) / 2;
        put(buf, x, area.y, PUYO, puyo_style(theme, *color));
    }
}

fn draw_pause_overlay(buf: &mut Buffer, theme: &Theme, board: Rect) {
    let popup = centered(board, BOARD_WIDTH, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(Span::styled(" P resume ", Style::default().fg(theme.main_fg))),
    ];
    fill(buf, popup, theme.bg);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, buf);
}

fn draw_game_over(buf: &mut Buffer, state: &GameState, theme: &Theme, board: Rect) {
    let popup = centered(board, BOARD_WIDTH + SIDEBAR_WIDTH, 9);
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(Span::styled(format!(" Score: {} ", state.score()), fg)),
        Line::from(Span::styled(format!(" Best: {} ", state.high_score()), fg)),
    ];
    if state.score() > 0 && state.score() == state.high_score() {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" R restart    Q quit ", fg)));
    fill(buf, popup, theme.bg);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, buf);
}

/// Fades cleared cells in from white (TachyonFX), filtered to the cleared positions.
fn apply_clear_flash(frame: &mut Frame, inner: Rect, flash: &mut ClearFlash, now: Instant) {
    let delta = flash
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    flash.last_process = Some(now);

    if flash.effect.is_none() {
        let targets: HashSet<(u16, u16)> = flash
            .cells
            .iter()
            .filter_map(|p| cell_origin(inner, *p))
            .flat_map(|(x, y)| (x..x + CELL_WIDTH).map(move |bx| (bx, y)))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            targets.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_from(
            Color::White,
            Color::White,
            (CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_filter(filter)
        .with_area(inner);
        flash.effect = Some(effect);
    }

    if let Some(effect) = flash.effect.as_mut() {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}
