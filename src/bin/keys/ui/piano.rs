//! On-screen piano: drawing and mouse hit-testing share one geometry

use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_keys::io::{FrequencyTable, KeySpec, NoteId};

/// Black-key left edge in white-key widths from the start of its octave
fn black_offset(note: &str) -> f32 {
    match note {
        "C#" => 0.72,
        "D#" => 1.72,
        "F#" => 3.72,
        "G#" => 4.72,
        _ => 5.72, // A#
    }
}

/// Screen rectangle of every key inside `area`, black keys first so that
/// hit-testing finds them before the white key underneath.
fn key_rects(table: &FrequencyTable, area: Rect) -> Vec<(&'static KeySpec, Rect)> {
    let whites = table.keys().iter().filter(|k| !k.black).count().max(1) as u16;
    let white_w = (area.width / whites).max(1);
    let black_w = (white_w * 3 / 5).max(1);
    let black_h = (area.height * 3 / 5).max(1);

    let mut white_rects = Vec::new();
    let mut black_rects = Vec::new();
    let mut white_index = 0u16;
    let mut octave_base = 0u16;
    for key in table.keys() {
        if key.black {
            let x = (f32::from(octave_base) + black_offset(key.note)) * f32::from(white_w);
            let rect = Rect::new(area.x + x as u16, area.y, black_w, black_h);
            black_rects.push((key, rect.intersection(area)));
        } else {
            let rect = Rect::new(area.x + white_index * white_w, area.y, white_w, area.height);
            white_rects.push((key, rect.intersection(area)));
            white_index += 1;
            if white_index % 7 == 0 {
                octave_base = white_index;
            }
        }
    }

    black_rects.extend(white_rects);
    black_rects
}

/// Key under a terminal cell, if any.
pub fn key_at(table: &FrequencyTable, area: Rect, column: u16, row: u16) -> Option<NoteId> {
    key_rects(table, area)
        .into_iter()
        .find(|(_, rect)| {
            column >= rect.x
                && column < rect.x + rect.width
                && row >= rect.y
                && row < rect.y + rect.height
        })
        .map(|(key, _)| key.id)
}

/// Render the keyboard; returns the inner area used for hit-testing.
pub fn render_piano(
    frame: &mut Frame,
    area: Rect,
    table: &FrequencyTable,
    is_pressed: impl Fn(NoteId) -> bool,
) -> Rect {
    let block = Block::default().title(" Piano ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // White keys are drawn first so black keys overlay them
    let mut rects = key_rects(table, inner);
    rects.reverse();

    for (key, rect) in rects {
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        let pressed = is_pressed(key.id);
        let (fg, bg) = match (key.black, pressed) {
            (_, true) => (Color::Black, Color::Cyan),
            (true, false) => (Color::White, Color::Black),
            (false, false) => (Color::Black, Color::White),
        };
        let style = Style::default().fg(fg).bg(bg);

        let mut lines = vec![Line::default(); rect.height.saturating_sub(2) as usize];
        lines.push(Line::from(Span::styled(
            key.label.to_string(),
            style.add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(key.note, style)));

        let edge = Block::default()
            .borders(Borders::LEFT)
            .border_style(Style::default().fg(Color::DarkGray).bg(bg));
        let widget = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(style)
            .block(edge);
        frame.render_widget(widget, rect);
    }

    inner
}
