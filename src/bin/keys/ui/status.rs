//! Status bar widget - output state, voice counts, pressed keys and levels

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_keys::graph::OutputState;

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    /// Compute audio stats from a buffer
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub struct StatusLine<'a> {
    pub state: OutputState,
    pub active: usize,
    pub releasing: usize,
    pub pressed: &'a str,
    pub stats: AudioStats,
}

/// Render the status bar
pub fn render_status(frame: &mut Frame, area: Rect, status: &StatusLine<'_>) {
    let block = Block::default().title(" keys ").borders(Borders::ALL);

    let (symbol, color) = match status.state {
        OutputState::Running => ("▶", Color::Green),
        OutputState::Suspended => ("■", Color::Yellow),
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} {}  ", symbol, status.state),
            Style::default().fg(color),
        ),
        Span::styled(
            format!("Voices: {} (+{} releasing)  ", status.active, status.releasing),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("Pressed: {}  ", status.pressed),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", status.stats.peak, status.stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
