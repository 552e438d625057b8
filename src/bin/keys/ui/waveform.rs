//! Output oscilloscope
//!
//! The vertical range follows the master volume so a single note fills a
//! useful part of the chart at any volume setting.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use saavy_keys::synth::factory::VOICE_HEADROOM;

/// Smallest vertical range, so a muted session still draws a flat line.
const MIN_RANGE: f64 = 0.01;

/// Peak the scope expects at `master_volume`: the sum of the first two
/// voices' headroom, scaled by the master gain.
fn scope_range(master_volume: f32) -> f64 {
    let two_voices = f64::from(VOICE_HEADROOM) * 1.5;
    (two_voices * f64::from(master_volume)).max(MIN_RANGE)
}

/// Render the output scope
pub fn render_waveform(frame: &mut Frame, area: Rect, samples: &[f32], master_volume: f32) {
    let range = scope_range(master_volume);
    let title = format!(" Output ±{range:.2} ");
    let block = Block::default().title(title).borders(Borders::ALL);

    let span = samples.len().max(1) as f64;
    let points: Vec<(f64, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, &s)| (i as f64 / span, f64::from(s).clamp(-range, range)))
        .collect();

    let trace = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![trace])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, 1.0])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([-range, range])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
