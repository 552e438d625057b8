//! Control panel: every adjustable parameter, one row each

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use saavy_keys::{
    graph::envelope::EnvelopeParams,
    synth::{AmParams, FmParams, MAX_PARTIALS},
    AudioEngine, PolySynth, SynthMode, SynthParams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Volume,
    Partials,
    AmRate,
    AmDepth,
    FmRate,
    FmDepth,
    Attack,
    Decay,
    Sustain,
    Release,
    VibratoRate,
    VibratoDepth,
}

impl Control {
    pub const ALL: [Control; 12] = [
        Control::Volume,
        Control::Partials,
        Control::AmRate,
        Control::AmDepth,
        Control::FmRate,
        Control::FmDepth,
        Control::Attack,
        Control::Decay,
        Control::Sustain,
        Control::Release,
        Control::VibratoRate,
        Control::VibratoDepth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Control::Volume => "Master volume",
            Control::Partials => "Partials",
            Control::AmRate => "AM rate",
            Control::AmDepth => "AM depth",
            Control::FmRate => "FM rate",
            Control::FmDepth => "FM depth",
            Control::Attack => "Attack",
            Control::Decay => "Decay",
            Control::Sustain => "Sustain",
            Control::Release => "Release",
            Control::VibratoRate => "Vibrato rate",
            Control::VibratoDepth => "Vibrato depth",
        }
    }

    /// Mode this control belongs to; `None` for controls shared by all modes.
    fn mode(self) -> Option<SynthMode> {
        match self {
            Control::Partials => Some(SynthMode::Additive),
            Control::AmRate | Control::AmDepth => Some(SynthMode::Am),
            Control::FmRate | Control::FmDepth => Some(SynthMode::Fm),
            _ => None,
        }
    }

    pub fn value(self, p: &SynthParams) -> String {
        match self {
            Control::Volume => format!("{:.2}", p.master_volume),
            Control::Partials => p.partials.to_string(),
            Control::AmRate => format!("{:.1} Hz", p.am.frequency),
            Control::AmDepth => format!("{:.2}", p.am.depth),
            Control::FmRate => format!("{:.1} Hz", p.fm.frequency),
            Control::FmDepth => format!("{:.0} Hz", p.fm.depth),
            Control::Attack => format!("{:.2} s", p.envelope.attack),
            Control::Decay => format!("{:.2} s", p.envelope.decay),
            Control::Sustain => format!("{:.2}", p.envelope.sustain),
            Control::Release => format!("{:.2} s", p.envelope.release),
            Control::VibratoRate => format!("{:.1} Hz", p.vibrato.rate),
            Control::VibratoDepth => format!("{:.0} cents", p.vibrato.depth),
        }
    }

    /// Nudge the parameter by `steps` increments.
    pub fn adjust<E: AudioEngine>(self, synth: &mut PolySynth<E>, steps: i32) {
        let p = *synth.params();
        let s = steps as f32;
        match self {
            Control::Volume => synth.set_master_volume(p.master_volume + 0.05 * s),
            Control::Partials => {
                let partials = p.partials.saturating_add_signed(steps);
                synth.set_partials(partials.clamp(1, MAX_PARTIALS))
            }
            Control::AmRate => synth.set_am(AmParams {
                frequency: p.am.frequency + 0.5 * s,
                ..p.am
            }),
            Control::AmDepth => synth.set_am(AmParams {
                depth: p.am.depth + 0.05 * s,
                ..p.am
            }),
            Control::FmRate => synth.set_fm(FmParams {
                frequency: p.fm.frequency + 0.5 * s,
                ..p.fm
            }),
            Control::FmDepth => synth.set_fm(FmParams {
                depth: p.fm.depth + 10.0 * s,
                ..p.fm
            }),
            Control::Attack => synth.set_envelope(EnvelopeParams {
                attack: p.envelope.attack + 0.01 * f64::from(steps),
                ..p.envelope
            }),
            Control::Decay => synth.set_envelope(EnvelopeParams {
                decay: p.envelope.decay + 0.01 * f64::from(steps),
                ..p.envelope
            }),
            Control::Sustain => synth.set_envelope(EnvelopeParams {
                sustain: p.envelope.sustain + 0.05 * s,
                ..p.envelope
            }),
            Control::Release => synth.set_envelope(EnvelopeParams {
                release: p.envelope.release + 0.05 * f64::from(steps),
                ..p.envelope
            }),
            Control::VibratoRate => synth.set_vibrato_rate(p.vibrato.rate + 0.5 * s),
            Control::VibratoDepth => synth.set_vibrato_depth((p.vibrato.depth + s).max(0.0)),
        }
    }
}

/// Render the control list with the selected row highlighted.
pub fn render_controls(frame: &mut Frame, area: Rect, params: &SynthParams, selected: usize) {
    let block = Block::default()
        .title(format!(
            " Controls: {} / {} / vibrato {} ",
            params.mode,
            params.waveform,
            if params.vibrato.enabled { "on" } else { "off" }
        ))
        .borders(Borders::ALL);

    let lines: Vec<Line> = Control::ALL
        .iter()
        .enumerate()
        .map(|(i, control)| {
            let relevant = control.mode().map_or(true, |m| m == params.mode);
            let mut style = if relevant {
                Style::default().fg(Color::White)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            if i == selected {
                style = style.bg(Color::Blue).add_modifier(Modifier::BOLD);
            }
            Line::from(vec![
                Span::styled(format!(" {:<14}", control.label()), style),
                Span::styled(format!("{:>10} ", control.value(params)), style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
