//! Waveform math for audio-rate and control-rate oscillators.

use std::{f64::consts::TAU, fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/*
Oscillator Waveforms
====================

Every oscillator in the engine is a phase accumulator. Each sample the phase
advances by `frequency / sample_rate` and wraps into [0, 1). The waveform is a
pure function of that phase:

    Sine       sin(2π·phase)                    fundamental only
    Square     +1 for phase < 0.5, else -1      odd harmonics, 1/n
    Sawtooth   2·phase - 1                      all harmonics, 1/n
    Triangle   1 - 4·|phase - 0.5|              odd harmonics, 1/n²

Frequency may be negative (deep FM pulls the instantaneous frequency below
zero); the phase then runs backwards, which is what a real FM oscillator does.

Detune is expressed in cents and applied multiplicatively:

    effective = frequency · 2^(cents / 1200)

So +1200 cents is one octave up and ±50 cents is a quarter-tone wobble.
*/

/// Oscillator shape, shared by carriers, partials and modulators.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// Evaluate the waveform at `phase` in [0, 1).
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };
        value as f32
    }

    /// Next waveform in menu order, wrapping.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|w| *w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" => Ok(Waveform::Sine),
            "square" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "triangle" => Ok(Waveform::Triangle),
            other => Err(SynthError::UnknownWaveform(other.to_string())),
        }
    }
}

/// Apply a detune in cents to a frequency.
#[inline]
pub fn detune_ratio(cents: f64) -> f64 {
    2.0_f64.powf(cents / 1200.0)
}

/// Phase accumulator driving one oscillator.
#[derive(Debug, Clone, Copy, Default)]
pub struct OscillatorBlock {
    waveform: Waveform,
    phase: f64,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Produce one sample at `frequency` Hz and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f64, sample_rate: f64) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase = (self.phase + frequency / sample_rate).rem_euclid(1.0);
        out
    }
}
