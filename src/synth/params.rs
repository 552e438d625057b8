//! User-facing synthesis settings.
//!
//! Everything the control panel can change lives in [`SynthParams`]. Which of
//! these reach a sounding voice depends on where they are read:
//!
//! - master volume and vibrato are live nodes, updated in place
//! - AM/FM modulator rate and depth are snapshotted at construction and also
//!   pushed to already sounding AM/FM voices
//! - envelope, partial count and waveform are read when a voice is built
//!   (and the envelope again at note-off for the release time)

use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    dsp::{finite_or, oscillator::Waveform},
    error::SynthError,
    graph::{envelope::EnvelopeParams, lfo::VibratoParams},
};

/// Most harmonics an additive voice stacks.
pub const MAX_PARTIALS: u32 = 16;

/// Which voice factory handles new notes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthMode {
    #[default]
    Additive,
    Am,
    Fm,
}

impl SynthMode {
    pub const ALL: [SynthMode; 3] = [SynthMode::Additive, SynthMode::Am, SynthMode::Fm];

    pub fn as_str(self) -> &'static str {
        match self {
            SynthMode::Additive => "additive",
            SynthMode::Am => "am",
            SynthMode::Fm => "fm",
        }
    }
}

impl fmt::Display for SynthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SynthMode {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" => Ok(SynthMode::Additive),
            "am" => Ok(SynthMode::Am),
            "fm" => Ok(SynthMode::Fm),
            other => Err(SynthError::UnknownMode(other.to_string())),
        }
    }
}

/// Amplitude-modulation settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmParams {
    /// Modulator rate in Hz
    pub frequency: f32,
    /// Modulation depth, 0 (none) to 1 (full)
    pub depth: f32,
}

impl Default for AmParams {
    fn default() -> Self {
        Self {
            frequency: 5.0,
            depth: 0.5,
        }
    }
}

impl AmParams {
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            frequency: finite_or(self.frequency, d.frequency).max(0.0),
            depth: finite_or(self.depth, d.depth).clamp(0.0, 1.0),
        }
    }

    /// Constant part of the carrier gain: `1 - depth/2`.
    pub fn offset(&self) -> f32 {
        1.0 - self.depth / 2.0
    }

    /// Modulator scale: `depth/2`.
    pub fn swing(&self) -> f32 {
        self.depth / 2.0
    }
}

/// Frequency-modulation settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FmParams {
    /// Modulator rate in Hz
    pub frequency: f32,
    /// Peak frequency deviation in Hz
    pub depth: f32,
}

impl Default for FmParams {
    fn default() -> Self {
        Self {
            frequency: 5.0,
            depth: 100.0,
        }
    }
}

impl FmParams {
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            frequency: finite_or(self.frequency, d.frequency).max(0.0),
            depth: finite_or(self.depth, d.depth).max(0.0),
        }
    }
}

/// Complete control-panel state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthParams {
    pub mode: SynthMode,
    pub waveform: Waveform,
    pub master_volume: f32,
    pub partials: u32,
    pub am: AmParams,
    pub fm: FmParams,
    pub envelope: EnvelopeParams,
    pub vibrato: VibratoParams,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            mode: SynthMode::Additive,
            waveform: Waveform::Sine,
            master_volume: 0.5,
            partials: 3,
            am: AmParams::default(),
            fm: FmParams::default(),
            envelope: EnvelopeParams::default(),
            vibrato: VibratoParams::default(),
        }
    }
}

impl SynthParams {
    /// Clamp every field into its legal range. Non-finite values fall back
    /// to the field's default.
    pub fn clamped(self) -> Self {
        Self {
            master_volume: clamp_volume(self.master_volume),
            partials: clamp_partials(self.partials),
            am: self.am.clamped(),
            fm: self.fm.clamped(),
            envelope: self.envelope.clamped(),
            vibrato: self.vibrato.clamped(),
            ..self
        }
    }
}

pub(crate) fn clamp_volume(volume: f32) -> f32 {
    finite_or(volume, SynthParams::default().master_volume).clamp(0.0, 1.0)
}

pub(crate) fn clamp_partials(partials: u32) -> u32 {
    partials.clamp(1, MAX_PARTIALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modes() {
        assert_eq!("additive".parse::<SynthMode>().unwrap(), SynthMode::Additive);
        assert_eq!("AM".parse::<SynthMode>().unwrap(), SynthMode::Am);
        assert_eq!(" fm ".parse::<SynthMode>().unwrap(), SynthMode::Fm);
        assert!(matches!(
            "pm".parse::<SynthMode>(),
            Err(SynthError::UnknownMode(m)) if m == "pm"
        ));
    }

    #[test]
    fn am_offset_and_swing_bound_the_gain() {
        for depth in [0.0, 0.25, 0.5, 1.0] {
            let am = AmParams {
                frequency: 5.0,
                depth,
            };
            assert!(am.offset() - am.swing() >= 0.0);
            assert!(am.offset() + am.swing() <= 1.0 + f32::EPSILON);
        }
    }

    #[test]
    fn clamping() {
        let params = SynthParams {
            master_volume: 2.0,
            partials: 0,
            am: AmParams {
                frequency: -1.0,
                depth: 3.0,
            },
            fm: FmParams {
                frequency: 2.0,
                depth: -50.0,
            },
            ..SynthParams::default()
        }
        .clamped();

        assert_eq!(params.master_volume, 1.0);
        assert_eq!(params.partials, 1);
        assert_eq!(params.am.depth, 1.0);
        assert_eq!(params.am.frequency, 0.0);
        assert_eq!(params.fm.depth, 0.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let defaults = SynthParams::default();
        let params = SynthParams {
            master_volume: f32::NAN,
            partials: 4_000_000_000,
            am: AmParams {
                frequency: f32::INFINITY,
                depth: f32::NAN,
            },
            fm: FmParams {
                frequency: f32::NAN,
                depth: f32::NEG_INFINITY,
            },
            envelope: EnvelopeParams {
                attack: f64::NAN,
                sustain: f32::NAN,
                ..EnvelopeParams::default()
            },
            vibrato: VibratoParams {
                enabled: true,
                rate: f32::NAN,
                depth: f32::INFINITY,
            },
            ..defaults
        }
        .clamped();

        assert_eq!(params.master_volume, defaults.master_volume);
        assert_eq!(params.partials, MAX_PARTIALS);
        assert_eq!(params.am, defaults.am);
        assert_eq!(params.fm, defaults.fm);
        assert_eq!(params.envelope, defaults.envelope);
        assert_eq!(params.vibrato.rate, defaults.vibrato.rate);
        assert_eq!(params.vibrato.depth, defaults.vibrato.depth);
        assert!(params.vibrato.enabled);
    }
}
