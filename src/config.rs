//! TOML startup configuration.
//!
//! Every field is optional; missing values take the defaults of
//! [`SynthParams`] and [`KeyboardConfig`].
//!
//! ```toml
//! [synth]
//! mode = "fm"
//! waveform = "sawtooth"
//! master_volume = 0.4
//!
//! [synth.fm]
//! frequency = 6.0
//! depth = 150.0
//!
//! [synth.envelope]
//! attack = 0.02
//! release = 0.5
//!
//! [keyboard]
//! initial_hold_ms = 500
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::SynthError, io::input::HoldGate, synth::params::SynthParams};

/// Key-release fallback timing for terminals without release events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    pub initial_hold_ms: u64,
    pub repeat_hold_ms: u64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            initial_hold_ms: 600,
            repeat_hold_ms: 120,
        }
    }
}

impl KeyboardConfig {
    pub fn hold_gate(&self) -> HoldGate {
        HoldGate::new(
            Duration::from_millis(self.initial_hold_ms),
            Duration::from_millis(self.repeat_hold_ms),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub synth: SynthParams,
    pub keyboard: KeyboardConfig,
}

impl SynthConfig {
    /// Parse a TOML document; the synth section is clamped into range.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, SynthError> {
        let config: SynthConfig = toml::from_str(toml_str)?;
        Ok(Self {
            synth: config.synth.clamped(),
            ..config
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SynthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dsp::oscillator::Waveform,
        synth::params::{SynthMode, MAX_PARTIALS},
    };

    #[test]
    fn empty_document_is_default() {
        let config = SynthConfig::from_toml_str("").unwrap();
        assert_eq!(config, SynthConfig::default());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config = SynthConfig::from_toml_str(
            r#"
            [synth]
            mode = "am"
            waveform = "square"
            master_volume = 3.0

            [synth.am]
            depth = 1.0

            [synth.envelope]
            release = 0.8

            [keyboard]
            repeat_hold_ms = 90
            "#,
        )
        .unwrap();

        assert_eq!(config.synth.mode, SynthMode::Am);
        assert_eq!(config.synth.waveform, Waveform::Square);
        assert_eq!(config.synth.master_volume, 1.0);
        assert_eq!(config.synth.am.depth, 1.0);
        assert_eq!(config.synth.am.frequency, 5.0);
        assert_eq!(config.synth.envelope.release, 0.8);
        assert_eq!(config.synth.envelope.attack, 0.01);
        assert_eq!(config.keyboard.repeat_hold_ms, 90);
        assert_eq!(config.keyboard.initial_hold_ms, 600);
    }

    #[test]
    fn nan_and_huge_values_are_tamed() {
        let config = SynthConfig::from_toml_str(
            r#"
            [synth]
            master_volume = nan
            partials = 4000000000

            [synth.am]
            depth = nan

            [synth.envelope]
            sustain = nan
            attack = inf
            "#,
        )
        .unwrap();

        let defaults = SynthParams::default();
        assert_eq!(config.synth.master_volume, defaults.master_volume);
        assert_eq!(config.synth.partials, MAX_PARTIALS);
        assert_eq!(config.synth.am.depth, defaults.am.depth);
        assert_eq!(config.synth.envelope.sustain, defaults.envelope.sustain);
        assert_eq!(config.synth.envelope.attack, defaults.envelope.attack);
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = SynthConfig::from_toml_str("[synth]\nmode = \"pm\"\n").unwrap_err();
        assert!(matches!(err, SynthError::Config(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SynthConfig::load("/nonexistent/keys.toml").unwrap_err();
        assert!(matches!(err, SynthError::Io { ref path, .. } if path.ends_with("keys.toml")));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SynthConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(SynthConfig::from_toml_str(&text).unwrap(), config);
    }
}
