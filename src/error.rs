//! Error types for parsing options and loading configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised outside the audio graph.
///
/// Graph operations themselves never fail: connect, disconnect, stop and
/// dispose report [`Teardown`](crate::graph::node::Teardown) instead.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Synthesis mode name not one of `additive`, `am`, `fm`
    #[error("unknown synthesis mode: {0}")]
    UnknownMode(String),

    /// Waveform name not one of `sine`, `square`, `sawtooth`, `triangle`
    #[error("unknown waveform: {0}")]
    UnknownWaveform(String),

    /// Note identifier could not be parsed as a key code
    #[error("invalid note identifier: {0}")]
    InvalidNote(String),

    /// Failed to read a configuration file
    #[error("failed to read config '{path}': {source}")]
    Io {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a TOML configuration
    #[cfg(feature = "serde")]
    #[error("failed to parse config: {0}")]
    Config(#[from] toml::de::Error),
}
