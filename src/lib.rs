#[cfg(feature = "serde")]
pub mod config; // TOML startup configuration
pub mod dsp;
pub mod error;
pub mod graph; // Audio graph engine, envelope and vibrato
pub mod io; // Key layout and input routing
pub mod synth; // Voices, polyphony and the playing session

pub use error::SynthError;
pub use graph::{AudioEngine, GraphEngine, SharedEngine};
pub use io::{InputEvent, InputRouter, NoteId};
pub use synth::{PolySynth, SynthMode, SynthParams};

pub const MAX_BLOCK_SIZE: usize = 2048;
