// Purpose: per-note voice graphs, polyphony and the playing session
// This layer sits above the graph engine and owns every live voice

pub mod additive;
pub mod am;
pub mod factory;
pub mod fm;
pub mod message;
pub mod params;
pub mod poly;
pub mod registry;
pub mod voice;

pub use factory::{factory_for, polyphony_peak, VoiceFactory};
pub use message::SynthEvent;
pub use params::{AmParams, FmParams, SynthMode, SynthParams, MAX_PARTIALS};
pub use poly::PolySynth;
pub use voice::{Voice, VoiceState};
