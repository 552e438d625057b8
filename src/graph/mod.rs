//! Audio-graph plumbing the synthesizer builds voices on.
//!
//! `node` defines the engine capability set voices are written against;
//! `engine` is the renderer that realizes it in-process. `envelope` and `lfo`
//! are the two pieces of shared control logic every voice uses: scheduled
//! ADSR curves and the session-wide vibrato.

/// Sample-accurate graph renderer and its shareable handle.
pub mod engine;
/// ADSR curves scheduled onto gain parameters.
pub mod envelope;
/// Shared vibrato oscillator fanned out to voice detune inputs.
pub mod lfo;
/// Node handles, parameter references and the `AudioEngine` trait.
pub mod node;

pub use engine::{GraphEngine, SharedEngine};
pub use node::{AudioEngine, NodeId, OutputState, ParamKind, ParamRef, Target, Teardown};
