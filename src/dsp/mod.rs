//! Low-level signal primitives used by the graph engine.
//!
//! These are plain math and bookkeeping with no knowledge of nodes or
//! voices: waveform evaluation with a phase accumulator, and the automation
//! timeline every controllable parameter carries.

/// Time-stamped parameter automation (set, linear and exponential ramps).
pub mod automation;
/// Oscillator waveforms and phase accumulation.
pub mod oscillator;

pub use oscillator::Waveform;

/// `value` when finite, otherwise `fallback`. `f32::clamp` lets NaN through.
pub(crate) fn finite_or<T: Into<f64> + Copy>(value: T, fallback: T) -> T {
    if value.into().is_finite() {
        value
    } else {
        fallback
    }
}
