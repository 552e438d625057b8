//! Benchmarks for the graph engine and voice lifecycle.
//!
//! Run with: cargo bench
//!
//! Reference timing at 48kHz sample rate:
//!   - 64 samples  = 1.33ms deadline
//!   - 128 samples = 2.67ms deadline
//!   - 256 samples = 5.33ms deadline
//!   - 512 samples = 10.67ms deadline
//!
//! Benchmark groups:
//!   - dsp/*        Primitives (oscillator phase accumulation, automation lookup)
//!   - scenarios/*  Rendering under polyphony, note-on/note-off churn

use criterion::{criterion_group, criterion_main};

mod dsp;
mod scenarios;

/// Common buffer sizes used in audio applications.
pub const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

criterion_group!(
    benches,
    // Primitives
    dsp::bench_oscillator,
    dsp::bench_automation,
    // Real-world scenarios
    scenarios::bench_polyphony,
    scenarios::bench_voice_churn,
);
criterion_main!(benches);
