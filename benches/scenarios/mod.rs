//! Benchmarks for real-world playing scenarios.

mod voices;

pub use voices::{bench_polyphony, bench_voice_churn};
