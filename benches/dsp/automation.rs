//! Benchmarks for automation timeline lookup.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_keys::dsp::automation::Automation;

use crate::BLOCK_SIZES;

pub fn bench_automation(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/automation");
    let sample_rate = 48_000.0;

    for &size in BLOCK_SIZES {
        // ADSR-shaped timeline: floor, peak, sustain, release anchor, floor
        let mut env = Automation::new(0.0001);
        env.set_value_at(0.0001, 0.0);
        env.exponential_ramp_to(0.22, 0.01);
        env.exponential_ramp_to(0.132, 0.16);
        env.set_value_at(0.132, 0.5);
        env.exponential_ramp_to(0.0001, 0.8);

        group.bench_with_input(BenchmarkId::new("adsr", size), &size, |b, &size| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for i in 0..size {
                    acc += env.value_at(black_box(0.005 + i as f64 / sample_rate));
                }
                acc
            })
        });
    }

    group.finish();
}
