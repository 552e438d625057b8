//! Benchmarks for complete voice graphs.
//!
//! Render cost grows with node count: an additive voice with 3 partials is
//! 8 nodes, AM is 6, FM is 5, plus the shared master and vibrato.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use saavy_keys::{GraphEngine, NoteId, PolySynth, SynthMode, SynthParams};

use crate::BLOCK_SIZES;

/// Bottom row of the keyboard, white and black keys
const CHORD: [u16; 8] = [90, 83, 88, 68, 67, 86, 71, 66];

fn held(mode: SynthMode, voices: usize) -> PolySynth<GraphEngine> {
    let mut synth = PolySynth::new(
        GraphEngine::new(48_000.0),
        SynthParams {
            mode,
            ..SynthParams::default()
        },
    );
    synth.start_output();
    synth.set_vibrato_enabled(true);
    for &code in CHORD.iter().take(voices) {
        synth.note_on(NoteId(code));
    }
    synth
}

pub fn bench_polyphony(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/polyphony");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for mode in SynthMode::ALL {
            for voices in [1, 4, 8] {
                let mut synth = held(mode, voices);
                let id = format!("{mode}x{voices}");
                group.bench_with_input(BenchmarkId::new(id, size), &size, |b, _| {
                    b.iter(|| {
                        synth.engine_mut().render(black_box(&mut buffer));
                    })
                });
            }
        }
    }

    group.finish();
}

/// Note-on, one block, note-off, then enough blocks for the tail to be freed.
pub fn bench_voice_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/churn");
    let mut buffer = vec![0.0f32; 256];

    for mode in SynthMode::ALL {
        let mut synth = held(mode, 0);
        synth.set_envelope(saavy_keys::graph::envelope::EnvelopeParams::new(
            0.001, 0.001, 0.5, 0.001,
        ));

        group.bench_function(mode.as_str(), |b| {
            b.iter(|| {
                synth.note_on(NoteId(90));
                synth.engine_mut().render(&mut buffer);
                synth.note_off(NoteId(90));
                for _ in 0..(48_000 / 256 / 8) {
                    synth.engine_mut().render(&mut buffer);
                }
                black_box(synth.tick())
            })
        });
    }

    group.finish();
}
