//! Additive voice: a stack of harmonic partials.

use crate::{
    graph::node::{AudioEngine, NodeId, ParamRef},
    synth::{
        factory::VoiceCtx,
        params::SynthMode,
        voice::{Voice, VoiceGraph},
    },
};

/*
Additive Synthesis
==================

Sum N oscillators at integer multiples of the fundamental:

    partial 1   f      weight 1/1
    partial 2   2f     weight 1/2
    partial 3   3f     weight 1/3
    ...
    partial N   N·f    weight 1/N

The raw 1/n weights are normalized to sum to 1, so adding partials makes the
tone brighter without making it louder. For N = 3:

    raw        [1.000, 0.500, 0.333]   sum 1.833
    normalized [0.545, 0.273, 0.182]   sum 1.000

Graph
-----

    osc 1 ─→ gain w1 ─┐
    osc 2 ─→ gain w2 ─┼─→ mix ─→ voice gain (envelope) ─→ master
    osc N ─→ gain wN ─┘

Vibrato fans out to every partial's detune so the whole stack bends together.
*/

/// Normalized 1/n weights for `count` partials.
pub fn partial_weights(count: u32) -> Vec<f64> {
    let raw: Vec<f64> = (1..=count.max(1)).map(|n| 1.0 / f64::from(n)).collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / sum).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct Partial {
    pub osc: NodeId,
    pub gain: NodeId,
}

pub struct AdditiveVoice {
    graph: VoiceGraph,
    mix: NodeId,
    partials: Vec<Partial>,
}

impl AdditiveVoice {
    pub fn build(engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Self {
        let mut graph = VoiceGraph::new(engine, ctx.output);
        let now = engine.current_time();

        let mix = engine.create_gain(1.0);
        engine.set_value_at_time(ParamRef::gain(mix), 1.0, now);
        engine.connect(mix, graph.voice_gain().into());
        graph.add_node(mix);

        let partials = partial_weights(ctx.params.partials)
            .into_iter()
            .enumerate()
            .map(|(i, weight)| {
                let frequency = ctx.frequency * (i + 1) as f32;
                let osc = engine.create_oscillator(ctx.params.waveform, frequency);
                engine.set_value_at_time(ParamRef::frequency(osc), frequency, now);

                let gain = engine.create_gain(weight as f32);
                engine.set_value_at_time(ParamRef::gain(gain), weight as f32, now);

                engine.connect(osc, gain.into());
                engine.connect(gain, mix.into());
                graph.add_source(osc);
                graph.add_node(gain);
                graph.attach_vibrato(engine, ctx.vibrato, ParamRef::detune(osc));

                Partial { osc, gain }
            })
            .collect();

        graph.attack(engine, &ctx.envelope, ctx.peak);
        graph.start_sources(engine);

        Self {
            graph,
            mix,
            partials,
        }
    }

    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }

    pub fn mix(&self) -> NodeId {
        self.mix
    }
}

impl Voice for AdditiveVoice {
    fn mode(&self) -> SynthMode {
        SynthMode::Additive
    }

    fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut VoiceGraph {
        &mut self.graph
    }
}
