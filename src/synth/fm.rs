//! Frequency-modulation voice.

use crate::{
    dsp::oscillator::Waveform,
    graph::node::{AudioEngine, NodeId, ParamRef},
    synth::{
        factory::VoiceCtx,
        params::{SynthMode, SynthParams},
        voice::{Voice, VoiceGraph},
    },
};

/*
FM wiring
=========

A sine modulator, scaled to a deviation in Hz, is summed onto the carrier's
frequency input:

    f(t) = f0 + depth · sin(2π·fm·t)

    modulator ─→ depth gain (Hz) ─→ carrier.frequency
    carrier ─→ out gain ─→ voice gain ─→ master

Vibrato goes to the carrier's detune, so it multiplies the whole swept
frequency rather than adding to it.
*/

pub struct FmVoice {
    graph: VoiceGraph,
    carrier: NodeId,
    modulator: NodeId,
    depth_gain: NodeId,
    out_gain: NodeId,
}

impl FmVoice {
    pub fn build(engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Self {
        let mut graph = VoiceGraph::new(engine, ctx.output);
        let now = engine.current_time();
        let fm = ctx.params.fm;

        let carrier = engine.create_oscillator(ctx.params.waveform, ctx.frequency);
        engine.set_value_at_time(ParamRef::frequency(carrier), ctx.frequency, now);

        let modulator = engine.create_oscillator(Waveform::Sine, fm.frequency);
        engine.set_value_at_time(ParamRef::frequency(modulator), fm.frequency, now);

        let depth_gain = engine.create_gain(fm.depth);
        engine.set_value_at_time(ParamRef::gain(depth_gain), fm.depth, now);

        let out_gain = engine.create_gain(1.0);
        engine.set_value_at_time(ParamRef::gain(out_gain), 1.0, now);

        engine.connect(modulator, depth_gain.into());
        engine.connect(depth_gain, ParamRef::frequency(carrier).into());
        engine.connect(carrier, out_gain.into());
        engine.connect(out_gain, graph.voice_gain().into());

        graph.add_source(carrier);
        graph.add_source(modulator);
        graph.add_node(depth_gain);
        graph.add_node(out_gain);
        graph.attach_vibrato(engine, ctx.vibrato, ParamRef::detune(carrier));

        graph.attack(engine, &ctx.envelope, ctx.peak);
        graph.start_sources(engine);

        Self {
            graph,
            carrier,
            modulator,
            depth_gain,
            out_gain,
        }
    }

    pub fn carrier(&self) -> NodeId {
        self.carrier
    }

    pub fn modulator(&self) -> NodeId {
        self.modulator
    }

    /// Gain that scales the modulator into Hz of deviation.
    pub fn depth_gain(&self) -> NodeId {
        self.depth_gain
    }

    pub fn out_gain(&self) -> NodeId {
        self.out_gain
    }
}

impl Voice for FmVoice {
    fn mode(&self) -> SynthMode {
        SynthMode::Fm
    }

    fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut VoiceGraph {
        &mut self.graph
    }

    fn retune(&mut self, engine: &mut dyn AudioEngine, params: &SynthParams) {
        let now = engine.current_time();
        engine.set_value_at_time(ParamRef::frequency(self.modulator), params.fm.frequency, now);
        engine.set_value_at_time(ParamRef::gain(self.depth_gain), params.fm.depth, now);
    }
}
