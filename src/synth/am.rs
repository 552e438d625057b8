//! Amplitude-modulation voice.

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
AM wiring
=========

The carrier gain's own value is held at 0; everything it multiplies by comes
in through its gain input:

    gain(t) = offset + swing · sin(2π·fm·t)
            = (1 - d/2) + (d/2) · sin(2π·fm·t)

which stays inside [1 - d, 1] for any depth d in [0, 1].

    carrier ───────────────→ carrier gain ─→ voice gain ─→ master
                                  ↑ gain
    modulator ─→ mod gain (d/2) ──┤
    offset (1 - d/2) ─────────────┘
*/

pub struct AmVoice {
    graph: VoiceGraph,
    carrier: NodeId,
    carrier_gain: NodeId,
    modulator: NodeId,
    mod_gain: NodeId,
    offset: NodeId,
}

impl AmVoice {
    pub fn build(engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Self {
        let mut graph = VoiceGraph::new(engine, ctx.output);
        let now = engine.current_time();
        let am = ctx.params.am;

        let carrier = engine.create_oscillator(ctx.params.waveform, ctx.frequency);
        engine.set_value_at_time(ParamRef::frequency(carrier), ctx.frequency, now);

        let carrier_gain = engine.create_gain(0.0);
        engine.set_value_at_time(ParamRef::gain(carrier_gain), 0.0, now);

        let modulator = engine.create_oscillator(Waveform::Sine, am.frequency);
        engine.set_value_at_time(ParamRef::frequency(modulator), am.frequency, now);

        let mod_gain = engine.create_gain(am.swing());
        engine.set_value_at_time(ParamRef::gain(mod_gain), am.swing(), now);

        let offset = engine.create_constant(am.offset());
        engine.set_value_at_time(ParamRef::offset(offset), am.offset(), now);

        engine.connect(carrier, carrier_gain.into());
        engine.connect(carrier_gain, graph.voice_gain().into());
        engine.connect(modulator, mod_gain.into());
        engine.connect(mod_gain, ParamRef::gain(carrier_gain).into());
        engine.connect(offset, ParamRef::gain(carrier_gain).into());

        graph.add_source(carrier);
        graph.add_source(modulator);
        graph.add_source(offset);
        graph.add_node(carrier_gain);
        graph.add_node(mod_gain);
        graph.attach_vibrato(engine, ctx.vibrato, ParamRef::detune(carrier));

        graph.attack(engine, &ctx.envelope, ctx.peak);
        graph.start_sources(engine);

        Self {
            graph,
            carrier,
            carrier_gain,
            modulator,
            mod_gain,
            offset,
        }
    }

    pub fn carrier(&self) -> NodeId {
        self.carrier
    }

    /// Gain stage whose gain input carries the modulation.
    pub fn carrier_gain(&self) -> NodeId {
        self.carrier_gain
    }

    pub fn modulator(&self) -> NodeId {
        self.modulator
    }
}

impl Voice for AmVoice {
    fn mode(&self) -> SynthMode {
        SynthMode::Am
    }

    fn graph(&self) -> &VoiceGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut VoiceGraph {
        &mut self.graph
    }

    fn retune(&mut self, engine: &mut dyn AudioEngine, params: &SynthParams) {
        let now = engine.current_time();
        let am = params.am;
        engine.set_value_at_time(ParamRef::frequency(self.modulator), am.frequency, now);
        engine.set_value_at_time(ParamRef::gain(self.mod_gain), am.swing(), now);
        engine.set_value_at_time(ParamRef::offset(self.offset), am.offset(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{
            engine::GraphEngine,
            envelope::{Envelope, EnvelopeParams},
            lfo::{Vibrato, VibratoParams},
        },
        synth::params::AmParams,
    };
    use proptest::prelude::*;

    fn build(engine: &mut GraphEngine, vibrato: &Vibrato, am: AmParams) -> AmVoice {
        let ctx = VoiceCtx {
            frequency: 440.0,
            peak: 0.22,
            params: SynthParams {
                mode: SynthMode::Am,
                am,
                ..SynthParams::default()
            },
            envelope: Envelope::new(EnvelopeParams::default()),
            output: engine.destination(),
            vibrato,
        };
        AmVoice::build(engine, &ctx)
    }

    fn gain_range(engine: &mut GraphEngine, voice: &AmVoice, seconds: f64) -> (f32, f32) {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        let steps = (seconds * engine.sample_rate()) as usize;
        let mut frame = [0.0f32; 1];
        for _ in 0..steps {
            engine.render(&mut frame);
            let g = engine
                .probe_param(ParamRef::gain(voice.carrier_gain()))
                .unwrap();
            lo = lo.min(g);
            hi = hi.max(g);
        }
        (lo, hi)
    }

    #[test]
    fn intrinsic_carrier_gain_is_zero() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let voice = build(&mut engine, &vibrato, AmParams::default());

        assert_eq!(engine.param_value(ParamRef::gain(voice.carrier_gain())), 0.0);
        let feeding = engine.sources_into(ParamRef::gain(voice.carrier_gain()).into());
        assert_eq!(feeding.len(), 2);
        assert!(engine.is_connected(vibrato.output(), ParamRef::detune(voice.carrier()).into()));
    }

    #[test]
    fn full_depth_sweeps_zero_to_one() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let voice = build(
            &mut engine,
            &vibrato,
            AmParams {
                frequency: 5.0,
                depth: 1.0,
            },
        );

        let (lo, hi) = gain_range(&mut engine, &voice, 0.4);
        assert!(lo >= -1e-4 && lo < 0.01, "lo = {lo}");
        assert!(hi <= 1.0 + 1e-4 && hi > 0.99, "hi = {hi}");
    }

    #[test]
    fn retune_moves_modulator() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let mut voice = build(&mut engine, &vibrato, AmParams::default());

        let params = SynthParams {
            am: AmParams {
                frequency: 9.0,
                depth: 0.2,
            },
            ..SynthParams::default()
        };
        voice.retune(&mut engine, &params);

        assert_eq!(engine.param_value(ParamRef::frequency(voice.modulator())), 9.0);
        let (lo, hi) = gain_range(&mut engine, &voice, 0.25);
        assert!(lo >= 0.8 - 1e-4);
        assert!(hi <= 1.0 + 1e-4);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn gain_stays_in_unit_range(depth in 0.0f32..=1.0, rate in 0.5f32..20.0) {
            let mut engine = GraphEngine::new(2_000.0);
            engine.resume();
            let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
            let voice = build(&mut engine, &vibrato, AmParams { frequency: rate, depth });

            let (lo, hi) = gain_range(&mut engine, &voice, 0.2);
            prop_assert!(lo >= 1.0 - depth - 1e-4);
            prop_assert!(lo >= -1e-4);
            prop_assert!(hi <= 1.0 + 1e-4);
        }
    }
}
