use crate::{
    dsp::{finite_or, oscillator::Waveform},
    graph::node::{AudioEngine, NodeId, ParamRef, Teardown},
};

/*
Shared Vibrato LFO
==================

One sine LFO serves every voice. Its output passes through a "depth" gain
whose value is the vibrato depth in cents, and that gain fans out to the
detune input of every carrier (or every partial, for additive voices):

                     ┌──────────────┐
    LfoOsc (sine) ─→ │ depth (cents)│ ─┬─→ voice A carrier.detune
       rate Hz       └──────────────┘  ├─→ voice B partial 1.detune
                                       ├─→ voice B partial 2.detune
                                       └─→ ...

Because all voices listen to the same oscillator, their pitch wobble is
phase-locked: a chord bends together instead of smearing.

Switching vibrato off sets the depth gain to 0. The oscillator keeps
running and voices stay wired, so toggling never clicks and never has to
rebuild anything. Each voice adds its own edges at construction and removes
only those edges at release; the LFO itself lives as long as the session.
*/

/// Vibrato settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VibratoParams {
    pub enabled: bool,
    /// LFO rate in Hz
    pub rate: f32,
    /// Pitch swing in cents (each direction)
    pub depth: f32,
}

impl Default for VibratoParams {
    fn default() -> Self {
        Self {
            enabled: false,
            rate: 5.0,
            depth: 10.0,
        }
    }
}

impl VibratoParams {
    /// Rate non-negative; non-finite rate or depth falls back to the default.
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            enabled: self.enabled,
            rate: finite_or(self.rate, d.rate).max(0.0),
            depth: finite_or(self.depth, d.depth),
        }
    }

    /// Depth actually applied to the gain: zero while disabled.
    pub fn effective_depth(&self) -> f32 {
        if self.enabled {
            self.depth
        } else {
            0.0
        }
    }
}

/// The session-wide vibrato oscillator and its depth stage.
#[derive(Debug)]
pub struct Vibrato {
    osc: NodeId,
    depth: NodeId,
    params: VibratoParams,
}

impl Vibrato {
    /// Build and start the LFO. It is never stopped or rebuilt afterwards.
    pub fn new(engine: &mut dyn AudioEngine, params: VibratoParams) -> Self {
        let params = params.clamped();
        let now = engine.current_time();

        let osc = engine.create_oscillator(Waveform::Sine, params.rate);
        let depth = engine.create_gain(0.0);
        engine.set_value_at_time(ParamRef::frequency(osc), params.rate, now);
        engine.set_value_at_time(ParamRef::gain(depth), params.effective_depth(), now);
        engine.connect(osc, depth.into());
        engine.start(osc);

        Self { osc, depth, params }
    }

    pub fn params(&self) -> VibratoParams {
        self.params
    }

    /// Node whose output is the detune signal in cents.
    pub fn output(&self) -> NodeId {
        self.depth
    }

    pub fn oscillator(&self) -> NodeId {
        self.osc
    }

    pub fn set_rate(&mut self, engine: &mut dyn AudioEngine, rate: f32) {
        self.params = VibratoParams { rate, ..self.params }.clamped();
        let now = engine.current_time();
        engine.set_value_at_time(ParamRef::frequency(self.osc), self.params.rate, now);
    }

    pub fn set_depth(&mut self, engine: &mut dyn AudioEngine, cents: f32) {
        self.params = VibratoParams {
            depth: cents,
            ..self.params
        }
        .clamped();
        self.apply_depth(engine);
    }

    pub fn set_enabled(&mut self, engine: &mut dyn AudioEngine, enabled: bool) {
        self.params.enabled = enabled;
        self.apply_depth(engine);
    }

    /// Wire the depth stage into a voice's detune input.
    pub fn attach(&self, engine: &mut dyn AudioEngine, detune: ParamRef) -> Teardown {
        engine.connect(self.depth, detune.into())
    }

    fn apply_depth(&self, engine: &mut dyn AudioEngine) {
        let now = engine.current_time();
        engine.set_value_at_time(ParamRef::gain(self.depth), self.params.effective_depth(), now);
    }
}
