use crate::{
    dsp::finite_or,
    graph::node::{AudioEngine, ParamRef},
};

/*
Scheduled ADSR Envelope
=======================

Unlike a per-sample envelope generator, this envelope never runs code while
audio plays. It writes a curve onto a gain parameter's automation timeline
and lets the engine follow it on its own clock.

  gain
  peak ┐      ╱╲
       │     ╱  ╲_____________
  S·pk │    ╱                 ╲
       │   ╱                   ╲
 floor └──╱─────────────────────╲───→ time
          now  +A  +A+D   note-off  +R

Note-on (`attack`):
  1. cancel anything still pending on the parameter (retrigger safety)
  2. jump to the floor at `now`
  3. exponential ramp to `peak` at `now + A`
  4. exponential ramp to `max(floor, peak · S)` at `now + A + D`

Note-off (`release`):
  1. read the value the parameter has RIGHT NOW (release may land mid-attack
     or mid-decay, so the nominal sustain level is the wrong anchor)
  2. cancel pending ramps
  3. re-anchor at that value
  4. exponential ramp to the floor at `now + R`

Why a floor?
------------
Exponential ramps cannot start from or reach exactly zero (see
`dsp::automation`), so the envelope bottoms out at 0.0001 (-80 dB).
*/

/// Lowest level the envelope ever targets (linear amplitude).
pub const FLOOR: f32 = 0.0001;

/// Attack/decay/sustain/release settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.15,
            sustain: 0.6,
            release: 0.3,
        }
    }
}

impl EnvelopeParams {
    pub fn new(attack: f64, decay: f64, sustain: f32, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
        .clamped()
    }

    /// Times non-negative, sustain within [0, 1]. Non-finite fields fall
    /// back to their defaults.
    pub fn clamped(self) -> Self {
        let d = Self::default();
        Self {
            attack: finite_or(self.attack, d.attack).max(0.0),
            decay: finite_or(self.decay, d.decay).max(0.0),
            sustain: finite_or(self.sustain, d.sustain).clamp(0.0, 1.0),
            release: finite_or(self.release, d.release).max(0.0),
        }
    }
}

/// Writes ADSR curves onto gain parameters.
#[derive(Debug, Clone, Copy)]
pub struct Envelope {
    params: EnvelopeParams,
}

impl Envelope {
    pub fn new(params: EnvelopeParams) -> Self {
        Self {
            params: params.clamped(),
        }
    }

    pub fn params(&self) -> EnvelopeParams {
        self.params
    }

    /// Schedule attack and decay from now. Returns the time decay ends.
    pub fn attack(&self, engine: &mut dyn AudioEngine, gain: ParamRef, peak: f32) -> f64 {
        let now = engine.current_time();
        let attack_end = now + self.params.attack;
        let decay_end = attack_end + self.params.decay;

        engine.cancel_scheduled_values(gain, now);
        engine.set_value_at_time(gain, FLOOR, now);
        engine.exponential_ramp_to_value_at_time(gain, peak.max(FLOOR), attack_end);
        engine.exponential_ramp_to_value_at_time(
            gain,
            (peak * self.params.sustain).max(FLOOR),
            decay_end,
        );

        decay_end
    }

    /// Schedule the release ramp from the gain's current value.
    ///
    /// Returns the release time in seconds so the caller can stop sources
    /// once the tail has faded.
    pub fn release(&self, engine: &mut dyn AudioEngine, gain: ParamRef) -> f64 {
        let now = engine.current_time();
        let current = engine.param_value(gain).max(FLOOR);

        engine.cancel_scheduled_values(gain, now);
        engine.set_value_at_time(gain, current, now);
        engine.exponential_ramp_to_value_at_time(gain, FLOOR, now + self.params.release);

        self.params.release
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{engine::GraphEngine, node::AudioEngine};

    const SAMPLE_RATE: f64 = 8_000.0;

    fn setup() -> (GraphEngine, ParamRef) {
        let mut engine = GraphEngine::new(SAMPLE_RATE);
        engine.resume();
        let gain = engine.create_gain(FLOOR);
        (engine, ParamRef::gain(gain))
    }

    #[test]
    fn attack_reaches_peak_then_sustain() {
        let (mut engine, gain) = setup();
        let env = Envelope::new(EnvelopeParams::new(0.1, 0.2, 0.5, 0.3));

        let decay_end = env.attack(&mut engine, gain, 0.2);
        assert!((decay_end - 0.3).abs() < 1e-9);
        assert!((engine.param_value(gain) - FLOOR).abs() < 1e-9);

        engine.advance(0.1);
        assert!((engine.param_value(gain) - 0.2).abs() < 1e-3);

        engine.advance(0.3);
        assert!((engine.param_value(gain) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_sustain_stays_above_floor() {
        let (mut engine, gain) = setup();
        let env = Envelope::new(EnvelopeParams::new(0.01, 0.01, 0.0, 0.1));
        env.attack(&mut engine, gain, 0.5);
        engine.advance(0.1);
        assert!((engine.param_value(gain) - FLOOR).abs() < 1e-9);
    }

    #[test]
    fn release_mid_attack_does_not_jump() {
        let (mut engine, gain) = setup();
        let env = Envelope::new(EnvelopeParams::new(1.0, 0.5, 0.5, 0.4));
        env.attack(&mut engine, gain, 0.22);

        engine.advance(0.5);
        let before = engine.param_value(gain);
        assert!(before > FLOOR && before < 0.22, "mid-attack value {before}");

        let release = env.release(&mut engine, gain);
        assert_eq!(release, 0.4);
        let after = engine.param_value(gain);
        assert!((after - before).abs() < 1e-7, "release jumped {before} -> {after}");

        engine.advance(0.05);
        assert!(engine.param_value(gain) < before, "release must ramp down");

        engine.advance(0.4);
        assert!((engine.param_value(gain) - FLOOR).abs() < 1e-9);
    }

    #[test]
    fn release_at_note_on_instant_starts_from_floor() {
        let (mut engine, gain) = setup();
        let env = Envelope::new(EnvelopeParams::default());
        env.attack(&mut engine, gain, 0.22);
        env.release(&mut engine, gain);
        assert!((engine.param_value(gain) - FLOOR).abs() < 1e-9);
    }

    #[test]
    fn params_are_clamped() {
        let params = EnvelopeParams::new(-1.0, -0.5, 1.5, -2.0);
        assert_eq!(params, EnvelopeParams::new(0.0, 0.0, 1.0, 0.0));
    }
}
