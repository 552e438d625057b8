use crate::{
    graph::{envelope::Envelope, lfo::Vibrato, node::AudioEngine, NodeId},
    synth::{
        additive::AdditiveVoice,
        am::AmVoice,
        fm::FmVoice,
        params::{SynthMode, SynthParams},
        voice::Voice,
    },
};

/// Headroom budget split across simultaneously sounding notes.
pub const VOICE_HEADROOM: f32 = 0.22;

/// Peak amplitude for a voice joining `active` already sounding voices.
///
/// Fixed at construction; later notes joining or leaving do not rescale it.
pub fn polyphony_peak(active: usize) -> f32 {
    VOICE_HEADROOM / (active + 1) as f32
}

/// Everything a factory reads when building one voice.
///
/// Parameters are a snapshot: later control changes do not reach a voice
/// through this struct.
pub struct VoiceCtx<'a> {
    /// Fundamental frequency in Hz
    pub frequency: f32,
    /// Envelope peak (see [`polyphony_peak`])
    pub peak: f32,
    pub params: SynthParams,
    pub envelope: Envelope,
    /// Node the voice gain feeds (the master gain)
    pub output: NodeId,
    pub vibrato: &'a Vibrato,
}

/// Factory for one synthesis mode's voice graph
///
/// This is the "instrument design" layer: each implementation knows how to
/// wire oscillators and gain stages for its mode, then hands back a voice
/// the registry can release without knowing which mode built it.
pub trait VoiceFactory: Send + Sync {
    fn create_voice(&self, engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Box<dyn Voice>;
}

pub struct AdditiveFactory;
pub struct AmFactory;
pub struct FmFactory;

impl VoiceFactory for AdditiveFactory {
    fn create_voice(&self, engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Box<dyn Voice> {
        Box::new(AdditiveVoice::build(engine, ctx))
    }
}

impl VoiceFactory for AmFactory {
    fn create_voice(&self, engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Box<dyn Voice> {
        Box::new(AmVoice::build(engine, ctx))
    }
}

impl VoiceFactory for FmFactory {
    fn create_voice(&self, engine: &mut dyn AudioEngine, ctx: &VoiceCtx<'_>) -> Box<dyn Voice> {
        Box::new(FmVoice::build(engine, ctx))
    }
}

/// Factory dispatch keyed on the synthesis mode.
pub fn factory_for(mode: SynthMode) -> &'static dyn VoiceFactory {
    match mode {
        SynthMode::Additive => &AdditiveFactory,
        SynthMode::Am => &AmFactory,
        SynthMode::Fm => &FmFactory,
    }
}
