use crate::{
    graph::node::AudioEngine,
    io::keymap::NoteId,
    synth::voice::Voice,
};

/// A released voice still ringing out its tail.
struct Releasing {
    note: NoteId,
    voice: Box<dyn Voice>,
    dispose_at: f64,
}

/// Live voices keyed by note, plus the tails waiting for disposal.
///
/// A note maps to at most one active voice. Removing a note from the active
/// set happens immediately at note-off; the voice's nodes are freed later by
/// [`VoiceRegistry::collect`] once the engine clock passes its deadline.
#[derive(Default)]
pub struct VoiceRegistry {
    active: Vec<(NoteId, Box<dyn Voice>)>,
    releasing: Vec<Releasing>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, note: NoteId) -> bool {
        self.active.iter().any(|(id, _)| *id == note)
    }

    /// Number of held (not releasing) voices.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Held notes in press order.
    pub fn active_ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.active.iter().map(|(id, _)| *id)
    }

    pub fn get(&self, note: NoteId) -> Option<&dyn Voice> {
        self.active
            .iter()
            .find(|(id, _)| *id == note)
            .map(|(_, voice)| voice.as_ref())
    }

    /// Store a voice under `note`. Refuses (and hands the voice back) if the
    /// note already has one.
    pub fn insert(&mut self, note: NoteId, voice: Box<dyn Voice>) -> Result<(), Box<dyn Voice>> {
        if self.contains(note) {
            return Err(voice);
        }
        self.active.push((note, voice));
        Ok(())
    }

    /// Take the active voice for `note` out of the map.
    pub fn remove(&mut self, note: NoteId) -> Option<Box<dyn Voice>> {
        let pos = self.active.iter().position(|(id, _)| *id == note)?;
        Some(self.active.remove(pos).1)
    }

    /// Take every active voice, oldest first.
    pub fn drain(&mut self) -> Vec<(NoteId, Box<dyn Voice>)> {
        std::mem::take(&mut self.active)
    }

    /// Park a released voice until `dispose_at`.
    pub fn retire(&mut self, note: NoteId, voice: Box<dyn Voice>, dispose_at: f64) {
        self.releasing.push(Releasing {
            note,
            voice,
            dispose_at,
        });
    }

    /// Tear down every tail whose deadline has passed. Returns how many
    /// voices were disposed.
    pub fn collect(&mut self, engine: &mut dyn AudioEngine, now: f64) -> usize {
        let mut disposed = 0;
        self.releasing.retain_mut(|tail| {
            if tail.dispose_at > now {
                return true;
            }
            let freed = tail.voice.teardown(engine);
            tracing::debug!(note = %tail.note, freed, "voice disposed");
            disposed += 1;
            false
        });
        disposed
    }

    /// Voices released but not yet disposed.
    pub fn releasing_len(&self) -> usize {
        self.releasing.len()
    }

    /// Every voice whose sources are still running (held or releasing).
    pub fn sounding_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Voice>> + '_ {
        self.active
            .iter_mut()
            .map(|(_, voice)| voice)
            .chain(self.releasing.iter_mut().map(|tail| &mut tail.voice))
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
        synth::{
            factory::{factory_for, VoiceCtx},
            params::{SynthMode, SynthParams},
            voice::VoiceState,
        },
    };

    fn voice(engine: &mut GraphEngine, vibrato: &Vibrato) -> Box<dyn Voice> {
        let ctx = VoiceCtx {
            frequency: 440.0,
            peak: 0.22,
            params: SynthParams::default(),
            envelope: Envelope::new(EnvelopeParams::default()),
            output: engine.destination(),
            vibrato,
        };
        factory_for(SynthMode::Additive).create_voice(engine, &ctx)
    }

    #[test]
    fn at_most_one_voice_per_note() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let mut registry = VoiceRegistry::new();

        let first = voice(&mut engine, &vibrato);
        let second = voice(&mut engine, &vibrato);
        assert!(registry.insert(NoteId(90), first).is_ok());
        assert!(registry.insert(NoteId(90), second).is_err());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(NoteId(90)));
    }

    #[test]
    fn keeps_press_order() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let mut registry = VoiceRegistry::new();

        for code in [88, 90, 83] {
            let v = voice(&mut engine, &vibrato);
            assert!(registry.insert(NoteId(code), v).is_ok());
        }
        registry.remove(NoteId(90));
        let ids: Vec<_> = registry.active_ids().collect();
        assert_eq!(ids, vec![NoteId(88), NoteId(83)]);
    }

    #[test]
    fn collect_waits_for_deadline() {
        let mut engine = GraphEngine::new(8_000.0);
        engine.resume();
        let vibrato = Vibrato::new(&mut engine, VibratoParams::default());
        let baseline = engine.node_count();
        let mut registry = VoiceRegistry::new();

        let v = voice(&mut engine, &vibrato);
        assert!(registry.insert(NoteId(90), v).is_ok());
        let mut v = registry.remove(NoteId(90)).unwrap();
        let envelope = Envelope::new(EnvelopeParams::default());
        let deadline = v.release(&mut engine, &envelope);
        assert_eq!(v.state(engine.current_time()), VoiceState::Releasing);
        registry.retire(NoteId(90), v, deadline);

        assert_eq!(registry.collect(&mut engine, deadline - 0.01), 0);
        assert_eq!(registry.releasing_len(), 1);
        assert_eq!(registry.collect(&mut engine, deadline), 1);
        assert_eq!(registry.releasing_len(), 0);
        assert_eq!(engine.node_count(), baseline);
    }
}
