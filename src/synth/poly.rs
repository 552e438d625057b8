use crate::{
    dsp::oscillator::Waveform,
    graph::{
        envelope::{Envelope, EnvelopeParams},
        lfo::{Vibrato, VibratoParams},
        node::{AudioEngine, NodeId, OutputState, ParamRef},
    },
    io::keymap::{FrequencyTable, NoteId},
    synth::{
        factory::{factory_for, polyphony_peak, VoiceCtx},
        message::SynthEvent,
        params::{clamp_partials, clamp_volume, AmParams, FmParams, SynthMode, SynthParams},
        registry::VoiceRegistry,
        voice::Voice,
    },
};

/// One playing session: the engine, the shared master and vibrato nodes,
/// the current control values and every live voice.
///
/// All graph work happens synchronously inside these calls; the engine
/// renders the result on its own clock. Call [`PolySynth::tick`] regularly
/// so released voices are freed once their tails end.
pub struct PolySynth<E: AudioEngine> {
    engine: E,
    params: SynthParams,
    table: FrequencyTable,
    master: Option<NodeId>,
    vibrato: Option<Vibrato>,
    registry: VoiceRegistry,
    events: Vec<SynthEvent>,
}

impl<E: AudioEngine> PolySynth<E> {
    pub fn new(engine: E, params: SynthParams) -> Self {
        Self {
            engine,
            params: params.clamped(),
            table: FrequencyTable::standard(),
            master: None,
            vibrato: None,
            registry: VoiceRegistry::new(),
            events: Vec::new(),
        }
    }

    /// Build the master gain and vibrato (first call only) and resume the
    /// engine. Returns `true` if output was not already running.
    pub fn start_output(&mut self) -> bool {
        if self.master.is_none() {
            let now = self.engine.current_time();
            let master = self.engine.create_gain(self.params.master_volume);
            self.engine
                .set_value_at_time(ParamRef::gain(master), self.params.master_volume, now);
            let destination = self.engine.destination();
            self.engine.connect(master, destination.into());
            self.master = Some(master);
        }
        if self.vibrato.is_none() {
            self.vibrato = Some(Vibrato::new(&mut self.engine, self.params.vibrato));
        }

        let was_running = self.is_running();
        self.engine.resume();
        if !was_running {
            tracing::info!(mode = %self.params.mode, "audio output started");
            self.events.push(SynthEvent::OutputStarted);
        }
        !was_running
    }

    pub fn is_running(&self) -> bool {
        self.master.is_some() && self.engine.output_state() == OutputState::Running
    }

    pub fn output_state(&self) -> OutputState {
        if self.is_running() {
            OutputState::Running
        } else {
            OutputState::Suspended
        }
    }

    /// Start a voice for `id`.
    ///
    /// Ignored (returns `false`) before output starts, for keys outside the
    /// frequency table, and for keys that already have a voice.
    pub fn note_on(&mut self, id: NoteId) -> bool {
        if !self.is_running() {
            tracing::trace!(%id, "note on ignored, output not running");
            return false;
        }
        let Some(frequency) = self.table.frequency(id) else {
            tracing::trace!(%id, "note on ignored, unknown key");
            return false;
        };
        if self.registry.contains(id) {
            tracing::trace!(%id, "note on ignored, already sounding");
            return false;
        }
        let (Some(master), Some(vibrato)) = (self.master, self.vibrato.as_ref()) else {
            return false;
        };

        let active = self.registry.len();
        let ctx = VoiceCtx {
            frequency,
            peak: polyphony_peak(active),
            params: self.params,
            envelope: Envelope::new(self.params.envelope),
            output: master,
            vibrato,
        };
        let voice = factory_for(self.params.mode).create_voice(&mut self.engine, &ctx);
        tracing::debug!(
            %id,
            mode = %self.params.mode,
            frequency,
            peak = ctx.peak,
            polyphony = active + 1,
            "voice started"
        );

        match self.registry.insert(id, voice) {
            Ok(()) => {
                self.events.push(SynthEvent::NoteOn(id));
                true
            }
            Err(mut voice) => {
                voice.teardown(&mut self.engine);
                false
            }
        }
    }

    /// Release the voice for `id`. Returns `false` if nothing was sounding.
    ///
    /// The key is removed from the registry now; its nodes are freed by a
    /// later [`PolySynth::tick`].
    pub fn note_off(&mut self, id: NoteId) -> bool {
        let Some(mut voice) = self.registry.remove(id) else {
            tracing::trace!(%id, "note off ignored, not sounding");
            return false;
        };

        let envelope = Envelope::new(self.params.envelope);
        let dispose_at = voice.release(&mut self.engine, &envelope);
        tracing::debug!(
            %id,
            release = envelope.params().release,
            dispose_at,
            "voice released"
        );
        self.registry.retire(id, voice, dispose_at);
        self.events.push(SynthEvent::NoteOff(id));
        true
    }

    /// Release every held voice. Returns how many were released.
    pub fn all_notes_off(&mut self) -> usize {
        let held: Vec<NoteId> = self.registry.active_ids().collect();
        held.into_iter().filter(|&id| self.note_off(id)).count()
    }

    /// Switch the factory used for new notes, releasing held voices first.
    ///
    /// Returns `false` (and leaves voices alone) if `mode` is already active.
    pub fn set_mode(&mut self, mode: SynthMode) -> bool {
        if mode == self.params.mode {
            return false;
        }
        let flushed = self.all_notes_off();
        tracing::debug!(from = %self.params.mode, to = %mode, flushed, "mode changed");
        self.params.mode = mode;
        self.events.push(SynthEvent::ModeChanged(mode));
        true
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.params.waveform = waveform;
    }

    pub fn set_partials(&mut self, partials: u32) {
        self.params.partials = clamp_partials(partials);
    }

    pub fn set_envelope(&mut self, envelope: EnvelopeParams) {
        self.params.envelope = envelope.clamped();
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.params.master_volume = clamp_volume(volume);
        if let Some(master) = self.master {
            let now = self.engine.current_time();
            self.engine
                .set_value_at_time(ParamRef::gain(master), self.params.master_volume, now);
        }
    }

    /// Update AM settings for new notes and for AM voices already sounding.
    ///
    /// Unlike waveform, partials and envelope, which only reach notes built
    /// after the change, this also retunes held AM notes in place.
    pub fn set_am(&mut self, am: AmParams) {
        self.params.am = am.clamped();
        self.retune(SynthMode::Am);
    }

    /// Update FM settings for new notes and for FM voices already sounding.
    ///
    /// Unlike waveform, partials and envelope, which only reach notes built
    /// after the change, this also retunes held FM notes in place.
    pub fn set_fm(&mut self, fm: FmParams) {
        self.params.fm = fm.clamped();
        self.retune(SynthMode::Fm);
    }

    pub fn set_vibrato_enabled(&mut self, enabled: bool) {
        self.params.vibrato.enabled = enabled;
        if let Some(vibrato) = self.vibrato.as_mut() {
            vibrato.set_enabled(&mut self.engine, enabled);
        }
    }

    pub fn set_vibrato_rate(&mut self, rate: f32) {
        self.params.vibrato = VibratoParams {
            rate,
            ..self.params.vibrato
        }
        .clamped();
        if let Some(vibrato) = self.vibrato.as_mut() {
            vibrato.set_rate(&mut self.engine, self.params.vibrato.rate);
        }
    }

    pub fn set_vibrato_depth(&mut self, cents: f32) {
        self.params.vibrato = VibratoParams {
            depth: cents,
            ..self.params.vibrato
        }
        .clamped();
        if let Some(vibrato) = self.vibrato.as_mut() {
            vibrato.set_depth(&mut self.engine, self.params.vibrato.depth);
        }
    }

    /// Free voices whose release tails have ended. Returns how many.
    pub fn tick(&mut self) -> usize {
        let now = self.engine.current_time();
        self.registry.collect(&mut self.engine, now)
    }

    /// Held keys in press order, or `(none)`.
    pub fn pressed_labels(&self) -> String {
        let labels: Vec<String> = self
            .registry
            .active_ids()
            .map(|id| {
                self.table
                    .label(id)
                    .map_or_else(|| id.to_string(), String::from)
            })
            .collect();
        if labels.is_empty() {
            "(none)".to_string()
        } else {
            labels.join(", ")
        }
    }

    pub fn pressed(&self) -> Vec<NoteId> {
        self.registry.active_ids().collect()
    }

    pub fn is_pressed(&self, id: NoteId) -> bool {
        self.registry.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.registry.len()
    }

    pub fn releasing_count(&self) -> usize {
        self.registry.releasing_len()
    }

    pub fn voice(&self, id: NoteId) -> Option<&dyn Voice> {
        self.registry.get(id)
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    pub fn table(&self) -> FrequencyTable {
        self.table
    }

    pub fn master(&self) -> Option<NodeId> {
        self.master
    }

    pub fn vibrato(&self) -> Option<&Vibrato> {
        self.vibrato.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Take the notifications raised since the last call.
    pub fn drain_events(&mut self) -> Vec<SynthEvent> {
        std::mem::take(&mut self.events)
    }

    fn retune(&mut self, mode: SynthMode) {
        let params = self.params;
        for voice in self.registry.sounding_mut() {
            if voice.mode() == mode {
                voice.retune(&mut self.engine, &params);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::engine::GraphEngine, synth::params::MAX_PARTIALS};

    const Z: NoteId = NoteId(90);
    const X: NoteId = NoteId(88);

    fn running() -> PolySynth<GraphEngine> {
        let mut synth = PolySynth::new(GraphEngine::new(8_000.0), SynthParams::default());
        synth.start_output();
        synth
    }

    #[test]
    fn ignores_notes_before_output_starts() {
        let mut synth = PolySynth::new(GraphEngine::new(8_000.0), SynthParams::default());
        assert!(!synth.note_on(Z));
        assert_eq!(synth.active_count(), 0);
        assert!(synth.master().is_none());
        assert_eq!(synth.output_state(), OutputState::Suspended);
    }

    #[test]
    fn start_output_is_lazy_and_once() {
        let mut synth = PolySynth::new(GraphEngine::new(8_000.0), SynthParams::default());
        let before = synth.engine().node_count();
        assert!(synth.start_output());
        let after = synth.engine().node_count();
        assert_eq!(after, before + 3);
        assert!(!synth.start_output());
        assert_eq!(synth.engine().node_count(), after);
        assert_eq!(synth.drain_events(), vec![SynthEvent::OutputStarted]);
    }

    #[test]
    fn duplicate_and_unknown_notes() {
        let mut synth = running();
        assert!(synth.note_on(Z));
        let nodes = synth.engine().node_count();
        assert!(!synth.note_on(Z));
        assert!(!synth.note_on(NoteId(65)));
        assert_eq!(synth.engine().node_count(), nodes);
        assert_eq!(synth.active_count(), 1);

        assert!(!synth.note_off(X));
        assert!(synth.note_off(Z));
        assert!(!synth.note_off(Z));
    }

    #[test]
    fn pressed_labels_follow_press_order() {
        let mut synth = running();
        assert_eq!(synth.pressed_labels(), "(none)");
        synth.note_on(X);
        synth.note_on(Z);
        assert_eq!(synth.pressed_labels(), "X, Z");
        synth.note_off(X);
        assert_eq!(synth.pressed_labels(), "Z");
    }

    #[test]
    fn mode_change_flushes_only_on_change() {
        let mut synth = running();
        synth.note_on(Z);
        synth.note_on(X);
        assert!(!synth.set_mode(SynthMode::Additive));
        assert_eq!(synth.active_count(), 2);

        assert!(synth.set_mode(SynthMode::Fm));
        assert_eq!(synth.active_count(), 0);
        assert_eq!(synth.releasing_count(), 2);

        synth.note_on(Z);
        assert_eq!(synth.voice(Z).map(|v| v.mode()), Some(SynthMode::Fm));
    }

    #[test]
    fn tick_frees_tails() {
        let mut synth = running();
        let baseline = synth.engine().node_count();
        synth.note_on(Z);
        synth.note_off(Z);

        synth.engine_mut().advance(0.2);
        assert_eq!(synth.tick(), 0);
        synth.engine_mut().advance(0.25);
        assert_eq!(synth.tick(), 1);
        assert_eq!(synth.releasing_count(), 0);
        assert_eq!(synth.engine().node_count(), baseline);
    }

    #[test]
    fn master_volume_is_live() {
        let mut synth = running();
        synth.set_master_volume(1.5);
        let master = synth.master().unwrap();
        assert_eq!(synth.params().master_volume, 1.0);
        assert_eq!(synth.engine().param_value(ParamRef::gain(master)), 1.0);
    }

    #[test]
    fn setters_reject_nan_and_cap_partials() {
        let mut synth = running();
        synth.set_master_volume(f32::NAN);
        synth.set_vibrato_rate(f32::NAN);
        synth.set_partials(u32::MAX);
        assert_eq!(synth.params().partials, MAX_PARTIALS);

        let master = synth.master().unwrap();
        assert_eq!(synth.engine().param_value(ParamRef::gain(master)), 0.5);
        let lfo = synth.vibrato().unwrap().oscillator();
        assert!(synth.engine().param_value(ParamRef::frequency(lfo)).is_finite());

        synth.note_on(Z);
        let mut block = [0.0f32; 256];
        synth.engine_mut().render(&mut block);
        assert!(block.iter().all(|s| s.is_finite()));
    }
}
