use crate::{
    graph::{
        envelope::{Envelope, FLOOR},
        lfo::Vibrato,
        node::{AudioEngine, NodeId, ParamRef, Teardown},
    },
    synth::params::{SynthMode, SynthParams},
};

/// Sources stop this long after the release ramp reaches the floor.
pub const STOP_MARGIN: f64 = 0.03;

/// Internal nodes are disconnected and freed this long after release ends.
pub const DISPOSE_MARGIN: f64 = 0.1;

/// Lifecycle of a voice, derived from the engine clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Attacking, // Ramping from the floor to peak
    Decaying,  // Ramping from peak to sustain
    Sustaining,
    Releasing, // Key released, tail ringing out until disposal
    Disposed,  // Nodes freed; nothing left in the engine
}

/// Nodes and edges owned by one voice, plus its lifecycle timestamps.
///
/// Every variant builds its oscillators and gain stages through this, so
/// release and teardown are written once.
#[derive(Debug)]
pub struct VoiceGraph {
    voice_gain: NodeId,
    sources: Vec<NodeId>,
    nodes: Vec<NodeId>,
    vibrato_edges: Vec<(NodeId, ParamRef)>,
    started_at: f64,
    attack_end: f64,
    decay_end: f64,
    released_at: Option<f64>,
    dispose_at: Option<f64>,
    disposed: bool,
}

impl VoiceGraph {
    /// Create the voice gain stage (held at the floor) feeding `output`.
    pub fn new(engine: &mut dyn AudioEngine, output: NodeId) -> Self {
        let now = engine.current_time();
        let voice_gain = engine.create_gain(FLOOR);
        engine.set_value_at_time(ParamRef::gain(voice_gain), FLOOR, now);
        engine.connect(voice_gain, output.into());

        Self {
            voice_gain,
            sources: Vec::new(),
            nodes: vec![voice_gain],
            vibrato_edges: Vec::new(),
            started_at: now,
            attack_end: now,
            decay_end: now,
            released_at: None,
            dispose_at: None,
            disposed: false,
        }
    }

    /// Gain stage the envelope drives.
    pub fn voice_gain(&self) -> NodeId {
        self.voice_gain
    }

    /// Register an oscillator or constant source owned by this voice.
    pub fn add_source(&mut self, node: NodeId) {
        self.sources.push(node);
        self.nodes.push(node);
    }

    /// Register a non-source node owned by this voice.
    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.push(node);
    }

    /// Fan the shared vibrato into one of this voice's detune inputs.
    pub fn attach_vibrato(
        &mut self,
        engine: &mut dyn AudioEngine,
        vibrato: &Vibrato,
        detune: ParamRef,
    ) {
        if vibrato.attach(engine, detune).is_done() {
            self.vibrato_edges.push((vibrato.output(), detune));
        }
    }

    /// Schedule the envelope's attack/decay on the voice gain.
    pub fn attack(&mut self, engine: &mut dyn AudioEngine, envelope: &Envelope, peak: f32) {
        self.started_at = engine.current_time();
        self.attack_end = self.started_at + envelope.params().attack;
        self.decay_end = envelope.attack(engine, ParamRef::gain(self.voice_gain), peak);
    }

    pub fn start_sources(&self, engine: &mut dyn AudioEngine) {
        for &node in &self.sources {
            engine.start(node);
        }
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn vibrato_targets(&self) -> impl Iterator<Item = ParamRef> + '_ {
        self.vibrato_edges.iter().map(|(_, detune)| *detune)
    }

    pub fn state(&self, now: f64) -> VoiceState {
        if self.disposed {
            VoiceState::Disposed
        } else if self.released_at.is_some() {
            VoiceState::Releasing
        } else if now < self.attack_end {
            VoiceState::Attacking
        } else if now < self.decay_end {
            VoiceState::Decaying
        } else {
            VoiceState::Sustaining
        }
    }

    /// Ramp to the floor, unhook the vibrato and schedule every source to
    /// stop after the tail.
    ///
    /// Returns the engine time at which the voice may be torn down. A second
    /// call returns the same deadline without touching the graph.
    pub fn release(&mut self, engine: &mut dyn AudioEngine, envelope: &Envelope) -> f64 {
        if let Some(dispose_at) = self.dispose_at {
            return dispose_at;
        }

        let release = envelope.release(engine, ParamRef::gain(self.voice_gain));
        self.detach_vibrato(engine);
        let now = engine.current_time();
        let stop_at = now + release + STOP_MARGIN;
        for &node in &self.sources {
            engine.stop_at(node, stop_at);
        }

        let dispose_at = now + release + DISPOSE_MARGIN;
        self.released_at = Some(now);
        self.dispose_at = Some(dispose_at);
        dispose_at
    }

    /// Remove vibrato edges, disconnect and free every owned node.
    ///
    /// Safe to call any number of times; returns how many nodes were freed.
    pub fn teardown(&mut self, engine: &mut dyn AudioEngine) -> usize {
        if self.disposed {
            return 0;
        }

        self.detach_vibrato(engine);
        let mut freed = 0;
        for &node in &self.nodes {
            engine.disconnect_all(node);
            if engine.dispose(node) == Teardown::Done {
                freed += 1;
            }
        }
        self.disposed = true;
        freed
    }

    fn detach_vibrato(&mut self, engine: &mut dyn AudioEngine) {
        for (lfo, detune) in self.vibrato_edges.drain(..) {
            engine.disconnect(lfo, detune.into());
        }
    }
}

/// One sounding (or releasing) note.
///
/// The three variants differ only in how they wire their graph; release and
/// teardown go through the shared [`VoiceGraph`].
pub trait Voice: Send {
    fn mode(&self) -> SynthMode;

    fn graph(&self) -> &VoiceGraph;

    fn graph_mut(&mut self) -> &mut VoiceGraph;

    /// Push live modulator settings into the running graph.
    ///
    /// Default implementation does nothing (structural parameters only).
    fn retune(&mut self, _engine: &mut dyn AudioEngine, _params: &SynthParams) {
        // Default: do nothing
    }

    /// Start the release tail. Returns the teardown deadline.
    fn release(&mut self, engine: &mut dyn AudioEngine, envelope: &Envelope) -> f64 {
        self.graph_mut().release(engine, envelope)
    }

    /// Free every node this voice owns. Idempotent.
    fn teardown(&mut self, engine: &mut dyn AudioEngine) -> usize {
        self.graph_mut().teardown(engine)
    }

    fn state(&self, now: f64) -> VoiceState {
        self.graph().state(now)
    }
}
