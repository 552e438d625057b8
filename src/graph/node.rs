use std::fmt;

use crate::dsp::oscillator::Waveform;

/// Handle to a node living inside an [`AudioEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Controllable parameters exposed by engine nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Oscillator frequency in Hz
    Frequency,
    /// Oscillator detune in cents (100 cents = 1 semitone)
    Detune,
    /// Gain stage multiplier
    Gain,
    /// Constant source output value
    Offset,
}

/// A specific parameter on a specific node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeId,
    pub kind: ParamKind,
}

impl ParamRef {
    pub fn frequency(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Frequency,
        }
    }

    pub fn detune(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Detune,
        }
    }

    pub fn gain(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Gain,
        }
    }

    pub fn offset(node: NodeId) -> Self {
        Self {
            node,
            kind: ParamKind::Offset,
        }
    }
}

/// Where a connection lands: another node's audio input, or a parameter.
///
/// Signals connected to a parameter are summed onto its automation value
/// every sample (audio-rate modulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Node(NodeId),
    Param(ParamRef),
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl From<ParamRef> for Target {
    fn from(param: ParamRef) -> Self {
        Target::Param(param)
    }
}

/// Outcome of an idempotent graph operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// The operation changed the graph.
    Done,
    /// Nothing to do: the edge, node or scheduled stop was already gone.
    AlreadyAbsent,
}

impl Teardown {
    pub fn is_done(self) -> bool {
        matches!(self, Teardown::Done)
    }
}

/// Whether the output context is rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputState {
    /// Created but not yet started by the user; clock frozen, output silent.
    #[default]
    Suspended,
    Running,
}

impl fmt::Display for OutputState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputState::Suspended => f.write_str("stopped"),
            OutputState::Running => f.write_str("running"),
        }
    }
}

/// Capability set the synthesizer needs from an audio engine.
///
/// The engine mixes continuous signal nodes on its own clock; everything here
/// is a control-side operation that takes effect on that clock. The trait is
/// object safe so voices can be built against `&mut dyn AudioEngine`.
///
/// Teardown operations are idempotent: repeating them, or aiming them at a
/// node that was already disposed, reports [`Teardown::AlreadyAbsent`] rather
/// than failing.
pub trait AudioEngine {
    /// Monotonic clock in seconds.
    fn current_time(&self) -> f64;

    fn output_state(&self) -> OutputState;

    /// Start (or resume) rendering.
    fn resume(&mut self);

    /// The node every audible chain must eventually reach.
    fn destination(&self) -> NodeId;

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId;

    fn create_gain(&mut self, gain: f32) -> NodeId;

    fn create_constant(&mut self, offset: f32) -> NodeId;

    /// Start a source node now.
    fn start(&mut self, node: NodeId) -> Teardown;

    /// Schedule a source node to fall silent at `time`.
    fn stop_at(&mut self, node: NodeId, time: f64) -> Teardown;

    fn connect(&mut self, source: NodeId, target: Target) -> Teardown;

    fn disconnect(&mut self, source: NodeId, target: Target) -> Teardown;

    /// Remove every outgoing connection of `source`.
    fn disconnect_all(&mut self, source: NodeId) -> Teardown;

    /// Free a node and every edge touching it.
    fn dispose(&mut self, node: NodeId) -> Teardown;

    fn set_value_at_time(&mut self, param: ParamRef, value: f32, time: f64);

    fn linear_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64);

    fn exponential_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64);

    fn cancel_scheduled_values(&mut self, param: ParamRef, time: f64);

    /// Intrinsic (automation) value of a parameter at the current time,
    /// excluding any audio-rate input connected to it.
    fn param_value(&self, param: ParamRef) -> f32;
}
