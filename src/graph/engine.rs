//! In-process realization of [`AudioEngine`].
//!
//! `GraphEngine` renders a graph of oscillators, gain stages and constant
//! sources one sample at a time. Parameters follow their automation timeline
//! and may additionally be driven by other nodes (audio-rate modulation), so
//! AM, FM and vibrato are expressed purely as connections.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

#[cfg(feature = "rtrb")]
use rtrb::Producer;

use crate::{
    dsp::{
        automation::Automation,
        oscillator::{detune_ratio, OscillatorBlock, Waveform},
    },
    graph::node::{AudioEngine, NodeId, OutputState, ParamKind, ParamRef, Target, Teardown},
    MAX_BLOCK_SIZE,
};

/// Start/stop window of a source node.
#[derive(Debug, Clone, Copy, Default)]
struct Lifespan {
    start: Option<f64>,
    stop: Option<f64>,
}

impl Lifespan {
    fn is_playing(&self, time: f64) -> bool {
        match self.start {
            Some(start) => start <= time && self.stop.map_or(true, |stop| time < stop),
            None => false,
        }
    }
}

enum NodeKind {
    Oscillator {
        osc: OscillatorBlock,
        frequency: Automation,
        detune: Automation,
        life: Lifespan,
    },
    Gain {
        gain: Automation,
    },
    Constant {
        offset: Automation,
        life: Lifespan,
    },
    Destination,
}

impl NodeKind {
    fn param(&self, kind: ParamKind) -> Option<&Automation> {
        match (self, kind) {
            (NodeKind::Oscillator { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (NodeKind::Oscillator { detune, .. }, ParamKind::Detune) => Some(detune),
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(gain),
            (NodeKind::Constant { offset, .. }, ParamKind::Offset) => Some(offset),
            _ => None,
        }
    }

    fn param_mut(&mut self, kind: ParamKind) -> Option<&mut Automation> {
        match (self, kind) {
            (NodeKind::Oscillator { frequency, .. }, ParamKind::Frequency) => Some(frequency),
            (NodeKind::Oscillator { detune, .. }, ParamKind::Detune) => Some(detune),
            (NodeKind::Gain { gain }, ParamKind::Gain) => Some(gain),
            (NodeKind::Constant { offset, .. }, ParamKind::Offset) => Some(offset),
            _ => None,
        }
    }

    fn life_mut(&mut self) -> Option<&mut Lifespan> {
        match self {
            NodeKind::Oscillator { life, .. } | NodeKind::Constant { life, .. } => Some(life),
            _ => None,
        }
    }

    fn prune(&mut self, time: f64) {
        match self {
            NodeKind::Oscillator {
                frequency, detune, ..
            } => {
                frequency.prune_before(time);
                detune.prune_before(time);
            }
            NodeKind::Gain { gain } => gain.prune_before(time),
            NodeKind::Constant { offset, .. } => offset.prune_before(time),
            NodeKind::Destination => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    source: NodeId,
    target: Target,
}

impl Edge {
    fn target_node(&self) -> NodeId {
        match self.target {
            Target::Node(node) => node,
            Target::Param(param) => param.node,
        }
    }
}

/// Topologically ordered view of the graph, rebuilt whenever edges change.
struct RenderPlan {
    order: Vec<NodeId>,
    index: HashMap<NodeId, usize>,
    inputs: Vec<Vec<usize>>,
    param_inputs: Vec<Vec<(ParamKind, usize)>>,
}

impl RenderPlan {
    fn build(nodes: &HashMap<NodeId, NodeKind>, edges: &[Edge]) -> Self {
        let mut ids: Vec<NodeId> = nodes.keys().copied().collect();
        ids.sort_unstable();

        // Kahn's algorithm; anything caught in a cycle is appended afterwards
        // and reads its inputs one sample late.
        let mut in_degree: HashMap<NodeId, usize> = ids.iter().map(|id| (*id, 0)).collect();
        for edge in edges {
            *in_degree.entry(edge.target_node()).or_default() += 1;
        }

        let mut ready: VecDeque<NodeId> = ids
            .iter()
            .copied()
            .filter(|id| in_degree.get(id).copied() == Some(0))
            .collect();
        let mut order = Vec::with_capacity(ids.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for edge in edges.iter().filter(|e| e.source == id) {
                if let Some(degree) = in_degree.get_mut(&edge.target_node()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(edge.target_node());
                    }
                }
            }
        }
        if order.len() < ids.len() {
            let placed: HashSet<NodeId> = order.iter().copied().collect();
            order.extend(ids.iter().copied().filter(|id| !placed.contains(id)));
        }

        let index: HashMap<NodeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut inputs = vec![Vec::new(); order.len()];
        let mut param_inputs = vec![Vec::new(); order.len()];
        for edge in edges {
            let (Some(&src), Some(&dst)) =
                (index.get(&edge.source), index.get(&edge.target_node()))
            else {
                continue;
            };
            match edge.target {
                Target::Node(_) => inputs[dst].push(src),
                Target::Param(param) => param_inputs[dst].push((param.kind, src)),
            }
        }

        Self {
            order,
            index,
            inputs,
            param_inputs,
        }
    }
}

/// Sample-accurate audio graph renderer with a frame-counting clock.
pub struct GraphEngine {
    sample_rate: f64,
    frames: u64,
    state: OutputState,
    next_id: u32,
    destination: NodeId,
    nodes: HashMap<NodeId, NodeKind>,
    edges: Vec<Edge>,
    plan: Option<RenderPlan>,
    outputs: Vec<f32>,
    #[cfg(feature = "rtrb")]
    scope: Option<Producer<f32>>,
}

impl GraphEngine {
    pub fn new(sample_rate: f64) -> Self {
        let destination = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(destination, NodeKind::Destination);

        Self {
            sample_rate,
            frames: 0,
            state: OutputState::Suspended,
            next_id: 1,
            destination,
            nodes,
            edges: Vec::new(),
            plan: None,
            outputs: Vec::new(),
            #[cfg(feature = "rtrb")]
            scope: None,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Mirror every rendered output sample into a ring buffer (oscilloscope).
    ///
    /// Samples are dropped when the ring is full.
    #[cfg(feature = "rtrb")]
    pub fn set_scope(&mut self, tx: Producer<f32>) {
        self.scope = Some(tx);
    }

    /// Render mono output. A suspended engine writes silence and its clock
    /// does not move.
    pub fn render(&mut self, out: &mut [f32]) {
        if self.state == OutputState::Suspended {
            out.fill(0.0);
            return;
        }

        if self.plan.is_none() {
            self.plan = Some(RenderPlan::build(&self.nodes, &self.edges));
        }
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        self.outputs.resize(plan.order.len(), 0.0);
        let dest_idx = plan.index.get(&self.destination).copied();

        for sample in out.iter_mut() {
            let time = self.frames as f64 / self.sample_rate;

            for (pos, id) in plan.order.iter().enumerate() {
                let Some(node) = self.nodes.get_mut(id) else {
                    continue;
                };
                let outputs = &self.outputs;
                let audio_in: f32 = plan.inputs[pos].iter().map(|&i| outputs[i]).sum();
                let modulation = |kind: ParamKind| -> f32 {
                    plan.param_inputs[pos]
                        .iter()
                        .filter(|(k, _)| *k == kind)
                        .map(|&(_, i)| outputs[i])
                        .sum()
                };

                let value = match node {
                    NodeKind::Oscillator {
                        osc,
                        frequency,
                        detune,
                        life,
                    } => {
                        if life.is_playing(time) {
                            let hz = f64::from(
                                frequency.value_at(time) + modulation(ParamKind::Frequency),
                            );
                            let cents =
                                f64::from(detune.value_at(time) + modulation(ParamKind::Detune));
                            osc.next_sample(hz * detune_ratio(cents), self.sample_rate)
                        } else {
                            0.0
                        }
                    }
                    NodeKind::Gain { gain } => {
                        audio_in * (gain.value_at(time) + modulation(ParamKind::Gain))
                    }
                    NodeKind::Constant { offset, life } => {
                        if life.is_playing(time) {
                            offset.value_at(time) + modulation(ParamKind::Offset)
                        } else {
                            0.0
                        }
                    }
                    NodeKind::Destination => audio_in,
                };
                self.outputs[pos] = value;
            }

            *sample = dest_idx.map_or(0.0, |i| self.outputs[i]);
            self.frames += 1;
        }

        #[cfg(feature = "rtrb")]
        if let Some(tx) = self.scope.as_mut() {
            for &s in out.iter() {
                if tx.push(s).is_err() {
                    break;
                }
            }
        }

        let now = self.current_time();
        for node in self.nodes.values_mut() {
            node.prune(now);
        }
    }

    /// Render and discard `seconds` of audio, moving the clock forward.
    pub fn advance(&mut self, seconds: f64) {
        let mut frames = (seconds * self.sample_rate).round() as usize;
        let mut scratch = [0.0f32; MAX_BLOCK_SIZE];
        while frames > 0 && self.state == OutputState::Running {
            let n = frames.min(MAX_BLOCK_SIZE);
            self.render(&mut scratch[..n]);
            frames -= n;
        }
    }

    /// Effective value of a parameter at the last rendered sample: automation
    /// plus every signal connected into it.
    pub fn probe_param(&self, param: ParamRef) -> Option<f32> {
        let base = self.nodes.get(&param.node)?.param(param.kind)?;
        let time = self.frames.saturating_sub(1) as f64 / self.sample_rate;
        let mut value = base.value_at(time);

        if let Some(plan) = self.plan.as_ref() {
            if let Some(&pos) = plan.index.get(&param.node) {
                value += plan.param_inputs[pos]
                    .iter()
                    .filter(|(k, _)| *k == param.kind)
                    .map(|&(_, i)| self.outputs.get(i).copied().unwrap_or(0.0))
                    .sum::<f32>();
            }
        }
        Some(value)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn is_connected(&self, source: NodeId, target: Target) -> bool {
        self.edges.contains(&Edge { source, target })
    }

    /// Every signal feeding `target`.
    pub fn sources_into(&self, target: Target) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.target == target)
            .map(|e| e.source)
            .collect()
    }

    pub fn waveform(&self, node: NodeId) -> Option<Waveform> {
        match self.nodes.get(&node)? {
            NodeKind::Oscillator { osc, .. } => Some(osc.waveform()),
            _ => None,
        }
    }

    /// Whether a source node is producing output at the current time.
    pub fn is_playing(&self, node: NodeId) -> bool {
        let now = self.current_time();
        match self.nodes.get(&node) {
            Some(NodeKind::Oscillator { life, .. } | NodeKind::Constant { life, .. }) => {
                life.is_playing(now)
            }
            _ => false,
        }
    }

    /// Scheduled stop time of a source node, if any.
    pub fn stop_time(&self, node: NodeId) -> Option<f64> {
        match self.nodes.get(&node)? {
            NodeKind::Oscillator { life, .. } | NodeKind::Constant { life, .. } => life.stop,
            _ => None,
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, kind);
        self.plan = None;
        id
    }

    fn automation_mut(&mut self, param: ParamRef) -> Option<&mut Automation> {
        let automation = self
            .nodes
            .get_mut(&param.node)
            .and_then(|node| node.param_mut(param.kind));
        if automation.is_none() {
            tracing::trace!(node = %param.node, kind = ?param.kind, "automation on missing param");
        }
        automation
    }

    fn accepts(&self, target: Target) -> bool {
        match target {
            Target::Node(node) => matches!(
                self.nodes.get(&node),
                Some(NodeKind::Gain { .. } | NodeKind::Destination)
            ),
            Target::Param(param) => self
                .nodes
                .get(&param.node)
                .is_some_and(|node| node.param(param.kind).is_some()),
        }
    }
}

impl AudioEngine for GraphEngine {
    fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    fn output_state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) {
        self.state = OutputState::Running;
    }

    fn destination(&self) -> NodeId {
        self.destination
    }

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.alloc(NodeKind::Oscillator {
            osc: OscillatorBlock::new(waveform),
            frequency: Automation::new(frequency),
            detune: Automation::new(0.0),
            life: Lifespan::default(),
        })
    }

    fn create_gain(&mut self, gain: f32) -> NodeId {
        self.alloc(NodeKind::Gain {
            gain: Automation::new(gain),
        })
    }

    fn create_constant(&mut self, offset: f32) -> NodeId {
        self.alloc(NodeKind::Constant {
            offset: Automation::new(offset),
            life: Lifespan::default(),
        })
    }

    fn start(&mut self, node: NodeId) -> Teardown {
        let now = self.current_time();
        match self.nodes.get_mut(&node).and_then(NodeKind::life_mut) {
            Some(life) if life.start.is_none() => {
                life.start = Some(now);
                Teardown::Done
            }
            _ => Teardown::AlreadyAbsent,
        }
    }

    fn stop_at(&mut self, node: NodeId, time: f64) -> Teardown {
        match self.nodes.get_mut(&node).and_then(NodeKind::life_mut) {
            Some(life) if life.start.is_some() && life.stop.is_none() => {
                life.stop = Some(time);
                Teardown::Done
            }
            _ => {
                tracing::trace!(%node, "stop on stopped or missing source");
                Teardown::AlreadyAbsent
            }
        }
    }

    fn connect(&mut self, source: NodeId, target: Target) -> Teardown {
        let edge = Edge { source, target };
        if !self.nodes.contains_key(&source) || !self.accepts(target) || self.edges.contains(&edge)
        {
            return Teardown::AlreadyAbsent;
        }
        self.edges.push(edge);
        self.plan = None;
        Teardown::Done
    }

    fn disconnect(&mut self, source: NodeId, target: Target) -> Teardown {
        let edge = Edge { source, target };
        let before = self.edges.len();
        self.edges.retain(|e| *e != edge);
        if self.edges.len() == before {
            tracing::trace!(%source, ?target, "disconnect of absent edge");
            return Teardown::AlreadyAbsent;
        }
        self.plan = None;
        Teardown::Done
    }

    fn disconnect_all(&mut self, source: NodeId) -> Teardown {
        let before = self.edges.len();
        self.edges.retain(|e| e.source != source);
        if self.edges.len() == before {
            return Teardown::AlreadyAbsent;
        }
        self.plan = None;
        Teardown::Done
    }

    fn dispose(&mut self, node: NodeId) -> Teardown {
        if node == self.destination || self.nodes.remove(&node).is_none() {
            return Teardown::AlreadyAbsent;
        }
        self.edges
            .retain(|e| e.source != node && e.target_node() != node);
        self.plan = None;
        Teardown::Done
    }

    fn set_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.set_value_at(value, time);
        }
    }

    fn linear_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.linear_ramp_to(value, time);
        }
    }

    fn exponential_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.exponential_ramp_to(value, time);
        }
    }

    fn cancel_scheduled_values(&mut self, param: ParamRef, time: f64) {
        if let Some(automation) = self.automation_mut(param) {
            automation.cancel_from(time);
        }
    }

    fn param_value(&self, param: ParamRef) -> f32 {
        let now = self.current_time();
        self.nodes
            .get(&param.node)
            .and_then(|node| node.param(param.kind))
            .map_or(0.0, |automation| automation.value_at(now))
    }
}

/// Engine shared between the audio callback and the control thread.
///
/// The audio callback calls [`SharedEngine::render`]; the control side uses
/// the [`AudioEngine`] impl. Each call takes the lock briefly.
#[derive(Clone)]
pub struct SharedEngine(Arc<Mutex<GraphEngine>>);

impl SharedEngine {
    pub fn new(engine: GraphEngine) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }

    /// Lock the engine; a poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, GraphEngine> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn render(&self, out: &mut [f32]) {
        self.lock().render(out);
    }
}

impl AudioEngine for SharedEngine {
    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn output_state(&self) -> OutputState {
        self.lock().output_state()
    }

    fn resume(&mut self) {
        self.lock().resume();
    }

    fn destination(&self) -> NodeId {
        self.lock().destination()
    }

    fn create_oscillator(&mut self, waveform: Waveform, frequency: f32) -> NodeId {
        self.lock().create_oscillator(waveform, frequency)
    }

    fn create_gain(&mut self, gain: f32) -> NodeId {
        self.lock().create_gain(gain)
    }

    fn create_constant(&mut self, offset: f32) -> NodeId {
        self.lock().create_constant(offset)
    }

    fn start(&mut self, node: NodeId) -> Teardown {
        self.lock().start(node)
    }

    fn stop_at(&mut self, node: NodeId, time: f64) -> Teardown {
        self.lock().stop_at(node, time)
    }

    fn connect(&mut self, source: NodeId, target: Target) -> Teardown {
        self.lock().connect(source, target)
    }

    fn disconnect(&mut self, source: NodeId, target: Target) -> Teardown {
        self.lock().disconnect(source, target)
    }

    fn disconnect_all(&mut self, source: NodeId) -> Teardown {
        self.lock().disconnect_all(source)
    }

    fn dispose(&mut self, node: NodeId) -> Teardown {
        self.lock().dispose(node)
    }

    fn set_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        self.lock().set_value_at_time(param, value, time);
    }

    fn linear_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        self.lock().linear_ramp_to_value_at_time(param, value, time);
    }

    fn exponential_ramp_to_value_at_time(&mut self, param: ParamRef, value: f32, time: f64) {
        self.lock()
            .exponential_ramp_to_value_at_time(param, value, time);
    }

    fn cancel_scheduled_values(&mut self, param: ParamRef, time: f64) {
        self.lock().cancel_scheduled_values(param, time);
    }

    fn param_value(&self, param: ParamRef) -> f32 {
        self.lock().param_value(param)
    }
}
