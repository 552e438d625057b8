//! Time-stamped parameter automation.

/*
Parameter Automation
====================

A parameter (gain, frequency, detune, offset) is not a single number but a
timeline of events. Each event says "by time T the value is V" and how to get
there from the previous event:

    Set           jump to V at T, hold until the next event
    Linear        straight line from the previous event to (T, V)
    Exponential   geometric curve from the previous event to (T, V)

  value
    │            ╭──────────╮
    │          ╱             ╲___________
    │        ╱                           ╲
    │  ____╱                               ╲____
    └──┴────┴──────┴──────────────┴──────────┴───→ time
      Set   Exp    Exp           Set        Exp
     floor  peak   sustain     (anchor)    floor

Exponential ramps are what make envelopes sound natural, but they have a
catch: the curve is

    v(t) = v0 · (v1 / v0)^((t - t0) / (t1 - t0))

which is undefined when either endpoint is zero or when the endpoints have
different signs. In that case the previous value is held until T, then the
value jumps. Envelopes avoid this by never targeting exactly zero (see the
floor in `graph::envelope`).

Cancelling
----------

`cancel_from(T)` drops every event at or after T. Whatever ramp was in flight
loses its target, so the value snaps back to the last surviving event. Callers
that want a smooth hand-off read the current value FIRST, cancel, then
re-anchor with a Set at the current time.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationEvent {
    pub time: f64,
    pub value: f32,
    pub kind: RampKind,
}

/// Automation timeline for a single parameter.
#[derive(Debug, Clone)]
pub struct Automation {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl Automation {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent {
            time,
            value,
            kind: RampKind::Set,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent {
            time: end_time,
            value,
            kind: RampKind::Linear,
        });
    }

    pub fn exponential_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent {
            time: end_time,
            value,
            kind: RampKind::Exponential,
        });
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    /// Intrinsic value of the parameter at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let next_idx = self.events.partition_point(|e| e.time <= time);

        let Some(next) = self.events.get(next_idx) else {
            return self.events.last().map_or(self.default_value, |e| e.value);
        };

        let (t0, v0) = match next_idx.checked_sub(1) {
            Some(prev) => (self.events[prev].time, self.events[prev].value),
            None => (0.0, self.default_value),
        };

        if time < t0 {
            return v0;
        }

        let span = next.time - t0;
        if span <= 0.0 {
            return next.value;
        }
        let progress = (time - t0) / span;

        match next.kind {
            RampKind::Set => v0,
            RampKind::Linear => v0 + (next.value - v0) * progress as f32,
            RampKind::Exponential => {
                let same_sign = (v0 > 0.0 && next.value > 0.0) || (v0 < 0.0 && next.value < 0.0);
                if same_sign {
                    let ratio = f64::from(next.value) / f64::from(v0);
                    (f64::from(v0) * ratio.powf(progress)) as f32
                } else {
                    v0
                }
            }
        }
    }

    /// Forget events that can no longer influence values at or after `time`.
    ///
    /// The last event at or before `time` is kept as the anchor for whatever
    /// ramp follows it.
    pub fn prune_before(&mut self, time: f64) {
        let passed = self.events.partition_point(|e| e.time <= time);
        if passed > 1 {
            self.events.drain(..passed - 1);
        }
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    fn insert(&mut self, event: AutomationEvent) {
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }
}
