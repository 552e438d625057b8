//! Routing raw key and mouse events into a [`PolySynth`].

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::{graph::node::AudioEngine, io::keymap::NoteId, synth::poly::PolySynth};

/// A raw input event already resolved to a piano key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(NoteId),
    KeyUp(NoteId),
    MouseDown(NoteId),
    MouseUp(NoteId),
    /// The pointer left a key while the button was held.
    MouseLeave(NoteId),
}

impl InputEvent {
    pub fn note(&self) -> NoteId {
        match *self {
            InputEvent::KeyDown(id)
            | InputEvent::KeyUp(id)
            | InputEvent::MouseDown(id)
            | InputEvent::MouseUp(id)
            | InputEvent::MouseLeave(id) => id,
        }
    }
}

/// Turns input events into note-on/note-off calls.
///
/// Keys outside the frequency table are dropped here. Mouse input is ignored
/// entirely while output is not running; key input goes through and is
/// rejected by the session itself.
#[derive(Debug, Default)]
pub struct InputRouter;

impl InputRouter {
    pub fn new() -> Self {
        Self
    }

    /// Returns whether the event changed the set of sounding notes.
    pub fn route<E: AudioEngine>(&mut self, synth: &mut PolySynth<E>, event: InputEvent) -> bool {
        let id = event.note();
        if !synth.table().contains(id) {
            tracing::trace!(%id, "input for unmapped key");
            return false;
        }

        match event {
            InputEvent::KeyDown(id) => synth.note_on(id),
            InputEvent::KeyUp(id) => synth.note_off(id),
            InputEvent::MouseDown(_) | InputEvent::MouseUp(_) | InputEvent::MouseLeave(_)
                if !synth.is_running() =>
            {
                false
            }
            InputEvent::MouseDown(id) => synth.note_on(id),
            InputEvent::MouseUp(id) | InputEvent::MouseLeave(id) => synth.note_off(id),
        }
    }
}

/// Synthesizes key releases for terminals that only report presses.
///
/// A press holds the key for `initial` (long enough to cover the OS delay
/// before auto-repeat starts); each repeat press extends it by `repeat`. A
/// key whose hold runs out is reported by [`HoldGate::expired`].
#[derive(Debug)]
pub struct HoldGate {
    initial: Duration,
    repeat: Duration,
    held: HashMap<NoteId, Instant>,
}

impl Default for HoldGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(600), Duration::from_millis(120))
    }
}

impl HoldGate {
    pub fn new(initial: Duration, repeat: Duration) -> Self {
        Self {
            initial,
            repeat,
            held: HashMap::new(),
        }
    }

    /// Record a press. Returns `true` for a fresh press, `false` for a
    /// repeat of a key already held.
    pub fn press(&mut self, id: NoteId, now: Instant) -> bool {
        match self.held.get_mut(&id) {
            Some(deadline) => {
                *deadline = (*deadline).max(now + self.repeat);
                false
            }
            None => {
                self.held.insert(id, now + self.initial);
                true
            }
        }
    }

    /// Forget a key (explicit release). Returns whether it was held.
    pub fn release(&mut self, id: NoteId) -> bool {
        self.held.remove(&id).is_some()
    }

    /// Remove and return every key whose hold ran out by `now`.
    pub fn expired(&mut self, now: Instant) -> Vec<NoteId> {
        let mut gone: Vec<NoteId> = self
            .held
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        gone.sort_unstable();
        for id in &gone {
            self.held.remove(id);
        }
        gone
    }

    pub fn is_held(&self, id: NoteId) -> bool {
        self.held.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{graph::engine::GraphEngine, synth::params::SynthParams};

    const Z: NoteId = NoteId(90);

    #[test]
    fn mouse_ignored_until_running() {
        let mut synth = PolySynth::new(GraphEngine::new(8_000.0), SynthParams::default());
        let mut router = InputRouter::new();

        assert!(!router.route(&mut synth, InputEvent::MouseDown(Z)));
        synth.start_output();
        assert!(router.route(&mut synth, InputEvent::MouseDown(Z)));
        assert!(router.route(&mut synth, InputEvent::MouseLeave(Z)));
        assert!(!router.route(&mut synth, InputEvent::MouseUp(Z)));
    }

    #[test]
    fn keys_map_to_notes() {
        let mut synth = PolySynth::new(GraphEngine::new(8_000.0), SynthParams::default());
        synth.start_output();
        let mut router = InputRouter::new();

        assert!(router.route(&mut synth, InputEvent::KeyDown(Z)));
        assert!(!router.route(&mut synth, InputEvent::KeyDown(Z)));
        assert!(!router.route(&mut synth, InputEvent::KeyDown(NoteId(65))));
        assert!(router.route(&mut synth, InputEvent::KeyUp(Z)));
        assert_eq!(synth.active_count(), 0);
    }

    #[test]
    fn hold_gate_extends_on_repeat() {
        let mut gate = HoldGate::new(Duration::from_millis(500), Duration::from_millis(100));
        let t0 = Instant::now();

        assert!(gate.press(Z, t0));
        assert!(!gate.press(Z, t0 + Duration::from_millis(450)));
        assert!(gate.expired(t0 + Duration::from_millis(520)).is_empty());
        assert!(!gate.press(Z, t0 + Duration::from_millis(520)));
        assert_eq!(gate.expired(t0 + Duration::from_millis(640)), vec![Z]);
        assert!(!gate.is_held(Z));
    }

    #[test]
    fn explicit_release_clears_hold() {
        let mut gate = HoldGate::default();
        let t0 = Instant::now();
        gate.press(Z, t0);
        assert!(gate.release(Z));
        assert!(!gate.release(Z));
        assert!(gate.expired(t0 + Duration::from_secs(5)).is_empty());
    }
}
