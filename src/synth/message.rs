use crate::{io::keymap::NoteId, synth::params::SynthMode};

/// Notifications raised by the session for the UI (key highlights, pressed
/// set, status indicator).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SynthEvent {
    NoteOn(NoteId),
    NoteOff(NoteId),
    OutputStarted,
    ModeChanged(SynthMode),
}
