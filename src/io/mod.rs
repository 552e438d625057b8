// Purpose - external interfaces: key layout and input routing

pub mod input;
pub mod keymap;

pub use input::{HoldGate, InputEvent, InputRouter};
pub use keymap::{FrequencyTable, KeySpec, NoteId, KEY_LAYOUT};
