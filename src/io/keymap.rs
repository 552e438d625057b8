//! Computer-keyboard piano layout.
//!
//! Two octaves starting at middle C: the bottom letter row plays C4-B4 with
//! sharps on the home row, the top letter row plays C5-B5 with sharps on the
//! number row. Keys are identified by their ASCII key code (`'Z'` is 90).

use std::{fmt, str::FromStr};

use crate::error::SynthError;

/// Identifier of a physical key, the registry's lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteId(pub u16);

impl NoteId {
    /// Key code for a printable key; letters are case-insensitive.
    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        c.is_ascii_graphic().then(|| NoteId(c as u16))
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u16>()
            .map(NoteId)
            .map_err(|_| SynthError::InvalidNote(s.to_string()))
    }
}

/// One key of the on-screen piano.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpec {
    pub id: NoteId,
    /// Character printed on the key (and typed to play it)
    pub label: char,
    /// Pitch class, e.g. `"C#"`
    pub note: &'static str,
    pub black: bool,
    /// Equal-tempered frequency, A4 = 440 Hz
    pub frequency: f32,
}

const fn key(code: u16, note: &'static str, black: bool, frequency: f32) -> KeySpec {
    KeySpec {
        id: NoteId(code),
        label: code as u8 as char,
        note,
        black,
        frequency,
    }
}

#[rustfmt::skip]
pub static KEY_LAYOUT: [KeySpec; 24] = [
    // C4 octave
    key(90, "C",  false, 261.625_57),  // Z
    key(83, "C#", true,  277.182_63),  // S
    key(88, "D",  false, 293.664_76),  // X
    key(68, "D#", true,  311.126_98),  // D
    key(67, "E",  false, 329.627_56),  // C
    key(86, "F",  false, 349.228_23),  // V
    key(71, "F#", true,  369.994_42),  // G
    key(66, "G",  false, 391.995_44),  // B
    key(72, "G#", true,  415.304_7),   // H
    key(78, "A",  false, 440.0),       // N
    key(74, "A#", true,  466.163_76),  // J
    key(77, "B",  false, 493.883_3),   // M
    // C5 octave
    key(81, "C",  false, 523.251_13),  // Q
    key(50, "C#", true,  554.365_26),  // 2
    key(87, "D",  false, 587.329_5),   // W
    key(51, "D#", true,  622.253_97),  // 3
    key(69, "E",  false, 659.255_1),   // E
    key(82, "F",  false, 698.456_46),  // R
    key(53, "F#", true,  739.988_8),   // 5
    key(84, "G",  false, 783.990_9),   // T
    key(54, "G#", true,  830.609_4),   // 6
    key(89, "A",  false, 880.0),       // Y
    key(55, "A#", true,  932.327_5),   // 7
    key(85, "B",  false, 987.766_6),   // U
];

/// Static mapping from key to fundamental frequency.
#[derive(Debug, Clone, Copy)]
pub struct FrequencyTable {
    keys: &'static [KeySpec],
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl FrequencyTable {
    /// The two-octave layout in [`KEY_LAYOUT`].
    pub fn standard() -> Self {
        Self { keys: &KEY_LAYOUT }
    }

    pub fn new(keys: &'static [KeySpec]) -> Self {
        Self { keys }
    }

    pub fn spec(&self, id: NoteId) -> Option<&'static KeySpec> {
        self.keys.iter().find(|k| k.id == id)
    }

    pub fn frequency(&self, id: NoteId) -> Option<f32> {
        self.spec(id).map(|k| k.frequency)
    }

    pub fn label(&self, id: NoteId) -> Option<char> {
        self.spec(id).map(|k| k.label)
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.spec(id).is_some()
    }

    /// Keys in layout order (left to right on the piano).
    pub fn keys(&self) -> &'static [KeySpec] {
        self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_two_chromatic_octaves() {
        let table = FrequencyTable::standard();
        assert_eq!(table.keys().len(), 24);
        assert_eq!(table.keys().iter().filter(|k| k.black).count(), 10);

        for pair in table.keys().windows(2) {
            let ratio = pair[1].frequency / pair[0].frequency;
            assert!((ratio - 2f32.powf(1.0 / 12.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn lookup_by_code() {
        let table = FrequencyTable::standard();
        let z = NoteId::from_char('z').unwrap();
        assert_eq!(z, NoteId(90));
        assert!((table.frequency(z).unwrap() - 261.625_57).abs() < 1e-3);
        assert_eq!(table.label(NoteId(50)), Some('2'));
        assert_eq!(table.spec(NoteId(78)).unwrap().frequency, 440.0);
        assert!(!table.contains(NoteId(65)));
        assert_eq!(table.frequency(NoteId(65)), None);
    }

    #[test]
    fn parses_codes() {
        assert_eq!("90".parse::<NoteId>().unwrap(), NoteId(90));
        assert!(matches!(
            "z".parse::<NoteId>(),
            Err(SynthError::InvalidNote(s)) if s == "z"
        ));
        assert_eq!(NoteId(90).to_string(), "90");
    }
}
