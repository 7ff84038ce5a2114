//! # Pitches and Dynamics
//!
//! ## Pitch
//! A pitch is a semitone ordinal on the recorder's keyboard range. Ordinal `0` is
//! reserved for silence, so a note's pitch is an `Option<Pitch>` where `None`
//! is a rest. Ordinals `1..=62` cover C2 (MIDI 36) to C#7 (MIDI 97):
//!
//! ```text
//! ordinal:  1    2     3  ...  25   ...  62
//! name:     C2   C#2   D2 ...  C4   ...  C#7
//! midi:     36   37    38 ...  60   ...  97
//! ```
//!
//! The ordinal is what the save file stores.
//!
//! ## Velocity
//! Named dynamics from silent to ffff on the 0..=127 MIDI velocity scale.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecitalError;

/// Offset between a pitch ordinal and its MIDI note number.
const MIDI_OFFSET: u8 = 35;

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A sounding pitch on the keyboard range (never a rest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Pitch(u8);

impl Pitch {
    /// C2, the lowest key.
    pub const LOWEST: Pitch = Pitch(1);
    /// C#7, the highest pitch a note can be dragged to.
    pub const HIGHEST: Pitch = Pitch(62);
    /// C4 (MIDI 60).
    pub const MIDDLE_C: Pitch = Pitch(25);

    /// Build a pitch from its save-file ordinal. `0` (rest) and anything above
    /// the range are rejected.
    pub fn new(ordinal: u8) -> Option<Self> {
        if (Self::LOWEST.0..=Self::HIGHEST.0).contains(&ordinal) {
            Some(Pitch(ordinal))
        } else {
            None
        }
    }

    /// Build a pitch from a MIDI note number, if it falls on the keyboard range.
    pub fn from_midi(midi: u8) -> Option<Self> {
        midi.checked_sub(MIDI_OFFSET).and_then(Self::new)
    }

    /// Clamp any semitone ordinal into the keyboard range.
    pub fn clamped(ordinal: i32) -> Self {
        Pitch(ordinal.clamp(Self::LOWEST.0 as i32, Self::HIGHEST.0 as i32) as u8)
    }

    pub fn ordinal(self) -> u8 {
        self.0
    }

    pub fn midi(self) -> u8 {
        self.0 + MIDI_OFFSET
    }

    /// Shift by `semitones`, stopping at either end of the range.
    pub fn offset(self, semitones: i32) -> Self {
        Self::clamped(self.0 as i32 + semitones)
    }

    /// Shift by `semitones`, or `None` if the result leaves the range.
    pub fn checked_offset(self, semitones: i32) -> Option<Self> {
        let target = self.0 as i32 + semitones;
        u8::try_from(target).ok().and_then(Self::new)
    }

    /// Semitone within the octave, `0` = C.
    pub fn pitch_class(self) -> u8 {
        self.midi() % 12
    }

    /// Scientific octave number (C4 = middle C).
    pub fn octave(self) -> i8 {
        (self.midi() / 12) as i8 - 1
    }

    /// True for the keys drawn black on a piano.
    pub fn is_sharp(self) -> bool {
        matches!(self.pitch_class(), 1 | 3 | 6 | 8 | 10)
    }

    /// Iterate every pitch from lowest to highest.
    pub fn all() -> impl Iterator<Item = Pitch> {
        (Self::LOWEST.0..=Self::HIGHEST.0).map(Pitch)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SHARP_NAMES[self.pitch_class() as usize], self.octave())
    }
}

impl FromStr for Pitch {
    type Err = RecitalError;

    /// Parse names like `C4`, `c#4`, `Db3`. Both `#`/`s` and `b`/`f` accidentals
    /// are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || RecitalError::InvalidPitch(trimmed.to_string());

        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let (accidental, octave_text) = match rest.chars().next() {
            Some('#') | Some('s') => (1, &rest[1..]),
            Some('b') | Some('f') => (-1, &rest[1..]),
            _ => (0, rest),
        };
        let octave: i8 = octave_text.parse().map_err(|_| invalid())?;

        let midi = (i32::from(octave) + 1) * 12 + base + accidental;
        u8::try_from(midi)
            .ok()
            .and_then(Pitch::from_midi)
            .ok_or_else(invalid)
    }
}

/// Note loudness presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Velocity {
    /// Silence (rest)
    Silent = 0,
    Pppp = 8,
    Ppp = 20,
    Pp = 31,
    P = 42,
    Mp = 53,
    Mf = 64,
    F = 80,
    Ff = 96,
    Fff = 112,
    #[default]
    Ffff = 127,
}

impl Velocity {
    pub const ALL: [Velocity; 11] = [
        Velocity::Silent,
        Velocity::Pppp,
        Velocity::Ppp,
        Velocity::Pp,
        Velocity::P,
        Velocity::Mp,
        Velocity::Mf,
        Velocity::F,
        Velocity::Ff,
        Velocity::Fff,
        Velocity::Ffff,
    ];

    /// MIDI velocity byte.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Loudest preset that does not exceed a raw MIDI velocity.
    pub fn from_value(value: u8) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|v| v.value() <= value)
            .unwrap_or(Velocity::Silent)
    }

    pub fn name(self) -> &'static str {
        match self {
            Velocity::Silent => "silent",
            Velocity::Pppp => "pppp",
            Velocity::Ppp => "ppp",
            Velocity::Pp => "pp",
            Velocity::P => "p",
            Velocity::Mp => "mp",
            Velocity::Mf => "mf",
            Velocity::F => "f",
            Velocity::Ff => "ff",
            Velocity::Fff => "fff",
            Velocity::Ffff => "ffff",
        }
    }
}

impl FromStr for Velocity {
    type Err = RecitalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name() == name)
            .ok_or_else(|| RecitalError::Config(format!("unknown dynamic '{}'", s.trim())))
    }
}
