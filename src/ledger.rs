//! # Note Ledger
//!
//! The ordered list of notes making up a recorded performance. Insertion order is
//! performance order.
//!
//! ## Save format
//! One note per line, `<pitchOrdinal>,<lengthUnits>`, no header:
//!
//! ```text
//! 25,32     C4 crotchet
//! 0,16      quaver rest
//! 29,64     E4 minim
//! ```
//!
//! Notes whose length is `None` are left out when saving. Loading fails on the
//! first malformed line rather than skipping it.

use serde::Serialize;

use crate::error::RecitalError;
use crate::length::NoteLength;
use crate::pitch::Pitch;

/// A single recorded note or rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Note {
    /// `None` is a rest.
    pub pitch: Option<Pitch>,
    pub length: NoteLength,
}

impl Note {
    /// Create a note. Pitched notes are never shorter than a hemidemisemiquaver.
    pub fn new(pitch: Option<Pitch>, length: NoteLength) -> Self {
        let length = match pitch {
            Some(_) if length < NoteLength::SHORTEST => NoteLength::SHORTEST,
            _ => length,
        };
        Self { pitch, length }
    }

    pub fn rest(length: NoteLength) -> Self {
        Self {
            pitch: None,
            length,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    notes: Vec<Note>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a note. Rests shorter than the shortest length are not recorded;
    /// returns `None` in that case.
    pub fn append(&mut self, pitch: Option<Pitch>, length: NoteLength) -> Option<&Note> {
        if pitch.is_none() && length < NoteLength::SHORTEST {
            return None;
        }
        self.notes.push(Note::new(pitch, length));
        self.notes.last()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn last(&self) -> Option<&Note> {
        self.notes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Change a note's pitch. Returns false if the index is out of range.
    pub fn set_pitch(&mut self, index: usize, pitch: Option<Pitch>) -> bool {
        match self.notes.get_mut(index) {
            Some(note) => {
                *note = Note::new(pitch, note.length);
                true
            }
            None => false,
        }
    }

    /// Change a note's length. Pitched notes clamp to the shortest length.
    pub fn set_length(&mut self, index: usize, length: NoteLength) -> bool {
        match self.notes.get_mut(index) {
            Some(note) => {
                *note = Note::new(note.pitch, length);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<Note> {
        if index < self.notes.len() {
            Some(self.notes.remove(index))
        } else {
            None
        }
    }

    /// Sum of all note lengths in units.
    pub fn total_units(&self) -> u64 {
        self.notes.iter().map(|n| n.length.units() as u64).sum()
    }

    /// Write the ledger in the save format.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for note in self.notes.iter().filter(|n| n.length != NoteLength::None) {
            let ordinal = note.pitch.map_or(0, Pitch::ordinal);
            out.push_str(&format!("{},{}\n", ordinal, note.length.units()));
        }
        out
    }

    /// Read a ledger back from the save format.
    pub fn deserialize(text: &str) -> Result<Self, RecitalError> {
        let mut ledger = Ledger::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }

            let corrupt = |message: String| RecitalError::CorruptLedger { line, message };

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields.len() != 2 {
                return Err(corrupt(format!(
                    "expected 2 fields, found {}",
                    fields.len()
                )));
            }

            let ordinal: u8 = fields[0]
                .parse()
                .map_err(|_| corrupt(format!("'{}' is not a pitch ordinal", fields[0])))?;
            let units: u16 = fields[1]
                .parse()
                .map_err(|_| corrupt(format!("'{}' is not a note length", fields[1])))?;

            let pitch = match ordinal {
                0 => None,
                n => Some(
                    Pitch::new(n)
                        .ok_or_else(|| corrupt(format!("pitch ordinal {} is out of range", n)))?,
                ),
            };
            let length = NoteLength::from_units(units)
                .ok_or_else(|| corrupt(format!("{} is not a defined note length", units)))?;

            if length == NoteLength::None {
                continue;
            }
            ledger.append(pitch, length);
        }

        Ok(ledger)
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

impl FromIterator<Note> for Ledger {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for note in iter {
            ledger.append(note.pitch, note.length);
        }
        ledger
    }
}
