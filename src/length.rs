//! # Note Lengths and Quantization
//!
//! Lengths are counted in half-hemidemisemiquaver units: a crotchet (one beat) is
//! 32 units, a semibreve 128. Dotted lengths are 1.5x their base and are the only
//! values that are not a power of two.
//!
//! ## Quantization
//! A held key produces a raw duration in milliseconds. [`BeatClock::quantize`]
//! turns it into units (`floor(ms / (beat_ms / 32))`) and then picks the longest
//! defined length that fits:
//!
//! ```text
//! beat_ms = 400  ->  unit = 12.5 ms
//!   399 ms -> 31 units -> DottedQuaver (24)
//!   400 ms -> 32 units -> Crotchet (32)
//!    20 ms ->  1 unit  -> None
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard note lengths with their unit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum NoteLength {
    #[default]
    None = 0,
    HemiDemiSemiQuaver = 2,
    DottedHemiDemiSemiQuaver = 3,
    DemiSemiQuaver = 4,
    DottedDemiSemiQuaver = 6,
    SemiQuaver = 8,
    DottedSemiQuaver = 12,
    Quaver = 16,
    DottedQuaver = 24,
    Crotchet = 32,
    DottedCrotchet = 48,
    Minim = 64,
    DottedMinim = 96,
    SemiBreve = 128,
    DottedSemiBreve = 192,
    Breve = 256,
    DottedBreve = 384,
}

impl NoteLength {
    /// Every length in ascending order, `None` first.
    pub const ALL: [NoteLength; 17] = [
        NoteLength::None,
        NoteLength::HemiDemiSemiQuaver,
        NoteLength::DottedHemiDemiSemiQuaver,
        NoteLength::DemiSemiQuaver,
        NoteLength::DottedDemiSemiQuaver,
        NoteLength::SemiQuaver,
        NoteLength::DottedSemiQuaver,
        NoteLength::Quaver,
        NoteLength::DottedQuaver,
        NoteLength::Crotchet,
        NoteLength::DottedCrotchet,
        NoteLength::Minim,
        NoteLength::DottedMinim,
        NoteLength::SemiBreve,
        NoteLength::DottedSemiBreve,
        NoteLength::Breve,
        NoteLength::DottedBreve,
    ];

    /// The shortest length a recorded note can have.
    pub const SHORTEST: NoteLength = NoteLength::HemiDemiSemiQuaver;

    pub fn units(self) -> u16 {
        self as u16
    }

    /// Look up a length by its unit value; only defined values match.
    pub fn from_units(units: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.units() == units)
    }

    /// True for dotted lengths. `None` counts as not dotted.
    pub fn is_dotted(self) -> bool {
        let units = self.units();
        units != 0 && !units.is_power_of_two()
    }

    /// The undotted length (itself if already undotted).
    pub fn base(self) -> Self {
        if self.is_dotted() {
            Self::from_units(self.units() / 3 * 2).unwrap_or(self)
        } else {
            self
        }
    }

    /// The dotted variant of an undotted length.
    pub fn dotted(self) -> Option<Self> {
        if self == NoteLength::None || self.is_dotted() {
            return None;
        }
        Self::from_units(self.units() / 2 * 3)
    }

    pub fn name(self) -> &'static str {
        match self {
            NoteLength::None => "none",
            NoteLength::HemiDemiSemiQuaver => "hemidemisemiquaver",
            NoteLength::DottedHemiDemiSemiQuaver => "dotted hemidemisemiquaver",
            NoteLength::DemiSemiQuaver => "demisemiquaver",
            NoteLength::DottedDemiSemiQuaver => "dotted demisemiquaver",
            NoteLength::SemiQuaver => "semiquaver",
            NoteLength::DottedSemiQuaver => "dotted semiquaver",
            NoteLength::Quaver => "quaver",
            NoteLength::DottedQuaver => "dotted quaver",
            NoteLength::Crotchet => "crotchet",
            NoteLength::DottedCrotchet => "dotted crotchet",
            NoteLength::Minim => "minim",
            NoteLength::DottedMinim => "dotted minim",
            NoteLength::SemiBreve => "semibreve",
            NoteLength::DottedSemiBreve => "dotted semibreve",
            NoteLength::Breve => "breve",
            NoteLength::DottedBreve => "dotted breve",
        }
    }
}

impl fmt::Display for NoteLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Beat length in milliseconds, from which every length-to-time conversion
/// is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatClock {
    beat_ms: f64,
}

impl Default for BeatClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BEAT_MS)
    }
}

impl BeatClock {
    pub const DEFAULT_BEAT_MS: f64 = 400.0;
    pub const MIN_BEAT_MS: f64 = 1.0;
    pub const MAX_BEAT_MS: f64 = 10_000.0;

    /// Create a clock; the beat length is clamped to 1..=10000 ms.
    pub fn new(beat_ms: f64) -> Self {
        Self {
            beat_ms: Self::clamp_beat(beat_ms),
        }
    }

    fn clamp_beat(beat_ms: f64) -> f64 {
        if beat_ms.is_nan() {
            Self::DEFAULT_BEAT_MS
        } else {
            beat_ms.clamp(Self::MIN_BEAT_MS, Self::MAX_BEAT_MS)
        }
    }

    /// Milliseconds per crotchet.
    pub fn beat_ms(&self) -> f64 {
        self.beat_ms
    }

    pub fn set_beat_ms(&mut self, beat_ms: f64) {
        self.beat_ms = Self::clamp_beat(beat_ms);
    }

    /// Milliseconds per half-hemidemisemiquaver.
    pub fn unit_ms(&self) -> f64 {
        self.beat_ms / 32.0
    }

    /// Playback duration of a length at this tempo.
    pub fn duration_ms(&self, length: NoteLength) -> f64 {
        length.units() as f64 * self.unit_ms()
    }

    /// Longest defined length that fits in `elapsed_ms`.
    pub fn quantize(&self, elapsed_ms: f64) -> NoteLength {
        if elapsed_ms.is_nan() || elapsed_ms <= 0.0 {
            return NoteLength::None;
        }
        let units = (elapsed_ms / self.unit_ms()).floor();
        NoteLength::ALL
            .iter()
            .rev()
            .copied()
            .find(|l| units >= l.units() as f64)
            .unwrap_or(NoteLength::None)
    }
}
