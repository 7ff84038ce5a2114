//! # Keyboard Input Mapping
//!
//! Maps pointer positions on the on-screen piano to pitches, and pitches back to
//! the key rectangles a renderer highlights. Also maps computer keys to pitches.
//!
//! ## Geometry
//! ```text
//! |<-------------------- width -------------------->|
//!    x0
//!    +---+-+-+-+-+---+---+-+-+-+-+-+-+---+
//!    |   |#| |#| |   |   |#| |#| |#| |   |   black band: top 4/7
//!    |   +-+ +-+ |   |   +-+ +-+ +-+ |   |
//!    | C | D | E | F | G | A | B | C  ...
//!    +---+---+---+---+---+---+---+---+
//! ```
//! - White key width: `((width - 2) * scale%) / (100 * white_keys)`
//! - Black key width: `white * 9 / 14`, starting `white - black / 2` into the key
//!   to its left
//! - No black key follows E or B, or the last white key
//!
//! The piano always starts at C2. [`KeyboardGeometry::area_of`] is the exact
//! inverse of [`KeyboardGeometry::pitch_at`]: the centre of any key's area maps
//! back to that key.

use serde::Serialize;

use crate::pitch::Pitch;

/// Outline thickness around the piano.
const LINE_THICKNESS: i32 = 2;

/// Semitone offset of each white key within an octave.
const WHITE_STEPS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// One drawable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Key {
    pub pitch: Pitch,
    pub area: Rect,
    pub black: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardGeometry {
    width: i32,
    height: i32,
    white_keys: u8,
    scale_percent: u8,
}

impl KeyboardGeometry {
    pub const DEFAULT_WHITE_KEYS: u8 = 29;
    /// White keys between C2 and C#7.
    pub const MAX_WHITE_KEYS: u8 = 36;

    /// `white_keys` clamps to 1..=36 and `scale_percent` to 1..=100.
    pub fn new(width: i32, height: i32, white_keys: u8, scale_percent: u8) -> Self {
        Self {
            width,
            height,
            white_keys: white_keys.clamp(1, Self::MAX_WHITE_KEYS),
            scale_percent: scale_percent.clamp(1, 100),
        }
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    pub fn set_scale_percent(&mut self, scale_percent: u8) {
        self.scale_percent = scale_percent.clamp(1, 100);
    }

    pub fn scale_percent(&self) -> u8 {
        self.scale_percent
    }

    pub fn white_keys(&self) -> u8 {
        self.white_keys
    }

    pub fn white_key_width(&self) -> i32 {
        let usable = (self.width - LINE_THICKNESS).max(0);
        (usable * self.scale_percent as i32) / (100 * self.white_keys as i32)
    }

    pub fn black_key_width(&self) -> i32 {
        self.white_key_width() * 9 / 14
    }

    fn black_key_offset(&self) -> i32 {
        self.white_key_width() - self.black_key_width() / 2
    }

    pub fn piano_width(&self) -> i32 {
        self.white_keys as i32 * self.white_key_width()
    }

    fn key_height(&self) -> i32 {
        (self.height - LINE_THICKNESS).max(0)
    }

    fn black_key_height(&self) -> i32 {
        self.key_height() * 4 / 7
    }

    /// Outline of the whole piano, centred horizontally.
    pub fn piano_bounds(&self) -> Rect {
        let piano_width = self.piano_width();
        Rect::new(
            (self.width - piano_width) / 2,
            LINE_THICKNESS / 2,
            piano_width,
            self.key_height(),
        )
    }

    fn white_pitch(index: i32) -> Pitch {
        let octave = index / 7;
        let step = WHITE_STEPS[(index % 7) as usize] as i32;
        Pitch::LOWEST.offset(octave * 12 + step)
    }

    /// Whether a black key sits between white key `index` and the next one.
    fn has_black_after(&self, index: i32) -> bool {
        let step = index % 7;
        index >= 0 && index + 1 < self.white_keys as i32 && step != 2 && step != 6
    }

    fn white_rect(&self, index: i32) -> Rect {
        let bounds = self.piano_bounds();
        let w = self.white_key_width();
        Rect::new(bounds.x + index * w, bounds.y, w, bounds.height)
    }

    fn black_rect(&self, index: i32) -> Rect {
        let bounds = self.piano_bounds();
        Rect::new(
            bounds.x + index * self.white_key_width() + self.black_key_offset(),
            bounds.y,
            self.black_key_width(),
            self.black_key_height(),
        )
    }

    /// White key index and colour of a pitch, ignoring whether it fits.
    fn key_index(pitch: Pitch) -> (i32, bool) {
        let offset = (pitch.ordinal() - Pitch::LOWEST.ordinal()) as i32;
        let octave = offset / 12;
        let semitone = (offset % 12) as u8;
        match WHITE_STEPS.iter().position(|&s| s == semitone) {
            Some(step) => (octave * 7 + step as i32, false),
            None => {
                let below = WHITE_STEPS
                    .iter()
                    .rposition(|&s| s < semitone)
                    .unwrap_or(0);
                (octave * 7 + below as i32, true)
            }
        }
    }

    /// Pitch of the key under a point, or `None` off the piano.
    pub fn pitch_at(&self, point: Point) -> Option<Pitch> {
        let bounds = self.piano_bounds();
        let w = self.white_key_width();
        if w <= 0 || bounds.is_empty() || !bounds.contains(point) {
            return None;
        }

        let index = (point.x - bounds.x) / w;
        if point.y < bounds.y + self.black_key_height() {
            for candidate in [index, index - 1] {
                if self.has_black_after(candidate) && self.black_rect(candidate).contains(point) {
                    return Some(Self::white_pitch(candidate).offset(1));
                }
            }
        }
        Some(Self::white_pitch(index))
    }

    /// Area of the key for a pitch, or `None` if the pitch is not on this piano
    /// or the key would have no area.
    pub fn area_of(&self, pitch: Pitch) -> Option<Rect> {
        let (index, black) = Self::key_index(pitch);
        let rect = if black {
            if !self.has_black_after(index) {
                return None;
            }
            self.black_rect(index)
        } else {
            if index >= self.white_keys as i32 {
                return None;
            }
            self.white_rect(index)
        };
        if rect.is_empty() {
            None
        } else {
            Some(rect)
        }
    }

    /// Every key on the piano, white keys first so black keys draw on top.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        for index in 0..self.white_keys as i32 {
            keys.push(Key {
                pitch: Self::white_pitch(index),
                area: self.white_rect(index),
                black: false,
            });
        }
        for index in 0..self.white_keys as i32 {
            if self.has_black_after(index) {
                keys.push(Key {
                    pitch: Self::white_pitch(index).offset(1),
                    area: self.black_rect(index),
                    black: true,
                });
            }
        }
        keys
    }

    /// Lowest and highest pitch on this piano.
    pub fn range(&self) -> (Pitch, Pitch) {
        let last = self.white_keys as i32 - 1;
        (Pitch::LOWEST, Self::white_pitch(last))
    }
}

/// Two-row computer keyboard layout, lower row from the base C and the upper
/// row one octave higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QwertyMapper {
    base: Pitch,
    octave_shift: i32,
}

impl Default for QwertyMapper {
    fn default() -> Self {
        Self::new(Pitch::MIDDLE_C)
    }
}

impl QwertyMapper {
    const LOWER_ROW: [char; 13] = ['z', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm', ','];
    const UPPER_ROW: [char; 13] = ['q', '2', 'w', '3', 'e', 'r', '5', 't', '6', 'y', '7', 'u', 'i'];
    const MAX_SHIFT: i32 = 3;

    pub fn new(base: Pitch) -> Self {
        Self {
            base,
            octave_shift: 0,
        }
    }

    pub fn octave_shift(&self) -> i32 {
        self.octave_shift
    }

    pub fn shift_octave(&mut self, delta: i32) {
        self.octave_shift = self
            .octave_shift
            .saturating_add(delta)
            .clamp(-Self::MAX_SHIFT, Self::MAX_SHIFT);
    }

    /// Pitch for a key character, clamped to the pitch range.
    pub fn pitch_for_key(&self, key: char) -> Option<Pitch> {
        let key = key.to_ascii_lowercase();
        let semitone = Self::LOWER_ROW
            .iter()
            .position(|&k| k == key)
            .or_else(|| Self::UPPER_ROW.iter().position(|&k| k == key).map(|i| i + 12))?;
        Some(self.base.offset(semitone as i32 + self.octave_shift * 12))
    }
}
