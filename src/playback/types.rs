//! Playback state and cue definitions

use serde::Serialize;

use crate::pitch::Pitch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    /// Halted mid-note; the cursor is kept.
    Paused,
}

impl PlaybackState {
    pub fn is_active(self) -> bool {
        self != PlaybackState::Stopped
    }
}

/// An instruction produced by the sequencer.
///
/// `pitch` is `None` for rests: the note is still highlighted but nothing sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cue", rename_all = "camelCase")]
pub enum Cue {
    /// Highlight the note at `index` and sound its pitch.
    Sound { index: usize, pitch: Option<Pitch> },
    /// Silence the pitch and drop the highlight of the note at `index`.
    Release { index: usize, pitch: Option<Pitch> },
    /// Playback ran past the last note.
    Finished,
}
