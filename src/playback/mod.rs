//! # Playback Module
//!
//! Walks a ledger note by note in real time, telling the caller which pitch to
//! sound and which note to highlight.
//!
//! ## Sub-modules
//! - `types` - [`PlaybackState`] and [`Cue`]
//! - `sequencer` - the [`Sequencer`] state machine
//!
//! ## Driving playback
//! The sequencer owns no clock and no output. The caller feeds it elapsed
//! milliseconds through [`Sequencer::tick`] and applies the returned cues:
//!
//! ```rust
//! use recital::ledger::Ledger;
//! use recital::length::{BeatClock, NoteLength};
//! use recital::pitch::Pitch;
//! use recital::playback::{Cue, PlaybackState, Sequencer};
//!
//! let mut ledger = Ledger::new();
//! ledger.append(Some(Pitch::MIDDLE_C), NoteLength::Crotchet);
//!
//! let clock = BeatClock::new(400.0);
//! let mut sequencer = Sequencer::new();
//!
//! let cues = sequencer.start(&ledger);
//! assert_eq!(cues, vec![Cue::Sound { index: 0, pitch: Some(Pitch::MIDDLE_C) }]);
//!
//! let cues = sequencer.tick(400.0, &ledger, &clock);
//! assert_eq!(cues.last(), Some(&Cue::Finished));
//! assert_eq!(sequencer.state(), PlaybackState::Stopped);
//! ```
//!
//! ## State machine
//!
//! ```text
//!            start                 pause
//!  Stopped ---------> Playing ------------> Paused
//!     ^                 |  ^                  |
//!     |   stop / end    |  +------ resume ----+
//!     +-----------------+
//! ```
//!
//! `start` is accepted from every state and always begins at the first note.
//! `stop` is accepted from every state.
//!
//! ## Timing
//! A note lasts `units * beat_ms / 32` milliseconds. When a tick overshoots the
//! current note, the remainder counts towards the next one, so a long tick can
//! advance through several notes at once without drifting.

mod sequencer;
mod types;


pub use sequencer::Sequencer;
pub use types::{Cue, PlaybackState};
