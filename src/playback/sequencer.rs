//! Real-time note sequencing

use tracing::debug;

use super::types::{Cue, PlaybackState};
use crate::ledger::{Ledger, Note};
use crate::length::BeatClock;

/// Playback cursor over a ledger.
///
/// Every operation returns the cues the caller must apply, in order. The
/// ledger is passed in rather than owned so that recording and editing keep
/// full control of it.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    state: PlaybackState,
    index: usize,
    elapsed_ms: f64,
    /// The note currently highlighted (and sounding when pitched).
    current: Option<Note>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the note being played or paused on.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Time spent on the current note.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    /// Index of the highlighted note, if any.
    pub fn current(&self) -> Option<usize> {
        self.current.map(|_| self.index)
    }

    /// Start from the first note, whatever the current state.
    pub fn start(&mut self, ledger: &Ledger) -> Vec<Cue> {
        let mut cues = self.release_current();
        self.index = 0;
        self.elapsed_ms = 0.0;

        if ledger.is_empty() {
            self.state = PlaybackState::Stopped;
            debug!("nothing to play");
            return cues;
        }

        self.state = PlaybackState::Playing;
        debug!(notes = ledger.len(), "playback started");
        cues.extend(self.sound(ledger));
        cues
    }

    /// Halt on the current note. Only meaningful while playing.
    pub fn pause(&mut self) -> Vec<Cue> {
        if self.state != PlaybackState::Playing {
            return Vec::new();
        }
        self.state = PlaybackState::Paused;
        debug!(index = self.index, "playback paused");
        self.release_current()
    }

    /// Continue from the paused note, which is replayed from its beginning.
    pub fn resume(&mut self, ledger: &Ledger) -> Vec<Cue> {
        if self.state != PlaybackState::Paused {
            return Vec::new();
        }
        self.elapsed_ms = 0.0;
        if self.index >= ledger.len() {
            return self.finish();
        }
        self.state = PlaybackState::Playing;
        debug!(index = self.index, "playback resumed");
        self.sound(ledger)
    }

    /// Stop and rewind.
    pub fn stop(&mut self) -> Vec<Cue> {
        let cues = self.release_current();
        if self.state.is_active() {
            debug!(index = self.index, "playback stopped");
        }
        self.state = PlaybackState::Stopped;
        self.index = 0;
        self.elapsed_ms = 0.0;
        cues
    }

    /// Advance the clock by `delta_ms`.
    pub fn tick(&mut self, delta_ms: f64, ledger: &Ledger, clock: &BeatClock) -> Vec<Cue> {
        let mut cues = Vec::new();
        if self.state != PlaybackState::Playing {
            return cues;
        }
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.elapsed_ms += delta_ms;
        }

        loop {
            let Some(note) = ledger.get(self.index) else {
                cues.extend(self.finish());
                return cues;
            };
            let duration = clock.duration_ms(note.length);
            if self.elapsed_ms < duration {
                return cues;
            }

            self.elapsed_ms -= duration;
            cues.extend(self.release_current());
            self.index += 1;
            if self.index >= ledger.len() {
                cues.extend(self.finish());
                return cues;
            }
            cues.extend(self.sound(ledger));
        }
    }

    fn sound(&mut self, ledger: &Ledger) -> Vec<Cue> {
        match ledger.get(self.index).copied() {
            Some(note) => {
                self.current = Some(note);
                vec![Cue::Sound {
                    index: self.index,
                    pitch: note.pitch,
                }]
            }
            None => Vec::new(),
        }
    }

    fn release_current(&mut self) -> Vec<Cue> {
        match self.current.take() {
            Some(note) => vec![Cue::Release {
                index: self.index,
                pitch: note.pitch,
            }],
            None => Vec::new(),
        }
    }

    fn finish(&mut self) -> Vec<Cue> {
        let mut cues = self.release_current();
        debug!("playback finished");
        self.state = PlaybackState::Stopped;
        self.index = 0;
        self.elapsed_ms = 0.0;
        cues.push(Cue::Finished);
        cues
    }
}
