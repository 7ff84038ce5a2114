//! # Staff
//!
//! The recorder itself. A [`Staff`] owns the ledger, its layout, the playback
//! sequencer and the pitch output, and turns input events into changes to all of
//! them. It draws nothing: renderers read the state back and follow the
//! [`StaffEvent`] stream.
//!
//! ## Recording
//! Each key press starts a live note and each release commits it, quantized
//! against the beat clock. Silence between a release and the next press becomes
//! a rest when it is at least a hemidemisemiquaver long. Shorter silence is added
//! to the previous note, which is quantized again.
//!
//! ```text
//! press C4 @0   release @400   press E4 @600   release @1400
//!   -> C4 crotchet, quaver rest, E4 minim
//! ```
//!
//! Only one note is live at a time. Pressing a second key commits the first.
//! Nothing is recorded while playback is running; a paused staff records.
//!
//! ## Sounding pitches
//! A pitch can be held by a key, by the note being dragged and by the sequencer
//! at once. Each holder is counted, and the output only hears note-off when the
//! last one lets go.
//!
//! ## Time
//! Every timestamp is a caller-supplied millisecond reading from a monotonic
//! clock. Nothing here reads the system clock, so the whole staff can be driven
//! deterministically.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::RecitalError;
use crate::keyboard::{KeyboardGeometry, Point};
use crate::layout::{Layout, LayoutMetrics};
use crate::ledger::{Ledger, Note};
use crate::length::{BeatClock, NoteLength};
use crate::output::PitchOutput;
use crate::pitch::{Pitch, Velocity};
use crate::playback::{Cue, PlaybackState, Sequencer};

/// Default on-screen keyboard height in pixels.
pub const KEYBOARD_HEIGHT: i32 = 120;

/// What changed, for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum StaffEvent {
    NoteAdded { index: usize },
    NoteChanged { index: usize },
    NoteRemoved { index: usize },
    /// Placements or bar lines moved.
    LayoutChanged,
    HighlightChanged { index: usize, highlighted: bool },
    PlaybackStarted,
    PlaybackStopped,
}

#[derive(Debug, Clone, Copy)]
struct LiveNote {
    pitch: Pitch,
    started_ms: f64,
}

#[derive(Debug, Clone, Copy)]
struct PitchDrag {
    index: usize,
    origin: Option<Pitch>,
    current: Option<Pitch>,
}

#[derive(Debug, Clone, Copy)]
struct LengthEdit {
    index: usize,
    started_ms: f64,
}

pub struct Staff<O: PitchOutput = Box<dyn PitchOutput>> {
    config: Config,
    clock: BeatClock,
    ledger: Ledger,
    layout: Layout,
    keyboard: KeyboardGeometry,
    sequencer: Sequencer,
    output: O,
    /// Holder count per sounding pitch.
    sounding: BTreeMap<Pitch, u8>,
    /// Keys that are down.
    held: BTreeSet<Pitch>,
    live: Option<LiveNote>,
    /// When the last committed note was released.
    last_release_ms: Option<f64>,
    /// Unquantized hold time of the last note, grown by merged silence.
    last_raw_ms: Option<f64>,
    drag: Option<PitchDrag>,
    length_edit: Option<LengthEdit>,
    highlighted: Option<usize>,
    events: Vec<StaffEvent>,
}

impl<O: PitchOutput> Staff<O> {
    pub fn new(config: Config, output: O) -> Self {
        let clock = BeatClock::new(config.beat_ms);
        let layout = Layout::new(config.page_width, LayoutMetrics::default());
        let keyboard = KeyboardGeometry::new(
            config.page_width,
            KEYBOARD_HEIGHT,
            config.white_keys,
            config.keyboard_scale,
        );
        debug!(output = output.name(), beat_ms = clock.beat_ms(), "staff created");
        Self {
            config,
            clock,
            ledger: Ledger::new(),
            layout,
            keyboard,
            sequencer: Sequencer::new(),
            output,
            sounding: BTreeMap::new(),
            held: BTreeSet::new(),
            live: None,
            last_release_ms: None,
            last_raw_ms: None,
            drag: None,
            length_edit: None,
            highlighted: None,
            events: Vec::new(),
        }
    }

    /// Start from an existing ledger.
    pub fn with_ledger(config: Config, output: O, ledger: Ledger) -> Self {
        let mut staff = Self::new(config, output);
        staff.ledger = ledger;
        staff.layout.relayout(&staff.ledger, staff.config.page_width);
        staff
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &BeatClock {
        &self.clock
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn keyboard(&self) -> &KeyboardGeometry {
        &self.keyboard
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn velocity(&self) -> Velocity {
        self.config.velocity
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.sequencer.state()
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.state().is_active()
    }

    /// Index of the highlighted note.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// Pitches currently held down or playing, lowest first.
    pub fn sounding(&self) -> impl Iterator<Item = Pitch> + '_ {
        self.sounding.keys().copied()
    }

    /// Hand every pending event to the caller.
    pub fn drain_events(&mut self) -> Vec<StaffEvent> {
        std::mem::take(&mut self.events)
    }

    // Recording

    /// A key went down at `at_ms`. Repeats of a key that is already down are
    /// ignored.
    pub fn press_key(&mut self, pitch: Pitch, at_ms: f64) {
        if !self.held.insert(pitch) {
            return;
        }
        self.sound_on(pitch);
        if self.sequencer.state() == PlaybackState::Playing {
            return;
        }

        if let Some(live) = self.live {
            if live.pitch != pitch {
                self.release_held(live.pitch);
            }
            self.commit_live(at_ms);
        }
        self.record_gap(at_ms);

        debug!(%pitch, at_ms, "live note started");
        self.live = Some(LiveNote {
            pitch,
            started_ms: at_ms,
        });
    }

    /// A key came up at `at_ms`.
    pub fn release_key(&mut self, pitch: Pitch, at_ms: f64) {
        self.release_held(pitch);
        if self.live.map_or(false, |live| live.pitch == pitch) {
            self.commit_live(at_ms);
        }
    }

    /// Press whatever key is under a pointer on the on-screen keyboard.
    pub fn press_at(&mut self, point: Point, at_ms: f64) -> Option<Pitch> {
        let pitch = self.keyboard.pitch_at(point)?;
        self.press_key(pitch, at_ms);
        Some(pitch)
    }

    /// Pitch of the note being held, if any.
    pub fn live_pitch(&self) -> Option<Pitch> {
        self.live.map(|live| live.pitch)
    }

    /// Length the held note (or the note whose length is being edited) would
    /// get if released at `now_ms`.
    pub fn live_length(&self, now_ms: f64) -> Option<NoteLength> {
        let started_ms = match (self.live, self.length_edit) {
            (Some(live), _) => live.started_ms,
            (None, Some(edit)) => edit.started_ms,
            (None, None) => return None,
        };
        Some(self.clock.quantize(now_ms - started_ms))
    }

    fn commit_live(&mut self, at_ms: f64) {
        let Some(live) = self.live.take() else {
            return;
        };

        let held_ms = (at_ms - live.started_ms).max(0.0);
        let length = self.clock.quantize(held_ms);
        if let Some(note) = self.ledger.append(Some(live.pitch), length) {
            debug!(pitch = %live.pitch, held_ms, length = %note.length, "note recorded");
        }
        self.note_appended();
        self.last_release_ms = Some(at_ms);
        self.last_raw_ms = Some(held_ms);
    }

    /// Turn the silence since the last release into a rest, or fold it into
    /// the previous note when it is too short to write down.
    fn record_gap(&mut self, at_ms: f64) {
        let Some(released_ms) = self.last_release_ms.take() else {
            return;
        };
        let gap_ms = at_ms - released_ms;
        if gap_ms <= 0.0 {
            return;
        }

        let length = self.clock.quantize(gap_ms);
        if length >= NoteLength::SHORTEST {
            self.ledger.append(None, length);
            debug!(gap_ms, length = %length, "rest recorded");
            self.note_appended();
            self.last_raw_ms = Some(gap_ms);
            return;
        }

        let Some(index) = self.ledger.len().checked_sub(1) else {
            return;
        };
        let Some(last) = self.ledger.get(index).copied() else {
            return;
        };
        let raw_ms = self
            .last_raw_ms
            .unwrap_or_else(|| self.clock.duration_ms(last.length))
            + gap_ms;
        self.last_raw_ms = Some(raw_ms);

        let merged = self.clock.quantize(raw_ms);
        debug!(gap_ms, index, "short silence merged into previous note");
        if merged != last.length {
            self.ledger.set_length(index, merged);
            self.events.push(StaffEvent::NoteChanged { index });
            self.relayout();
        }
    }

    fn note_appended(&mut self) {
        if let Some(note) = self.ledger.last().copied() {
            self.layout.push(note.length);
            self.events.push(StaffEvent::NoteAdded {
                index: self.ledger.len() - 1,
            });
        }
    }

    // Editing

    /// Start dragging a note's pitch. The note is sounded while dragged.
    pub fn begin_pitch_drag(&mut self, index: usize) -> bool {
        let Some(note) = self.ledger.get(index).copied() else {
            return false;
        };
        self.end_pitch_drag();
        if let Some(pitch) = note.pitch {
            self.sound_on(pitch);
        }
        self.drag = Some(PitchDrag {
            index,
            origin: note.pitch,
            current: note.pitch,
        });
        self.set_highlight(Some(index));
        true
    }

    /// Move the dragged note by `dy_px` pixels of upward pointer travel since
    /// the drag began. Two semitones per staff line; dragging below C2 turns the
    /// note into a rest.
    pub fn drag_pitch(&mut self, index: usize, dy_px: i32) {
        let Some(drag) = self.drag.filter(|d| d.index == index) else {
            return;
        };
        let line_space = self.layout.metrics().line_space.max(1);
        let semitones = dy_px.saturating_mul(2) / line_space;
        let origin = drag.origin.map_or(0, |p| p.ordinal() as i32);
        let target = origin
            .saturating_add(semitones)
            .clamp(0, Pitch::HIGHEST.ordinal() as i32);
        let pitch = u8::try_from(target).ok().and_then(Pitch::new);
        if pitch == drag.current {
            return;
        }

        if let Some(old) = drag.current {
            self.sound_off(old);
        }
        if let Some(new) = pitch {
            self.sound_on(new);
        }
        self.ledger.set_pitch(index, pitch);
        self.drag = Some(PitchDrag {
            current: pitch,
            ..drag
        });
        self.touch_note(index);
    }

    pub fn end_pitch_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            if let Some(pitch) = drag.current {
                self.sound_off(pitch);
            }
            self.set_highlight(None);
        }
    }

    /// Start timing a new length for a note.
    pub fn begin_length_edit(&mut self, index: usize, at_ms: f64) -> bool {
        if index >= self.ledger.len() {
            return false;
        }
        self.length_edit = Some(LengthEdit {
            index,
            started_ms: at_ms,
        });
        self.set_highlight(Some(index));
        true
    }

    /// Give the note the length held since [`Staff::begin_length_edit`].
    pub fn end_length_edit(&mut self, at_ms: f64) -> Option<NoteLength> {
        let edit = self.length_edit.take()?;
        self.set_highlight(None);
        let length = self.clock.quantize(at_ms - edit.started_ms);
        if !self.ledger.set_length(edit.index, length) {
            return None;
        }
        self.touch_note(edit.index);
        self.relayout();
        self.ledger.get(edit.index).map(|note| note.length)
    }

    /// Remove a note. Later notes move down one index, so active playback is
    /// stopped first.
    pub fn remove_note(&mut self, index: usize) -> Option<Note> {
        if index >= self.ledger.len() {
            return None;
        }
        if self.is_playing() {
            self.stop();
        }
        let note = self.ledger.remove(index)?;
        if self.drag.map_or(false, |d| d.index == index) {
            self.end_pitch_drag();
        }
        if self.length_edit.map_or(false, |e| e.index == index) {
            self.length_edit = None;
            self.set_highlight(None);
        }
        self.last_raw_ms = None;
        self.events.push(StaffEvent::NoteRemoved { index });
        self.relayout();
        Some(note)
    }

    fn touch_note(&mut self, index: usize) {
        if index + 1 == self.ledger.len() {
            self.last_raw_ms = None;
        }
        self.events.push(StaffEvent::NoteChanged { index });
    }

    // Playback

    /// Play from the first note.
    pub fn play(&mut self) {
        self.abandon_live();
        self.last_release_ms = None;
        let cues = self.sequencer.start(&self.ledger);
        self.apply_cues(cues);
        if self.is_playing() {
            info!(notes = self.ledger.len(), "playing");
            self.events.push(StaffEvent::PlaybackStarted);
        }
    }

    pub fn pause(&mut self) {
        let cues = self.sequencer.pause();
        self.apply_cues(cues);
    }

    pub fn resume(&mut self) {
        let cues = self.sequencer.resume(&self.ledger);
        self.apply_cues(cues);
    }

    pub fn stop(&mut self) {
        let was_playing = self.is_playing();
        let cues = self.sequencer.stop();
        self.apply_cues(cues);
        if was_playing {
            self.events.push(StaffEvent::PlaybackStopped);
        }
    }

    /// Advance playback by `delta_ms`.
    pub fn tick(&mut self, delta_ms: f64) {
        let cues = self.sequencer.tick(delta_ms, &self.ledger, &self.clock);
        self.apply_cues(cues);
    }

    fn apply_cues(&mut self, cues: Vec<Cue>) {
        for cue in cues {
            match cue {
                Cue::Sound { index, pitch } => {
                    if let Some(pitch) = pitch {
                        self.sound_on(pitch);
                    }
                    self.set_highlight(Some(index));
                }
                Cue::Release { pitch, .. } => {
                    if let Some(pitch) = pitch {
                        self.sound_off(pitch);
                    }
                    self.set_highlight(None);
                }
                Cue::Finished => {
                    info!("playback finished");
                    self.events.push(StaffEvent::PlaybackStopped);
                }
            }
        }
    }

    fn set_highlight(&mut self, index: Option<usize>) {
        if self.highlighted == index {
            return;
        }
        if let Some(old) = self.highlighted.take() {
            self.events.push(StaffEvent::HighlightChanged {
                index: old,
                highlighted: false,
            });
        }
        if let Some(new) = index {
            self.events.push(StaffEvent::HighlightChanged {
                index: new,
                highlighted: true,
            });
        }
        self.highlighted = index;
    }

    // Output

    fn sound_on(&mut self, pitch: Pitch) {
        let holders = self.sounding.entry(pitch).or_insert(0);
        *holders = holders.saturating_add(1);
        if *holders > 1 {
            return;
        }
        if let Err(err) = self.output.sound_on(pitch, self.config.velocity) {
            warn!(%pitch, output = self.output.name(), %err, "sound on failed");
        }
    }

    /// Let go of a pitch. It falls silent once nothing else holds it; pitches
    /// that are not sounding are left alone.
    fn sound_off(&mut self, pitch: Pitch) {
        let Some(holders) = self.sounding.get_mut(&pitch) else {
            return;
        };
        *holders -= 1;
        if *holders > 0 {
            return;
        }
        self.sounding.remove(&pitch);
        if let Err(err) = self.output.sound_off(pitch) {
            warn!(%pitch, output = self.output.name(), %err, "sound off failed");
        }
    }

    /// Silence everything that is still sounding.
    pub fn silence(&mut self) {
        self.held.clear();
        let sounding = std::mem::take(&mut self.sounding);
        for pitch in sounding.into_keys() {
            if let Err(err) = self.output.sound_off(pitch) {
                warn!(%pitch, output = self.output.name(), %err, "sound off failed");
            }
        }
    }

    /// Treat a key as released without waiting for it to come up.
    fn release_held(&mut self, pitch: Pitch) {
        if self.held.remove(&pitch) {
            self.sound_off(pitch);
        }
    }

    fn abandon_live(&mut self) {
        if let Some(live) = self.live.take() {
            debug!(pitch = %live.pitch, "live note dropped");
            self.release_held(live.pitch);
        }
    }

    // Page and settings

    /// Rewrap the staff for a new page width.
    pub fn resize(&mut self, page_width: i32) {
        if page_width == self.layout.page_width() {
            return;
        }
        self.config.page_width = page_width;
        self.layout.relayout(&self.ledger, page_width);
        self.events.push(StaffEvent::LayoutChanged);
    }

    pub fn resize_keyboard(&mut self, width: i32, height: i32) {
        self.keyboard.resize(width, height);
    }

    fn relayout(&mut self) {
        self.layout.relayout(&self.ledger, self.layout.page_width());
        self.events.push(StaffEvent::LayoutChanged);
    }

    pub fn set_beat_ms(&mut self, beat_ms: f64) {
        self.clock.set_beat_ms(beat_ms);
        self.config.beat_ms = self.clock.beat_ms();
    }

    pub fn set_velocity(&mut self, velocity: Velocity) {
        self.config.velocity = velocity;
    }

    pub fn set_keyboard_scale(&mut self, scale_percent: u8) {
        self.keyboard.set_scale_percent(scale_percent);
        self.config.keyboard_scale = self.keyboard.scale_percent();
    }

    /// Stop playback and forget every note.
    pub fn clear(&mut self) {
        self.stop();
        self.end_pitch_drag();
        self.length_edit = None;
        self.abandon_live();
        self.silence();
        self.set_highlight(None);
        self.ledger.clear();
        self.last_release_ms = None;
        self.last_raw_ms = None;
        self.layout.reset();
        self.events.push(StaffEvent::LayoutChanged);
    }

    // Persistence

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecitalError> {
        let path = path.as_ref();
        crate::save_ledger(path, &self.ledger)?;
        info!(path = %path.display(), notes = self.ledger.len(), "saved");
        Ok(())
    }

    /// Replace the ledger with a save file. A corrupt file leaves the staff
    /// untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), RecitalError> {
        let path = path.as_ref();
        let ledger = crate::load_ledger(path)?;
        self.clear();
        self.ledger = ledger;
        self.relayout();
        info!(path = %path.display(), notes = self.ledger.len(), "loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{MemoryOutput, OutputError, OutputEvent};

    fn staff() -> Staff<MemoryOutput> {
        Staff::new(Config::default(), MemoryOutput::new())
    }

    fn e4() -> Pitch {
        Pitch::MIDDLE_C.offset(4)
    }

    fn record(staff: &mut Staff<MemoryOutput>, pitch: Pitch, from_ms: f64, to_ms: f64) {
        staff.press_key(pitch, from_ms);
        staff.release_key(pitch, to_ms);
    }

    #[test]
    fn test_records_notes_and_rests() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        record(&mut staff, e4(), 600.0, 1400.0);

        let notes = staff.ledger().notes();
        assert_eq!(
            notes,
            &[
                Note::new(Some(Pitch::MIDDLE_C), NoteLength::Crotchet),
                Note::rest(NoteLength::Quaver),
                Note::new(Some(e4()), NoteLength::Minim),
            ]
        );
        assert_eq!(staff.layout().len(), 3);
        assert_eq!(
            staff.drain_events(),
            vec![
                StaffEvent::NoteAdded { index: 0 },
                StaffEvent::NoteAdded { index: 1 },
                StaffEvent::NoteAdded { index: 2 },
            ]
        );
        assert_eq!(staff.sounding().count(), 0);
    }

    #[test]
    fn test_short_silence_merges_into_previous_note() {
        let mut staff = staff();
        // 390 ms is 31 units, a dotted quaver
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 390.0);
        assert_eq!(staff.ledger().notes()[0].length, NoteLength::DottedQuaver);

        // 20 ms of silence is too short for a rest; 410 ms is a crotchet
        staff.press_key(e4(), 410.0);
        assert_eq!(staff.ledger().len(), 1);
        assert_eq!(staff.ledger().notes()[0].length, NoteLength::Crotchet);
        assert!(staff
            .drain_events()
            .contains(&StaffEvent::NoteChanged { index: 0 }));
    }

    #[test]
    fn test_second_key_commits_first() {
        let mut staff = staff();
        staff.press_key(Pitch::MIDDLE_C, 0.0);
        staff.press_key(e4(), 400.0);
        assert_eq!(staff.ledger().len(), 1);
        assert_eq!(staff.live_pitch(), Some(e4()));

        // Releasing the first key again changes nothing
        staff.release_key(Pitch::MIDDLE_C, 500.0);
        assert_eq!(staff.ledger().len(), 1);

        staff.release_key(e4(), 800.0);
        assert_eq!(staff.ledger().len(), 2);
        assert_eq!(staff.ledger().notes()[1].length, NoteLength::Crotchet);
        assert_eq!(staff.sounding().count(), 0);
    }

    #[test]
    fn test_live_length_follows_the_clock() {
        let mut staff = staff();
        assert_eq!(staff.live_length(0.0), None);
        staff.press_key(Pitch::MIDDLE_C, 1000.0);
        assert_eq!(staff.live_length(1010.0), Some(NoteLength::None));
        assert_eq!(staff.live_length(1200.0), Some(NoteLength::Quaver));
        assert_eq!(staff.live_length(1400.0), Some(NoteLength::Crotchet));
    }

    #[test]
    fn test_tiny_press_is_still_a_note() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 1.0);
        assert_eq!(staff.ledger().notes()[0].length, NoteLength::SHORTEST);
    }

    #[test]
    fn test_pitch_drag_moves_and_clamps() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.drain_events();

        assert!(staff.begin_pitch_drag(0));
        assert!(!staff.begin_pitch_drag(9));
        staff.begin_pitch_drag(0);

        // Two semitones per 10 px line
        staff.drag_pitch(0, 20);
        assert_eq!(staff.ledger().notes()[0].pitch, Some(Pitch::MIDDLE_C.offset(4)));
        staff.drag_pitch(0, -10);
        assert_eq!(staff.ledger().notes()[0].pitch, Some(Pitch::MIDDLE_C.offset(-2)));

        staff.drag_pitch(0, 10_000);
        assert_eq!(staff.ledger().notes()[0].pitch, Some(Pitch::HIGHEST));
        staff.drag_pitch(0, -10_000);
        assert_eq!(staff.ledger().notes()[0].pitch, None);

        staff.end_pitch_drag();
        assert_eq!(staff.sounding().count(), 0);
        assert_eq!(staff.highlighted(), None);
    }

    #[test]
    fn test_pitch_drag_sounds_the_note() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.output_mut().take_events();

        staff.begin_pitch_drag(0);
        staff.drag_pitch(0, 2);
        staff.drag_pitch(0, 5);
        staff.end_pitch_drag();
        assert_eq!(
            staff.output_mut().take_events(),
            vec![
                OutputEvent::On {
                    pitch: Pitch::MIDDLE_C,
                    velocity: Velocity::Ffff
                },
                OutputEvent::Off {
                    pitch: Pitch::MIDDLE_C
                },
                OutputEvent::On {
                    pitch: Pitch::MIDDLE_C.offset(1),
                    velocity: Velocity::Ffff
                },
                OutputEvent::Off {
                    pitch: Pitch::MIDDLE_C.offset(1)
                },
            ]
        );
    }

    #[test]
    fn test_length_edit_requantizes() {
        let mut staff = staff();
        for i in 0..8 {
            let start = i as f64 * 400.0;
            record(&mut staff, Pitch::MIDDLE_C, start, start + 400.0);
        }
        assert_eq!(staff.layout().bar_lines().len(), 1);

        assert!(staff.begin_length_edit(7, 10_000.0));
        assert_eq!(staff.live_length(10_200.0), Some(NoteLength::Quaver));
        assert_eq!(staff.end_length_edit(10_200.0), Some(NoteLength::Quaver));
        assert_eq!(staff.ledger().notes()[7].length, NoteLength::Quaver);
        assert!(staff.layout().bar_lines().is_empty());
        assert_eq!(staff.end_length_edit(11_000.0), None);
    }

    #[test]
    fn test_remove_note_relayouts() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        record(&mut staff, e4(), 400.0, 800.0);
        staff.drain_events();

        assert_eq!(staff.remove_note(0).map(|n| n.pitch), Some(Some(Pitch::MIDDLE_C)));
        assert_eq!(staff.remove_note(5), None);
        assert_eq!(staff.layout().len(), 1);
        assert_eq!(
            staff.drain_events(),
            vec![StaffEvent::NoteRemoved { index: 0 }, StaffEvent::LayoutChanged]
        );
    }

    #[test]
    fn test_playback_drives_output_and_highlight() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        record(&mut staff, e4(), 600.0, 1400.0);
        staff.output_mut().take_events();
        staff.drain_events();

        staff.play();
        assert_eq!(staff.highlighted(), Some(0));
        staff.tick(400.0);
        assert_eq!(staff.highlighted(), Some(1));
        assert_eq!(staff.sounding().count(), 0);
        staff.tick(200.0);
        assert_eq!(staff.sounding().collect::<Vec<_>>(), vec![e4()]);
        staff.tick(800.0);
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
        assert_eq!(staff.highlighted(), None);

        let on_count = staff
            .output()
            .events()
            .iter()
            .filter(|e| matches!(e, OutputEvent::On { .. }))
            .count();
        assert_eq!(on_count, 2);

        let events = staff.drain_events();
        assert_eq!(events.first(), Some(&StaffEvent::HighlightChanged { index: 0, highlighted: true }));
        assert!(events.contains(&StaffEvent::PlaybackStarted));
        assert_eq!(events.last(), Some(&StaffEvent::PlaybackStopped));
    }

    #[test]
    fn test_keys_sound_but_do_not_record_during_playback() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.play();
        staff.press_key(e4(), 1000.0);
        assert!(staff.sounding().any(|p| p == e4()));
        staff.release_key(e4(), 1400.0);
        assert_eq!(staff.ledger().len(), 1);
        staff.stop();
        assert_eq!(staff.sounding().count(), 0);
    }

    fn minim_c4() -> Staff<MemoryOutput> {
        let mut ledger = Ledger::new();
        ledger.append(Some(Pitch::MIDDLE_C), NoteLength::Minim);
        Staff::with_ledger(Config::default(), MemoryOutput::new(), ledger)
    }

    #[test]
    fn test_key_on_the_playing_pitch_leaves_playback_sounding() {
        let mut staff = minim_c4();
        staff.play();
        staff.press_key(Pitch::MIDDLE_C, 0.0);
        staff.release_key(Pitch::MIDDLE_C, 100.0);
        staff.tick(100.0);
        assert_eq!(staff.sounding().collect::<Vec<_>>(), vec![Pitch::MIDDLE_C]);
        assert_eq!(staff.highlighted(), Some(0));
        assert_eq!(
            staff.output().events(),
            &[OutputEvent::On {
                pitch: Pitch::MIDDLE_C,
                velocity: Velocity::Ffff
            }]
        );

        staff.tick(700.0);
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
        assert_eq!(staff.sounding().count(), 0);
        assert_eq!(
            staff.output().events().last(),
            Some(&OutputEvent::Off {
                pitch: Pitch::MIDDLE_C
            })
        );
        assert_eq!(staff.output().events().len(), 2);
    }

    #[test]
    fn test_held_key_outlasts_the_playing_note() {
        let mut staff = minim_c4();
        staff.play();
        staff.press_key(Pitch::MIDDLE_C, 0.0);
        staff.press_key(Pitch::MIDDLE_C, 50.0);
        staff.tick(800.0);
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
        assert_eq!(staff.sounding().collect::<Vec<_>>(), vec![Pitch::MIDDLE_C]);
        assert_eq!(staff.output().events().len(), 1);

        staff.release_key(Pitch::MIDDLE_C, 900.0);
        assert_eq!(staff.sounding().count(), 0);
        assert_eq!(
            staff.output().events(),
            &[
                OutputEvent::On {
                    pitch: Pitch::MIDDLE_C,
                    velocity: Velocity::Ffff
                },
                OutputEvent::Off {
                    pitch: Pitch::MIDDLE_C
                },
            ]
        );
        assert_eq!(staff.ledger().len(), 1);
    }

    #[test]
    fn test_paused_staff_records() {
        let mut staff = minim_c4();
        staff.play();
        staff.pause();
        record(&mut staff, e4(), 1000.0, 1400.0);
        assert_eq!(
            staff.ledger().notes()[1],
            Note::new(Some(e4()), NoteLength::Crotchet)
        );

        staff.resume();
        staff.press_key(e4(), 2000.0);
        staff.release_key(e4(), 2400.0);
        assert_eq!(staff.ledger().len(), 2);
    }

    #[test]
    fn test_remove_note_stops_playback() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        record(&mut staff, e4(), 400.0, 800.0);
        staff.play();
        staff.tick(400.0);
        assert_eq!(staff.highlighted(), Some(1));
        staff.drain_events();

        staff.remove_note(0);
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
        assert_eq!(staff.highlighted(), None);
        assert_eq!(staff.sounding().count(), 0);
        assert_eq!(
            staff.drain_events(),
            vec![
                StaffEvent::HighlightChanged {
                    index: 1,
                    highlighted: false
                },
                StaffEvent::PlaybackStopped,
                StaffEvent::NoteRemoved { index: 0 },
                StaffEvent::LayoutChanged,
            ]
        );
    }

    #[test]
    fn test_drag_saturates_at_extreme_travel() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.begin_pitch_drag(0);
        staff.drag_pitch(0, i32::MAX);
        assert_eq!(staff.ledger().notes()[0].pitch, Some(Pitch::HIGHEST));
        staff.drag_pitch(0, i32::MIN);
        assert_eq!(staff.ledger().notes()[0].pitch, None);
        staff.end_pitch_drag();
        assert_eq!(staff.sounding().count(), 0);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.play();
        staff.pause();
        assert_eq!(staff.playback_state(), PlaybackState::Paused);
        assert_eq!(staff.sounding().count(), 0);
        staff.resume();
        assert_eq!(staff.sounding().collect::<Vec<_>>(), vec![Pitch::MIDDLE_C]);
        staff.stop();
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_resize_only_relayouts_on_change() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.drain_events();
        staff.resize(624);
        assert!(staff.drain_events().is_empty());
        staff.resize(300);
        assert_eq!(staff.drain_events(), vec![StaffEvent::LayoutChanged]);
        assert_eq!(staff.layout().page_width(), 300);
    }

    #[test]
    fn test_setters_clamp() {
        let mut staff = staff();
        staff.set_beat_ms(-3.0);
        assert_eq!(staff.clock().beat_ms(), 1.0);
        staff.set_keyboard_scale(0);
        assert_eq!(staff.keyboard().scale_percent(), 1);
        staff.set_velocity(Velocity::Mp);
        staff.press_key(Pitch::MIDDLE_C, 0.0);
        assert_eq!(
            staff.output().events().last(),
            Some(&OutputEvent::On {
                pitch: Pitch::MIDDLE_C,
                velocity: Velocity::Mp
            })
        );
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        staff.play();
        staff.clear();
        assert!(staff.ledger().is_empty());
        assert!(staff.layout().is_empty());
        assert!(!staff.is_playing());
        assert_eq!(staff.sounding().count(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("recital-staff-{}.txt", std::process::id()));
        let mut staff = staff();
        record(&mut staff, Pitch::MIDDLE_C, 0.0, 400.0);
        record(&mut staff, e4(), 600.0, 1400.0);
        staff.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "25,32\n0,16\n29,64\n");

        let mut other = Staff::new(Config::default(), MemoryOutput::new());
        record(&mut other, Pitch::LOWEST, 0.0, 100.0);
        other.load(&path).unwrap();
        assert_eq!(other.ledger(), staff.ledger());
        assert_eq!(other.layout().len(), 3);

        std::fs::write(&path, "25,32\nbroken\n").unwrap();
        assert!(matches!(
            other.load(&path),
            Err(RecitalError::CorruptLedger { line: 2, .. })
        ));
        assert_eq!(other.ledger().len(), 3);

        std::fs::remove_file(&path).ok();
    }

    struct FailingOutput;

    impl PitchOutput for FailingOutput {
        fn sound_on(&mut self, _pitch: Pitch, _velocity: Velocity) -> Result<(), OutputError> {
            Err(OutputError::Send("unplugged".to_string()))
        }

        fn sound_off(&mut self, _pitch: Pitch) -> Result<(), OutputError> {
            Err(OutputError::Send("unplugged".to_string()))
        }
    }

    #[test]
    fn test_output_failures_do_not_stop_playback() {
        let mut ledger = Ledger::new();
        ledger.append(Some(Pitch::MIDDLE_C), NoteLength::Crotchet);
        ledger.append(Some(e4()), NoteLength::Crotchet);
        let mut staff = Staff::with_ledger(Config::default(), FailingOutput, ledger);
        staff.play();
        staff.tick(400.0);
        assert_eq!(staff.highlighted(), Some(1));
        staff.tick(400.0);
        assert_eq!(staff.playback_state(), PlaybackState::Stopped);
    }
}
