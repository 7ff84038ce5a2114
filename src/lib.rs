pub mod config;
pub mod error;
pub mod keyboard;
pub mod layout;
pub mod ledger;
pub mod length;
pub mod output;
pub mod pitch;
pub mod playback;
pub mod staff;

use std::path::Path;

pub use config::Config;
pub use error::*;
pub use keyboard::{KeyboardGeometry, Point, QwertyMapper, Rect};
pub use layout::{compute_layout, Layout, LayoutMetrics};
pub use ledger::{Ledger, Note};
pub use length::{BeatClock, NoteLength};
pub use output::{MemoryOutput, MutedOutput, OutputError, PitchOutput};
pub use pitch::{Pitch, Velocity};
pub use playback::{Cue, PlaybackState, Sequencer};
pub use staff::{Staff, StaffEvent};

/// Read a save file into a ledger.
/// Fails on the first corrupt line.
pub fn load_ledger(path: impl AsRef<Path>) -> Result<Ledger, RecitalError> {
    let text = std::fs::read_to_string(path)?;
    Ledger::deserialize(&text)
}

/// Write a ledger in the save format.
pub fn save_ledger(path: impl AsRef<Path>, ledger: &Ledger) -> Result<(), RecitalError> {
    std::fs::write(path, ledger.serialize())?;
    Ok(())
}

/// Total playing time of a ledger at a given tempo.
pub fn ledger_duration_ms(ledger: &Ledger, clock: &BeatClock) -> f64 {
    ledger.iter().map(|note| clock.duration_ms(note.length)).sum()
}
