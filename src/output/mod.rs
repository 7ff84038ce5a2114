//! # Pitch Output
//!
//! The sink that turns note-on and note-off requests into sound. The staff calls
//! it synchronously on every playback transition and every direct key press.
//! Sinks are best effort: a failed call is logged by the caller and playback
//! carries on.
//!
//! ## Sinks
//! - [`MutedOutput`] - discards everything; used when no device could be opened
//! - [`MemoryOutput`] - records every call, for tests and dry runs
//! - `MidirOutput` - a real MIDI port (cargo feature `midir`)
//!
//! ## Wire format
//! Note-on is `0x90 | channel, key, velocity` and note-off is
//! `0x80 | channel, key, 0`, where `key` is the pitch's MIDI number.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::pitch::{Pitch, Velocity};

#[cfg(feature = "midir")]
mod midir;

#[cfg(feature = "midir")]
pub use self::midir::MidirOutput;

#[derive(Error, Debug)]
pub enum OutputError {
    /// No device could be opened.
    #[error("MIDI output unavailable: {0}")]
    Unavailable(String),

    /// The device refused a message.
    #[error("failed to send MIDI message: {0}")]
    Send(String),
}

/// Where sounding pitches go.
pub trait PitchOutput {
    fn sound_on(&mut self, pitch: Pitch, velocity: Velocity) -> Result<(), OutputError>;

    fn sound_off(&mut self, pitch: Pitch) -> Result<(), OutputError>;

    /// Human readable name for logs.
    fn name(&self) -> &str {
        "output"
    }
}

impl<T: PitchOutput + ?Sized> PitchOutput for Box<T> {
    fn sound_on(&mut self, pitch: Pitch, velocity: Velocity) -> Result<(), OutputError> {
        (**self).sound_on(pitch, velocity)
    }

    fn sound_off(&mut self, pitch: Pitch) -> Result<(), OutputError> {
        (**self).sound_off(pitch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
}

impl MidiMessage {
    pub fn note_on(pitch: Pitch, velocity: Velocity) -> Self {
        MidiMessage::NoteOn {
            channel: 0,
            key: pitch.midi(),
            velocity: velocity.value(),
        }
    }

    pub fn note_off(pitch: Pitch) -> Self {
        MidiMessage::NoteOff {
            channel: 0,
            key: pitch.midi(),
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        match self {
            MidiMessage::NoteOn {
                channel,
                key,
                velocity,
            } => [0x90 | (channel & 0x0f), key & 0x7f, velocity & 0x7f],
            MidiMessage::NoteOff { channel, key } => [0x80 | (channel & 0x0f), key & 0x7f, 0],
        }
    }
}

/// Output used when no device is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct MutedOutput;

impl PitchOutput for MutedOutput {
    fn sound_on(&mut self, _pitch: Pitch, _velocity: Velocity) -> Result<(), OutputError> {
        Ok(())
    }

    fn sound_off(&mut self, _pitch: Pitch) -> Result<(), OutputError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "muted"
    }
}

/// One recorded sink call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutputEvent {
    On { pitch: Pitch, velocity: Velocity },
    Off { pitch: Pitch },
}

/// Output that remembers every call in order.
#[derive(Debug, Default, Clone)]
pub struct MemoryOutput {
    events: Vec<OutputEvent>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[OutputEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<OutputEvent> {
        std::mem::take(&mut self.events)
    }
}

impl PitchOutput for MemoryOutput {
    fn sound_on(&mut self, pitch: Pitch, velocity: Velocity) -> Result<(), OutputError> {
        self.events.push(OutputEvent::On { pitch, velocity });
        Ok(())
    }

    fn sound_off(&mut self, pitch: Pitch) -> Result<(), OutputError> {
        self.events.push(OutputEvent::Off { pitch });
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Open the output for a port index, falling back to [`MutedOutput`].
///
/// The device is opened once. If it cannot be opened the problem is reported
/// once and the caller keeps running muted.
#[cfg(feature = "midir")]
pub fn open_output(port: Option<usize>) -> Box<dyn PitchOutput> {
    match MidirOutput::connect(port.unwrap_or(0)) {
        Ok(output) => Box::new(output),
        Err(err) => {
            warn!(%err, "continuing without sound");
            Box::new(MutedOutput)
        }
    }
}

#[cfg(not(feature = "midir"))]
pub fn open_output(port: Option<usize>) -> Box<dyn PitchOutput> {
    if let Some(port) = port {
        warn!(port, "built without MIDI support, continuing without sound");
    }
    Box::new(MutedOutput)
}

/// Names of the available MIDI output ports.
#[cfg(feature = "midir")]
pub fn list_ports() -> Result<Vec<String>, OutputError> {
    MidirOutput::port_names()
}

#[cfg(not(feature = "midir"))]
pub fn list_ports() -> Result<Vec<String>, OutputError> {
    Err(OutputError::Unavailable(
        "built without the `midir` feature".to_string(),
    ))
}
