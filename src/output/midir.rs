use ::midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

use super::{MidiMessage, OutputError, PitchOutput};
use crate::pitch::{Pitch, Velocity};

const CLIENT_NAME: &str = "recital";

/// Output backed by a `midir` port connection.
pub struct MidirOutput {
    name: String,
    connection: MidiOutputConnection,
}

impl MidirOutput {
    /// Connect to the output port at `port_index`.
    pub fn connect(port_index: usize) -> Result<Self, OutputError> {
        let output = MidiOutput::new(CLIENT_NAME)
            .map_err(|err| OutputError::Unavailable(format!("initialise midir: {err}")))?;
        let ports = output.ports();
        let Some(port) = ports.get(port_index) else {
            return Err(OutputError::Unavailable(format!(
                "no output port at index {port_index} ({} available)",
                ports.len()
            )));
        };
        let name = output
            .port_name(port)
            .unwrap_or_else(|_| format!("Port {port_index}"));
        let connection = output
            .connect(port, "recital-output")
            .map_err(|err| OutputError::Unavailable(format!("connect to {name}: {err}")))?;
        info!(port = %name, "opened MIDI output");
        Ok(Self { name, connection })
    }

    /// Names of every output port, in index order.
    pub fn port_names() -> Result<Vec<String>, OutputError> {
        let output = MidiOutput::new(CLIENT_NAME)
            .map_err(|err| OutputError::Unavailable(format!("initialise midir: {err}")))?;
        let names = output
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                output
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Port {index}"))
            })
            .collect();
        Ok(names)
    }

    fn send(&mut self, message: MidiMessage) -> Result<(), OutputError> {
        self.connection
            .send(&message.to_bytes())
            .map_err(|err| OutputError::Send(err.to_string()))
    }
}

impl PitchOutput for MidirOutput {
    fn sound_on(&mut self, pitch: Pitch, velocity: Velocity) -> Result<(), OutputError> {
        self.send(MidiMessage::note_on(pitch, velocity))
    }

    fn sound_off(&mut self, pitch: Pitch) -> Result<(), OutputError> {
        self.send(MidiMessage::note_off(pitch))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
