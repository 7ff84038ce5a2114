//! # Configuration
//!
//! Runtime settings for a staff, read from an optional YAML file with kebab-case
//! keys. Every key may be left out:
//!
//! ```yaml
//! beat-ms: 400          # milliseconds per crotchet, 1..=10000
//! keyboard-scale: 100   # percent of the window width used by the keyboard
//! white-keys: 29        # 1..=36
//! velocity: ffff        # silent, pppp, ppp, pp, p, mp, mf, f, ff, fff, ffff
//! page-width: 624       # staff width in pixels
//! midi-port: 0          # output port index
//! ```
//!
//! A settings file is external input, so out-of-range values are rejected with
//! [`RecitalError::Config`]. The runtime setters on the staff clamp instead.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::RecitalError;
use crate::keyboard::KeyboardGeometry;
use crate::length::BeatClock;
use crate::pitch::Velocity;

/// Settings file as written, before validation.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawConfig {
    pub beat_ms: Option<f64>,
    pub keyboard_scale: Option<u8>,
    pub white_keys: Option<u8>,
    pub velocity: Option<String>,
    pub page_width: Option<i32>,
    pub midi_port: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub beat_ms: f64,
    pub keyboard_scale: u8,
    pub white_keys: u8,
    pub velocity: Velocity,
    pub page_width: i32,
    pub midi_port: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            beat_ms: BeatClock::DEFAULT_BEAT_MS,
            keyboard_scale: 100,
            white_keys: KeyboardGeometry::DEFAULT_WHITE_KEYS,
            velocity: Velocity::default(),
            page_width: 624,
            midi_port: None,
        }
    }
}

impl Config {
    /// Parse and validate a YAML settings document.
    pub fn from_yaml(text: &str) -> Result<Self, RecitalError> {
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(text).map_err(|e| RecitalError::Config(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Read a settings file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecitalError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self, RecitalError> {
        let defaults = Config::default();

        let beat_ms = match raw.beat_ms {
            Some(ms) if !(BeatClock::MIN_BEAT_MS..=BeatClock::MAX_BEAT_MS).contains(&ms) => {
                return Err(RecitalError::Config(format!(
                    "beat-ms must be between {} and {}, got {}",
                    BeatClock::MIN_BEAT_MS,
                    BeatClock::MAX_BEAT_MS,
                    ms
                )));
            }
            Some(ms) => ms,
            None => defaults.beat_ms,
        };

        let keyboard_scale = match raw.keyboard_scale {
            Some(scale) if !(1..=100).contains(&scale) => {
                return Err(RecitalError::Config(format!(
                    "keyboard-scale must be between 1 and 100, got {}",
                    scale
                )));
            }
            Some(scale) => scale,
            None => defaults.keyboard_scale,
        };

        let white_keys = match raw.white_keys {
            Some(keys) if !(1..=KeyboardGeometry::MAX_WHITE_KEYS).contains(&keys) => {
                return Err(RecitalError::Config(format!(
                    "white-keys must be between 1 and {}, got {}",
                    KeyboardGeometry::MAX_WHITE_KEYS,
                    keys
                )));
            }
            Some(keys) => keys,
            None => defaults.white_keys,
        };

        let velocity = match raw.velocity {
            Some(ref name) => name.parse()?,
            None => defaults.velocity,
        };

        let page_width = match raw.page_width {
            Some(width) if width <= 0 => {
                return Err(RecitalError::Config(format!(
                    "page-width must be positive, got {}",
                    width
                )));
            }
            Some(width) => width,
            None => defaults.page_width,
        };

        Ok(Config {
            beat_ms,
            keyboard_scale,
            white_keys,
            velocity,
            page_width,
            midi_port: raw.midi_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
beat-ms: 500
keyboard-scale: 80
white-keys: 15
velocity: mf
page-width: 1000
midi-port: 2
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.beat_ms, 500.0);
        assert_eq!(config.keyboard_scale, 80);
        assert_eq!(config.white_keys, 15);
        assert_eq!(config.velocity, Velocity::Mf);
        assert_eq!(config.page_width, 1000);
        assert_eq!(config.midi_port, Some(2));
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = Config::from_yaml("beat-ms: 250\n").unwrap();
        assert_eq!(config.beat_ms, 250.0);
        assert_eq!(config.white_keys, 29);
        assert_eq!(config.velocity, Velocity::Ffff);
        assert_eq!(config.midi_port, None);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for yaml in [
            "beat-ms: 0",
            "beat-ms: 20000",
            "keyboard-scale: 0",
            "keyboard-scale: 101",
            "white-keys: 0",
            "white-keys: 37",
            "page-width: -5",
            "velocity: loud",
        ] {
            match Config::from_yaml(yaml) {
                Err(RecitalError::Config(_)) => {}
                other => panic!("expected config error for {:?}, got {:?}", yaml, other),
            }
        }
    }

    #[test]
    fn test_unknown_keys_and_bad_yaml_are_rejected() {
        assert!(matches!(
            Config::from_yaml("tempo: 120"),
            Err(RecitalError::Config(_))
        ));
        assert!(matches!(
            Config::from_yaml("beat-ms: [1, 2"),
            Err(RecitalError::Config(_))
        ));
    }
}
