//! Player configuration, loadable from a JSON file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "tempo_bpm": 72, "roll": { "cell_width": 12 } }
//! ```

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    audio::{PlaybackSettings, DEFAULT_TEMPO_BPM},
    roll::RollLayout,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub tempo_bpm: f64,
    /// Chords requested from the generation service
    pub length: usize,
    /// Rest probability sent with random-seed requests
    pub rest_probability: f64,
    pub playback: PlaybackSettings,
    pub roll: RollLayout,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: DEFAULT_TEMPO_BPM,
            length: 56,
            rest_probability: 0.2,
            playback: PlaybackSettings::default(),
            roll: RollLayout::default(),
        }
    }
}

impl PlayerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        assert_eq!(PlayerConfig::from_json("{}").unwrap(), PlayerConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = PlayerConfig::from_json(
            r#"{ "tempo_bpm": 72, "roll": { "cell_width": 12 }, "playback": { "peak": 0.5 } }"#,
        )
        .unwrap();

        assert_eq!(config.tempo_bpm, 72.0);
        assert_eq!(config.roll.cell_width, 12);
        assert_eq!(config.roll.row_height, 6);
        assert_eq!(config.playback.envelope.peak, 0.5);
        assert_eq!(config.playback.lead_in, 0.1);
        assert_eq!(config.length, 56);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            PlayerConfig::from_json("{ tempo"),
            Err(ConfigError::Parse(_))
        ));
    }
}
