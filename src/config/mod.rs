// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for the recorder.
//!
//! A studio file holds the tempo and time signature applied at export,
//! where recordings are saved, and which MIDI source to listen on. Files
//! ending in `.toml` are read as TOML, anything else as YAML.

pub mod watcher;

pub use watcher::{ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::timing::TempoSignature;

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StudioConfig {
    /// Tempo and time signature
    #[serde(default)]
    pub tempo: TempoConfig,
    /// Where and how recordings are saved
    #[serde(default)]
    pub recording: RecordingConfig,
    /// MIDI input selection
    #[serde(default)]
    pub input: InputConfig,
}

impl StudioConfig {
    /// Load a configuration file, choosing the format by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if is_toml(path) {
            Self::from_toml(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Parse a configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Parse a configuration from TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration to TOML")
    }

    /// Save configuration, choosing the format by extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_yaml()?
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Tempo snapshot described by this configuration
    pub fn tempo_signature(&self) -> TempoSignature {
        self.tempo.to_signature()
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

/// Tempo configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TempoConfig {
    /// Tempo in BPM (20-300)
    #[serde(default = "default_bpm")]
    pub bpm: u16,
    /// Time signature numerator (1-32)
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u8,
    /// Time signature denominator (1, 2, 4, 8, 16, 32 or 64)
    #[serde(default = "default_beat_unit")]
    pub beat_unit: u8,
}

fn default_bpm() -> u16 {
    120
}
fn default_beats_per_measure() -> u8 {
    4
}
fn default_beat_unit() -> u8 {
    4
}

impl TempoConfig {
    /// Convert to a tempo snapshot, saturating out-of-range values
    pub fn to_signature(&self) -> TempoSignature {
        TempoSignature::new(self.bpm, self.beats_per_measure, self.beat_unit)
    }
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            bpm: default_bpm(),
            beats_per_measure: default_beats_per_measure(),
            beat_unit: default_beat_unit(),
        }
    }
}

/// Recording output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingConfig {
    /// Directory recordings are saved into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Recording length for unattended takes, in seconds
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u64,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("recordings")
}
fn default_max_seconds() -> u64 {
    30
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_seconds: default_max_seconds(),
        }
    }
}

/// MIDI input configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InputConfig {
    /// Source index as listed by `--list-sources` (None = first source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.tempo.bpm, 120);
        assert_eq!(config.tempo.beats_per_measure, 4);
        assert_eq!(config.tempo.beat_unit, 4);
        assert_eq!(config.recording.output_dir, PathBuf::from("recordings"));
        assert_eq!(config.input.source, None);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
tempo:
  bpm: 96
  beats_per_measure: 6
  beat_unit: 8
recording:
  output_dir: "/tmp/takes"
input:
  source: 2
"#;

        let config = StudioConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.tempo.bpm, 96);
        assert_eq!(config.tempo_signature(), TempoSignature::new(96, 6, 8));
        assert_eq!(config.recording.output_dir, PathBuf::from("/tmp/takes"));
        assert_eq!(config.recording.max_seconds, 30);
        assert_eq!(config.input.source, Some(2));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = StudioConfig::from_yaml("tempo:\n  bpm: 140\n").unwrap();
        assert_eq!(config.tempo.bpm, 140);
        assert_eq!(config.tempo.beat_unit, 4);
        assert_eq!(config.recording, RecordingConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
[tempo]
bpm = 72
beats_per_measure = 3

[recording]
max_seconds = 10
"#;

        let config = StudioConfig::from_toml(text).unwrap();
        assert_eq!(config.tempo_signature(), TempoSignature::new(72, 3, 4));
        assert_eq!(config.recording.max_seconds, 10);
    }

    #[test]
    fn test_out_of_range_tempo_saturated() {
        let config = StudioConfig::from_yaml("tempo:\n  bpm: 1000\n  beats_per_measure: 0\n  beat_unit: 3\n").unwrap();
        let sig = config.tempo_signature();
        assert_eq!(sig.bpm, 300);
        assert_eq!(sig.beats_per_measure, 1);
        assert_eq!(sig.normalized_beat_unit(), 4);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(StudioConfig::from_yaml("tempo: [").is_err());
    }

    #[test]
    fn test_save_load_by_extension() {
        let dir = tempdir().unwrap();
        let mut config = StudioConfig::default();
        config.tempo.bpm = 88;

        for name in ["studio.yaml", "studio.toml"] {
            let path = dir.path().join(name);
            config.save(&path).unwrap();
            assert_eq!(StudioConfig::load(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(StudioConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
