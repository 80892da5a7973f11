use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::ffmpeg::EncodeSettings;

/// Defaults that can be saved to a file and merged under command-line
/// arguments.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_silence: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_silence: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub silence_level: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_files: Option<bool>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    /// Config file path (`~/.config/chapterize/defaults.toml`).
    pub fn get_config_path() -> Result<PathBuf, io::Error> {
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(io::ErrorKind::NotFound, "HOME environment variable not set")
        })?;

        let config_dir = Path::new(&home).join(".config").join("chapterize");
        Ok(config_dir.join("defaults.toml"))
    }

    /// Load the defaults file; an absent file is an empty config.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Config::new());
        }

        let content = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    /// Merge with another config, preferring values from `other`.
    pub fn merge(&mut self, other: &Config) {
        if other.bitrate.is_some() {
            self.bitrate = other.bitrate.clone();
        }
        if other.sample_rate.is_some() {
            self.sample_rate = other.sample_rate;
        }
        if other.min_silence.is_some() {
            self.min_silence = other.min_silence;
        }
        if other.max_silence.is_some() {
            self.max_silence = other.max_silence;
        }
        if other.silence_level.is_some() {
            self.silence_level = other.silence_level;
        }
        if other.keep_files.is_some() {
            self.keep_files = other.keep_files;
        }
    }

    /// Encode settings with crate defaults applied for unset fields.
    pub fn encode_settings(&self) -> EncodeSettings {
        let mut enc = EncodeSettings::default();
        if let Some(bitrate) = &self.bitrate {
            enc.bitrate = bitrate.clone();
        }
        if let Some(sample_rate) = self.sample_rate {
            enc.sample_rate = sample_rate;
        }
        enc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            bitrate: Some("96k".to_string()),
            sample_rate: Some(22_050),
            ..Config::new()
        };
        let other = Config {
            bitrate: Some("128k".to_string()),
            max_silence: Some(3.0),
            ..Config::new()
        };

        base.merge(&other);
        assert_eq!(base.bitrate.as_deref(), Some("128k"));
        assert_eq!(base.sample_rate, Some(22_050));
        assert_eq!(base.max_silence, Some(3.0));
    }

    #[test]
    fn test_encode_settings_defaults() {
        let enc = Config::new().encode_settings();
        assert_eq!(enc.bitrate, "112k");
        assert_eq!(enc.sample_rate, 44_100);
        assert!(!enc.copy_audio);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            bitrate: Some("64k".to_string()),
            min_silence: Some(1.5),
            keep_files: Some(true),
            ..Config::new()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.bitrate.as_deref(), Some("64k"));
        assert_eq!(back.min_silence, Some(1.5));
        assert_eq!(back.keep_files, Some(true));
        assert!(back.sample_rate.is_none());
    }
}
