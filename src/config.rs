use crate::ffmpeg::FFmpegWrapper;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "audio_merger.json";
pub const CONFIG_PATH_ENV: &str = "AUDIO_MERGER_CONFIG";
pub const FFMPEG_PATH_ENV: &str = "AUDIO_MERGER_FFMPEG";
pub const FFPROBE_PATH_ENV: &str = "AUDIO_MERGER_FFPROBE";

/// Startup settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergerConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// Preselected output directory
    pub output_directory: Option<PathBuf>,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            output_directory: None,
        }
    }
}

impl MergerConfig {
    /// Load from `$AUDIO_MERGER_CONFIG` or `./audio_merger.json`, then apply
    /// environment overrides. A broken file is reported and ignored.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        let mut config = if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring configuration file: {:#}", e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_overrides(
            std::env::var(FFMPEG_PATH_ENV).ok(),
            std::env::var(FFPROBE_PATH_ENV).ok(),
        );
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn apply_overrides(&mut self, ffmpeg: Option<String>, ffprobe: Option<String>) {
        if let Some(path) = ffmpeg.filter(|p| !p.trim().is_empty()) {
            self.ffmpeg_path = path;
        }
        if let Some(path) = ffprobe.filter(|p| !p.trim().is_empty()) {
            self.ffprobe_path = path;
        }
    }

    pub fn ffmpeg(&self) -> FFmpegWrapper {
        FFmpegWrapper::with_paths(self.ffmpeg_path.clone(), self.ffprobe_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "ffmpeg_path": "/opt/ffmpeg/bin/ffmpeg" }"#).unwrap();

        let config = MergerConfig::load_from(&path).unwrap();
        assert_eq!(config.ffmpeg_path, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.ffprobe_path, "ffprobe");
        assert_eq!(config.output_directory, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "not json").unwrap();

        let err = MergerConfig::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn test_overrides_ignore_blank_values() {
        let mut config = MergerConfig::default();
        config.apply_overrides(Some("/usr/local/bin/ffmpeg".to_string()), Some("  ".to_string()));
        assert_eq!(config.ffmpeg_path, "/usr/local/bin/ffmpeg");
        assert_eq!(config.ffprobe_path, "ffprobe");

        let ffmpeg = config.ffmpeg();
        assert_eq!(ffmpeg.ffmpeg_path(), "/usr/local/bin/ffmpeg");
    }
}
