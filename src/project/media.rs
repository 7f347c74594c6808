use crate::utils::{display_name, format_duration};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Video containers accepted for merging
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi"];

/// Check if a path has one of the accepted extensions (case-insensitive)
pub fn is_supported_media(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// A registered input file and its channel selection.
///
/// `selected_channels` is always an ascending, duplicate-free subset of
/// `detected_channels`; it can only change through [`MediaFile::toggle_channel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub duration_seconds: f64,
    detected_channels: Vec<u32>,
    selected_channels: Vec<u32>,
}

impl MediaFile {
    /// Every detected channel starts out selected
    pub fn new(path: PathBuf, duration_seconds: f64, mut detected_channels: Vec<u32>) -> Self {
        detected_channels.sort_unstable();
        detected_channels.dedup();
        Self {
            path,
            duration_seconds: duration_seconds.max(0.0),
            selected_channels: detected_channels.clone(),
            detected_channels,
        }
    }

    pub fn detected_channels(&self) -> &[u32] {
        &self.detected_channels
    }

    pub fn selected_channels(&self) -> &[u32] {
        &self.selected_channels
    }

    pub fn is_selected(&self, channel: u32) -> bool {
        self.selected_channels.binary_search(&channel).is_ok()
    }

    /// Select or deselect one channel. Returns true if the selection changed;
    /// channels that were never detected are refused.
    pub fn toggle_channel(&mut self, channel: u32, selected: bool) -> bool {
        if self.detected_channels.binary_search(&channel).is_err() {
            return false;
        }

        match (self.selected_channels.binary_search(&channel), selected) {
            (Err(pos), true) => {
                self.selected_channels.insert(pos, channel);
                true
            }
            (Ok(pos), false) => {
                self.selected_channels.remove(pos);
                true
            }
            _ => false,
        }
    }

    pub fn filename(&self) -> String {
        display_name(&self.path)
    }

    pub fn duration_string(&self) -> String {
        format_duration(self.duration_seconds)
    }
}
