use super::probe;
use crate::events::EventSink;
use std::path::Path;
use std::process::Stdio;

#[cfg(windows)]
pub(crate) const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Locations of the FFmpeg binaries used for probing and merging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FFmpegWrapper {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FFmpegWrapper {
    pub fn new() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }

    pub fn with_paths(ffmpeg_path: String, ffprobe_path: String) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }

    /// Check if FFmpeg is available
    pub fn is_available(&self) -> bool {
        let mut cmd = std::process::Command::new(&self.ffmpeg_path);
        cmd.arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd.status().map(|s| s.success()).unwrap_or(false)
    }

    /// Container duration in seconds, 0.0 when it cannot be determined
    pub fn probe_duration(&self, path: &Path, sink: &EventSink) -> f64 {
        probe::probe_duration(self.ffprobe_path(), path, sink)
    }

    /// Sorted, distinct audio stream indices, empty when they cannot be determined
    pub fn probe_audio_channels(&self, path: &Path, sink: &EventSink) -> Vec<u32> {
        probe::probe_audio_channels(self.ffprobe_path(), path, sink)
    }
}

impl Default for FFmpegWrapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let ffmpeg = FFmpegWrapper::with_paths(
            "/nonexistent/ffmpeg-binary".to_string(),
            "/nonexistent/ffprobe-binary".to_string(),
        );
        assert!(!ffmpeg.is_available());
    }
}
