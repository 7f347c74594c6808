use crate::events::EventSink;
use crate::utils::display_name;
use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use std::path::Path;
use std::process::{Command, Stdio};

const DURATION_ARGS: [&str; 6] = [
    "-v", "error",
    "-show_entries", "format=duration",
    "-of", "default=noprint_wrappers=1:nokey=1",
];

const AUDIO_STREAM_ARGS: [&str; 8] = [
    "-v", "error",
    "-select_streams", "a",
    "-show_entries", "stream=index",
    "-of", "csv=p=0",
];

/// Ask ffprobe for the container duration. Any failure is reported to the
/// sink and degrades to 0.0.
pub fn probe_duration(ffprobe: &str, path: &Path, sink: &EventSink) -> f64 {
    let result = run_ffprobe(ffprobe, &DURATION_ARGS, path)
        .and_then(|stdout| parse_duration_output(&stdout));

    match result {
        Ok(duration) => duration,
        Err(e) => {
            warn!("Duration probe failed for {:?}: {:#}", path, e);
            sink.log(format!(
                "ERROR: Could not detect duration for '{}': {:#}",
                display_name(path),
                e
            ));
            0.0
        }
    }
}

/// Ask ffprobe for the indices of all audio streams. Any failure is reported
/// to the sink and degrades to an empty list.
pub fn probe_audio_channels(ffprobe: &str, path: &Path, sink: &EventSink) -> Vec<u32> {
    match run_ffprobe(ffprobe, &AUDIO_STREAM_ARGS, path) {
        Ok(stdout) => parse_channel_output(&stdout, sink),
        Err(e) => {
            warn!("Audio stream probe failed for {:?}: {:#}", path, e);
            sink.log(format!(
                "ERROR: Could not detect audio channels for '{}': {:#}",
                display_name(path),
                e
            ));
            Vec::new()
        }
    }
}

fn run_ffprobe(ffprobe: &str, args: &[&str], path: &Path) -> Result<String> {
    let mut cmd = Command::new(ffprobe);
    cmd.args(args)
        .arg(path)
        .stdin(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(super::wrapper::CREATE_NO_WINDOW);
    }

    let output = cmd
        .output()
        .with_context(|| format!("failed to launch {}", ffprobe))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("ffprobe failed: {}", stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse the bare `format=duration` value
pub fn parse_duration_output(stdout: &str) -> Result<f64> {
    let text = stdout.trim();
    if text.is_empty() {
        bail!("ffprobe reported no duration");
    }

    let duration: f64 = text
        .parse()
        .map_err(|_| anyhow!("unexpected duration value '{}'", text))?;

    if !duration.is_finite() || duration < 0.0 {
        bail!("unexpected duration value '{}'", text);
    }
    Ok(duration)
}

/// Parse one stream index per line. Bad lines are reported and skipped.
pub fn parse_channel_output(stdout: &str, sink: &EventSink) -> Vec<u32> {
    let mut indices = Vec::new();

    for line in stdout.lines() {
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        match value.parse::<u32>() {
            Ok(index) => indices.push(index),
            Err(_) => {
                warn!("Skipping invalid stream index {:?}", value);
                sink.log(format!("Invalid channel value detected from FFprobe: '{}'", value));
            }
        }
    }

    indices.sort_unstable();
    indices.dedup();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BatchEvent;

    #[test]
    fn test_parse_duration_output() {
        assert_eq!(parse_duration_output("10.000000\n").unwrap(), 10.0);
        assert!(parse_duration_output("").is_err());
        assert!(parse_duration_output("N/A\n").is_err());
        assert!(parse_duration_output("-3.0").is_err());
    }

    #[test]
    fn test_parse_channel_output_sorts_and_skips_garbage() {
        let (sink, rx) = EventSink::channel();
        let channels = parse_channel_output("3\n1\n\nabc\n2\n1\n", &sink);
        assert_eq!(channels, vec![1, 2, 3]);

        let logs: Vec<BatchEvent> = rx.try_iter().collect();
        assert_eq!(
            logs,
            vec![BatchEvent::Log(
                "Invalid channel value detected from FFprobe: 'abc'".to_string()
            )]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_reads_fake_ffprobe() {
        let tools = crate::test_support::FakeTools::new(crate::test_support::FFMPEG_SUCCESS);
        let media = tools.media("clip.mkv", 12.5, &[2, 1]);
        let (sink, rx) = EventSink::channel();

        let ffmpeg = tools.wrapper();
        assert_eq!(ffmpeg.probe_duration(&media, &sink), 12.5);
        assert_eq!(ffmpeg.probe_audio_channels(&media, &sink), vec![1, 2]);
        assert!(rx.try_iter().next().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_failure_degrades_to_defaults() {
        let tools = crate::test_support::FakeTools::new(crate::test_support::FFMPEG_SUCCESS);
        let missing = tools.dir().join("missing.mp4");
        let (sink, rx) = EventSink::channel();

        let ffmpeg = tools.wrapper();
        assert_eq!(ffmpeg.probe_duration(&missing, &sink), 0.0);
        assert!(ffmpeg.probe_audio_channels(&missing, &sink).is_empty());

        let logs: Vec<BatchEvent> = rx.try_iter().collect();
        assert_eq!(logs.len(), 2);
        assert!(matches!(&logs[0], BatchEvent::Log(msg) if msg.contains("duration for 'missing.mp4'")));
    }

    #[test]
    fn test_launch_failure_degrades_to_defaults() {
        let (sink, rx) = EventSink::channel();
        let path = Path::new("/tmp/whatever.mp4");

        assert_eq!(probe_duration("/nonexistent/ffprobe-binary", path, &sink), 0.0);
        assert!(probe_audio_channels("/nonexistent/ffprobe-binary", path, &sink).is_empty());
        assert_eq!(rx.try_iter().count(), 2);
    }
}
