use crate::error::CommandError;
use std::path::{Path, PathBuf};

/// Container of every merged output, whatever the source container was
pub const MERGED_EXTENSION: &str = "mkv";
pub const MERGED_SUFFIX: &str = "_merged";

/// Build the `amix` filter graph for `channel_count` audio inputs.
///
/// Inputs are addressed by their position in the selection (`0:a:0`,
/// `0:a:1`, ...), not by the stream index reported by ffprobe. FFmpeg numbers
/// the audio streams of an input in ascending order, so a selection of
/// streams `[2, 5]` mixes the first two audio streams of the file. When the
/// selection is not a prefix of the file's audio streams this mixes different
/// streams than the ones selected. This mapping is intentional and not
/// validated here.
pub fn build_amix_filter(channel_count: usize) -> String {
    let audio_inputs: String = (0..channel_count)
        .map(|i| format!("[0:a:{}]", i))
        .collect();
    format!(
        "{}amix=inputs={}:duration=longest[a]",
        audio_inputs, channel_count
    )
}

/// Build FFmpeg arguments that copy the video stream and mix the selected
/// audio streams into a single track, overwriting `output`
pub fn build_merge_args(
    input: &Path,
    output: &Path,
    selected_channels: &[u32],
) -> Result<Vec<String>, CommandError> {
    if selected_channels.is_empty() {
        return Err(CommandError::NoChannelsSelected);
    }

    Ok(vec![
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-map".to_string(),
        "0:v".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-filter_complex".to_string(),
        build_amix_filter(selected_channels.len()),
        "-map".to_string(),
        "[a]".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ])
}

/// `<output_dir>/<input stem>_merged.mkv`
pub fn merged_output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output_dir.join(format!("{}{}.{}", stem, MERGED_SUFFIX, MERGED_EXTENSION))
}

/// Render a command line for the log
pub fn format_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_positional_inputs() {
        assert_eq!(
            build_amix_filter(3),
            "[0:a:0][0:a:1][0:a:2]amix=inputs=3:duration=longest[a]"
        );
        assert_eq!(build_amix_filter(1), "[0:a:0]amix=inputs=1:duration=longest[a]");
    }

    #[test]
    fn test_merge_args_ignore_original_stream_indices() {
        let args = build_merge_args(
            Path::new("/in/show.mp4"),
            Path::new("/out/show_merged.mkv"),
            &[2, 5],
        )
        .unwrap();

        assert_eq!(
            args,
            vec![
                "-i", "/in/show.mp4",
                "-map", "0:v",
                "-c:v", "copy",
                "-filter_complex", "[0:a:0][0:a:1]amix=inputs=2:duration=longest[a]",
                "-map", "[a]",
                "-y", "/out/show_merged.mkv",
            ]
        );
    }

    #[test]
    fn test_merge_args_are_deterministic() {
        let build = || build_merge_args(Path::new("a.mkv"), Path::new("b.mkv"), &[1, 2, 3]);
        assert_eq!(build(), build());
    }

    #[test]
    fn test_empty_selection_is_rejected() {
        assert_eq!(
            build_merge_args(Path::new("a.mkv"), Path::new("b.mkv"), &[]),
            Err(CommandError::NoChannelsSelected)
        );
    }

    #[test]
    fn test_merged_output_path() {
        assert_eq!(
            merged_output_path(Path::new("/out"), Path::new("/videos/Holiday.Trip.MOV")),
            PathBuf::from("/out/Holiday.Trip_merged.mkv")
        );
        assert_eq!(
            merged_output_path(Path::new("/out"), Path::new("/videos/clip.mkv")),
            PathBuf::from("/out/clip_merged.mkv")
        );
    }

    #[test]
    fn test_format_command_line() {
        let args = vec!["-i".to_string(), "a.mp4".to_string()];
        assert_eq!(format_command_line("ffmpeg", &args), "ffmpeg -i a.mp4");
    }
}
