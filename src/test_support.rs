//! Fake ffmpeg/ffprobe scripts for process-level tests.
//!
//! The fake ffprobe answers from sidecar files next to the media path
//! (`<media>.duration`, `<media>.channels`). The fake ffmpeg appends its
//! arguments to `calls.log` and then runs the body given by the test.

use crate::events::BatchEvent;
use crate::ffmpeg::FFmpegWrapper;
use crossbeam_channel::Receiver;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FFPROBE_SCRIPT: &str = r#"#!/bin/sh
[ "$1" = "--ready" ] && exit 0
for media in "$@"; do :; done
case "$*" in
  *format=duration*) sidecar="$media.duration" ;;
  *) sidecar="$media.channels" ;;
esac
if [ -f "$sidecar" ]; then
  cat "$sidecar"
  exit 0
fi
echo "$media: No such file or directory" >&2
exit 1
"#;

const FFMPEG_HEADER: &str = r#"#!/bin/sh
[ "$1" = "--ready" ] && exit 0
echo "$@" >> "$(dirname "$0")/calls.log"
"#;

/// Two status updates at 2.5s and 5s, rewritten with carriage returns like the real tool
pub const FFMPEG_SUCCESS: &str = r#"
echo "ffmpeg version fake" >&2
printf 'size=     100kB time=00:00:02.50 bitrate= 1.0kbits/s\r' >&2
printf 'size=     200kB time=00:00:05.00 bitrate= 1.0kbits/s\r' >&2
echo "" >&2
exit 0
"#;

pub const FFMPEG_FAILURE: &str = r#"
echo "Stream specifier ':a:1' matches no streams." >&2
exit 3
"#;

/// Alternates stdout and stderr lines: out-0, err-0, out-1, ...
pub const FFMPEG_INTERLEAVED: &str = r#"
i=0
while [ $i -lt 30 ]; do
  echo "out-$i"
  echo "err-$i" >&2
  i=$((i+1))
done
exit 0
"#;

/// Prints nothing, then fails after a pause
pub const FFMPEG_SILENT_FAILURE: &str = r#"
sleep 1
exit 1
"#;

/// Files named `a.*` stall at 4s for a long time; everything else succeeds quickly
pub const FFMPEG_SLOW_FIRST: &str = r#"
case "$*" in
  */a.*)
    i=0
    while [ $i -lt 400 ]; do
      echo "frame=  10 time=00:00:04.00 bitrate= 1.0kbits/s" >&2
      sleep 0.05
      i=$((i+1))
    done
    ;;
  *)
    echo "frame=  10 time=00:00:05.00 bitrate= 1.0kbits/s" >&2
    ;;
esac
exit 0
"#;

pub struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    pub fn new(ffmpeg_body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let tools = Self { dir };
        tools.write_script("ffprobe", FFPROBE_SCRIPT);
        tools.write_script("ffmpeg", &format!("{}{}", FFMPEG_HEADER, ffmpeg_body));
        tools
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn wrapper(&self) -> FFmpegWrapper {
        FFmpegWrapper::with_paths(
            self.dir().join("ffmpeg").to_string_lossy().to_string(),
            self.dir().join("ffprobe").to_string_lossy().to_string(),
        )
    }

    /// Register a media path the fake ffprobe knows about. The media file itself is never created.
    pub fn media(&self, name: &str, duration: f64, channels: &[u32]) -> PathBuf {
        let path = self.dir().join(name);
        let sidecar = |ext: &str| PathBuf::from(format!("{}.{}", path.display(), ext));

        std::fs::write(sidecar("duration"), format!("{:.6}\n", duration)).expect("write duration");
        let listing: String = channels.iter().map(|c| format!("{}\n", c)).collect();
        std::fs::write(sidecar("channels"), listing).expect("write channels");
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        let out = self.dir().join("out");
        std::fs::create_dir_all(&out).expect("create output dir");
        out
    }

    /// Argument lines of every fake ffmpeg invocation so far
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir().join("calls.log"))
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn write_script(&self, name: &str, body: &str) {
        let path = self.dir().join(name);
        std::fs::write(&path, body).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");

        // A sibling test forking at the wrong moment can briefly hold our
        // write handle open, making exec fail with ETXTBSY.
        for _ in 0..100 {
            match std::process::Command::new(&path).arg("--ready").status() {
                Err(e) if e.raw_os_error() == Some(26) => {
                    std::thread::sleep(Duration::from_millis(10))
                }
                _ => return,
            }
        }
    }
}

/// Collect events until `done` matches one, panicking after `timeout`
pub fn collect_until(
    rx: &Receiver<BatchEvent>,
    timeout: Duration,
    mut done: impl FnMut(&BatchEvent) -> bool,
) -> Vec<BatchEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => {
                let finished = done(&event);
                events.push(event);
                if finished {
                    return events;
                }
            }
            Err(_) => panic!("timed out waiting for event; got {:#?}", events),
        }
    }
}
