use super::commands::{build_merge_args, format_command_line};
use super::progress::ProgressTracker;
use super::wrapper::FFmpegWrapper;
use crate::utils::display_name;
use log::{debug, info, warn};
use std::io::{self, PipeReader, Read};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc;

/// Lifecycle of one merge job. `Succeeded`, `Failed` and `Cancelled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed | JobState::Cancelled)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Idle => "Pending",
            JobState::Running => "Running...",
            JobState::Succeeded => "Done",
            JobState::Failed => "Failed",
            JobState::Cancelled => "Stopped",
        }
    }
}

/// Latched cancellation flag shared between the controller and a running job
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns false if it had already been requested.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a running job reports to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Log(String),
    Progress(u8),
}

/// One FFmpeg invocation for one file. Path, selection and duration are
/// captured at construction; later edits to the file do not reach the job.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub selected_channels: Vec<u32>,
    pub total_duration: f64,
    state: JobState,
    progress: u8,
}

impl MergeJob {
    pub fn new(
        input: PathBuf,
        output: PathBuf,
        selected_channels: Vec<u32>,
        total_duration: f64,
    ) -> Self {
        Self {
            input,
            output,
            selected_channels,
            total_duration,
            state: JobState::Idle,
            progress: 0,
        }
    }

    /// Run the merge to completion and return the terminal state.
    ///
    /// Output lines are forwarded through `on_event` in the order FFmpeg wrote
    /// them. `cancel` is checked once per line and again when the process exits.
    /// Every failure ends in a terminal state plus a log line.
    pub async fn run(
        &mut self,
        ffmpeg: &FFmpegWrapper,
        cancel: &CancelToken,
        mut on_event: impl FnMut(JobEvent),
    ) -> JobState {
        if self.state.is_terminal() {
            return self.state;
        }

        let name = display_name(&self.input);
        self.state = JobState::Running;
        self.set_progress(0, &mut on_event);

        if cancel.is_cancelled() {
            on_event(JobEvent::Log(format!("Processing stopped: {}", name)));
            return self.finish(JobState::Cancelled);
        }

        let args = match build_merge_args(&self.input, &self.output, &self.selected_channels) {
            Ok(args) => args,
            Err(_) => {
                on_event(JobEvent::Log(format!(
                    "No audio channels selected for '{}'. Skipping.",
                    name
                )));
                return self.finish(JobState::Failed);
            }
        };

        let command_line = format_command_line(ffmpeg.ffmpeg_path(), &args);
        info!("Starting merge: {}", command_line);
        on_event(JobEvent::Log(format!(
            "\n--- Starting FFmpeg process for '{}' ---",
            name
        )));
        on_event(JobEvent::Log(format!("Output file: {}", display_name(&self.output))));
        on_event(JobEvent::Log(format!("Command: {}", command_line)));

        let (reader, stdout, stderr) = match shared_output_pipe() {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("Failed to create output pipe: {}", e);
                on_event(JobEvent::Log(format!(
                    "ERROR: Could not start FFmpeg for '{}': {}",
                    name, e
                )));
                return self.finish(JobState::Failed);
            }
        };

        let mut cmd = Command::new(ffmpeg.ffmpeg_path());
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            cmd.creation_flags(super::wrapper::CREATE_NO_WINDOW);
        }

        let spawned = cmd.spawn();
        // The command holds our copies of the write end; the reader only sees
        // EOF once they are closed.
        drop(cmd);

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to launch {}: {}", ffmpeg.ffmpeg_path(), e);
                on_event(JobEvent::Log(format!(
                    "ERROR: Could not start FFmpeg for '{}': {}",
                    name, e
                )));
                return self.finish(JobState::Failed);
            }
        };

        let mut lines = output_lines(reader);
        let mut tracker = ProgressTracker::new(self.total_duration);

        while let Some(line) = lines.recv().await {
            if cancel.is_cancelled() {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill FFmpeg for {:?}: {}", self.input, e);
                }
                on_event(JobEvent::Log(format!("Processing stopped: {}", name)));
                return self.finish_cancelled(&name, &mut on_event);
            }

            debug!("ffmpeg: {}", line);
            let percent = tracker.observe(&line);
            on_event(JobEvent::Log(line));
            if let Some(percent) = percent {
                self.set_progress(percent, &mut on_event);
            }
        }

        let status = child.wait().await;

        if cancel.is_cancelled() {
            return self.finish_cancelled(&name, &mut on_event);
        }

        match status {
            Ok(status) if status.success() => {
                on_event(JobEvent::Log(format!(
                    "--- Processing completed for '{}' ---",
                    name
                )));
                self.set_progress(100, &mut on_event);
                self.finish(JobState::Succeeded)
            }
            Ok(status) => {
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "terminated by signal".to_string());
                warn!("FFmpeg failed for {:?}: {}", self.input, code);
                on_event(JobEvent::Log(format!(
                    "ERROR: An error occurred while processing '{}'. Error code: {}",
                    name, code
                )));
                self.finish(JobState::Failed)
            }
            Err(e) => {
                warn!("Failed to wait for FFmpeg on {:?}: {}", self.input, e);
                on_event(JobEvent::Log(format!(
                    "ERROR: Lost track of FFmpeg while processing '{}': {}",
                    name, e
                )));
                self.finish(JobState::Failed)
            }
        }
    }

    fn set_progress(&mut self, percent: u8, on_event: &mut impl FnMut(JobEvent)) {
        self.progress = percent;
        on_event(JobEvent::Progress(percent));
    }

    fn finish_cancelled(&mut self, name: &str, on_event: &mut impl FnMut(JobEvent)) -> JobState {
        on_event(JobEvent::Log(format!(
            "--- Processing for '{}' stopped by user ---",
            name
        )));
        self.set_progress(0, on_event);
        self.finish(JobState::Cancelled)
    }

    fn finish(&mut self, state: JobState) -> JobState {
        info!("Job for {:?} finished: {:?}", self.input, state);
        self.state = state;
        state
    }
}

/// One pipe for both stdout and stderr, so lines keep the order FFmpeg wrote them in
fn shared_output_pipe() -> io::Result<(PipeReader, Stdio, Stdio)> {
    let (reader, writer) = io::pipe()?;
    let stderr = writer.try_clone()?;
    Ok((reader, Stdio::from(writer), Stdio::from(stderr)))
}

/// Split the child's output into lines on a blocking thread. FFmpeg redraws
/// its status line with `\r`, so both `\r` and `\n` end a line. Blank lines
/// are dropped.
fn output_lines(reader: PipeReader) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || forward_lines(reader, tx));
    rx
}

fn forward_lines(mut reader: impl Read, tx: mpsc::UnboundedSender<String>) {
    let mut pending = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("Error reading FFmpeg output: {}", e);
                break;
            }
        };

        for &byte in &chunk[..n] {
            if byte == b'\n' || byte == b'\r' {
                if !send_line(&mut pending, &tx) {
                    return;
                }
            } else {
                pending.push(byte);
            }
        }
    }

    send_line(&mut pending, &tx);
}

/// Returns false once nobody is receiving anymore
fn send_line(pending: &mut Vec<u8>, tx: &mpsc::UnboundedSender<String>) -> bool {
    if pending.is_empty() {
        return true;
    }
    let line = String::from_utf8_lossy(pending).trim().to_string();
    pending.clear();
    if line.is_empty() {
        return true;
    }
    tx.send(line).is_ok()
}
