use crate::error::ValidationError;
use crate::events::{BatchEvent, BatchSummary, EventSink};
use crate::ffmpeg::{
    aggregate_percent, merged_output_path, CancelToken, FFmpegWrapper, JobEvent, JobState,
    MergeJob,
};
use crate::project::{is_supported_media, MediaFile};
use crate::utils::display_name;
use anyhow::{Context, Result};
use log::{info, warn};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// The job currently owned by the run
#[derive(Debug, Clone)]
struct ActiveJob {
    index: usize,
    cancel: CancelToken,
    progress: u8,
}

#[derive(Debug, Default)]
struct BatchState {
    files: Vec<MediaFile>,
    output_directory: Option<PathBuf>,
    is_running: bool,
    current_index: usize,
    active: Option<ActiveJob>,
}

impl BatchState {
    fn aggregate_percent(&self) -> u8 {
        let current = self.active.as_ref().map(|job| job.progress);
        aggregate_percent(self.current_index, current, self.files.len())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.is_running {
            return Err(ValidationError::AlreadyRunning);
        }
        if self.files.is_empty() {
            return Err(ValidationError::NoFiles);
        }
        if self.output_directory.is_none() {
            return Err(ValidationError::NoOutputDirectory);
        }
        if let Some((index, file)) = self
            .files
            .iter()
            .enumerate()
            .find(|(_, f)| f.selected_channels().is_empty())
        {
            return Err(ValidationError::NoChannelsSelected {
                index,
                file: file.filename(),
            });
        }
        Ok(())
    }
}

type SharedState = Arc<Mutex<BatchState>>;

/// Holds the file list and drives one merge job at a time.
///
/// All methods are called from the control thread. A run executes on a
/// background task of the controller's runtime and reports through the
/// [`EventSink`]. Stopping cancels only the running file; the batch then moves
/// on to the next one.
pub struct BatchController {
    ffmpeg: FFmpegWrapper,
    runtime: Runtime,
    state: SharedState,
    sink: EventSink,
}

impl BatchController {
    pub fn new(ffmpeg: FFmpegWrapper, sink: EventSink) -> Result<Self> {
        let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
        Ok(Self {
            ffmpeg,
            runtime,
            state: Arc::new(Mutex::new(BatchState::default())),
            sink,
        })
    }

    pub fn ffmpeg(&self) -> &FFmpegWrapper {
        &self.ffmpeg
    }

    /// Probe and register a file. Returns false for a path already in the list.
    pub fn add_file(&self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }

        // Probing blocks on ffprobe, so it happens outside the lock
        let duration = self.ffmpeg.probe_duration(&path, &self.sink);
        let channels = self.ffmpeg.probe_audio_channels(&path, &self.sink);
        let file = MediaFile::new(path, duration, channels);

        let mut state = self.state.lock();
        if state.files.iter().any(|f| f.path == file.path) {
            return false;
        }
        info!(
            "Added {:?} ({:.2}s, channels {:?})",
            file.path,
            file.duration_seconds,
            file.detected_channels()
        );
        self.sink.log(format!(
            "'{}' added. Duration: {}, Detected channels: {:?}",
            file.filename(),
            file.duration_string(),
            file.detected_channels()
        ));
        state.files.push(file);
        true
    }

    /// Register dropped or picked paths, skipping unsupported files. Returns how many were added.
    pub fn add_files(&self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        let mut added = 0;
        for path in paths {
            if path.is_file() && is_supported_media(&path) {
                if self.add_file(path) {
                    added += 1;
                }
            } else {
                warn!("Rejected input {:?}", path);
                self.sink.log(format!("Invalid file: {}", display_name(&path)));
            }
        }
        added
    }

    fn contains(&self, path: &Path) -> bool {
        self.state.lock().files.iter().any(|f| f.path == path)
    }

    /// Remove a file. While a run is active only files after the current one can be removed.
    pub fn remove_file(&self, index: usize) -> bool {
        let mut state = self.state.lock();
        if index >= state.files.len() {
            return false;
        }
        if state.is_running && index <= state.current_index {
            self.sink.log("Cannot remove a file that is being or has been processed in the current run.");
            return false;
        }
        let file = state.files.remove(index);
        self.sink.log(format!("'{}' removed.", file.filename()));
        true
    }

    pub fn clear_files(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_running {
            self.sink.log("Cannot clear the file list while processing.");
            return false;
        }
        state.files.clear();
        state.current_index = 0;
        self.sink.log("File list cleared.");
        self.sink.emit(BatchEvent::TotalProgress(0));
        true
    }

    /// Select or deselect one channel of one file. Unknown files or channels change nothing.
    pub fn toggle_channel(&self, file_index: usize, channel: u32, selected: bool) -> bool {
        let mut state = self.state.lock();
        state
            .files
            .get_mut(file_index)
            .map(|file| file.toggle_channel(channel, selected))
            .unwrap_or(false)
    }

    pub fn set_output_directory(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        info!("Output directory set to {:?}", dir);
        self.state.lock().output_directory = Some(dir);
    }

    pub fn output_directory(&self) -> Option<PathBuf> {
        self.state.lock().output_directory.clone()
    }

    /// Snapshot of the registered files
    pub fn files(&self) -> Vec<MediaFile> {
        self.state.lock().files.clone()
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_running
    }

    pub fn current_index(&self) -> usize {
        self.state.lock().current_index
    }

    pub fn aggregate_percent(&self) -> u8 {
        self.state.lock().aggregate_percent()
    }

    /// Validate and start processing every file in order.
    pub fn run(&self) -> Result<(), ValidationError> {
        {
            let mut state = self.state.lock();
            if let Err(e) = state.validate() {
                warn!("Batch not started: {}", e);
                self.sink.log(e.console_message());
                return Err(e);
            }
            state.is_running = true;
            state.current_index = 0;
            state.active = None;
        }

        info!("Starting batch processing");
        self.sink.log("Starting batch processing...");
        self.sink.emit(BatchEvent::TotalProgress(0));

        let worker = BatchWorker {
            ffmpeg: self.ffmpeg.clone(),
            state: Arc::clone(&self.state),
            sink: self.sink.clone(),
        };
        self.runtime.spawn(worker.drive());
        Ok(())
    }

    /// Cancel the running job. The batch continues with the next file.
    pub fn stop(&self) -> bool {
        let state = self.state.lock();
        match state.active.as_ref() {
            Some(job) => {
                if job.cancel.cancel() {
                    let name = state
                        .files
                        .get(job.index)
                        .map(|f| f.filename())
                        .unwrap_or_default();
                    info!("Stop requested for {}", name);
                    self.sink.log(format!("Stopping '{}'...", name));
                }
                true
            }
            None => {
                self.sink.log("No active process to stop.");
                false
            }
        }
    }
}

/// Background half of a run
struct BatchWorker {
    ffmpeg: FFmpegWrapper,
    state: SharedState,
    sink: EventSink,
}

impl BatchWorker {
    async fn drive(self) {
        let mut summary = BatchSummary::default();

        while let Some((index, mut job, cancel)) = self.next_job() {
            let path = job.input.clone();
            self.sink.emit(BatchEvent::FileStarted {
                index,
                path: path.clone(),
            });

            let outcome = job
                .run(&self.ffmpeg, &cancel, |event| self.on_job_event(index, event))
                .await;
            summary.record(outcome);

            let aggregate = {
                let mut state = self.state.lock();
                state.active = None;
                state.current_index += 1;
                state.aggregate_percent()
            };
            self.sink.emit(BatchEvent::FileFinished {
                index,
                path,
                outcome,
            });
            self.sink.emit(BatchEvent::TotalProgress(aggregate));
        }

        let aggregate = {
            let mut state = self.state.lock();
            state.is_running = false;
            state.active = None;
            state.aggregate_percent()
        };

        info!(
            "Batch finished: {} succeeded, {} failed, {} stopped",
            summary.succeeded, summary.failed, summary.cancelled
        );
        self.sink.log(format!(
            "\nAll files processed. {} succeeded, {} failed, {} stopped.",
            summary.succeeded, summary.failed, summary.cancelled
        ));
        self.sink.emit(BatchEvent::TotalProgress(aggregate));
        self.sink.emit(BatchEvent::BatchFinished(summary));
    }

    /// Capture the next file's settings and install its job in the slot
    fn next_job(&self) -> Option<(usize, MergeJob, CancelToken)> {
        let mut state = self.state.lock();
        let index = state.current_index;
        let output_dir = state.output_directory.clone()?;
        let file = state.files.get(index)?;

        let job = MergeJob::new(
            file.path.clone(),
            merged_output_path(&output_dir, &file.path),
            file.selected_channels().to_vec(),
            file.duration_seconds,
        );
        let cancel = CancelToken::new();
        state.active = Some(ActiveJob {
            index,
            cancel: cancel.clone(),
            progress: 0,
        });
        Some((index, job, cancel))
    }

    fn on_job_event(&self, index: usize, event: JobEvent) {
        match event {
            JobEvent::Log(line) => self.sink.log(line),
            JobEvent::Progress(percent) => {
                let aggregate = {
                    let mut state = self.state.lock();
                    if let Some(job) = state.active.as_mut() {
                        job.progress = percent;
                    }
                    state.aggregate_percent()
                };
                self.sink.emit(BatchEvent::FileProgress { index, percent });
                self.sink.emit(BatchEvent::TotalProgress(aggregate));
            }
        }
    }
}
