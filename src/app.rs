use crate::batch::BatchController;
use crate::config::MergerConfig;
use crate::events::{BatchEvent, EventSink};
use crate::ffmpeg::JobState;
use crate::utils::display_name;
use crossbeam_channel::Receiver;
use eframe::egui;
use log::{info, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const MAX_LOG_LINES: usize = 5000;

pub struct MergerApp {
    pub batch: BatchController,
    events: Receiver<BatchEvent>,
    pub selected_file_index: Option<usize>,
    pub status_message: String,

    // Console and progress, fed from batch events
    pub log_lines: Vec<String>,
    pub file_progress: u8,
    pub total_progress: u8,
    pub active_file: Option<PathBuf>,
    pub outcomes: HashMap<PathBuf, JobState>,
    /// Set from a successful start until the batch's final event arrives
    awaiting_finish: bool,
}

impl MergerApp {
    pub fn new(config: &MergerConfig) -> anyhow::Result<Self> {
        let (sink, events) = EventSink::channel();
        let batch = BatchController::new(config.ffmpeg(), sink)?;
        if let Some(ref dir) = config.output_directory {
            batch.set_output_directory(dir.clone());
        }

        let mut app = Self {
            batch,
            events,
            selected_file_index: None,
            status_message: String::from("Ready"),
            log_lines: Vec::new(),
            file_progress: 0,
            total_progress: 0,
            active_file: None,
            outcomes: HashMap::new(),
            awaiting_finish: false,
        };

        info!(
            "Using ffmpeg {:?}, ffprobe {:?}",
            app.batch.ffmpeg().ffmpeg_path(),
            app.batch.ffmpeg().ffprobe_path()
        );
        if !app.batch.ffmpeg().is_available() {
            let path = app.batch.ffmpeg().ffmpeg_path().to_string();
            warn!("FFmpeg not found at {:?}", path);
            app.push_log(format!(
                "WARNING: FFmpeg could not be started ('{}'). Install it or set AUDIO_MERGER_FFMPEG.",
                path
            ));
            app.status_message = "FFmpeg not found".to_string();
        }

        Ok(app)
    }

    pub fn add_files(&mut self, paths: Vec<PathBuf>) {
        let added = self.batch.add_files(paths);
        if self.selected_file_index.is_none() && self.batch.file_count() > 0 {
            self.selected_file_index = Some(0);
        }
        if added > 0 {
            self.status_message = format!("{} file(s) added", added);
        }
    }

    pub fn select_file(&mut self, index: usize) {
        if index < self.batch.file_count() {
            self.selected_file_index = Some(index);
        }
    }

    pub fn remove_file_at(&mut self, index: usize) {
        if !self.batch.remove_file(index) {
            return;
        }
        let count = self.batch.file_count();
        self.selected_file_index = match self.selected_file_index {
            _ if count == 0 => None,
            Some(selected) if selected > index => Some(selected - 1),
            Some(selected) if selected >= count => Some(count - 1),
            other => other,
        };
    }

    pub fn clear_files(&mut self) {
        if self.batch.clear_files() {
            self.selected_file_index = None;
            self.outcomes.clear();
            self.file_progress = 0;
            self.total_progress = 0;
        }
    }

    pub fn choose_output_directory(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_title("Select Output Directory")
            .pick_folder()
        {
            self.status_message = format!("Output directory: {}", dir.display());
            self.batch.set_output_directory(dir);
        }
    }

    pub fn start_batch(&mut self) {
        match self.batch.run() {
            Ok(()) => {
                self.log_lines.clear();
                self.outcomes.clear();
                self.file_progress = 0;
                self.total_progress = 0;
                self.awaiting_finish = true;
                self.status_message = "Processing...".to_string();
            }
            Err(e) => {
                self.status_message = e.to_string();
            }
        }
    }

    pub fn stop_batch(&mut self) {
        self.batch.stop();
    }

    fn push_log(&mut self, line: String) {
        self.log_lines.push(line);
        if self.log_lines.len() > MAX_LOG_LINES {
            let excess = self.log_lines.len() - MAX_LOG_LINES;
            self.log_lines.drain(..excess);
        }
    }

    /// Apply everything the batch reported since the last frame
    fn poll_events(&mut self) {
        let events: Vec<BatchEvent> = self.events.try_iter().collect();
        for event in events {
            match event {
                BatchEvent::Log(line) => self.push_log(line),
                BatchEvent::FileStarted { path, .. } => {
                    self.status_message = format!("Processing {}", display_name(&path));
                    self.active_file = Some(path);
                    self.file_progress = 0;
                }
                BatchEvent::FileProgress { percent, .. } => self.file_progress = percent,
                BatchEvent::TotalProgress(percent) => self.total_progress = percent,
                BatchEvent::FileFinished { path, outcome, .. } => {
                    self.outcomes.insert(path, outcome);
                    self.active_file = None;
                    self.file_progress = 0;
                }
                BatchEvent::BatchFinished(summary) => {
                    self.awaiting_finish = false;
                    self.status_message = format!(
                        "Finished {} file(s): {} OK, {} failed, {} stopped",
                        summary.total(),
                        summary.succeeded,
                        summary.failed,
                        summary.cancelled
                    );
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.add_files(dropped);
        }
    }
}

impl eframe::App for MergerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.handle_dropped_files(ctx);

        crate::ui::render_main_window(self, ctx);

        // Clicks during this frame may already have queued log lines
        if !self.events.is_empty() {
            ctx.request_repaint();
        } else if self.awaiting_finish {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
