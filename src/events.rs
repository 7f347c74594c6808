use crate::ffmpeg::JobState;
use crossbeam_channel::{Receiver, Sender};
use std::path::PathBuf;

/// Notifications emitted by the batch core for whatever presentation layer is listening
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// A line for the console: diagnostics, job banners and raw FFmpeg output
    Log(String),
    /// The file at `index` is now being processed
    FileStarted { index: usize, path: PathBuf },
    /// Progress of the running file in percent
    FileProgress { index: usize, percent: u8 },
    /// Progress of the whole batch in percent
    TotalProgress(u8),
    FileFinished {
        index: usize,
        path: PathBuf,
        outcome: JobState,
    },
    BatchFinished(BatchSummary),
}

/// Terminal outcomes counted over one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: JobState) {
        match outcome {
            JobState::Succeeded => self.succeeded += 1,
            JobState::Failed => self.failed += 1,
            JobState::Cancelled => self.cancelled += 1,
            JobState::Idle | JobState::Running => {}
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Sending half of the event channel. Sends never fail loudly: a closed
/// receiver just means nobody is listening anymore.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<BatchEvent>,
}

impl EventSink {
    pub fn new(tx: Sender<BatchEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its unbounded receiver
    pub fn channel() -> (Self, Receiver<BatchEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(BatchEvent::Log(message.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_terminal_states_only() {
        let mut summary = BatchSummary::default();
        summary.record(JobState::Succeeded);
        summary.record(JobState::Failed);
        summary.record(JobState::Cancelled);
        summary.record(JobState::Running);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded, 1);
    }

    #[test]
    fn test_sink_survives_dropped_receiver() {
        let (sink, rx) = EventSink::channel();
        sink.log("first");
        assert_eq!(rx.try_recv().unwrap(), BatchEvent::Log("first".to_string()));
        drop(rx);
        sink.log("nobody listens");
    }
}
