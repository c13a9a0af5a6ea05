// src/progress.rs
use crate::fetch::Target;

/// Lightweight progress reporting for one pipeline run.
/// Frontends implement this to surface status to users; the pipeline also logs
/// everything through `tracing`, so implementations are optional.
pub trait Progress: Send {
    /// Called at the start with the number of stages.
    fn begin(&mut self, _stages: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// Called when one page has been fetched and extracted (or given up on).
    fn page_done(&mut self, _target: Target, _records: usize) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// Collects every callback; handy in tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub events: Vec<String>,
}

impl Progress for RecordingProgress {
    fn begin(&mut self, stages: usize) {
        self.events.push(format!("begin {stages}"));
    }
    fn log(&mut self, msg: &str) {
        self.events.push(s!(msg));
    }
    fn page_done(&mut self, target: Target, records: usize) {
        self.events.push(format!("{target}: {records}"));
    }
    fn finish(&mut self) {
        self.events.push(s!("finish"));
    }
}
