use crate::engine::FileOutcome;

/// Trait for reporting pipeline progress.
///
/// The CLI implements this with indicatif; tests use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _candidates: usize, _total_bytes: u64, _duration_secs: f64) {}
    fn on_file_start(&self, _index: usize, _total: usize, _path: &str, _size: u64) {}
    fn on_file_complete(&self, _path: &str, _outcome: &FileOutcome, _total_saved: u64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
