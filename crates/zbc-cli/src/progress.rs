use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use zbc_core::{FileOutcome, ProgressReporter};

/// CLI progress reporter using indicatif.
///
/// - Scan phase: spinner (candidate count unknown upfront)
/// - Compress phase: progress bar (total known from scan), with a summary
///   line per file printed above the bar
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message("Scanning vault...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_complete(&self, candidates: usize, total_bytes: u64, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} PDFs to compress ({:.1} MB) in {:.2}s",
            candidates,
            total_bytes as f64 / 1_000_000.0,
            duration_secs
        );
    }

    fn on_file_start(&self, index: usize, total: usize, path: &str, size: u64) {
        let mut guard = self.bar.lock().unwrap();
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "  {spinner:.cyan} Compressing [{bar:30.cyan/dim}] {pos}/{len} files",
                )
                .unwrap()
                .progress_chars("━╸─")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.enable_steady_tick(std::time::Duration::from_millis(80));
            pb
        });
        pb.set_position(index as u64);
        pb.println(format!(
            "  Compressing PDF #{}/{}: {} ({:.1} MB)",
            index + 1,
            total,
            path,
            size as f64 / 1_000_000.0
        ));
    }

    fn on_file_complete(&self, path: &str, outcome: &FileOutcome, total_saved: u64) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            let line = match outcome {
                FileOutcome::Committed { bytes_saved } => format!(
                    "  \x1b[32m✓\x1b[0m {} — saved {:.1} MB ({:.1} MB total so far)",
                    path,
                    *bytes_saved as f64 / 1_000_000.0,
                    total_saved as f64 / 1_000_000.0
                ),
                FileOutcome::AbortedLarger { .. } => format!(
                    "  \x1b[33m-\x1b[0m {} — result not smaller, original kept",
                    path
                ),
                FileOutcome::Failed(err) => {
                    format!("  \x1b[31m✗\x1b[0m {} — {}", path, err)
                }
            };
            pb.println(line);
            pb.inc(1);
            if pb.position() >= pb.length().unwrap_or(0) {
                pb.finish_and_clear();
            }
        }
    }
}
