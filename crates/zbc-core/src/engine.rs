use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::backup::BackupManager;
use crate::compressor::{Compressor, Ghostscript};
use crate::config::AppConfig;
use crate::error::{CompressError, Error};
use crate::markers::{FsMarkerStore, MarkerStore};
use crate::progress::ProgressReporter;
use crate::scanner::{self, CandidateFile};

/// One fixed temporary output path per run, inside the vault root. Reused
/// across candidates and removed after each one.
const TEMP_FILE_NAME: &str = ".zbc-temp.pdf";

/// Per-run knobs taken from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Compression level, 0-4.
    pub power: u8,
    /// Size threshold in kilobytes; smaller PDFs are left alone.
    pub max_kilobytes: u64,
    pub backup: bool,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            power: 2,
            max_kilobytes: 5000,
            backup: true,
            dry_run: false,
        }
    }
}

/// Terminal state of one candidate file. Transient; only aggregated into
/// the run totals.
#[derive(Debug)]
pub enum FileOutcome {
    Committed { bytes_saved: u64 },
    AbortedLarger { original: u64, compressed: u64 },
    Failed(CompressError),
}

#[derive(Debug)]
pub struct RunResult {
    pub scan_duration: Duration,
    pub compress_duration: Duration,
    pub candidates: usize,
    pub committed: usize,
    pub aborted_larger: usize,
    pub failed: usize,
    pub bytes_saved: u64,
    /// Set when at least one backup was written this run.
    pub backup_root: Option<PathBuf>,
}

pub struct CompressEngine<C, M> {
    config: AppConfig,
    options: RunOptions,
    compressor: C,
    markers: M,
    cancel: Arc<AtomicBool>,
}

impl CompressEngine<Ghostscript, FsMarkerStore> {
    /// Wire up the production pipeline. Fails fast when no Ghostscript
    /// executable can be found.
    pub fn new(config: AppConfig, options: RunOptions) -> Result<Self, Error> {
        let fallback = config.ghostscript_dir.clone().map(PathBuf::from);
        let compressor = Ghostscript::locate(fallback.as_deref())?;
        Ok(Self::with_parts(config, options, compressor, FsMarkerStore))
    }
}

impl<C: Compressor, M: MarkerStore> CompressEngine<C, M> {
    /// Assemble an engine from explicit collaborators. Tests inject a fake
    /// compressor or marker store here.
    pub fn with_parts(config: AppConfig, options: RunOptions, compressor: C, markers: M) -> Self {
        Self {
            config,
            options,
            compressor,
            markers,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag for requesting a stop. Honored between candidates only;
    /// a running Ghostscript invocation is never interrupted.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the full pipeline:
    /// 1. Scan item directories for oversized, unmarked PDFs
    /// 2. Per candidate: compress → verify size → backup → replace → mark
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunResult, Error> {
        self.cancel.store(false, Ordering::Relaxed);

        let storage_root = self.config.storage_path();
        if !storage_root.is_dir() {
            return Err(Error::VaultMissing(storage_root));
        }

        info!("Looking for files at {}", storage_root.display());

        // Phase 1: Scan
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let candidates = scanner::scan_vault(
            &storage_root,
            self.options.power,
            self.options.max_kilobytes,
            &self.markers,
        )?;
        let scan_duration = scan_start.elapsed();

        let total_bytes: u64 = candidates.iter().map(|c| c.size).sum();
        reporter.on_scan_complete(candidates.len(), total_bytes, scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s — {} candidates, {} bytes total",
            scan_duration.as_secs_f64(),
            candidates.len(),
            total_bytes,
        );

        if self.options.dry_run {
            info!(
                "Dry run: {} PDFs would be compressed, nothing was changed",
                candidates.len()
            );
            return Ok(RunResult {
                scan_duration,
                compress_duration: Duration::ZERO,
                candidates: candidates.len(),
                committed: 0,
                aborted_larger: 0,
                failed: 0,
                bytes_saved: 0,
                backup_root: None,
            });
        }

        // Phase 2: Compress. The backup root is named by run timestamp but
        // created lazily, on the first backup that actually happens.
        let run_stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let backups = if self.options.backup {
            Some(BackupManager::new(self.config.backup_path().join(&run_stamp)))
        } else {
            None
        };
        let temp_path = PathBuf::from(&self.config.vault_root).join(TEMP_FILE_NAME);

        let compress_start = Instant::now();
        let mut committed = 0usize;
        let mut aborted_larger = 0usize;
        let mut failed = 0usize;
        let mut bytes_saved = 0u64;

        for (index, candidate) in candidates.iter().enumerate() {
            if self.cancel.load(Ordering::Relaxed) {
                let _ = fs::remove_file(&temp_path);
                return Err(Error::Cancelled);
            }

            reporter.on_file_start(
                index,
                candidates.len(),
                &candidate.path.to_string_lossy(),
                candidate.size,
            );

            let outcome = self.process_candidate(candidate, &temp_path, backups.as_ref());
            // The temporary output goes away in every terminal state.
            let _ = fs::remove_file(&temp_path);

            match &outcome {
                FileOutcome::Committed { bytes_saved: saved } => {
                    committed += 1;
                    bytes_saved += saved;
                }
                FileOutcome::AbortedLarger {
                    original,
                    compressed,
                } => {
                    aborted_larger += 1;
                    warn!(
                        "New size for {} is not smaller ({} -> {} bytes), leaving original in place",
                        candidate.path.display(),
                        original,
                        compressed,
                    );
                }
                FileOutcome::Failed(err) => {
                    failed += 1;
                    warn!("Failed to compress {}: {}", candidate.path.display(), err);
                }
            }

            reporter.on_file_complete(&candidate.path.to_string_lossy(), &outcome, bytes_saved);
        }
        let compress_duration = compress_start.elapsed();

        let backup_root = backups
            .filter(|b| b.run_root().is_dir())
            .map(|b| b.run_root().to_path_buf());

        info!(
            "Finished {} candidates — {} compressed, {} not smaller, {} failed, {} bytes reclaimed",
            candidates.len(),
            committed,
            aborted_larger,
            failed,
            bytes_saved,
        );

        Ok(RunResult {
            scan_duration,
            compress_duration,
            candidates: candidates.len(),
            committed,
            aborted_larger,
            failed,
            bytes_saved,
            backup_root,
        })
    }

    /// Drive one candidate through compress → verify → backup → replace →
    /// mark. The backup must be durable before the original is overwritten,
    /// and the marker is only written once the overwrite has completed: it
    /// is the durable signal that the directory is safe to skip next time.
    fn process_candidate(
        &self,
        candidate: &CandidateFile,
        temp_path: &Path,
        backups: Option<&BackupManager>,
    ) -> FileOutcome {
        if let Err(err) = self
            .compressor
            .compress(&candidate.path, temp_path, self.options.power)
        {
            return FileOutcome::Failed(err);
        }

        let compressed = match fs::metadata(temp_path) {
            Ok(metadata) => metadata.len(),
            Err(err) => return FileOutcome::Failed(CompressError::Io(err)),
        };

        if compressed >= candidate.size {
            return FileOutcome::AbortedLarger {
                original: candidate.size,
                compressed,
            };
        }

        if let Some(backups) = backups {
            if let Err(err) = backups.backup(&candidate.path) {
                return FileOutcome::Failed(CompressError::Io(err));
            }
        }

        if let Err(err) = fs::copy(temp_path, &candidate.path) {
            return FileOutcome::Failed(CompressError::Io(err));
        }

        if let Err(err) = self
            .markers
            .commit(&candidate.item_dir, self.options.power, Local::now())
        {
            return FileOutcome::Failed(CompressError::Io(err));
        }

        FileOutcome::Committed {
            bytes_saved: candidate.size - compressed,
        }
    }
}
