use std::collections::HashMap;
use std::fs;
use std::hash::Hasher as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::tempdir;
use twox_hash::XxHash64;

use zbc_core::compressor::Compressor;
use zbc_core::markers::{marker_file_name, FsMarkerStore, MemoryMarkerStore};
use zbc_core::{
    AppConfig, CompressEngine, CompressError, Error, ProgressReporter, RunOptions, SilentReporter,
};

/// Programmable stand-in for the Ghostscript adapter: writes a fixed number
/// of bytes to the output path, or fails, per input filename.
enum FakeBehavior {
    Emit(u64),
    Fail,
}

struct FakeCompressor {
    by_name: HashMap<String, FakeBehavior>,
    default: FakeBehavior,
}

impl FakeCompressor {
    fn emitting(size: u64) -> Self {
        Self {
            by_name: HashMap::new(),
            default: FakeBehavior::Emit(size),
        }
    }

    fn with_rule(mut self, name: &str, behavior: FakeBehavior) -> Self {
        self.by_name.insert(name.to_string(), behavior);
        self
    }
}

impl Compressor for FakeCompressor {
    fn compress(&self, input: &Path, output: &Path, _level: u8) -> Result<(), CompressError> {
        let name = input.file_name().unwrap().to_string_lossy().into_owned();
        match self.by_name.get(&name).unwrap_or(&self.default) {
            FakeBehavior::Emit(size) => {
                fs::write(output, vec![0x2a; *size as usize])?;
                Ok(())
            }
            FakeBehavior::Fail => Err(CompressError::MissingOutput(output.to_path_buf())),
        }
    }
}

/// Reporter that requests cancellation as soon as the first file starts.
struct CancelOnFirstFile {
    token: Arc<AtomicBool>,
}

impl ProgressReporter for CancelOnFirstFile {
    fn on_file_start(&self, _index: usize, _total: usize, _path: &str, _size: u64) {
        self.token.store(true, Ordering::Relaxed);
    }
}

fn test_config(vault: &Path) -> AppConfig {
    AppConfig {
        vault_root: vault.to_string_lossy().into_owned(),
        storage_dir: "storage".to_string(),
        backup_dir: "compression_backups".to_string(),
        ghostscript_dir: None,
    }
}

fn options(power: u8) -> RunOptions {
    RunOptions {
        power,
        max_kilobytes: 5000,
        backup: true,
        dry_run: false,
    }
}

/// Create `<vault>/storage/<item>/<name>` of `size` patterned (non-uniform)
/// bytes, so byte-fidelity checks are meaningful.
fn make_pdf(vault: &Path, item: &str, name: &str, size: usize) -> PathBuf {
    let dir = vault.join("storage").join(item);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    fs::write(&path, content).unwrap();
    path
}

fn hash_file(path: &Path) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&fs::read(path).unwrap());
    hasher.finish()
}

#[test]
fn test_commit_replaces_backs_up_and_marks() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let pdf = make_pdf(vault, "item-1", "paper.pdf", 7_000_000);
    let original_hash = hash_file(&pdf);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(3),
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.candidates, 1);
    assert_eq!(result.committed, 1);
    assert_eq!(result.aborted_larger, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(result.bytes_saved, 4_000_000);

    // Original replaced with the compressed content.
    assert_eq!(fs::metadata(&pdf).unwrap().len(), 3_000_000);

    // Marker committed in the item directory, after the replace.
    let marker = vault.join("storage/item-1").join(marker_file_name(3));
    assert!(marker.is_file());
    assert!(fs::read_to_string(&marker)
        .unwrap()
        .starts_with("Compressed at: "));

    // Backup holds the byte-identical pre-compression original.
    let backup_root = result.backup_root.expect("a backup was written");
    assert!(backup_root.starts_with(vault.join("compression_backups")));
    let backup = backup_root.join("item-1").join("paper.pdf");
    assert_eq!(fs::metadata(&backup).unwrap().len(), 7_000_000);
    assert_eq!(hash_file(&backup), original_hash);

    // Temporary output is gone.
    assert!(!vault.join(".zbc-temp.pdf").exists());
}

#[test]
fn test_aborted_when_result_not_smaller() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let pdf = make_pdf(vault, "item-1", "paper.pdf", 7_000_000);
    let original_hash = hash_file(&pdf);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(3),
        FakeCompressor::emitting(7_200_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.candidates, 1);
    assert_eq!(result.aborted_larger, 1);
    assert_eq!(result.committed, 0);
    assert_eq!(result.bytes_saved, 0);

    // Original is byte-for-byte untouched, no marker, and the backup tree
    // was never created (it is lazy).
    assert_eq!(fs::metadata(&pdf).unwrap().len(), 7_000_000);
    assert_eq!(hash_file(&pdf), original_hash);
    assert!(!vault.join("storage/item-1").join(marker_file_name(3)).exists());
    assert!(!vault.join("compression_backups").exists());
    assert!(result.backup_root.is_none());
    assert!(!vault.join(".zbc-temp.pdf").exists());
}

#[test]
fn test_equal_size_also_aborts() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let pdf = make_pdf(vault, "item-1", "paper.pdf", 7_000_000);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(7_000_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.aborted_larger, 1);
    assert_eq!(fs::metadata(&pdf).unwrap().len(), 7_000_000);
}

#[test]
fn test_idempotent_rerun() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    // The fake output stays above the threshold, so only the marker can
    // exclude the directory on the second run.
    make_pdf(vault, "item-1", "paper.pdf", 7_000_000);

    let first = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(6_500_000),
        FsMarkerStore,
    );
    let result = first.run(&SilentReporter).unwrap();
    assert_eq!(result.committed, 1);

    // Same level: the committed marker excludes the directory entirely.
    let second = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(6_500_000),
        FsMarkerStore,
    );
    let result = second.run(&SilentReporter).unwrap();
    assert_eq!(result.candidates, 0);

    // Lower level is subsumed by the existing marker too.
    let lower = CompressEngine::with_parts(
        test_config(vault),
        options(1),
        FakeCompressor::emitting(6_500_000),
        FsMarkerStore,
    );
    assert_eq!(lower.run(&SilentReporter).unwrap().candidates, 0);

    // A more aggressive level is not subsumed and re-qualifies the file.
    let higher = CompressEngine::with_parts(
        test_config(vault),
        options(3),
        FakeCompressor::emitting(6_000_000),
        FsMarkerStore,
    );
    assert_eq!(higher.run(&SilentReporter).unwrap().candidates, 1);
}

#[test]
fn test_failed_tool_leaves_original_and_continues() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let broken = make_pdf(vault, "item-1", "broken.pdf", 6_000_000);
    let fine = make_pdf(vault, "item-2", "fine.pdf", 7_000_000);
    let broken_hash = hash_file(&broken);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(3_000_000).with_rule("broken.pdf", FakeBehavior::Fail),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.candidates, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.committed, 1);

    // The failed file and its marker state are unchanged.
    assert_eq!(hash_file(&broken), broken_hash);
    assert!(!vault.join("storage/item-1").join(marker_file_name(2)).exists());

    // The healthy file still went through.
    assert_eq!(fs::metadata(&fine).unwrap().len(), 3_000_000);
    assert!(vault.join("storage/item-2").join(marker_file_name(2)).is_file());
}

#[test]
fn test_dry_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let pdf = make_pdf(vault, "item-1", "paper.pdf", 7_000_000);
    let original_hash = hash_file(&pdf);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        RunOptions {
            dry_run: true,
            ..options(2)
        },
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.candidates, 1);
    assert_eq!(result.committed, 0);
    assert_eq!(result.bytes_saved, 0);
    assert_eq!(hash_file(&pdf), original_hash);
    assert!(!vault.join("storage/item-1").join(marker_file_name(2)).exists());
    assert!(!vault.join("compression_backups").exists());
    assert!(!vault.join(".zbc-temp.pdf").exists());
}

#[test]
fn test_nobackup_commits_without_backup_tree() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let pdf = make_pdf(vault, "item-1", "paper.pdf", 7_000_000);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        RunOptions {
            backup: false,
            ..options(2)
        },
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.committed, 1);
    assert!(result.backup_root.is_none());
    assert!(!vault.join("compression_backups").exists());
    assert_eq!(fs::metadata(&pdf).unwrap().len(), 3_000_000);
    assert!(vault.join("storage/item-1").join(marker_file_name(2)).is_file());
}

#[test]
fn test_two_candidates_in_one_item_directory() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    make_pdf(vault, "item-1", "first.pdf", 7_000_000);
    make_pdf(vault, "item-1", "second.pdf", 6_000_000);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );
    let result = engine.run(&SilentReporter).unwrap();

    assert_eq!(result.candidates, 2);
    assert_eq!(result.committed, 2);
    assert_eq!(result.bytes_saved, 4_000_000 + 3_000_000);
    assert!(vault.join("storage/item-1").join(marker_file_name(2)).is_file());
}

#[test]
fn test_missing_vault_root_is_fatal() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path().join("does-not-exist");

    let engine = CompressEngine::with_parts(
        test_config(&vault),
        options(2),
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );

    match engine.run(&SilentReporter) {
        Err(Error::VaultMissing(path)) => assert!(path.ends_with("storage")),
        other => panic!("expected VaultMissing, got {:?}", other.map(|r| r.candidates)),
    }
}

#[test]
fn test_cancellation_takes_effect_between_candidates() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    let first = make_pdf(vault, "item-1", "one.pdf", 7_000_000);
    let second = make_pdf(vault, "item-2", "two.pdf", 7_000_000);

    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(3_000_000),
        FsMarkerStore,
    );
    let reporter = CancelOnFirstFile {
        token: engine.cancel_token(),
    };

    // The request lands while the first candidate is in flight, so that
    // candidate completes and the stop happens before the second begins.
    match engine.run(&reporter) {
        Err(Error::Cancelled) => {}
        other => panic!("expected Cancelled, got {:?}", other.map(|r| r.candidates)),
    }

    let sizes = [
        fs::metadata(&first).unwrap().len(),
        fs::metadata(&second).unwrap().len(),
    ];
    let replaced = sizes.iter().filter(|s| **s == 3_000_000).count();
    let untouched = sizes.iter().filter(|s| **s == 7_000_000).count();
    assert_eq!((replaced, untouched), (1, 1));
    assert!(!vault.join(".zbc-temp.pdf").exists());
}

#[test]
fn test_memory_marker_store_makes_rerun_a_noop() {
    let tmp = tempdir().unwrap();
    let vault = tmp.path();
    make_pdf(vault, "item-1", "paper.pdf", 7_000_000);

    // Output stays above the threshold; the in-memory marker alone must
    // make the second run an empty scan.
    let engine = CompressEngine::with_parts(
        test_config(vault),
        options(2),
        FakeCompressor::emitting(6_500_000),
        MemoryMarkerStore::new(),
    );

    let first = engine.run(&SilentReporter).unwrap();
    assert_eq!(first.committed, 1);

    let second = engine.run(&SilentReporter).unwrap();
    assert_eq!(second.candidates, 0);
}
