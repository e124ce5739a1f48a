use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::compressor::MAX_LEVEL;

/// Marker that excludes an item directory from compression permanently.
pub const IGNORE_MARKER: &str = ".zbc.ignore";

/// Filename of the marker recording a completed compression at `level`.
pub fn marker_file_name(level: u8) -> String {
    format!(".zbc.p{}-compressed", level)
}

/// Parse a `.zbc.p<level>-compressed` filename back to its level. Names
/// outside the supported level range are not markers.
fn parse_marker_level(name: &str) -> Option<u8> {
    let level = name.strip_prefix(".zbc.p")?.strip_suffix("-compressed")?;
    match level.parse::<u8>() {
        Ok(p) if p <= MAX_LEVEL => Some(p),
        _ => None,
    }
}

/// Per-directory skip state, persisted as sentinel files in the item
/// directories themselves. Markers are what make reruns of the pipeline a
/// no-op scan instead of a redundant compression pass.
pub trait MarkerStore {
    /// True when `dir` holds an ignore marker, or a compressed-marker at
    /// `requested_level` or any higher level. Side-effect-free.
    fn is_skippable(&self, dir: &Path, requested_level: u8) -> io::Result<bool>;

    /// Record a completed compression of `dir` at `level`. Only called once
    /// the replaced file in `dir` has been written. Safe to re-run.
    fn commit(&self, dir: &Path, level: u8, timestamp: DateTime<Local>) -> io::Result<()>;
}

/// The production marker store, backed by the vault filesystem.
pub struct FsMarkerStore;

impl MarkerStore for FsMarkerStore {
    fn is_skippable(&self, dir: &Path, requested_level: u8) -> io::Result<bool> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };

            if name == IGNORE_MARKER {
                return Ok(true);
            }
            if let Some(level) = parse_marker_level(name) {
                if level >= requested_level {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn commit(&self, dir: &Path, level: u8, timestamp: DateTime<Local>) -> io::Result<()> {
        let marker = dir.join(marker_file_name(level));
        fs::write(
            &marker,
            format!("Compressed at: {}.", timestamp.format("%d-%m-%y %H:%M:%S")),
        )
    }
}

/// In-memory marker store for exercising the engine without a real vault.
#[derive(Default)]
pub struct MemoryMarkerStore {
    ignored: Mutex<Vec<PathBuf>>,
    committed: Mutex<HashMap<PathBuf, u8>>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore(&self, dir: &Path) {
        self.ignored.lock().unwrap().push(dir.to_path_buf());
    }

    pub fn committed_level(&self, dir: &Path) -> Option<u8> {
        self.committed.lock().unwrap().get(dir).copied()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn is_skippable(&self, dir: &Path, requested_level: u8) -> io::Result<bool> {
        if self.ignored.lock().unwrap().iter().any(|d| d == dir) {
            return Ok(true);
        }
        Ok(self
            .committed
            .lock()
            .unwrap()
            .get(dir)
            .is_some_and(|level| *level >= requested_level))
    }

    fn commit(&self, dir: &Path, level: u8, _timestamp: DateTime<Local>) -> io::Result<()> {
        // The most permissive marker governs, so only ever raise the level.
        let mut committed = self.committed.lock().unwrap();
        let entry = committed.entry(dir.to_path_buf()).or_insert(level);
        if level > *entry {
            *entry = level;
        }
        Ok(())
    }
}
