use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;

use crate::markers::MarkerStore;

/// One PDF eligible for compression this run. `size` is captured at scan
/// time and is what all later verification arithmetic uses.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub size: u64,
    pub item_dir: PathBuf,
}

/// Walk the item directories directly under `storage_root`, skipping any the
/// marker store reports as already handled, and collect every PDF at or
/// above the size threshold. Enumeration order is filesystem order; callers
/// must not assume it is sorted.
pub fn scan_vault<M: MarkerStore>(
    storage_root: &Path,
    requested_level: u8,
    max_kilobytes: u64,
    markers: &M,
) -> io::Result<Vec<CandidateFile>> {
    let threshold_bytes = max_kilobytes * 1000;
    let mut candidates = Vec::new();

    for entry in fs::read_dir(storage_root)? {
        let entry = entry?;
        let item_dir = entry.path();
        if !item_dir.is_dir() {
            continue;
        }

        match markers.is_skippable(&item_dir, requested_level) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                error!("Access denied reading {}: {}", item_dir.display(), err);
                continue;
            }
            Err(err) => return Err(err),
        }

        collect_pdfs(&item_dir, threshold_bytes, &mut candidates)?;
    }

    Ok(candidates)
}

fn collect_pdfs(
    item_dir: &Path,
    threshold_bytes: u64,
    candidates: &mut Vec<CandidateFile>,
) -> io::Result<()> {
    let entries = match fs::read_dir(item_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            error!("Access denied reading {}: {}", item_dir.display(), err);
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !is_pdf(&path) {
            continue;
        }
        let metadata = fs::metadata(&path)?;
        if metadata.is_file() && metadata.len() >= threshold_bytes {
            candidates.push(CandidateFile {
                path,
                size: metadata.len(),
                item_dir: item_dir.to_path_buf(),
            });
        }
    }
    Ok(())
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
