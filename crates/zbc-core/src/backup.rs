use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies originals into a run-scoped backup tree before they are
/// overwritten. Nothing appears on disk until the first backup of the run.
pub struct BackupManager {
    run_root: PathBuf,
}

impl BackupManager {
    pub fn new(run_root: PathBuf) -> Self {
        Self { run_root }
    }

    pub fn run_root(&self) -> &Path {
        &self.run_root
    }

    /// Byte-copy `file` into `<run_root>/<item-dir-name>/` under its original
    /// filename, creating the directories on first use. The copy is flushed
    /// to disk before this returns, so the caller may overwrite the original
    /// afterwards.
    pub fn backup(&self, file: &Path) -> io::Result<PathBuf> {
        let item_name = file.parent().and_then(|dir| dir.file_name()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no parent item directory for {}", file.display()),
            )
        })?;
        let file_name = file.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no filename in {}", file.display()),
            )
        })?;

        let target_dir = self.run_root.join(item_name);
        fs::create_dir_all(&target_dir)?;
        let target = target_dir.join(file_name);

        let mut source = File::open(file)?;
        let mut dest = File::create(&target)?;
        io::copy(&mut source, &mut dest)?;
        dest.sync_all()?;

        debug!("Backed up {} to {}", file.display(), target.display());
        Ok(target)
    }
}
