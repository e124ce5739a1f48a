mod ghostscript;

pub use ghostscript::Ghostscript;

use std::path::Path;

use crate::error::CompressError;

/// Highest supported compression level.
pub const MAX_LEVEL: u8 = 4;

/// Ghostscript quality preset for each compression level
/// (0 = highest fidelity … 4 = most aggressive). The mapping is fixed and
/// not overridable per invocation.
pub fn quality_preset(level: u8) -> &'static str {
    match level {
        0 => "/default",
        1 => "/prepress",
        2 => "/printer",
        3 => "/ebook",
        _ => "/screen",
    }
}

/// Compresses a single PDF into a separate output file.
///
/// The production implementation spawns Ghostscript; tests use a
/// programmable fake so the engine state machine runs without a subprocess.
pub trait Compressor {
    /// Compress `input` into `output` at the given level. Must never modify
    /// or delete `input`; on failure `output` is left absent.
    fn compress(&self, input: &Path, output: &Path, level: u8) -> Result<(), CompressError>;
}
