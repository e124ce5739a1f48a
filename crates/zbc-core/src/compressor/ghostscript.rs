use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use which::which;

use super::{quality_preset, Compressor};
use crate::error::{CompressError, Error};
use crate::platform;

/// Invokes the Ghostscript pdfwrite device as a blocking subprocess.
pub struct Ghostscript {
    bin: PathBuf,
}

impl Ghostscript {
    /// Locate a Ghostscript executable on the PATH, then in the configured
    /// fallback install directory. Absence aborts the whole run before any
    /// file is touched.
    pub fn locate(fallback_dir: Option<&Path>) -> Result<Self, Error> {
        for name in platform::ghostscript_candidates() {
            if let Ok(bin) = which(name) {
                debug!("Using Ghostscript at {}", bin.display());
                return Ok(Self { bin });
            }
            if let Some(dir) = fallback_dir {
                let candidate = dir.join(platform::exe_name(name));
                if candidate.is_file() {
                    debug!("Using Ghostscript at {}", candidate.display());
                    return Ok(Self { bin: candidate });
                }
            }
        }

        let mut searched = format!(
            "searched PATH for {}",
            platform::ghostscript_candidates().join("/")
        );
        if let Some(dir) = fallback_dir {
            searched.push_str(&format!(" and {}", dir.display()));
        }
        Err(Error::GhostscriptMissing(searched))
    }

    pub fn with_binary(bin: PathBuf) -> Self {
        Self { bin }
    }
}

impl Compressor for Ghostscript {
    fn compress(&self, input: &Path, output: &Path, level: u8) -> Result<(), CompressError> {
        // Both checks happen before any subprocess is spawned.
        if !input.is_file() {
            return Err(CompressError::MissingInput(input.to_path_buf()));
        }
        let is_pdf = input
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !is_pdf {
            return Err(CompressError::NotPdf(input.to_path_buf()));
        }

        let result = Command::new(&self.bin)
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", quality_preset(level)))
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg(format!("-sOutputFile={}", output.display()))
            .arg(input)
            .output()?;

        if !result.status.success() {
            // Ghostscript can leave a partial file behind on failure.
            let _ = fs::remove_file(output);
            return Err(CompressError::ToolFailed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        if !output.is_file() {
            return Err(CompressError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}
