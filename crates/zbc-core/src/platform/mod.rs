use std::env::consts::EXE_SUFFIX;

/// Ghostscript executable names to try, most specific first.
#[cfg(target_os = "windows")]
pub fn ghostscript_candidates() -> &'static [&'static str] {
    &["gswin64c", "gswin32c", "gs"]
}

#[cfg(not(target_os = "windows"))]
pub fn ghostscript_candidates() -> &'static [&'static str] {
    &["gs"]
}

/// Executable filename for `base` on the current platform.
pub fn exe_name(base: &str) -> String {
    format!("{}{}", base, EXE_SUFFIX)
}
