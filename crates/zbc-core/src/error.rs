use std::path::PathBuf;
use thiserror::Error;

/// Fatal, batch-aborting errors. Nothing in the vault has been touched when
/// one of these is returned from engine construction or startup checks.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("vault storage not found at {0}")]
    VaultMissing(PathBuf),

    #[error("no Ghostscript executable was found ({0})")]
    GhostscriptMissing(String),

    #[error("Cancelled")]
    Cancelled,
}

/// File-scoped, recoverable errors. Each one is logged as a warning, leaves
/// the original file and marker state unchanged, and the batch continues.
#[derive(Error, Debug)]
pub enum CompressError {
    #[error("invalid input path: {0}")]
    MissingInput(PathBuf),

    #[error("input file is not a PDF: {0}")]
    NotPdf(PathBuf),

    #[error("compression tool exited with {status}: {stderr}")]
    ToolFailed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("compression tool produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
