pub mod backup;
pub mod compressor;
pub mod config;
pub mod engine;
pub mod error;
pub mod markers;
pub mod platform;
pub mod progress;
pub mod scanner;

pub use config::AppConfig;
pub use engine::{CompressEngine, FileOutcome, RunOptions, RunResult};
pub use error::{CompressError, Error};
pub use progress::{ProgressReporter, SilentReporter};
