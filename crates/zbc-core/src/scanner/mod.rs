mod vault;

pub use vault::{scan_vault, CandidateFile};
