pub mod pattern;
pub mod walk;

use serde::{Deserialize, Serialize};

pub use pattern::{SuspiciousPattern, SUSPICIOUS_EXTENSIONS};
pub use walk::ScanEngine;

/// Outcome of one traversal over the target directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Matches in discovery order, relative to the site root where possible.
    pub files: Vec<String>,
    /// The match cap was reached; more matches may exist.
    pub truncated: bool,
    pub directories_scanned: usize,
}

impl ScanResult {
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }
}
