//! Watches static upload directories for files that look executable.
//!
//! Matching is by file name only. Matches are surfaced for review; nothing
//! is read, deleted or quarantined.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod progress;
pub mod scanner;
pub mod sentry;
pub mod settings;
pub mod store;

pub use catalog::{CandidateList, DirectoryCandidate, DirectoryCatalog, SiteLayout};
pub use config::AppConfig;
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use scanner::{ScanEngine, ScanResult, SuspiciousPattern};
pub use sentry::{Sentry, SentryReport};
pub use settings::{SentrySettings, SettingsInput};
pub use store::{CacheStore, MemoryStore, RocksStore, SettingsStore, TimestampStore};
