//! Storage boundaries for settings, cached scan results and the last scan time.

mod memory;
mod rocks;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::scanner::ScanResult;
use crate::settings::SentrySettings;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

pub trait SettingsStore: Send + Sync {
    fn get_settings(&self, key: &str) -> Result<Option<SentrySettings>>;
    fn set_settings(&self, key: &str, settings: &SentrySettings) -> Result<()>;
}

/// TTL key/value store. An expired entry must read exactly like a missing one.
pub trait CacheStore: Send + Sync {
    fn get_cached(&self, key: &str) -> Result<Option<ScanResult>>;
    /// `ttl_secs == 0` keeps the entry until it is deleted.
    fn set_cached(&self, key: &str, result: &ScanResult, ttl_secs: u64) -> Result<()>;
    fn delete_cached(&self, key: &str) -> Result<()>;
}

pub trait TimestampStore: Send + Sync {
    fn get_timestamp(&self) -> Result<Option<i64>>;
    fn set_timestamp(&self, epoch_secs: i64) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    result: ScanResult,
    expires_at: Option<i64>,
}

impl CacheEntry {
    fn new(result: ScanResult, ttl_secs: u64, now: i64) -> Self {
        let expires_at = match ttl_secs {
            0 => None,
            ttl => Some(now.saturating_add(i64::try_from(ttl).unwrap_or(i64::MAX))),
        };
        Self { result, expires_at }
    }

    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}
