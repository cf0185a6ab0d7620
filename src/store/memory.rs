use dashmap::DashMap;
use std::sync::{Arc, Mutex};

use super::{CacheEntry, CacheStore, SettingsStore, TimestampStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::scanner::ScanResult;
use crate::settings::SentrySettings;

/// Process-local implementation of all three stores.
pub struct MemoryStore {
    settings: DashMap<String, SentrySettings>,
    cache: DashMap<String, CacheEntry>,
    last_scan: Mutex<Option<i64>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            settings: DashMap::new(),
            cache: DashMap::new(),
            last_scan: Mutex::new(None),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryStore {
    fn get_settings(&self, key: &str) -> Result<Option<SentrySettings>> {
        Ok(self.settings.get(key).map(|entry| entry.value().clone()))
    }

    fn set_settings(&self, key: &str, settings: &SentrySettings) -> Result<()> {
        self.settings.insert(key.to_string(), settings.clone());
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn get_cached(&self, key: &str) -> Result<Option<ScanResult>> {
        let now = self.clock.now();
        if let Some(entry) = self.cache.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.result.clone()));
            }
        }
        // A concurrent set may have replaced the entry since the read.
        self.cache.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    fn set_cached(&self, key: &str, result: &ScanResult, ttl_secs: u64) -> Result<()> {
        let entry = CacheEntry::new(result.clone(), ttl_secs, self.clock.now());
        self.cache.insert(key.to_string(), entry);
        Ok(())
    }

    fn delete_cached(&self, key: &str) -> Result<()> {
        self.cache.remove(key);
        Ok(())
    }
}

impl TimestampStore for MemoryStore {
    fn get_timestamp(&self) -> Result<Option<i64>> {
        let last_scan = self
            .last_scan
            .lock()
            .map_err(|e| Error::Cache(format!("Failed to lock timestamp: {}", e)))?;
        Ok(*last_scan)
    }

    fn set_timestamp(&self, epoch_secs: i64) -> Result<()> {
        let mut last_scan = self
            .last_scan
            .lock()
            .map_err(|e| Error::Cache(format!("Failed to lock timestamp: {}", e)))?;
        *last_scan = Some(epoch_secs);
        Ok(())
    }
}
