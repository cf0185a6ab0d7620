use rocksdb::{Options, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace};

use super::{CacheEntry, CacheStore, SettingsStore, TimestampStore};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::scanner::ScanResult;
use crate::settings::SentrySettings;

const SETTINGS_PREFIX: &str = "settings|";
const CACHE_PREFIX: &str = "cache|";
const LAST_SCAN_KEY: &str = "last_scan_timestamp";

/// RocksDB-backed implementation of all three stores.
///
/// Values are bincode encoded. Cache entries carry their own expiry, which
/// is checked on read; expired entries are deleted lazily.
pub struct RocksStore {
    db: Mutex<DB>,
    clock: Arc<dyn Clock>,
}

impl RocksStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Using '{}' for sentry store", path.display());

        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        let db = DB::open(&db_options, path)?;
        Ok(Self {
            db: Mutex::new(db),
            clock,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DB>> {
        self.db
            .lock()
            .map_err(|e| Error::Cache(format!("Failed to lock store: {}", e)))
    }

    fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let db = self.lock()?;
        match db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        let db = self.lock()?;
        db.put(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn delete_value(&self, key: &str) -> Result<()> {
        let db = self.lock()?;
        db.delete(key.as_bytes())?;
        Ok(())
    }
}

impl SettingsStore for RocksStore {
    fn get_settings(&self, key: &str) -> Result<Option<SentrySettings>> {
        self.get_value(&format!("{}{}", SETTINGS_PREFIX, key))
    }

    fn set_settings(&self, key: &str, settings: &SentrySettings) -> Result<()> {
        self.put_value(&format!("{}{}", SETTINGS_PREFIX, key), settings)
    }
}

impl CacheStore for RocksStore {
    fn get_cached(&self, key: &str) -> Result<Option<ScanResult>> {
        let db_key = format!("{}{}", CACHE_PREFIX, key);
        match self.get_value::<CacheEntry>(&db_key)? {
            Some(entry) if !entry.is_expired(self.clock.now()) => {
                trace!("Found {} in cache", key);
                Ok(Some(entry.result))
            }
            Some(_) => {
                trace!("Cache entry {} expired, removing", key);
                self.delete_value(&db_key)?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set_cached(&self, key: &str, result: &ScanResult, ttl_secs: u64) -> Result<()> {
        let entry = CacheEntry::new(result.clone(), ttl_secs, self.clock.now());
        self.put_value(&format!("{}{}", CACHE_PREFIX, key), &entry)
    }

    fn delete_cached(&self, key: &str) -> Result<()> {
        self.delete_value(&format!("{}{}", CACHE_PREFIX, key))
    }
}

impl TimestampStore for RocksStore {
    fn get_timestamp(&self) -> Result<Option<i64>> {
        self.get_value(LAST_SCAN_KEY)
    }

    fn set_timestamp(&self, epoch_secs: i64) -> Result<()> {
        self.put_value(LAST_SCAN_KEY, &epoch_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store");
        let result = ScanResult {
            files: vec!["media/x.cgi".to_string()],
            truncated: true,
            directories_scanned: 2,
        };
        let settings = SentrySettings {
            cache_ttl: 0,
            dirs: vec!["/srv/site/media".to_string()],
        };

        {
            let store = RocksStore::open(&db_path).unwrap();
            store.set_settings("sentry", &settings).unwrap();
            store.set_cached("scan", &result, 0).unwrap();
            store.set_timestamp(1_700_000_000).unwrap();
        }

        let store = RocksStore::open(&db_path).unwrap();
        assert_eq!(store.get_settings("sentry").unwrap(), Some(settings));
        assert_eq!(store.get_cached("scan").unwrap(), Some(result));
        assert_eq!(store.get_timestamp().unwrap(), Some(1_700_000_000));
    }

    #[test]
    fn test_expired_entry_reads_as_missing() {
        let dir = tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        let store = RocksStore::open_with_clock(dir.path().join("store"), clock.clone()).unwrap();

        store.set_cached("scan", &ScanResult::default(), 3600).unwrap();
        clock.advance(3599);
        assert!(store.get_cached("scan").unwrap().is_some());
        clock.advance(1);
        assert!(store.get_cached("scan").unwrap().is_none());

        // expired entry was removed, not just hidden
        clock.set(0);
        assert!(store.get_cached("scan").unwrap().is_none());
    }

    #[test]
    fn test_malformed_settings_surface_as_error() {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("store")).unwrap();
        {
            let db = store.lock().unwrap();
            db.put(format!("{}sentry", SETTINGS_PREFIX).as_bytes(), [0xffu8])
                .unwrap();
        }
        assert!(store.get_settings("sentry").is_err());
    }

    #[test]
    fn test_delete_cached() {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("store")).unwrap();
        store.set_cached("scan", &ScanResult::default(), 60).unwrap();
        store.delete_cached("scan").unwrap();
        assert!(store.get_cached("scan").unwrap().is_none());
        // deleting a missing key is fine
        store.delete_cached("scan").unwrap();
    }
}
