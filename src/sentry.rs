//! Cached scanning of the configured static directories.
//!
//! `Sentry` ties the catalog, the scan engine and the three stores together.
//! A cached result is served until its TTL runs out, a refresh is forced,
//! or the settings are saved. None of the store failures here are fatal:
//! a broken cache just means every call scans, broken settings mean defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{CandidateList, DirectoryCatalog};
use crate::clock::{Clock, SystemClock};
use crate::config::{self, AppConfig};
use crate::error::Result;
use crate::progress::{ProgressReporter, SilentReporter};
use crate::scanner::{ScanEngine, ScanResult, SuspiciousPattern};
use crate::settings::{SentrySettings, SettingsInput, DEFAULT_CACHE_TTL};
use crate::store::{CacheStore, SettingsStore, TimestampStore};

pub const SETTINGS_KEY: &str = "sentry_settings";
pub const SCAN_CACHE_KEY: &str = "sentry_scan_results";

/// Everything a dashboard needs to render one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentryReport {
    pub result: ScanResult,
    pub is_cached: bool,
    /// Number of resolved target directories, scanned or not.
    pub directory_count: usize,
    pub last_scan: Option<i64>,
}

impl SentryReport {
    pub fn files(&self) -> &[String] {
        &self.result.files
    }
}

pub struct Sentry {
    catalog: DirectoryCatalog,
    engine: ScanEngine,
    pattern: SuspiciousPattern,
    scan_limit: usize,
    settings: Arc<dyn SettingsStore>,
    cache: Arc<dyn CacheStore>,
    last_scan: Arc<dyn TimestampStore>,
    clock: Arc<dyn Clock>,
}

impl Sentry {
    pub fn new(
        config: &AppConfig,
        settings: Arc<dyn SettingsStore>,
        cache: Arc<dyn CacheStore>,
        last_scan: Arc<dyn TimestampStore>,
    ) -> Self {
        Self {
            catalog: DirectoryCatalog::from_config(config),
            engine: ScanEngine::new(&config.site_root).with_parallel(config.parallel),
            pattern: SuspiciousPattern::default(),
            scan_limit: config.scan_limit,
            settings,
            cache,
            last_scan,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use one store for settings, cache and timestamp.
    pub fn with_store<S>(config: &AppConfig, store: Arc<S>) -> Self
    where
        S: SettingsStore + CacheStore + TimestampStore + 'static,
    {
        Self::new(config, store.clone(), store.clone(), store)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_pattern(mut self, pattern: SuspiciousPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_scan_limit(mut self, scan_limit: usize) -> Self {
        self.scan_limit = scan_limit;
        self
    }

    pub fn candidates(&self) -> CandidateList {
        self.catalog.discover()
    }

    /// Stored settings, or defaults when missing or unreadable.
    pub fn settings(&self) -> SentrySettings {
        match self.settings.get_settings(SETTINGS_KEY) {
            Ok(Some(settings)) => settings,
            Ok(None) => SentrySettings::default(),
            Err(err) => {
                warn!("Unreadable settings, using defaults: {}", err);
                SentrySettings::default()
            }
        }
    }

    /// Configured directories, or just the upload directory if none are set.
    pub fn resolve_targets(&self, settings: &SentrySettings) -> Vec<PathBuf> {
        if settings.dirs.is_empty() {
            return vec![self.catalog.upload_dir().to_path_buf()];
        }
        config::dedupe_directories(settings.dirs.clone())
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    pub fn selected_directories(&self) -> Vec<PathBuf> {
        self.resolve_targets(&self.settings())
    }

    pub fn last_scan(&self) -> Option<i64> {
        match self.last_scan.get_timestamp() {
            Ok(last_scan) => last_scan,
            Err(err) => {
                warn!("Unable to read last scan time: {}", err);
                None
            }
        }
    }

    pub fn get_results(&self) -> SentryReport {
        self.get_results_with(&SilentReporter)
    }

    /// Serve the cached result, or scan and cache a fresh one.
    ///
    /// The last scan time only moves when a scan actually runs.
    pub fn get_results_with(&self, reporter: &dyn ProgressReporter) -> SentryReport {
        let settings = self.settings();
        let targets = self.resolve_targets(&settings);

        let cached = match self.cache.get_cached(SCAN_CACHE_KEY) {
            Ok(cached) => cached,
            Err(err) => {
                warn!("Scan cache unavailable, scanning without it: {}", err);
                None
            }
        };

        if let Some(result) = cached {
            debug!("Serving cached scan result ({} files)", result.files.len());
            return SentryReport {
                result,
                is_cached: true,
                directory_count: targets.len(),
                last_scan: self.last_scan(),
            };
        }

        let result = self
            .engine
            .walk_with(&targets, &self.pattern, self.scan_limit, reporter);

        if let Err(err) = self
            .cache
            .set_cached(SCAN_CACHE_KEY, &result, settings.cache_ttl)
        {
            warn!("Unable to cache scan result: {}", err);
        }

        let now = self.clock.now();
        if let Err(err) = self.last_scan.set_timestamp(now) {
            warn!("Unable to record last scan time: {}", err);
        }

        SentryReport {
            result,
            is_cached: false,
            directory_count: targets.len(),
            last_scan: Some(now),
        }
    }

    /// Drop the cached result. The next `get_results` scans again.
    ///
    /// Callers must have authorized the request; nothing is checked here.
    pub fn force_refresh(&self) -> Result<()> {
        self.cache.delete_cached(SCAN_CACHE_KEY)?;
        info!("Scan cache cleared");
        Ok(())
    }

    /// Validate a settings submission against the current catalog.
    ///
    /// Directories must be exact catalog paths. When none survive, the
    /// upload directory is used if the catalog lists it.
    pub fn sanitize_settings(&self, input: &SettingsInput) -> SentrySettings {
        let cache_ttl = input
            .cache_ttl
            .map(|ttl| ttl.unsigned_abs())
            .unwrap_or(DEFAULT_CACHE_TTL);

        let candidates = self.catalog.discover();
        let submitted: Vec<String> = input
            .dirs
            .iter()
            .flatten()
            .map(|dir| dir.trim().to_string())
            .collect();

        let mut dirs: Vec<String> = Vec::new();
        for dir in config::dedupe_directories(submitted) {
            match candidates.paths().find(|path| *path == Path::new(&dir)) {
                Some(path) => dirs.push(path.to_string_lossy().into_owned()),
                None => debug!("Dropping directory not in catalog: {}", dir),
            }
        }

        if dirs.is_empty() {
            let upload_dir = self.catalog.upload_dir();
            if candidates.contains(upload_dir) {
                dirs.push(upload_dir.to_string_lossy().into_owned());
            }
        }

        SentrySettings { cache_ttl, dirs }
    }

    /// Sanitize and store settings. Always invalidates the cached result.
    pub fn save_settings(&self, input: &SettingsInput) -> Result<SentrySettings> {
        let settings = self.sanitize_settings(input);

        if let Err(err) = self.cache.delete_cached(SCAN_CACHE_KEY) {
            warn!("Unable to clear scan cache: {}", err);
        }

        self.settings.set_settings(SETTINGS_KEY, &settings)?;
        info!(
            "Settings saved: {} directories, cache ttl {}s",
            settings.dirs.len(),
            settings.cache_ttl
        );
        Ok(settings)
    }
}
