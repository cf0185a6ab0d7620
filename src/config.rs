use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::catalog::SiteLayout;
use crate::error::Error;
use crate::scanner::SuspiciousPattern;

/// Top-level directory names that hold code rather than uploaded media.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "wp-admin",
    "wp-includes",
    "plugins",
    "themes",
    "mu-plugins",
    "cache",
];

pub const DEFAULT_SCAN_LIMIT: usize = 100;
pub const DEFAULT_CONTENT_DIR_NAME: &str = "wp-content";
pub const DEFAULT_UPLOAD_DIR_NAME: &str = "uploads";
pub const DEFAULT_STORE_PATH: &str = "sentry_store";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FILE: &str = "logs/sentry.log";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub site_root: String,
    #[serde(default)]
    pub content_dir: Option<String>,
    #[serde(default)]
    pub upload_dir: Option<String>,
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Replaces the built-in suspicious extension list.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Empty disables the log file.
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_excluded_dirs() -> Vec<String> {
    DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect()
}

fn default_scan_limit() -> usize {
    DEFAULT_SCAN_LIMIT
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_file() -> String {
    DEFAULT_LOG_FILE.to_string()
}

impl AppConfig {
    /// Config for a site root with every other field at its default.
    pub fn for_site_root(site_root: impl Into<String>) -> Self {
        Self {
            site_root: site_root.into(),
            content_dir: None,
            upload_dir: None,
            excluded_dirs: default_excluded_dirs(),
            scan_limit: DEFAULT_SCAN_LIMIT,
            parallel: false,
            store_path: default_store_path(),
            extensions: None,
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }

    pub fn load() -> Result<AppConfig, ConfigError> {
        load_configuration()
    }

    pub fn content_path(&self) -> PathBuf {
        match &self.content_dir {
            Some(dir) => PathBuf::from(dir),
            None => Path::new(&self.site_root).join(DEFAULT_CONTENT_DIR_NAME),
        }
    }

    pub fn upload_path(&self) -> PathBuf {
        match &self.upload_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.content_path().join(DEFAULT_UPLOAD_DIR_NAME),
        }
    }

    pub fn suspicious_pattern(&self) -> Result<SuspiciousPattern, Error> {
        match &self.extensions {
            Some(extensions) => SuspiciousPattern::from_extensions(extensions),
            None => Ok(SuspiciousPattern::default()),
        }
    }

    pub fn log_file_parts(&self) -> Option<(PathBuf, OsString)> {
        log_file_parts(&self.log_file)
    }

    pub fn layout(&self) -> SiteLayout {
        SiteLayout {
            site_root: PathBuf::from(&self.site_root),
            content_dir: self.content_path(),
            upload_dir: self.upload_path(),
        }
    }
}

/// Reads `Sentry.toml` (optional) and `SENTRY_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Sentry").required(false))
        .add_source(
            Environment::with_prefix("SENTRY")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("excluded_dirs")
                .with_list_parse_key("extensions"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Split a log file path into its directory and file name.
pub fn log_file_parts(log_file: &str) -> Option<(PathBuf, OsString)> {
    let path = Path::new(log_file.trim());
    let file_name = path.file_name()?.to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some((dir, file_name))
}

/// Drop exact repeats from a directory list, keeping the first occurrence.
pub fn dedupe_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(dirs.len());

    for dir in dirs {
        if !result.iter().any(|seen| Path::new(seen) == Path::new(&dir)) {
            result.push(dir);
        }
    }

    result
}
