use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_TTL: u64 = 3600;

/// Persisted monitor settings. An empty `dirs` means "the upload directory".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentrySettings {
    /// Seconds a scan result stays cached; 0 keeps it until invalidated.
    pub cache_ttl: u64,
    pub dirs: Vec<String>,
}

impl Default for SentrySettings {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            dirs: Vec::new(),
        }
    }
}

/// Raw, unvalidated settings as submitted by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsInput {
    pub cache_ttl: Option<i64>,
    pub dirs: Option<Vec<String>>,
}
