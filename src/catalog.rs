//! Discovery of the top-level directories a site owner may choose to monitor.
//!
//! Only immediate children of the content root and the site root are
//! considered. Anything whose base name is on the exclusion list (core,
//! plugin and theme code, caches) never becomes a candidate.

use glob::{glob_with, MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::AppConfig;

/// Where the site keeps its code, its content and its uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    pub site_root: PathBuf,
    pub content_dir: PathBuf,
    pub upload_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCandidate {
    pub path: PathBuf,
    pub label: String,
}

/// Candidates keyed by path, iterated in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    entries: Vec<DirectoryCandidate>,
}

impl CandidateList {
    /// Returns false if the path was already listed; the first label wins.
    fn insert(&mut self, path: PathBuf, label: String) -> bool {
        if self.contains(&path) {
            return false;
        }
        self.entries.push(DirectoryCandidate { path, label });
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|c| c.path == path)
    }

    pub fn label(&self, path: &Path) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.path == path)
            .map(|c| c.label.as_str())
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|c| c.path.as_path())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DirectoryCandidate> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a DirectoryCandidate;
    type IntoIter = std::slice::Iter<'a, DirectoryCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    layout: SiteLayout,
    excluded_dirs: Vec<String>,
}

impl DirectoryCatalog {
    pub fn new(layout: SiteLayout, excluded_dirs: Vec<String>) -> Self {
        Self {
            layout,
            excluded_dirs,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.layout(), config.excluded_dirs.clone())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.layout.upload_dir
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|excluded| excluded == name)
    }

    /// List every directory eligible for monitoring.
    ///
    /// Order: the upload directory, then content-root children, then
    /// site-root children. The upload directory is always listed, even if
    /// it does not exist yet. Unreadable roots contribute nothing.
    pub fn discover(&self) -> CandidateList {
        let mut candidates = CandidateList::default();
        let layout = &self.layout;

        candidates.insert(layout.upload_dir.clone(), self.upload_label());

        let content_name = base_name(&layout.content_dir);
        for dir in immediate_subdirectories(&layout.content_dir) {
            let name = base_name(&dir);
            if self.is_excluded(&name) || dir == layout.upload_dir {
                continue;
            }
            let label = format!("{}/{}", content_name, name);
            candidates.insert(dir, label);
        }

        for dir in immediate_subdirectories(&layout.site_root) {
            let name = base_name(&dir);
            if name == content_name || self.is_excluded(&name) {
                continue;
            }
            let label = format!("/{}", name);
            candidates.insert(dir, label);
        }

        debug!("Discovered {} candidate directories", candidates.len());
        candidates
    }

    fn upload_label(&self) -> String {
        let upload = &self.layout.upload_dir;
        let shown = match upload.strip_prefix(&self.layout.site_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
            _ => upload.to_string_lossy().into_owned(),
        };
        format!("{} (Standard)", shown)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directories directly under `root`, hidden entries skipped, in glob order.
fn immediate_subdirectories(root: &Path) -> Vec<PathBuf> {
    let escaped = Pattern::escape(&root.to_string_lossy());
    let pattern = Path::new(&escaped).join("*");
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let paths = match glob_with(&pattern.to_string_lossy(), options) {
        Ok(paths) => paths,
        Err(err) => {
            warn!("Invalid directory pattern for {}: {}", root.display(), err);
            return Vec::new();
        }
    };

    paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!("Error listing {}: {}", root.display(), err);
                None
            }
        })
        .filter(|path| path.is_dir())
        .collect()
}
