use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::{ScanResult, SuspiciousPattern};
use crate::progress::{ProgressReporter, SilentReporter};

pub struct ScanEngine {
    relative_root: PathBuf,
    parallel: bool,
}

impl ScanEngine {
    /// Matches are reported relative to `relative_root` (normally the site root).
    pub fn new(relative_root: impl Into<PathBuf>) -> Self {
        Self {
            relative_root: relative_root.into(),
            parallel: false,
        }
    }

    /// Walk targets concurrently. The cap stays global across all workers.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn walk(&self, targets: &[PathBuf], pattern: &SuspiciousPattern, cap: usize) -> ScanResult {
        self.walk_with(targets, pattern, cap, &SilentReporter)
    }

    /// Collect up to `cap` suspicious files from `targets`, in target order.
    ///
    /// Targets that are missing or not directories are skipped, as are
    /// unreadable subtrees. Symlinks are never followed.
    pub fn walk_with(
        &self,
        targets: &[PathBuf],
        pattern: &SuspiciousPattern,
        cap: usize,
        reporter: &dyn ProgressReporter,
    ) -> ScanResult {
        info!("Scanning {} target directories...", targets.len());
        reporter.on_scan_start(targets.len());
        let scan_start = Instant::now();

        let result = if cap == 0 {
            ScanResult {
                truncated: true,
                ..ScanResult::default()
            }
        } else if self.parallel {
            self.walk_parallel(targets, pattern, cap, reporter)
        } else {
            self.walk_sequential(targets, pattern, cap, reporter)
        };

        let duration = scan_start.elapsed();
        info!(
            "Scan completed in {:.2}s: {} suspicious files in {} directories{}",
            duration.as_secs_f64(),
            result.files.len(),
            result.directories_scanned,
            if result.truncated { " (limit reached)" } else { "" },
        );
        reporter.on_scan_complete(result.files.len(), result.truncated, duration.as_secs_f64());
        result
    }

    fn walk_sequential(
        &self,
        targets: &[PathBuf],
        pattern: &SuspiciousPattern,
        cap: usize,
        reporter: &dyn ProgressReporter,
    ) -> ScanResult {
        let mut result = ScanResult::default();

        'targets: for target in targets {
            if !target.is_dir() {
                debug!("Skipping {}: not a directory", target.display());
                continue;
            }
            result.directories_scanned += 1;
            reporter.on_target_start(&target.to_string_lossy());

            for path in walker(target).filter_map(|entry| matching_path(entry, pattern)) {
                let shown = self.display_path(&path);
                reporter.on_match(result.files.len() + 1, &shown);
                result.files.push(shown);
                if result.files.len() >= cap {
                    result.truncated = true;
                    break 'targets;
                }
            }
        }

        result
    }

    fn walk_parallel(
        &self,
        targets: &[PathBuf],
        pattern: &SuspiciousPattern,
        cap: usize,
        reporter: &dyn ProgressReporter,
    ) -> ScanResult {
        // Slots are reserved with fetch_add, so no more than `cap` files are
        // ever kept no matter how many workers race.
        let reserved = AtomicUsize::new(0);
        let under_cap = || reserved.load(Ordering::SeqCst) < cap;

        let per_target: Vec<Option<Vec<String>>> = targets
            .par_iter()
            .map(|target| {
                if !target.is_dir() {
                    debug!("Skipping {}: not a directory", target.display());
                    return None;
                }
                if !under_cap() {
                    return None;
                }
                let mut files = Vec::new();
                reporter.on_target_start(&target.to_string_lossy());

                let matches = walker(target)
                    .take_while(|_| under_cap())
                    .filter_map(|entry| matching_path(entry, pattern));
                for path in matches {
                    let slot = reserved.fetch_add(1, Ordering::SeqCst);
                    if slot >= cap {
                        break;
                    }
                    let shown = self.display_path(&path);
                    reporter.on_match(slot + 1, &shown);
                    files.push(shown);
                }
                Some(files)
            })
            .collect();

        let mut result = ScanResult::default();
        for files in per_target.into_iter().flatten() {
            result.directories_scanned += 1;
            result.files.extend(files);
        }
        result.truncated = result.files.len() >= cap;
        result
    }

    /// Path relative to the root, or the absolute path if it lies outside.
    fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.relative_root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel.to_string_lossy().into_owned(),
            _ => path.to_string_lossy().into_owned(),
        }
    }
}

fn walker(target: &Path) -> walkdir::IntoIter {
    WalkDir::new(target)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
}

fn matching_path(entry: walkdir::Result<DirEntry>, pattern: &SuspiciousPattern) -> Option<PathBuf> {
    let entry = match entry {
        Ok(entry) => entry,
        Err(err) => {
            debug!("Skipping unreadable entry: {}", err);
            return None;
        }
    };

    // Symlinks are leaves: matched by name, never descended into.
    if !entry.file_type().is_file() && !entry.path_is_symlink() {
        return None;
    }

    if pattern.is_match(&entry.file_name().to_string_lossy()) {
        Some(entry.into_path())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_case_insensitive_match_in_nested_dirs() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("a/b/shell.PHP5"));
        touch(&root.join("a/image.png"));
        touch(&root.join("a/c/readme.txt"));

        let engine = ScanEngine::new(root);
        let result = engine.walk(&[root.to_path_buf()], &SuspiciousPattern::default(), 100);

        let expected = Path::new("a").join("b").join("shell.PHP5");
        assert_eq!(result.files, vec![expected.to_string_lossy().into_owned()]);
        assert!(!result.truncated);
        assert_eq!(result.directories_scanned, 1);
    }

    #[test]
    fn test_cap_truncates_single_target() {
        let tmp = tempdir().unwrap();
        for i in 0..150 {
            touch(&tmp.path().join(format!("drop/f{:03}.php", i)));
        }

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(&[tmp.path().to_path_buf()], &SuspiciousPattern::default(), 100);

        assert_eq!(result.files.len(), 100);
        assert!(result.truncated);
    }

    #[test]
    fn test_cap_is_global_across_targets() {
        let tmp = tempdir().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        let third = tmp.path().join("third");
        for i in 0..60 {
            touch(&first.join(format!("a{:02}.sh", i)));
            touch(&second.join(format!("b{:02}.cgi", i)));
        }
        touch(&third.join("c.exe"));

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(
            &[first.clone(), second.clone(), third.clone()],
            &SuspiciousPattern::default(),
            100,
        );

        assert_eq!(result.files.len(), 100);
        assert!(result.truncated);
        // third target never reached
        assert_eq!(result.directories_scanned, 2);
        assert!(result.files[..60].iter().all(|f| f.starts_with("first")));
        assert!(result.files[60..].iter().all(|f| f.starts_with("second")));
    }

    #[test]
    fn test_exactly_cap_matches_reports_truncated() {
        let tmp = tempdir().unwrap();
        for i in 0..3 {
            touch(&tmp.path().join(format!("x{}.py", i)));
        }

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(&[tmp.path().to_path_buf()], &SuspiciousPattern::default(), 3);
        assert_eq!(result.files.len(), 3);
        assert!(result.truncated);

        let result = engine.walk(&[tmp.path().to_path_buf()], &SuspiciousPattern::default(), 4);
        assert_eq!(result.files.len(), 3);
        assert!(!result.truncated);
    }

    #[test]
    fn test_missing_targets_are_skipped() {
        let tmp = tempdir().unwrap();
        let real = tmp.path().join("real");
        touch(&real.join("x.asp"));
        let file_target = tmp.path().join("plain.txt");
        touch(&file_target);

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(
            &[tmp.path().join("gone"), file_target, real],
            &SuspiciousPattern::default(),
            100,
        );

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.directories_scanned, 1);
        assert!(!result.truncated);
    }

    #[test]
    fn test_directories_are_not_matched() {
        let tmp = tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("backup.php/inner")).unwrap();
        touch(&tmp.path().join("backup.php/inner/photo.jpg"));

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(&[tmp.path().to_path_buf()], &SuspiciousPattern::default(), 100);
        assert!(result.is_clean());
    }

    #[test]
    fn test_paths_outside_root_stay_absolute() {
        let site = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let shell = elsewhere.path().join("cmd.php");
        touch(&shell);

        let engine = ScanEngine::new(site.path());
        let result = engine.walk(
            &[elsewhere.path().to_path_buf()],
            &SuspiciousPattern::default(),
            100,
        );
        assert_eq!(result.files, vec![shell.to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_zero_cap_scans_nothing() {
        let tmp = tempdir().unwrap();
        touch(&tmp.path().join("a.php"));

        let engine = ScanEngine::new(tmp.path());
        let result = engine.walk(&[tmp.path().to_path_buf()], &SuspiciousPattern::default(), 0);
        assert!(result.files.is_empty());
        assert!(result.truncated);
        assert_eq!(result.directories_scanned, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_matched_but_not_followed() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("uploads");
        touch(&root.join("2024/evil.phtml"));
        std::os::unix::fs::symlink(&root, root.join("2024/loop")).unwrap();
        std::os::unix::fs::symlink(root.join("2024/evil.phtml"), root.join("alias.php")).unwrap();

        let engine = ScanEngine::new(&root);
        let result = engine.walk(&[root.clone()], &SuspiciousPattern::default(), 100);
        let expected = vec![
            Path::new("2024").join("evil.phtml").to_string_lossy().into_owned(),
            "alias.php".to_string(),
        ];
        assert_eq!(result.files, expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_script_outside_target_is_reported() {
        let tmp = tempdir().unwrap();
        let config_file = tmp.path().join("wp-config.php");
        touch(&config_file);
        let root = tmp.path().join("uploads");
        fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&config_file, root.join("shell.php")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone.txt"), root.join("dangling.sh")).unwrap();

        let engine = ScanEngine::new(&root);
        let result = engine.walk(&[root.clone()], &SuspiciousPattern::default(), 100);
        assert_eq!(
            result.files,
            vec!["dangling.sh".to_string(), "shell.php".to_string()]
        );
    }

    #[test]
    fn test_parallel_respects_global_cap() {
        let tmp = tempdir().unwrap();
        let targets: Vec<PathBuf> = (0..4).map(|t| tmp.path().join(format!("t{}", t))).collect();
        for target in &targets {
            for i in 0..40 {
                touch(&target.join(format!("deep/f{:02}.pl", i)));
            }
        }

        let engine = ScanEngine::new(tmp.path()).with_parallel(true);
        let result = engine.walk(&targets, &SuspiciousPattern::default(), 100);
        assert_eq!(result.files.len(), 100);
        assert!(result.truncated);
    }

    #[test]
    fn test_parallel_keeps_target_order() {
        let tmp = tempdir().unwrap();
        let first = tmp.path().join("first");
        let second = tmp.path().join("second");
        touch(&first.join("a.php"));
        touch(&first.join("b.php"));
        touch(&second.join("c.php"));

        let engine = ScanEngine::new(tmp.path()).with_parallel(true);
        let result = engine.walk(
            &[first, tmp.path().join("missing"), second],
            &SuspiciousPattern::default(),
            100,
        );

        let expected: Vec<String> = [
            Path::new("first").join("a.php"),
            Path::new("first").join("b.php"),
            Path::new("second").join("c.php"),
        ]
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
        assert_eq!(result.files, expected);
        assert_eq!(result.directories_scanned, 2);
        assert!(!result.truncated);
    }
}
