/// Trait for reporting scan progress.
///
/// The CLI implements it with an indicatif spinner; embedders that render
/// their own dashboard can ignore it. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _target_count: usize) {}
    fn on_target_start(&self, _target: &str) {}
    fn on_match(&self, _matches_found: usize, _path: &str) {}
    fn on_scan_complete(&self, _total_matches: usize, _truncated: bool, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
