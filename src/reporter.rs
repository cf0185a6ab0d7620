use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use uploads_sentry::ProgressReporter;

/// Spinner shown while a fresh scan walks the target directories.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, target_count: usize) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(format!("Scanning {} directories...", target_count));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_target_start(&self, target: &str) {
        self.with_bar(|pb| pb.set_message(format!("Scanning {}", target)));
    }

    fn on_match(&self, matches_found: usize, _path: &str) {
        self.with_bar(|pb| {
            pb.set_message(format!("Scanning... {} suspicious files", matches_found))
        });
    }

    fn on_scan_complete(&self, total_matches: usize, truncated: bool, duration_secs: f64) {
        self.finish_bar();
        eprintln!("{}", completion_line(total_matches, truncated, duration_secs));
    }
}

fn completion_line(total_matches: usize, truncated: bool, duration_secs: f64) -> String {
    format!(
        "  {} Scan complete: {}{} matches in {:.2}s",
        "✓".green(),
        total_matches,
        if truncated { "+" } else { "" },
        duration_secs
    )
}
