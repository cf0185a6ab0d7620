mod cli;
mod logging;
mod reporter;

use std::error::Error;
use std::process;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{CommandFactory, Parser};
use colored::*;
use dotenv::dotenv;
use tracing::{error, info};

use cli::{Cli, Commands};
use reporter::CliReporter;
use uploads_sentry::config;
use uploads_sentry::{AppConfig, RocksStore, Sentry, SentryReport, SettingsInput};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let loaded = AppConfig::load();

    let _guard = match &loaded {
        Ok(config) => logging::init_logger(&config.log_level, config.log_file_parts()),
        Err(_) => logging::init_logger(
            config::DEFAULT_LOG_LEVEL,
            config::log_file_parts(config::DEFAULT_LOG_FILE),
        ),
    };

    let Some(command) = args.command else {
        if let Err(err) = Cli::command().print_long_help() {
            error!("Unable to print help: {}", err);
        }
        return;
    };

    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = run(command, &config) {
        error!("Error: {}", err);
        process::exit(1);
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    if let Commands::PrintConfig = command {
        println!("Configuration: {:?}", config);
        return Ok(());
    }

    let store = Arc::new(RocksStore::open(&config.store_path)?);
    let sentry = Sentry::with_store(config, store).with_pattern(config.suspicious_pattern()?);

    match command {
        Commands::Scan(args) => {
            if args.refresh {
                sentry.force_refresh()?;
            }
            let reporter = CliReporter::new();
            let report = sentry.get_results_with(&reporter);
            print_report(&report);
        }
        Commands::Refresh => {
            sentry.force_refresh()?;
            println!("Scan cache cleared. The next scan will run fresh.");
        }
        Commands::Candidates => print_candidates(&sentry),
        Commands::Configure(args) => {
            let input = SettingsInput {
                cache_ttl: args.cache_ttl,
                dirs: Some(args.dirs),
            };
            let saved = sentry.save_settings(&input)?;
            info!("Cache ttl set to {}s", saved.cache_ttl);
            println!("Monitoring {} directories:", saved.dirs.len());
            for dir in &saved.dirs {
                println!("  {}", dir);
            }
        }
        Commands::Status => {
            let settings = sentry.settings();
            println!("Last scan:  {}", format_timestamp(sentry.last_scan()));
            println!("Cache ttl:  {}s", settings.cache_ttl);
            println!("Targets:");
            for dir in sentry.resolve_targets(&settings) {
                println!("  {}", dir.display());
            }
        }
        Commands::PrintConfig => {}
    }

    Ok(())
}

fn print_report(report: &SentryReport) {
    let result = &report.result;
    println!();
    if result.is_clean() {
        println!("{}", "✔ Secure".green().bold());
        println!(
            "Scanned {} directory(s). No executable files found.",
            report.directory_count
        );
    } else {
        println!(
            "{}",
            format!("⚠ Warning: {} suspicious files", result.files.len())
                .red()
                .bold()
        );
        for path in &result.files {
            println!("  {}", path.red());
        }
        if result.truncated {
            println!(
                "{}",
                "Result limit reached; more suspicious files may exist.".yellow()
            );
        }
    }

    println!();
    let cached = if report.is_cached { "Cached. " } else { "" };
    println!(
        "{}",
        format!(
            "{}Last scan: {} | uploads-sentry v{}",
            cached,
            format_timestamp(report.last_scan),
            env!("CARGO_PKG_VERSION")
        )
        .dimmed()
    );
}

fn print_candidates(sentry: &Sentry) {
    let selected = sentry.selected_directories();
    println!("Code-heavy directories (plugins, themes, core) are excluded automatically.");
    for candidate in &sentry.candidates() {
        let mark = if selected.contains(&candidate.path) {
            "[x]".green()
        } else {
            "[ ]".normal()
        };
        println!("{} {}  {}", mark, candidate.label.cyan(), candidate.path.display());
    }
}

fn format_timestamp(epoch_secs: Option<i64>) -> String {
    epoch_secs
        .and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Never".to_string())
}
