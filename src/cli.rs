use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "uploads-sentry")]
#[command(about = "Watch static upload directories for executable files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Report suspicious files, served from cache while it is fresh
    Scan(ScanArgs),
    /// Clear the cached result so the next scan runs again
    Refresh,
    /// List directories eligible for monitoring
    Candidates,
    /// Choose monitored directories and cache duration
    Configure(ConfigureArgs),
    /// Show last scan time and effective settings
    Status,
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Clear the cache before scanning
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Debug, Args)]
pub struct ConfigureArgs {
    /// Directory to monitor; repeat for several. Must be a listed candidate
    #[arg(long = "dir", value_name = "PATH")]
    pub dirs: Vec<String>,
    /// Seconds to keep a scan result (900, 3600, 43200, 86400 are typical)
    #[arg(long, allow_negative_numbers = true)]
    pub cache_ttl: Option<i64>,
}
