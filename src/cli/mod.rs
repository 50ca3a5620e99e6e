//! CLI module for traffic-guard
//!
//! Command-line interface definitions and handlers for the traffic monitoring client.
//!
//! # Commands
//!
//! - `watch` - Run the dashboard and render published state in the terminal
//! - `analyze` - Submit one image for analysis
//! - `upload` - Upload one video for stream analysis
//! - `logs` - Show recent traffic logs
//! - `check` - Check that the backend is reachable
//! - `config` - Configuration utilities (init)
//! - `completions` - Generate shell completions
//!
//! # Example
//!
//! ```bash
//! # Watch the webcam stream with spoken alerts
//! traffic-guard watch --voice
//!
//! # Show the admin log table once, as JSON
//! traffic-guard logs --limit 20 --json
//!
//! # Generate shell completions
//! traffic-guard completions bash > ~/.bash_completion.d/traffic-guard
//! ```

pub mod analyze;
pub mod check;
pub mod completions;
pub mod config;
pub mod logs;
pub mod output;
pub mod upload;
pub mod watch;

pub use completions::handle_completions;
pub use config::handle_config_init;

use crate::config::TrafficGuardConfig;
use crate::dashboard::View;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// traffic-guard - traffic monitoring dashboard client
#[derive(Parser, Debug)]
#[command(
    name = "traffic-guard",
    version,
    about = "Terminal dashboard for an AI traffic-sensing backend"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dashboard and render live state
    Watch(WatchArgs),
    /// Analyze a single image
    Analyze(AnalyzeArgs),
    /// Upload a video for stream analysis
    Upload(UploadArgs),
    /// Show recent traffic logs
    Logs(LogsArgs),
    /// Check backend liveness
    Check(CheckArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that talks to the backend.
#[derive(Args, Debug, Clone)]
pub struct BackendArgs {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "TRAFFIC_GUARD_CONFIG",
        default_value = "traffic-guard.toml"
    )]
    pub config: PathBuf,

    /// Override the backend root address
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Initial view (live, uploads, admin, analytics)
    #[arg(long)]
    pub view: Option<View>,

    /// Initial live source (camera index, stream URI, or uploaded filename)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Speak alerts
    #[arg(long)]
    pub voice: bool,

    /// Emit one JSON object per update instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Image file to analyze
    pub image: PathBuf,

    /// Write the annotated image to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output stats as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Video file to upload
    pub video: PathBuf,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[command(flatten)]
    pub backend: BackendArgs,

    /// Number of records to fetch (defaults to polling.logs_limit)
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "traffic-guard.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

/// Load configuration with CLI overrides
///
/// A missing file at the default path means defaults; environment overrides
/// apply next and CLI flags last. The result is validated.
pub fn load_config_with_overrides(
    args: &BackendArgs,
) -> Result<TrafficGuardConfig, Box<dyn std::error::Error>> {
    let mut config = if args.config.exists() {
        TrafficGuardConfig::load(Some(&args.config))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        TrafficGuardConfig::default()
    };

    config = config.with_env_overrides();

    if let Some(ref backend) = args.backend {
        config.backend.url = backend.clone();
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    config.validate()?;
    Ok(config)
}
