//! Montage CLI: command-line interface for short-video projects.
//!
//! Usage:
//!   montage init <NAME>              Create a new project
//!   montage add <PATH> <SOURCE>      Add a clip to a project's timeline
//!   montage info <PATH>              Show project and timeline information
//!   montage resolve <PATH> <TIME>    Show what is on screen at a time
//!   montage thumbnails <PATH>        Extract evenly spaced snapshots
//!   montage check                    Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use montage_common::config::AppConfig;
use montage_common::logging::{init_logging, level_for_verbosity};

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Short-video timeline editing and thumbnail extraction",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory (defaults to the configured projects directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output width
        #[arg(long, default_value = "1080")]
        width: u32,

        /// Output height
        #[arg(long, default_value = "1920")]
        height: u32,

        /// Output frame rate
        #[arg(long, default_value = "30")]
        fps: u32,
    },

    /// Add a clip to the main track or as an overlay
    Add(commands::add::AddArgs),

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Show the active clips at a timeline time
    Resolve {
        /// Path to the project directory
        path: PathBuf,

        /// Timeline time in seconds
        time: f64,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract evenly spaced snapshots as PNG files
    Thumbnails {
        /// Path to the project directory
        path: PathBuf,

        /// Number of snapshots
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Range start in seconds
        #[arg(long, default_value = "0.0")]
        start: f64,

        /// Range length in seconds (defaults to the rest of the timeline)
        #[arg(long)]
        duration: Option<f64>,

        /// Output directory (defaults to <project>/thumbnails)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    if cli.verbose {
        config.logging.level = level_for_verbosity(true);
    }
    init_logging(&config.logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            width,
            height,
            fps,
        } => commands::init::run(&config, name, output, width, height, fps),
        Commands::Add(args) => commands::add::run(&config, args),
        Commands::Info { path } => commands::info::run(&config, path),
        Commands::Resolve { path, time, json } => commands::resolve::run(&config, path, time, json),
        Commands::Thumbnails {
            path,
            count,
            start,
            duration,
            output,
        } => commands::thumbnails::run(&config, path, count, start, duration, output).await,
        Commands::Check => commands::check::run(&config),
    }
}
