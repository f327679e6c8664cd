use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "theatre")]
#[command(author, version, about = "Resumable streaming playback controller")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Parameters of the simulated media element.
#[derive(Args, Debug, Clone)]
pub struct Simulation {
    /// Media duration in seconds
    #[arg(long, default_value = "1800")]
    pub duration: f64,

    /// Bytes per second of media, used to turn fetched bytes into buffered time.
    /// Must not exceed the file's average bitrate or playback stalls short of the cursor
    #[arg(long, default_value = "250000")]
    pub bitrate: u64,

    /// Clock tick in milliseconds
    #[arg(long, default_value = "250")]
    pub tick_ms: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a movie from its saved position
    PlayMovie {
        /// Backend ID of the movie
        #[arg(long)]
        id: u64,

        /// Media locator passed to the media endpoint
        #[arg(long)]
        file: String,

        /// Resume offset as MM:SS
        #[arg(long, default_value = "00:00")]
        resume: String,

        #[command(flatten)]
        simulation: Simulation,
    },

    /// Play one episode of a series, then continue with the following ones
    PlayEpisode {
        /// Backend ID of the series
        #[arg(long)]
        series: u64,

        /// Position in the episode listing
        #[arg(long)]
        index: usize,

        /// Start from the beginning instead of the saved offset
        #[arg(long)]
        restart: bool,

        #[command(flatten)]
        simulation: Simulation,
    },

    /// Continue a series at its last played episode
    Continue {
        /// Backend ID of the series
        #[arg(long)]
        series: u64,

        #[command(flatten)]
        simulation: Simulation,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
