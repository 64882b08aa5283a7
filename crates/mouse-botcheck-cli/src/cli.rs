/*!
# Command-Line Interface
*/

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mouse_botcheck::{Profile, StoreFormat};

/// Mouse Botcheck - classify pointer trajectories as human or automated
#[derive(Parser, Debug)]
#[command(name = "mouse-botcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the session outcome as JSON instead of a report
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a stored sample buffer
    Replay {
        /// Stored buffer (JSON array or CSV table)
        #[arg(short, long)]
        input: PathBuf,

        /// File format (inferred from the extension if not provided)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Generate and evaluate a synthetic trajectory
    Simulate {
        /// Movement style to generate
        #[arg(short, long, value_enum, default_value = "human")]
        profile: ProfileArg,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of samples
        #[arg(short = 'n', long, default_value = "200")]
        samples: usize,

        /// Write the trajectory here (format from the extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run one observation session fed by JSON lines on standard input
    Stdin,

    /// Run one observation session fed by cursor movement over a window
    #[cfg(feature = "window-capture")]
    Capture,

    /// Remove the stored diagnostic buffer
    Clear,

    /// Show the effective configuration
    Config,
}

/// On-disk sample formats
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for StoreFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => StoreFormat::Json,
            FormatArg::Csv => StoreFormat::Csv,
        }
    }
}

/// Synthetic movement styles
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileArg {
    Human,
    Bot,
}

impl From<ProfileArg> for Profile {
    fn from(profile: ProfileArg) -> Self {
        match profile {
            ProfileArg::Human => Profile::Human,
            ProfileArg::Bot => Profile::Bot,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
