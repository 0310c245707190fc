//! Command line interface definition

use clap::{Parser, Subcommand};
use ota_types::ColorChoice;
use std::path::PathBuf;

/// otactl - A/B over-the-air update orchestrator
#[derive(Parser)]
#[command(name = "otactl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A/B over-the-air update orchestrator")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Device product to validate packages against
    #[arg(long, global = true, value_name = "PRODUCT")]
    pub device: Option<String>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Validate a package and show where its payload lives
    Inspect {
        /// Path to the update package (.zip)
        package: PathBuf,
    },

    /// Show the persisted update record
    Status,

    /// Apply a package and follow the update until it finishes
    Apply {
        /// Path to the update package (.zip)
        package: PathBuf,
    },

    /// Restore state after a restart and follow a running update
    Recover,

    /// Drop whatever is recorded and return to IDLE
    Reset,

    /// Clear the record and reboot into the updated slot
    Reboot,

    /// Ask the update server for a build newer than the running one
    Check,

    /// Download a package into the packages directory, resuming a partial one
    Download {
        /// Package URL; defaults to the newest build offered by `check`
        url: Option<String>,

        /// Drop any partial download and start over
        #[arg(long)]
        restart: bool,

        /// Apply the package once it is downloaded
        #[arg(long)]
        apply: bool,
    },

    /// List packages in the packages directory
    List,
}

impl Commands {
    /// Get command name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Inspect { .. } => "inspect",
            Commands::Status => "status",
            Commands::Apply { .. } => "apply",
            Commands::Recover => "recover",
            Commands::Reset => "reset",
            Commands::Reboot => "reboot",
            Commands::Check => "check",
            Commands::Download { .. } => "download",
            Commands::List => "list",
        }
    }

    /// Validate command arguments
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Commands::Inspect { package } | Commands::Apply { package } => {
                if package.as_os_str().is_empty() {
                    Err("package path is empty".to_string())
                } else {
                    Ok(())
                }
            }
            Commands::Download { url: Some(url), .. } if url.trim().is_empty() => {
                Err("download URL is empty".to_string())
            }
            _ => Ok(()),
        }
    }
}
