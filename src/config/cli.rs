//! Command-line arguments

use super::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_PATH};
use clap::Parser;
use std::path::PathBuf;

/// Mirror a master directory into a slave directory, forever
#[derive(Debug, Clone, Parser)]
#[command(name = "dirmirror", version, about)]
pub struct Cli {
    /// Configuration file (key=value lines)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log file records are appended to
    #[arg(short, long, default_value = DEFAULT_LOG_PATH)]
    pub log_file: PathBuf,

    /// Seconds to sleep between cycles (overrides the config file)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}
