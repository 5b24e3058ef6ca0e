//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "aismixer", about = "UDP AIS/NMEA sentence mixer")]
pub struct Args {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Override the config's `debug` flag (enables verbose logging).
    #[arg(long)]
    pub debug: bool,
}
