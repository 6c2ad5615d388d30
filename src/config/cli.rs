use std::path::PathBuf;

use clap::Parser;

/// A ping like tool for TCP, HTTP and HTTPS services.
#[derive(Debug, Parser)]
#[command(name = "serviceping", version)]
pub struct Cli {
    /// Number of pings to send (0 pings until interrupted)
    #[arg(short = 'c', long)]
    pub count: Option<u64>,

    /// Seconds between pings
    #[arg(short = 'i', long)]
    pub interval: Option<f64>,

    /// Show timings for every phase of the connection
    #[arg(short = 'd', long, overrides_with = "no_timings")]
    pub timings: bool,

    /// Show only the total time, even if the config file enables timings
    #[arg(long = "no-timings", overrides_with = "timings")]
    pub no_timings: bool,

    /// Seconds to wait for each ping before giving up
    #[arg(short = 't', long)]
    pub timeout: Option<f64>,

    /// Maximum response bytes to read (0 reads until the server closes)
    #[arg(short = 's', long = "max-size")]
    pub max_size: Option<usize>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// YAML file with default settings
    #[arg(long, env = "CONFIG_FILE", default_value = "serviceping.yml")]
    pub config: PathBuf,

    /// Destination: host[:port[:path]] or an http(s) URL
    pub destination: String,
}
