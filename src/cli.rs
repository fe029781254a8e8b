use clap::Parser;
use std::path::PathBuf;

/// Remote agent control gateway for a tick-driven simulation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// HTTP port (overrides config file)
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to bind (can be specified multiple times, overrides config file)
    #[arg(long = "host", value_name = "ADDR")]
    pub hosts: Vec<String>,

    /// Load demo scene waypoints from a JSON file instead of the built-in grid
    #[arg(short = 'w', long = "waypoints", value_name = "FILE")]
    pub waypoints: Option<PathBuf>,

    /// Do not start the HTTP gateway (console only)
    #[arg(long = "no-server")]
    pub no_server: bool,

    /// Do not read console commands from stdin
    #[arg(long = "no-console")]
    pub no_console: bool,

    /// Run this many simulation ticks, then exit
    #[arg(long = "ticks", value_name = "N")]
    pub ticks: Option<u64>,

    /// Enable debug logging to file (default: agentgate.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
