use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "flotilla", version)]
#[command(about = "Send one HTTP request to every live member of a group", long_about = None)]
pub struct Cli {
    /// Configuration file (RON). Defaults to ./flotilla.ron when present.
    #[arg(long, global = true, env = "FLOTILLA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Display refresh interval in milliseconds; overrides the configuration.
    #[arg(long = "refresh-ms", global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_ms: Option<u64>,

    /// Where log records go while the display owns the terminal.
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Connect straight to every target, ignoring configured tunnel brokers.
    #[arg(long, global = true)]
    pub direct: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a request to every live member of a group.
    Sail(SailArgs),
    /// List configured groups and their members.
    Groups,
}

#[derive(Debug, Args)]
pub struct SailArgs {
    /// Group to resolve into targets.
    pub group: String,

    /// Request path, starting with '/'.
    pub path: String,

    /// HTTP method.
    #[arg(short = 'm', long, default_value = "GET")]
    pub method: String,

    /// Extra header as name=value; repeatable, last one wins.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Port to request; defaults to the scheme's port.
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Protocol scheme.
    #[arg(short = 'P', long = "protocol", default_value = "http")]
    pub scheme: String,

    /// Print every outcome as JSON once the display exits.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
    Off,
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name is empty in {raw:?}"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
