//! beacond — the Beacon daemon.
//!
//! One binary, three roles:
//! - `directory`: the shared naming service every node registers with
//! - `node`: a participant that registers, serves peer RPCs, and runs the
//!   election scheduler until Ctrl-C
//! - `status`: print a running node's status as JSON
//!
//! # Usage
//!
//! ```text
//! beacond directory --port 7000
//! beacond node --config beacon.toml --port 7101 --eligibility observer
//! beacond status 127.0.0.1:7101
//! ```

mod directory_mode;
mod node_mode;

use std::path::PathBuf;

use anyhow::Context;
use beacon_core::config::parse_duration;
use beacon_core::{BeaconConfig, Eligibility};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beacond", about = "Beacon leader election daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the directory service nodes register with.
    Directory {
        /// Address to listen on.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value = "7000")]
        port: u16,
    },

    /// Run an election node.
    Node(NodeArgs),

    /// Print the status of a running node.
    Status {
        /// Node address (`host:port`).
        address: String,

        /// Request timeout, e.g. "2s" or "500ms".
        #[arg(long, default_value = "2s")]
        timeout: String,
    },
}

/// Flags for `beacond node`. Each one overrides the config file.
#[derive(Args, Debug, Default)]
struct NodeArgs {
    /// Path to beacon.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node name: letters, digits, '-', '_' or '.' (generated when neither
    /// flag nor file sets one).
    #[arg(long)]
    name: Option<String>,

    /// Host other nodes use to reach this node; also the listen address.
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// eligible, observer, or random.
    #[arg(long)]
    eligibility: Option<Eligibility>,

    /// Directory service address (`host:port`).
    #[arg(long)]
    directory: Option<String>,

    #[arg(long)]
    startup_delay: Option<String>,

    #[arg(long)]
    tick_interval: Option<String>,

    #[arg(long)]
    rpc_timeout: Option<String>,
}

impl NodeArgs {
    /// Load the config file (or defaults) and apply flag overrides.
    fn into_config(self) -> anyhow::Result<BeaconConfig> {
        let mut config = match &self.config {
            Some(path) => BeaconConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => BeaconConfig::default(),
        };

        if let Some(name) = self.name {
            config.node.name = Some(name);
        }
        if let Some(host) = self.host {
            config.node.host = host;
        }
        if let Some(port) = self.port {
            config.node.port = port;
        }
        if let Some(eligibility) = self.eligibility {
            config.node.eligibility = eligibility;
        }
        if let Some(address) = self.directory {
            config.directory.address = address;
        }
        if let Some(delay) = self.startup_delay {
            config.timing.startup_delay = delay;
        }
        if let Some(interval) = self.tick_interval {
            config.timing.tick_interval = interval;
        }
        if let Some(timeout) = self.rpc_timeout {
            config.timing.rpc_timeout = timeout;
        }

        // Reject bad names and durations before anything starts.
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beacond=debug,beacon=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Directory { host, port } => directory_mode::run_directory(&host, port).await,
        Command::Node(args) => node_mode::run_node(args.into_config()?).await,
        Command::Status { address, timeout } => {
            let timeout = parse_duration(&timeout)
                .with_context(|| format!("invalid timeout {timeout:?}"))?;
            let status = beacon_transport::fetch_status(&address, timeout)
                .await
                .with_context(|| format!("failed to query {address}"))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
    }
}
