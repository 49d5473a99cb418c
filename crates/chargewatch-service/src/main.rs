//! chargewatchd - BC-211 charger monitor daemon

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use chargewatch_service::{
    ConfigOverrides, DaemonFlags, LoggingConfig, ServiceConfig, ServiceDaemon, init_logging,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "chargewatchd")]
#[command(about = "Watch a BC-211 charger through a CP2112 + MCP23017 and serve its slot status")]
#[command(version)]
struct Cli {
    /// Config file (default: config.json next to the executable)
    #[arg(long, env = "CHARGEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind the status server to
    #[arg(long)]
    host: Option<String>,

    /// Port for the status server
    #[arg(long)]
    port: Option<u16>,

    /// ntfy topic URL; an empty string disables notifications
    #[arg(long, env = "CHARGEWATCH_NTFY_URL")]
    ntfy_url: Option<String>,

    /// USB serial number of the CP2112 to use
    #[arg(long)]
    serial: Option<String>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Keep retrying if the charger is not connected at startup
    #[arg(long)]
    wait_for_device: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        verbosity: cli.verbose,
        json: cli.log_json,
    })?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting chargewatchd");

    let config_path = match cli.config {
        Some(path) => path,
        None => ServiceConfig::default_config_path()?,
    };
    let config = ServiceConfig::load_or_default(&config_path)
        .await
        .with_overrides(ConfigOverrides {
            host: cli.host,
            port: cli.port,
            ntfy_url: cli.ntfy_url,
            serial: cli.serial,
        });
    config.validate()?;

    let flags = DaemonFlags {
        wait_for_device: cli.wait_for_device,
        ..DaemonFlags::default()
    };
    ServiceDaemon::new(config, flags).run().await
}
