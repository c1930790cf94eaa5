//! spp-ctl - control-plane broker for SPP.
//!
//! Accepts the primary and secondary worker connections and serves the REST
//! API used by the SPP CLI and other tooling.

use anyhow::Result;
use clap::Parser;
use sppctl_core::config::{ListenConfig, ProtocolConfig};
use sppctl_core::{BrokerConfig, Controller, LayoutSourceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spp-ctl")]
#[command(about = "SPP Controller")]
struct Args {
    /// Bind address for all listeners
    #[arg(short, long, default_value = ListenConfig::BIND_ADDR)]
    bind_addr: String,

    /// Primary port
    #[arg(short = 'p', long, default_value_t = ListenConfig::PRIMARY_PORT)]
    pri_port: u16,

    /// Secondary port
    #[arg(short = 's', long, default_value_t = ListenConfig::SECONDARY_PORT)]
    sec_port: u16,

    /// Web API port
    #[arg(short = 'a', long, default_value_t = ListenConfig::API_PORT)]
    api_port: u16,

    /// Seconds to wait for a worker reply
    #[arg(long, default_value_t = ProtocolConfig::COMMAND_TIMEOUT.as_secs())]
    command_timeout: u64,

    /// External CPU layout helper run with `--json` (default: read sysfs)
    #[arg(long)]
    cpu_layout_helper: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            bind_addr: self.bind_addr.clone(),
            primary_port: self.pri_port,
            secondary_port: self.sec_port,
            api_port: self.api_port,
            command_timeout: Duration::from_secs(self.command_timeout),
            layout_source: match &self.cpu_layout_helper {
                Some(helper) => LayoutSourceConfig::Helper(helper.clone()),
                None => LayoutSourceConfig::default(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides the default level
    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting spp-ctl");

    let config = args.broker_config();
    config.validate()?;

    let controller = Arc::new(Controller::new(&config));
    let mut listeners = controller.listen(&config).await?;
    let api_addr =
        sppctl_web::start_server(controller.clone(), &config.bind_addr, config.api_port).await?;

    info!(
        "spp-ctl running: primary {}, secondary {}, api {}",
        listeners.primary_addr, listeners.secondary_addr, api_addr
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    listeners.shutdown();

    Ok(())
}
