//! gigecam probe entry point.
//!
//! ```text
//! gigecam-probe                       Probe with defaults
//! gigecam-probe --config <path>       Use custom config TOML
//! gigecam-probe --endpoint host:port  Override the camera address
//! gigecam-probe --websocket           Use the WebSocket transport
//! gigecam-probe --gen-config          Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gigecam_core::config::Transport;
use gigecam_core::{Connector, Device, Endpoint};
use gigecam_probe::config::ProbeConfig;
use gigecam_probe::probe;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gigecam-probe", about = "Ping, configure and grab frames from a remote camera")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "gigecam-probe.toml")]
    config: PathBuf,

    /// Camera address (overrides config). Example: 192.168.2.3:4001
    #[arg(short, long)]
    endpoint: Option<Endpoint>,

    /// Talk to the camera over WebSocket instead of raw TCP.
    #[arg(long)]
    websocket: bool,

    /// Number of frames to grab (overrides config).
    #[arg(short, long)]
    frames: Option<u32>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ProbeConfig::default())?;
        println!("{text}");
        return Ok(());
    }
    if cli.write_config {
        ProbeConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = ProbeConfig::load(&cli.config);
    if let Some(endpoint) = cli.endpoint {
        config.device.network.host = endpoint.host().to_string();
        config.device.network.port = endpoint.port();
    }
    if cli.websocket {
        config.device.network.transport = Transport::WebSocket;
    }
    if let Some(frames) = cli.frames {
        config.run.frames = frames;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("gigecam-probe v{}", env!("CARGO_PKG_VERSION"));

    match config.device.network.transport {
        Transport::Tcp => {
            let mut device = Device::from_config(&config.device)?;
            probe_device(&mut device, &config).await
        }
        Transport::WebSocket => {
            let mut device = Device::websocket_from_config(&config.device)?;
            probe_device(&mut device, &config).await
        }
    }
}

async fn probe_device<C: Connector>(
    device: &mut Device<C>,
    config: &ProbeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match probe::run(device, &config.run, config.device.monitor.cycle_count).await {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                requested = config.run.frames,
                released = summary.released,
                "probe finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(endpoint = %device.endpoint(), "probe failed: {e}");
            device.disconnect().await;
            Err(e.into())
        }
    }
}
