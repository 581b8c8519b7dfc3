//! linkwatch client entry point.
//!
//! ```text
//! main()
//!  └─ load config           -- --config path, or the platform default
//!  └─ UdpRadio::start()     -- background receive thread
//!  └─ runtime::run()        -- discover, pair, heartbeat, execute commands
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linkwatch_client::application::session::ClientSession;
use linkwatch_client::infrastructure::actuator::HostActuator;
use linkwatch_client::infrastructure::runtime;
use linkwatch_client::infrastructure::storage::config::AppConfig;
use linkwatch_core::config_store::{load_config, load_config_from, ConfigError, ConfigFile};
use linkwatch_core::RadioTransport;
use linkwatch_radio::UdpRadio;

/// linkwatch client.
///
/// Broadcasts discovery until a coordinator holding the same secret answers,
/// then sends it heartbeats over an encrypted link.
#[derive(Debug, Parser)]
#[command(name = "linkwatch-client", version)]
struct Cli {
    /// Configuration file; defaults to the platform config directory.
    #[arg(long, env = "LINKWATCH_CLIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset; overrides the config file.
    #[arg(long, env = "LINKWATCH_LOG")]
    log_level: Option<String>,

    /// UDP port of the radio segment; overrides the config file.
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn load(&self) -> anyhow::Result<AppConfig> {
        let mut cfg: AppConfig = match &self.config {
            Some(path) => load_config_from::<AppConfig>(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => match load_config::<AppConfig>() {
                Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
                other => other.context("loading platform config")?,
            },
        };
        if let Some(port) = self.port {
            cfg.radio.port = port;
        }
        if let Some(level) = &self.log_level {
            cfg.client.log_level = level.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.load()?;

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.client.log_level)),
        )
        .init();

    let (radio, inbound) = UdpRadio::start(&cfg.radio).context("starting radio")?;
    info!(
        address = %radio.local_address(),
        port = cfg.radio.port,
        "linkwatch client starting"
    );

    let session = ClientSession::new(
        cfg.protocol.discovery_secret.clone(),
        cfg.protocol.network_key.clone(),
        radio.clone(),
        Arc::new(HostActuator::new()),
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    runtime::run(session, inbound, cfg.timing.timings(), shutdown).await;

    radio.shutdown();
    info!("linkwatch client stopped");
    Ok(())
}
