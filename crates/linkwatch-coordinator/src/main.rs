//! linkwatch coordinator entry point.
//!
//! ```text
//! main()
//!  └─ load config           -- --config path, or the platform default
//!  └─ UdpRadio::start()     -- background receive thread
//!  └─ Coordinator::run()    -- radio frames, stdin commands, liveness sweep
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use linkwatch_coordinator::application::protocol_core::ProtocolCore;
use linkwatch_coordinator::infrastructure::console::spawn_stdin_reader;
use linkwatch_coordinator::infrastructure::runtime::Coordinator;
use linkwatch_coordinator::infrastructure::storage::config::AppConfig;
use linkwatch_core::config_store::{load_config, load_config_from, ConfigError, ConfigFile};
use linkwatch_core::{MonotonicClock, RadioTransport};
use linkwatch_radio::UdpRadio;

/// linkwatch coordinator.
///
/// Answers discovery from clients holding the shared secret, keeps at most
/// `max_clients` of them registered, and declares silent ones dead.
#[derive(Debug, Parser)]
#[command(name = "linkwatch-coordinator", version)]
struct Cli {
    /// Configuration file; defaults to the platform config directory.
    #[arg(long, env = "LINKWATCH_COORDINATOR_CONFIG")]
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
            cfg.coordinator.log_level = level.clone();
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
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.coordinator.log_level)),
        )
        .init();

    let (radio, inbound) = UdpRadio::start(&cfg.radio).context("starting radio")?;
    info!(
        address = %radio.local_address(),
        port = cfg.radio.port,
        "linkwatch coordinator starting"
    );

    let core = ProtocolCore::new(cfg.core_settings(), radio.clone(), Arc::new(MonotonicClock));
    let mut coordinator = Coordinator::new(core, std::io::stdout());
    coordinator.on_console_line("help");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    coordinator
        .run(inbound, spawn_stdin_reader(), cfg.sweep_interval(), shutdown)
        .await;

    radio.shutdown();
    info!("linkwatch coordinator stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["linkwatch-coordinator"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_cli_port_override_applies() {
        let dir = std::env::temp_dir().join("linkwatch_cli_missing_dir");
        let cli = Cli::parse_from([
            "linkwatch-coordinator",
            "--config",
            dir.join("absent.toml").to_str().unwrap_or("absent.toml"),
            "--port",
            "48123",
        ]);

        let cfg = cli.load().unwrap();

        assert_eq!(cfg.radio.port, 48123);
    }

    #[test]
    fn test_port_override_is_validated_after_it_applies() {
        let path = std::env::temp_dir().join("linkwatch_cli_missing_dir").join("absent.toml");
        let cli = Cli::parse_from([
            "linkwatch-coordinator",
            "--config",
            path.to_str().unwrap_or("absent.toml"),
            "--port",
            "0",
        ]);

        let err = cli.load().unwrap_err();

        assert!(err.to_string().contains("radio.port"), "got {err}");
    }
}
