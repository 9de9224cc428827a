//! kwatch-alertd - cluster alarm daemon
//!
//! Evaluates alarm targets on a schedule and notifies alarm groups when a
//! target fires or recovers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use kwatch_alertd::{AlertdConfig, Daemon};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "kwatch-alertd")]
#[command(about = "kwatch cluster alarm daemon")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "KWATCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run alarm passes on the configured interval
    Run {
        /// Path to config file
        #[arg(short, long, env = "KWATCH_CONFIG", default_value = "/etc/kwatch/alertd.json")]
        config: PathBuf,
    },

    /// Run a single alarm pass and print its report
    Once {
        /// Path to config file
        #[arg(short, long, env = "KWATCH_CONFIG", default_value = "/etc/kwatch/alertd.json")]
        config: PathBuf,
    },

    /// Generate a sample config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "/etc/kwatch/alertd.json")]
        output: PathBuf,
    },
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("kwatch=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    match cli.command {
        Commands::Run { config } => run(config).await?,
        Commands::Once { config } => once(config).await?,
        Commands::InitConfig { output } => init_config(&output)?,
    }

    Ok(())
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    info!(config = %config_path.display(), "starting kwatch-alertd");

    let config = AlertdConfig::load(&config_path)?;
    info!(
        clusters = ?config.clusters,
        interval_secs = config.interval_secs,
        "loaded config"
    );

    let daemon = Daemon::new(config)?;
    daemon
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("kwatch-alertd stopped");
    Ok(())
}

async fn once(config_path: PathBuf) -> anyhow::Result<()> {
    let config = AlertdConfig::load(&config_path)?;
    let daemon = Daemon::new(config)?;

    let report = daemon.tick().await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_config(output: &Path) -> anyhow::Result<()> {
    let config = AlertdConfig::default();
    let json = serde_json::to_string_pretty(&config)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, json)?;

    println!("Config written to: {}", output.display());
    Ok(())
}
