mod config_cmd;
mod status_cmd;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use docgate_config::{config_dir, config_file_path, load_and_prepare};
use docgate_gateway::{start_server, GatewayState};
use docgate_logging::init_logger;

#[derive(Parser)]
#[command(name = "docgate")]
#[command(about = "docgate: document storage, OCR, extraction, and RAG search gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the effective config (secrets masked) and validation report
    Config {
        /// Path to the config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query the health endpoint of a running instance
    Status {
        /// Port the instance listens on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| config_file_path(&config_dir()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => run_server(resolve_config_path(config), port).await?,
        Commands::Config { config } => config_cmd::run(&resolve_config_path(config)).await?,
        Commands::Status { port } => {
            let port = match port {
                Some(port) => port,
                None => {
                    let (config, _) = load_and_prepare(&resolve_config_path(None)).await?;
                    config.server.port
                }
            };
            status_cmd::run(port).await?;
        }
    }

    Ok(())
}

async fn run_server(config_path: PathBuf, port: Option<u16>) -> Result<()> {
    let (mut config, report) = load_and_prepare(&config_path).await?;
    if let Some(port) = port {
        config.server.port = port;
    }

    init_logger(&config.logging);

    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, "{}", error.message);
        }
        bail!("Config at {} is invalid ({} errors)", config_path.display(), report.errors.len());
    }

    info!(
        config = %config_path.display(),
        port = config.server.port,
        bind = %config.server.bind,
        "Starting docgate"
    );

    let state = GatewayState::from_config(&config).await?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.bind, config.server.port))?;

    start_server(addr, state).await
}
