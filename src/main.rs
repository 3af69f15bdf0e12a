//! Netdesign CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "netdesign")]
#[command(about = "Visual neural network architecture designer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Working directory searched for netdesign.toml
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Explicit config file (overrides the netdesign.toml lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the designer server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Design file to load at startup
        #[arg(short, long)]
        load: Option<PathBuf>,
    },
    /// Print a design's layers in dependency order with inferred shapes
    Inspect {
        file: PathBuf,
    },
    /// Replay every connection of a design through the validator
    Check {
        file: PathBuf,
    },
    /// Write a starter design
    Init {
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "netdesign={0},netdesign_core={0},netdesign_server={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = netdesign_core::DesignerConfig::discover(cli.config.as_deref(), &cli.root)?;
    config.apply_env()?;
    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Serve { port, host, load } => {
            tracing::info!("Netdesign v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(config, host, port, load).await
        }
        Commands::Inspect { file } => commands::inspect(&config, &file),
        Commands::Check { file } => commands::check(&config, &file),
        Commands::Init { file, force } => commands::init(&file, force),
        Commands::Version => {
            println!("Netdesign v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
