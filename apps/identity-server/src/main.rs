use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use identity_server::Server;
use modkit::ShutdownOptions;
use runtime::{AppConfig, CliArgs};

/// Identity Server - user identity administration backend
#[derive(Parser)]
#[command(name = "identity-server")]
#[command(about = "Identity Server - user identity administration backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    runtime::init_logging_from_config(&config.logging, Path::new(&config.server.home_dir));
    tracing::info!("Identity Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let server = Server::new(&config).await?;
    let report = server.run(ShutdownOptions::Signals).await;

    if !report.is_clean() {
        let failed: Vec<&str> = report.failures().map(|(name, _)| name).collect();
        anyhow::bail!("runnables failed: {}", failed.join(", "));
    }
    tracing::info!("Identity Server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    // AppConfig::load_* already validated the values and created home_dir
    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
