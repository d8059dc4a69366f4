mod cli;
mod config;
mod records;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Version => print_version(),
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config()?,
        cli::Command::Keyring(cmd) => records::handle(cmd, &config).await?,
    }

    Ok(())
}

fn init_tracing() {
    // Stdout carries record JSON, so logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("didvault {}", env!("CARGO_PKG_VERSION"));
}

/// Verifies the data key and the keyring store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let repo = storage::repo_from_config(config).await?;
    repo.verify().await?;
    println!("Keyring store ({}): ok", repo.namespace());
    Ok(())
}

fn init_config() -> Result<()> {
    let defaults = config::Config::with_defaults(storage::default_data_dir()?);
    let path = config::write_if_missing(&defaults, &config::default_path()?)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
