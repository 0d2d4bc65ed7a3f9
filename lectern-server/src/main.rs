//! Lectern server binary

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use lectern_config::{ConfigLoader, LecternConfig};
use lectern_logging::init_logging;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address, overriding the configuration (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// Database URL, overriding the configuration
    #[arg(long)]
    database_url: Option<String>,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        println!("{}", LecternConfig::generate_sample());
        return Ok(());
    }

    let mut config = ConfigLoader::new().load(cli.config.as_ref())?;
    apply_cli_overrides(&mut config, &cli)?;

    init_logging(&config.logging)?;

    lectern_server::serve(config).await
}

/// Apply CLI argument overrides to configuration
fn apply_cli_overrides(config: &mut LecternConfig, cli: &Cli) -> Result<()> {
    if let Some(bind) = &cli.bind {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid bind address '{}': expected host:port", bind))?;
        config.server.bind_address = host.to_string();
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid port in bind address '{}': {}", bind, e))?;
    }

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }

    Ok(())
}
