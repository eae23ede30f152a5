//! Geoblock - country-based inbound port blocking for Linux firewalls.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use geoblock::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Block { countries, ports } => {
            geoblock::commands::block::run(&countries, &ports, &cli.config).await
        }
        Commands::Refresh => geoblock::commands::refresh::run(&cli.config).await,
        Commands::List => geoblock::commands::list::run(&cli.config).await,
        Commands::Remove { all, select } => {
            geoblock::commands::remove::run(all, &select, &cli.config).await
        }
        Commands::Interactive => geoblock::commands::interactive::run(&cli.config).await,
        Commands::Version => {
            println!("geoblock {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
