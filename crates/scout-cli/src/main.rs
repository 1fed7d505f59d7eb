mod enrich;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scout")]
#[command(about = "Lead enrichment command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Enrich scraped profiles and print one JSON record per lead to stdout
    Enrich {
        /// JSON array or JSON-lines file of lead profiles
        #[arg(long, short)]
        input: PathBuf,
        /// Override `SCOUT_CONCURRENCY`
        #[arg(long)]
        concurrency: Option<usize>,
        /// Harvest every contact page even after an email is found
        #[arg(long)]
        exhaustive: bool,
    },
    /// Print the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let mut config = scout_core::load_scout_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Enrich {
            input,
            concurrency,
            exhaustive,
        } => {
            if let Some(concurrency) = concurrency {
                config.concurrency = concurrency;
            }
            config.exhaustive_harvest |= exhaustive;
            enrich::run_enrich(&config, &input).await?;
        }
        Commands::Config => println!("{config:#?}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
