//! Airbnb EDA - Main Entry Point

use airbnb_eda::cli::{cmd_describe, cmd_model, cmd_run, Cli, Commands, RunArgs};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airbnb_eda=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, source, output_dir, snapshot_date, city, price_ceiling, no_raw_copy } => {
            cmd_run(RunArgs { config, source, output_dir, snapshot_date, city, price_ceiling, no_raw_copy })?;
        }
        Commands::Describe { data, json } => {
            cmd_describe(&data, json)?;
        }
        Commands::Model { data, json } => {
            cmd_model(&data, json)?;
        }
    }

    Ok(())
}
