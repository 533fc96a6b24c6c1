mod analysis;
mod cli;
mod config;
mod error;
mod insights;
mod month;
mod report;
mod sources;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting DeployLens - Deployment Impact & Savings Tool");
    cli.execute()?;

    Ok(())
}
