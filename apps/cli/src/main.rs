//! jsondocgen CLI: generates JSON documentation for a node catalog.
//!
//! Reads a catalog snapshot, merges each item's description markup with
//! its runtime facts and writes the item and port type documentation.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
