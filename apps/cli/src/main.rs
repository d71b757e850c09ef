//! SourceDock CLI — multi-source document retrieval from the terminal.
//!
//! Fetches topic-relevant documents from configured knowledge sources
//! (docs, wikis, forums, feeds, local fallbacks) through one client.

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
