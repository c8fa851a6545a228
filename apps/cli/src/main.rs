//! SocialSync CLI: pull social media posts and comments into a local store.
//!
//! Syncs Facebook and Instagram data through a staged merge, and derives
//! sentiment and competitor reports from what is stored.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
