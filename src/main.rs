#![allow(dead_code)]
#![recursion_limit = "256"]

mod analysis;
mod application;
mod cli;
mod cluster;
mod data;
mod domain;
mod error;
mod infra;
mod ml;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("skeleton_embed_eval=info")),
        )
        .init();

    let cli = Cli::parse();
    cli.run()
}
