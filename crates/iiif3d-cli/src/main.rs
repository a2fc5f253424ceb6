//! IIIF3D CLI entry point

use anyhow::Result;
use clap::Parser;

use iiif3d_cli::{Cli, execute};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    execute(cli).await
}
