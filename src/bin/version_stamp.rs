use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nucleo_release_tools::{flags, version};

#[derive(Parser)]
#[command(name = "version-stamp")]
#[command(about = "Bump the firmware patch version and regenerate version.hpp", long_about = None)]
struct Cli {
    /// Persisted version counter file
    #[arg(long, default_value = "last_version")]
    version_file: PathBuf,

    /// Generated header to rewrite
    #[arg(long, default_value = "lib/mylib/version.hpp")]
    header: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    // The build orchestrator gates this step per target.
    if flags::flag_from_env("INCR_VERSION")? == Some(false) {
        println!("{}", "version bump disabled, skipping".dimmed());
        return Ok(());
    }

    let next = version::stamp(&cli.version_file, &cli.header)?;
    println!("{next}");
    Ok(())
}
