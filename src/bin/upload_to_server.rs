use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use nucleo_release_tools::config::ServerConfig;
use nucleo_release_tools::deploy::{self, Deployment};
use nucleo_release_tools::flags;

#[derive(Parser)]
#[command(name = "upload-to-server")]
#[command(about = "Upload a firmware build to the flashing host and run st-flash", long_about = None)]
struct Cli {
    /// Build variant to upload (selects .pioenvs/nucleo_f042k6_<which>/firmware.bin)
    which: String,

    /// Server connection parameters
    #[arg(long, default_value = "server_config.json")]
    config: PathBuf,

    /// Build output root
    #[arg(long, default_value = ".pioenvs")]
    env_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    if flags::flag_from_env("UPLOAD_TO_SERVER")? == Some(false) {
        println!("{}", "upload disabled, skipping".dimmed());
        return Ok(());
    }

    let config = ServerConfig::load(&cli.config)?;
    println!("{} {}", "UPLOADING TO SERVER:".cyan().bold(), cli.which);

    let deployment = Deployment::new(config, deploy::firmware_path(&cli.env_dir, &cli.which));
    deployment.run()?;
    Ok(())
}
