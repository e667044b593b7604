//! # quoteboard CLI

use std::path::PathBuf;

use clap::Parser;

use crate::cli::Commands;

mod cli;

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        global = true,
        short = 'c',
        long = "config",
        help = "Path of the configuration file"
    )]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    quoteboard::init();

    let config_path = cli.config.as_deref();
    match &cli.command {
        Commands::Check(cmd) => {
            cmd.exec(config_path).await;
        }
        Commands::Quote(cmd) => {
            cmd.exec(config_path).await;
        }
        Commands::Serve(cmd) => {
            cmd.exec(config_path).await;
        }
    }
}
