mod cli;
mod ui;

use anyhow::Result;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level())).init();
    info!("Starting code2txt v{}", env!("CARGO_PKG_VERSION"));

    cli::run(args)
}
