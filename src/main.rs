use clap::Parser;

use igir::cli::Cli;
use igir::config::Config;
use igir::pipeline;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::try_from(cli)?;

    pipeline::run(&config)
}
