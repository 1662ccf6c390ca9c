use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use searchprobe::{cli::Cli, configuration::get_configuration, startup::run};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let mut configuration = get_configuration()?;
    cli.apply(&mut configuration);
    configuration.validate()?;

    match run(&cli, &configuration).await? {
        true => Ok(ExitCode::SUCCESS),
        false => Ok(ExitCode::FAILURE),
    }
}
