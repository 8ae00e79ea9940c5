use anyhow::Result;
use clap::Parser;
use meetbot::cli::{
    handle_check_command, handle_init_config_command, handle_run_command, Cli, CliCommand,
    RunCliArgs,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("meetbot {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Some(CliCommand::InitConfig { force }) => {
            handle_init_config_command(config_path, force)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(CliCommand::Check(overrides)) => handle_check_command(config_path, overrides),
        Some(CliCommand::Run(args)) => handle_run_command(config_path, args).await,
        None => handle_run_command(config_path, RunCliArgs::default()).await,
    }
}
