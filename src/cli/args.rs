use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SessionOverrides;

#[derive(Parser, Debug)]
#[command(name = "meetbot")]
#[command(about = "Join a video meeting and record its audio", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: <config_dir>/meetbot/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Join the meeting and record it (default)
    Run(RunCliArgs),
    /// Check that the browser, encoder and output directory are usable
    Check(OverrideArgs),
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug, Default)]
pub struct RunCliArgs {
    #[command(flatten)]
    pub overrides: OverrideArgs,
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug, Default, Clone)]
pub struct OverrideArgs {
    /// Meeting URL
    #[arg(long)]
    pub url: Option<String>,
    /// Display name typed into the join page
    #[arg(long)]
    pub username: Option<String>,
    /// Recording length in seconds
    #[arg(short, long)]
    pub duration: Option<u64>,
    /// Directory the audio file is written to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Audio device handed to the encoder (e.g. hw:0,0)
    #[arg(long)]
    pub device: Option<String>,
}

impl From<OverrideArgs> for SessionOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            url: args.url,
            username: args.username,
            duration_seconds: args.duration,
            output_dir: args.output_dir,
            device: args.device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["meetbot"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_run_overrides() {
        let cli = Cli::try_parse_from([
            "meetbot",
            "run",
            "--url",
            "https://meet.example.org/planning",
            "-d",
            "20",
            "--json",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Some(CliCommand::Run(args)) => {
                assert!(args.json);
                let overrides = SessionOverrides::from(args.overrides);
                assert_eq!(overrides.duration_seconds, Some(20));
                assert_eq!(
                    overrides.url.as_deref(),
                    Some("https://meet.example.org/planning")
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["meetbot", "check", "--config", "/etc/meetbot.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/meetbot.toml")));
        assert!(matches!(cli.command, Some(CliCommand::Check(_))));
    }
}
