mod args;
mod check;

pub use args::{Cli, CliCommand, OverrideArgs, RunCliArgs};
pub use check::{preflight, PreflightItem};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::browser::ChromeLauncher;
use crate::capture::FfmpegCapture;
use crate::config::{Config, SessionConfig, SessionOverrides};
use crate::global;
use crate::hook::ShellCommandHook;
use crate::orchestrator::{Orchestrator, RunLock};

fn load_session(config_path: Option<&Path>, overrides: OverrideArgs) -> Result<SessionConfig> {
    let config = Config::load(config_path)?;
    SessionConfig::from_config(&config, &SessionOverrides::from(overrides))
        .context("Invalid configuration")
}

pub async fn handle_run_command(config_path: Option<&Path>, args: RunCliArgs) -> Result<ExitCode> {
    let session = load_session(config_path, args.overrides)?;
    let _lock = RunLock::acquire(&global::run_lock_file()?)?;

    for item in preflight(&session).iter().filter(|item| !item.ok) {
        warn!("Preflight: {} {}", item.name, item.detail);
    }

    let hook = session.hook.as_ref().map(ShellCommandHook::from_settings);
    let mut orchestrator = Orchestrator::new(session, ChromeLauncher::new(), FfmpegCapture::new());
    if let Some(hook) = hook {
        orchestrator = orchestrator.with_hook(Box::new(hook));
    }

    let cancel = orchestrator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, wrapping up the run");
            cancel.cancel();
        }
    });

    let report = orchestrator.run().await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
        );
    } else {
        println!("{}", report.summary());
    }

    Ok(ExitCode::from(report.outcome.exit_code()))
}

pub fn handle_check_command(config_path: Option<&Path>, overrides: OverrideArgs) -> Result<ExitCode> {
    let session = load_session(config_path, overrides)?;
    let items = preflight(&session);

    for item in &items {
        let mark = if item.ok { "ok" } else { "MISSING" };
        println!("{:<12} {:<8} {}", item.name, mark, item.detail);
    }

    if items.iter().all(|item| item.ok) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

pub fn handle_init_config_command(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path: PathBuf = match config_path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };

    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(&path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
