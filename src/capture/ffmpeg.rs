//! Encoder subprocess supervision (`ffmpeg` command line).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

use super::output::{inspect_artifact, output_path};
use super::pipe::{collect, drain, PipeDrain};
use super::signal::request_termination;
use super::{AudioCapture, CaptureError, CaptureReport, CaptureStatus};
use crate::config::CaptureSettings;

/// Pipes are still read for this long after a forced kill.
const MIN_DRAIN: Duration = Duration::from_millis(500);

/// One recording attempt, owned by `FfmpegCapture` until it is terminal.
struct CaptureJob {
    device: String,
    output_path: PathBuf,
    child: Option<Child>,
    started_at: Instant,
    grace: Duration,
    status: CaptureStatus,
    stdout: Option<PipeDrain>,
    stderr: Option<PipeDrain>,
    report: Option<CaptureReport>,
}

impl CaptureJob {
    fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn transition(&mut self, next: CaptureStatus) {
        if self.status.can_transition_to(next) {
            debug!("Capture {} -> {}", self.status.as_str(), next.as_str());
            self.status = next;
        } else {
            warn!(
                "Ignoring capture transition {} -> {}",
                self.status.as_str(),
                next.as_str()
            );
        }
    }
}

#[derive(Default)]
pub struct FfmpegCapture {
    job: Option<CaptureJob>,
    launch_error: Option<String>,
}

impl FfmpegCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(settings: &CaptureSettings, output: &Path) -> Command {
        let mut cmd = Command::new(&settings.encoder_path);
        cmd.args(["-hide_banner", "-nostdin", "-y"])
            .args(["-f", settings.input_format.as_str()])
            .args(["-i", settings.device.as_str()])
            .arg("-t")
            .arg(format!("{:.3}", settings.duration.as_secs_f64()))
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn launch_failed(&mut self, message: String) -> CaptureError {
        error!("Encoder launch failed: {}", message);
        self.launch_error = Some(message.clone());
        CaptureError::Launch(message)
    }
}

#[async_trait]
impl AudioCapture for FfmpegCapture {
    async fn start(&mut self, settings: &CaptureSettings) -> Result<PathBuf, CaptureError> {
        if let Some(job) = &self.job {
            return Err(CaptureError::AlreadyStarted(job.status));
        }
        if self.launch_error.is_some() {
            return Err(CaptureError::AlreadyStarted(CaptureStatus::LaunchFailure));
        }

        if let Err(e) = std::fs::create_dir_all(&settings.output_dir) {
            return Err(self.launch_failed(format!(
                "cannot create output directory {}: {e}",
                settings.output_dir.display()
            )));
        }

        let output = match output_path(
            &settings.output_dir,
            &settings.extension,
            chrono::Utc::now(),
        ) {
            Ok(output) => output,
            Err(e) => return Err(self.launch_failed(format!("no free output name: {e}"))),
        };
        info!(
            "Starting audio capture from {} for {}s into {:?}",
            settings.device,
            settings.duration.as_secs(),
            output
        );

        let mut child = match Self::command(settings, &output).spawn() {
            Ok(child) => child,
            Err(e) => {
                return Err(self.launch_failed(format!(
                    "{}: {e}",
                    settings.encoder_path.display()
                )));
            }
        };

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let mut job = CaptureJob {
            device: settings.device.clone(),
            output_path: output.clone(),
            child: Some(child),
            started_at: Instant::now(),
            grace: settings.stop_grace,
            status: CaptureStatus::NotStarted,
            stdout,
            stderr,
            report: None,
        };
        job.transition(CaptureStatus::Running);
        self.job = Some(job);

        Ok(output)
    }

    async fn stop(&mut self) -> CaptureReport {
        let current = self.status();
        let Some(job) = self.job.as_mut() else {
            return CaptureReport::without_process(current);
        };
        if let Some(report) = &job.report {
            debug!("Capture already stopped, returning previous report");
            return report.clone();
        }

        info!("Stopping audio capture after {}s", job.elapsed().as_secs());
        let grace = job.grace;
        let deadline = Instant::now() + grace;

        let mut exit: Option<ExitStatus> = None;
        let mut forced_kill = false;

        if let Some(mut child) = job.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    info!("Encoder already finished on its own ({})", status);
                    exit = Some(status);
                }
                _ => {
                    if let Err(e) = request_termination(&mut child) {
                        warn!("Failed to signal encoder: {}", e);
                    }
                    match timeout(grace, child.wait()).await {
                        Ok(Ok(status)) => exit = Some(status),
                        Ok(Err(e)) => warn!("Failed to wait for encoder exit: {}", e),
                        Err(_) => {
                            warn!(
                                "Encoder did not exit within {}s, killing it",
                                grace.as_secs()
                            );
                            forced_kill = true;
                            if let Err(e) = child.kill().await {
                                error!("Failed to kill encoder: {}", e);
                            }
                        }
                    }
                }
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = if forced_kill {
            remaining.max(MIN_DRAIN)
        } else {
            remaining
        };
        let (stdout, stderr) = collect(job.stdout.take(), job.stderr.take(), budget).await;
        if !stdout.trim().is_empty() {
            debug!("Encoder stdout:\n{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            debug!("Encoder stderr:\n{}", stderr.trim_end());
        }

        let artifact_bytes = inspect_artifact(&job.output_path);
        match artifact_bytes {
            Some(bytes) => info!("Audio saved: {:?} ({} bytes)", job.output_path, bytes),
            None => warn!("Audio file missing or empty: {:?}", job.output_path),
        }

        let status = if forced_kill || exit.is_none() {
            CaptureStatus::StopFailure
        } else {
            CaptureStatus::Stopped
        };
        job.transition(status);

        let report = CaptureReport {
            status: job.status,
            device: Some(job.device.clone()),
            output_path: Some(job.output_path.clone()),
            artifact_bytes,
            exit_code: exit.and_then(|s| s.code()),
            forced_kill,
            diagnostics: join_diagnostics(&stdout, &stderr),
        };
        job.report = Some(report.clone());
        report
    }

    fn status(&self) -> CaptureStatus {
        match (&self.job, &self.launch_error) {
            (Some(job), _) => job.status,
            (None, Some(_)) => CaptureStatus::LaunchFailure,
            (None, None) => CaptureStatus::NotStarted,
        }
    }
}

fn join_diagnostics(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    }
}
