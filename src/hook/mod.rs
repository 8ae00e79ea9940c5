//! Post-capture command.
//!
//! A successful recording can be handed to whatever comes next (upload,
//! transcription, archival) by a shell command. Its result is recorded in the
//! run report but never changes the run outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::capture::pipe::{collect, drain};
use crate::config::HookSettings;

/// Environment handed to the command.
pub mod hook_env {
    pub const RUN_ID: &str = "MEETBOT_RUN_ID";
    pub const MEETING_URL: &str = "MEETBOT_MEETING_URL";
    pub const AUDIO_PATH: &str = "MEETBOT_AUDIO_PATH";
    pub const AUDIO_BYTES: &str = "MEETBOT_AUDIO_BYTES";
    pub const DURATION_SECONDS: &str = "MEETBOT_DURATION_SECONDS";
}

/// Output is still read for this long once the command has exited.
const OUTPUT_DRAIN: Duration = Duration::from_secs(1);

/// Stderr kept in the report, from the end.
const STDERR_TAIL: usize = 2048;

/// A recording that made it to disk.
#[derive(Debug, Clone)]
pub struct Recording {
    pub run_id: String,
    pub meeting_url: String,
    pub audio_path: PathBuf,
    pub artifact_bytes: u64,
    pub duration_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HookStatus {
    Completed,
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    TimedOut {
        after_seconds: u64,
    },
    NotStarted {
        message: String,
    },
}

impl HookStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed {
                exit_code: Some(code),
                ..
            } => write!(f, "exited with status {code}"),
            Self::Failed { exit_code: None, .. } => f.write_str("killed by a signal"),
            Self::TimedOut { after_seconds } => write!(f, "killed after {after_seconds}s"),
            Self::NotStarted { message } => write!(f, "could not start: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookReport {
    pub command: String,
    #[serde(flatten)]
    pub status: HookStatus,
    pub elapsed_ms: u64,
}

#[async_trait]
pub trait PostCaptureHook: Send + Sync {
    async fn execute(&self, recording: &Recording) -> HookReport;
}

/// `sh -c <command>` with the recording described in `MEETBOT_*` variables.
pub struct ShellCommandHook {
    command: String,
    timeout: Duration,
}

impl ShellCommandHook {
    pub fn new(command: String, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn from_settings(settings: &HookSettings) -> Self {
        Self::new(settings.command.clone(), settings.timeout)
    }

    fn spawn_command(&self, recording: &Recording) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .env(hook_env::RUN_ID, &recording.run_id)
            .env(hook_env::MEETING_URL, &recording.meeting_url)
            .env(hook_env::AUDIO_PATH, &recording.audio_path)
            .env(hook_env::AUDIO_BYTES, recording.artifact_bytes.to_string())
            .env(
                hook_env::DURATION_SECONDS,
                recording.duration_seconds.to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, recording: &Recording) -> HookStatus {
        let mut child = match self.spawn_command(recording).spawn() {
            Ok(child) => child,
            Err(e) => return HookStatus::NotStarted { message: e.to_string() },
        };
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let exit = match timeout(self.timeout, child.wait()).await {
            Ok(Ok(exit)) => exit,
            Ok(Err(e)) => return HookStatus::NotStarted { message: e.to_string() },
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill post-capture command: {}", e);
                }
                return HookStatus::TimedOut {
                    after_seconds: self.timeout.as_secs(),
                };
            }
        };

        let (stdout, stderr) = collect(stdout, stderr, OUTPUT_DRAIN).await;
        if !stdout.trim().is_empty() {
            debug!("Post-capture command output:\n{}", stdout.trim_end());
        }

        if exit.success() {
            HookStatus::Completed
        } else {
            HookStatus::Failed {
                exit_code: exit.code(),
                stderr: tail(stderr.trim(), STDERR_TAIL).to_string(),
            }
        }
    }
}

#[async_trait]
impl PostCaptureHook for ShellCommandHook {
    async fn execute(&self, recording: &Recording) -> HookReport {
        info!("Handing {:?} to: {}", recording.audio_path, self.command);
        let started = Instant::now();
        let status = self.run(recording).await;

        if status.is_completed() {
            info!("Post-capture command completed");
        } else {
            warn!("Post-capture command {}", status);
        }

        HookReport {
            command: self.command.clone(),
            status,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn recording() -> Recording {
        Recording {
            run_id: "run-42".to_string(),
            meeting_url: "https://meet.example.org/platformPlanning".to_string(),
            audio_path: PathBuf::from("/tmp/meeting_audio_20260309_120507.mp3"),
            artifact_bytes: 4096,
            duration_seconds: 25,
        }
    }

    #[tokio::test]
    async fn test_command_sees_recording() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("env.txt");
        let hook = ShellCommandHook::new(
            format!(
                "echo \"$MEETBOT_RUN_ID $MEETBOT_AUDIO_PATH $MEETBOT_AUDIO_BYTES \
                 $MEETBOT_DURATION_SECONDS $MEETBOT_MEETING_URL\" > {}",
                out.display()
            ),
            Duration::from_secs(10),
        );

        let report = hook.execute(&recording()).await;
        assert_eq!(report.status, HookStatus::Completed);

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(
            written.trim(),
            "run-42 /tmp/meeting_audio_20260309_120507.mp3 4096 25 \
             https://meet.example.org/platformPlanning"
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_with_stderr() {
        let hook = ShellCommandHook::new(
            "echo 'upload rejected: 413' >&2; exit 3".to_string(),
            Duration::from_secs(10),
        );
        let report = hook.execute(&recording()).await;
        assert_eq!(
            report.status,
            HookStatus::Failed {
                exit_code: Some(3),
                stderr: "upload rejected: 413".to_string(),
            }
        );
        assert_eq!(report.status.to_string(), "exited with status 3");
    }

    #[tokio::test]
    async fn test_slow_command_is_killed() {
        let hook = ShellCommandHook::new("sleep 5".to_string(), Duration::from_millis(100));
        let started = std::time::Instant::now();
        let report = hook.execute(&recording()).await;
        assert!(matches!(report.status, HookStatus::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_report_serialization() {
        let report = HookReport {
            command: "rclone copy".to_string(),
            status: HookStatus::TimedOut { after_seconds: 600 },
            elapsed_ms: 600_000,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "timed_out");
        assert_eq!(json["after_seconds"], 600);
        assert_eq!(json["command"], "rclone copy");
    }

    #[test]
    fn test_tail_keeps_the_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
        assert_eq!(tail("aé", 1), "");
    }
}
