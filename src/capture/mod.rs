//! Capture process: the external audio encoder recording the meeting.
//!
//! Strategy:
//! 1. `start` spawns the encoder with an explicit `-t` bound, so it stops on
//!    its own even if `stop` never runs
//! 2. Both output pipes are drained from the moment of spawn; an unread pipe
//!    can block the encoder on exit
//! 3. `stop` sends SIGTERM, waits out the grace period, then kills
//! 4. The artifact is inspected after exit; a clean exit with no file is
//!    still reported

mod ffmpeg;
mod output;
pub(crate) mod pipe;
mod signal;

pub use ffmpeg::FfmpegCapture;
pub use output::{inspect_artifact, output_path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::CaptureSettings;

/// Lifecycle of one recording attempt. Never regresses:
/// `NotStarted → Running → Stopped | StopFailure`, or `NotStarted → LaunchFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    NotStarted,
    Running,
    Stopped,
    LaunchFailure,
    StopFailure,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::LaunchFailure => "launch_failure",
            Self::StopFailure => "stop_failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::LaunchFailure | Self::StopFailure)
    }

    pub fn can_transition_to(&self, next: CaptureStatus) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running)
                | (Self::NotStarted, Self::LaunchFailure)
                | (Self::Running, Self::Stopped)
                | (Self::Running, Self::StopFailure)
        )
    }
}

/// Read-only view of a finished (or never started) capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub status: CaptureStatus,
    /// Capture device the encoder read from.
    #[serde(default)]
    pub device: Option<String>,
    pub output_path: Option<PathBuf>,
    /// Size of the artifact; `None` when it is missing or empty.
    pub artifact_bytes: Option<u64>,
    pub exit_code: Option<i32>,
    /// Whether the encoder had to be killed after the grace period.
    pub forced_kill: bool,
    /// Everything the encoder wrote to stdout and stderr.
    pub diagnostics: String,
}

impl CaptureReport {
    pub fn without_process(status: CaptureStatus) -> Self {
        Self {
            status,
            device: None,
            output_path: None,
            artifact_bytes: None,
            exit_code: None,
            forced_kill: false,
            diagnostics: String::new(),
        }
    }

    pub fn artifact_present(&self) -> bool {
        self.artifact_bytes.is_some()
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch encoder: {0}")]
    Launch(String),
    #[error("capture already started (status: {})", .0.as_str())]
    AlreadyStarted(CaptureStatus),
}

#[async_trait]
pub trait AudioCapture: Send {
    /// Begin recording; returns the path the artifact will be written to.
    async fn start(&mut self, settings: &CaptureSettings) -> Result<PathBuf, CaptureError>;

    /// Finish recording. Idempotent: once terminal, the same report comes back.
    async fn stop(&mut self) -> CaptureReport;

    fn status(&self) -> CaptureStatus;
}
