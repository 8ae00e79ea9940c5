//! Terminal results of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::capture::{CaptureReport, CaptureStatus};
use crate::hook::HookReport;
use crate::join::{JoinFailure, JoinState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureFailure {
    /// Encoder binary missing or rejected its arguments.
    LaunchFailure { message: String },
    /// Encoder had to be killed after the grace period.
    StopFailure {
        output_path: PathBuf,
        diagnostics: String,
    },
    /// Encoder exited but left no (or an empty) file behind.
    OutputMissing {
        output_path: PathBuf,
        diagnostics: String,
    },
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaunchFailure { message } => write!(f, "capture launch failure: {message}"),
            Self::StopFailure { output_path, .. } => write!(
                f,
                "encoder did not stop within the grace period ({})",
                output_path.display()
            ),
            Self::OutputMissing { output_path, .. } => {
                write!(f, "no audio written to {}", output_path.display())
            }
        }
    }
}

impl CaptureFailure {
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::LaunchFailure { .. } => None,
            Self::StopFailure { diagnostics, .. } | Self::OutputMissing { diagnostics, .. } => {
                Some(diagnostics)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunOutcome {
    Success {
        output_path: PathBuf,
        artifact_bytes: u64,
    },
    JoinFailed {
        cause: JoinFailure,
    },
    CaptureFailed {
        cause: CaptureFailure,
    },
    Fault {
        message: String,
    },
}

impl RunOutcome {
    /// Classify a finished capture.
    pub fn from_capture(report: &CaptureReport) -> Self {
        let output_path = report.output_path.clone().unwrap_or_default();
        match (report.status, report.artifact_bytes) {
            (CaptureStatus::Stopped, Some(artifact_bytes)) => Self::Success {
                output_path,
                artifact_bytes,
            },
            (CaptureStatus::Stopped, None) => Self::CaptureFailed {
                cause: CaptureFailure::OutputMissing {
                    output_path,
                    diagnostics: report.diagnostics.clone(),
                },
            },
            (CaptureStatus::StopFailure, _) => Self::CaptureFailed {
                cause: CaptureFailure::StopFailure {
                    output_path,
                    diagnostics: report.diagnostics.clone(),
                },
            },
            (status, _) => Self::Fault {
                message: format!("capture ended in unexpected state {}", status.as_str()),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success { .. } => 0,
            Self::JoinFailed { .. } => 2,
            Self::CaptureFailed { .. } => 3,
            Self::Fault { .. } => 4,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success {
                output_path,
                artifact_bytes,
            } => write!(
                f,
                "success: {} ({} bytes)",
                output_path.display(),
                artifact_bytes
            ),
            Self::JoinFailed { cause } => write!(f, "join failed: {cause}"),
            Self::CaptureFailed { cause } => write!(f, "capture failed: {cause}"),
            Self::Fault { message } => write!(f, "fault: {message}"),
        }
    }
}

/// Everything a caller needs to know about one attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    pub join_trace: Vec<JoinState>,
    pub capture: Option<CaptureReport>,
    /// Post-capture command result; only present after a successful capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook: Option<HookReport>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn summary(&self) -> String {
        let mut text = format!("[{}] {}", self.run_id, self.outcome);
        if self.cancelled {
            text.push_str(" (cancelled)");
        }
        if let Some(hook) = self.hook.as_ref().filter(|h| !h.status.is_completed()) {
            text.push_str(&format!("\npost-capture command {}", hook.status));
        }
        if let RunOutcome::CaptureFailed { cause } = &self.outcome {
            if let Some(diagnostics) = cause.diagnostics().filter(|d| !d.is_empty()) {
                text.push_str("\nencoder output:\n");
                text.push_str(diagnostics);
            }
        }
        text
    }
}
