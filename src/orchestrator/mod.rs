//! Orchestrator: one join-and-capture attempt, end to end.
//!
//! join → start capture → hold → stop capture → close browser
//!
//! Capture teardown and the browser close run on every path, including a
//! panic inside one of the stages. The browser is always closed after the
//! capture has been torn down, and exactly once.

mod lock;
mod outcome;

pub use lock::RunLock;
pub use outcome::{CaptureFailure, RunOutcome, RunReport};

use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::browser::{UiLauncher, UiSession};
use crate::capture::{AudioCapture, CaptureError, CaptureReport, CaptureStatus};
use crate::config::SessionConfig;
use crate::hook::{PostCaptureHook, Recording};
use crate::join::{JoinFlow, JoinOutcome, JoinState};

pub struct Orchestrator<L: UiLauncher, C: AudioCapture> {
    config: SessionConfig,
    launcher: L,
    capture: C,
    hook: Option<Box<dyn PostCaptureHook>>,
    cancel: CancellationToken,
}

/// What the staged part of a run leaves behind for teardown.
#[derive(Default)]
struct StageRecord {
    join_trace: Vec<JoinState>,
    capture: Option<CaptureReport>,
}

impl<L: UiLauncher, C: AudioCapture> Orchestrator<L, C> {
    pub fn new(config: SessionConfig, launcher: L, capture: C) -> Self {
        Self {
            config,
            launcher,
            capture,
            hook: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_hook(mut self, hook: Box<dyn PostCaptureHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Cancelling this token ends UI waits and the capture hold early;
    /// teardown still runs in full.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub async fn run(&mut self) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: String) -> RunReport {
        let started_at = Utc::now();
        info!("Starting join-and-capture run");

        let mut session: Option<L::Session> = None;
        let mut record = StageRecord::default();

        let staged = AssertUnwindSafe(Self::stages(
            &self.config,
            &self.launcher,
            &mut self.capture,
            &self.cancel,
            &mut session,
            &mut record,
        ))
        .catch_unwind()
        .await;

        let outcome = match staged {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Run aborted by unexpected fault: {}", message);
                RunOutcome::Fault { message }
            }
        };

        if self.capture.status() == CaptureStatus::Running {
            warn!("Capture still running after the run ended, stopping it");
            record.capture = Some(self.capture.stop().await);
        }

        match session.take() {
            Some(mut session) => {
                session.close().await;
                info!("Browser session closed");
            }
            None => info!("No browser session to close"),
        }

        let hook = match (&self.hook, &outcome) {
            (
                Some(hook),
                RunOutcome::Success {
                    output_path,
                    artifact_bytes,
                },
            ) => {
                let recording = Recording {
                    run_id: run_id.clone(),
                    meeting_url: self.config.meeting_url.clone(),
                    audio_path: output_path.clone(),
                    artifact_bytes: *artifact_bytes,
                    duration_seconds: self.config.capture.duration.as_secs(),
                };
                Some(hook.execute(&recording).await)
            }
            _ => None,
        };

        match &outcome {
            RunOutcome::Success { .. } => info!("Run finished: {}", outcome),
            _ => error!("Run finished: {}", outcome),
        }

        RunReport {
            run_id,
            outcome,
            join_trace: record.join_trace,
            capture: record.capture,
            hook,
            cancelled: self.cancel.is_cancelled(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn stages(
        config: &SessionConfig,
        launcher: &L,
        capture: &mut C,
        cancel: &CancellationToken,
        session: &mut Option<L::Session>,
        record: &mut StageRecord,
    ) -> RunOutcome {
        let mut flow = JoinFlow::new(config, cancel.clone());
        let joined = flow.run(launcher, session).await;
        record.join_trace = flow.trace().to_vec();

        if let JoinOutcome::Failed(cause) = joined {
            return RunOutcome::JoinFailed { cause };
        }

        match capture.start(&config.capture).await {
            Ok(path) => info!("Recording to {:?}", path),
            Err(CaptureError::Launch(message)) => {
                return RunOutcome::CaptureFailed {
                    cause: CaptureFailure::LaunchFailure { message },
                };
            }
            Err(e) => return RunOutcome::Fault { message: e.to_string() },
        }

        let duration = config.capture.duration;
        info!("Recording for {}s", duration.as_secs());
        tokio::select! {
            _ = cancel.cancelled() => warn!("Run cancelled, stopping capture early"),
            _ = sleep(duration) => {}
        }

        let report = capture.stop().await;
        let outcome = RunOutcome::from_capture(&report);
        record.capture = Some(report);
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
