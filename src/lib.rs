pub mod browser;
pub mod capture;
pub mod cli;
pub mod config;
pub mod global;
pub mod hook;
pub mod join;
pub mod orchestrator;

pub use browser::{ChromeLauncher, ChromeSession, UiError, UiLauncher, UiSession, WaitPolicy};
pub use capture::{AudioCapture, CaptureError, CaptureReport, CaptureStatus, FfmpegCapture};
pub use config::{Config, Selector, SessionConfig, SessionOverrides};
pub use join::{JoinFailure, JoinFlow, JoinOutcome, JoinStage, JoinState};
pub use orchestrator::{CaptureFailure, Orchestrator, RunLock, RunOutcome, RunReport};
