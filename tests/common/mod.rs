//! Scripted browser and encoder doubles that record what the orchestrator did.

#![allow(dead_code)]

use async_trait::async_trait;
use meetbot::capture::{output_path, AudioCapture, CaptureError, CaptureReport, CaptureStatus};
use meetbot::config::{CaptureSettings, Config, Selector, SessionConfig, SessionOverrides};
use meetbot::{UiError, UiLauncher, UiSession};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<&'static str>>,
}

impl CallLog {
    pub fn push(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }
}

#[derive(Default)]
pub struct FakePage {
    pub present: HashSet<Selector>,
    pub panic_on_click: bool,
}

pub struct FakeLauncher {
    pub page: Arc<FakePage>,
    pub log: Arc<CallLog>,
    pub fail_launch: bool,
}

pub struct FakeSession {
    page: Arc<FakePage>,
    log: Arc<CallLog>,
}

#[async_trait]
impl UiLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _config: &SessionConfig) -> Result<FakeSession, UiError> {
        self.log.push("launch");
        if self.fail_launch {
            return Err(UiError::Launch("chromium: not found".to_string()));
        }
        Ok(FakeSession {
            page: self.page.clone(),
            log: self.log.clone(),
        })
    }
}

#[async_trait]
impl UiSession for FakeSession {
    type Element = Selector;

    async fn navigate(&self, _url: &str) -> Result<(), UiError> {
        Ok(())
    }

    async fn find_element(&self, selector: &Selector) -> Result<Option<Selector>, UiError> {
        Ok(self.page.present.get(selector).cloned())
    }

    async fn click(&self, _element: &Selector) -> Result<(), UiError> {
        if self.page.panic_on_click {
            panic!("consent dialog exploded");
        }
        self.log.push("click");
        Ok(())
    }

    async fn type_text(&self, _element: &Selector, _text: &str) -> Result<(), UiError> {
        self.log.push("type");
        Ok(())
    }

    async fn close(&mut self) {
        self.log.push("close");
    }
}

/// Encoder double: writes (or skips) the artifact on start and stops instantly.
pub struct FakeCapture {
    pub log: Arc<CallLog>,
    pub fail_launch: bool,
    pub write_artifact: bool,
    /// Panic inside the first `stop`, leaving the capture `Running`.
    pub panic_on_first_stop: bool,
    status: CaptureStatus,
    device: Option<String>,
    path: Option<PathBuf>,
    report: Option<CaptureReport>,
    pub started: Option<Instant>,
    pub stopped: Option<Instant>,
}

impl FakeCapture {
    pub fn new(log: Arc<CallLog>) -> Self {
        Self {
            log,
            fail_launch: false,
            write_artifact: true,
            panic_on_first_stop: false,
            status: CaptureStatus::NotStarted,
            device: None,
            path: None,
            report: None,
            started: None,
            stopped: None,
        }
    }
}

#[async_trait]
impl AudioCapture for FakeCapture {
    async fn start(&mut self, settings: &CaptureSettings) -> Result<PathBuf, CaptureError> {
        self.log.push("start");
        if self.fail_launch {
            self.status = CaptureStatus::LaunchFailure;
            return Err(CaptureError::Launch("encoder missing".to_string()));
        }
        std::fs::create_dir_all(&settings.output_dir).unwrap();
        let path =
            output_path(&settings.output_dir, &settings.extension, chrono::Utc::now()).unwrap();
        if self.write_artifact {
            std::fs::write(&path, b"ID3fake-audio").unwrap();
        }
        self.path = Some(path.clone());
        self.device = Some(settings.device.clone());
        self.status = CaptureStatus::Running;
        self.started = Some(Instant::now());
        Ok(path)
    }

    async fn stop(&mut self) -> CaptureReport {
        if let Some(report) = &self.report {
            return report.clone();
        }
        self.log.push("stop");
        if self.panic_on_first_stop {
            self.panic_on_first_stop = false;
            panic!("encoder supervisor crashed");
        }
        self.status = CaptureStatus::Stopped;
        self.stopped = Some(Instant::now());
        let artifact_bytes = self
            .path
            .as_deref()
            .and_then(meetbot::capture::inspect_artifact);
        let report = CaptureReport {
            status: self.status,
            device: self.device.clone(),
            output_path: self.path.clone(),
            artifact_bytes,
            exit_code: Some(0),
            forced_kill: false,
            diagnostics: "[alsa] cannot open audio device hw:0,0".to_string(),
        };
        self.report = Some(report.clone());
        report
    }

    fn status(&self) -> CaptureStatus {
        self.status
    }
}

/// Config with a 30s UI timeout, 20s capture and no settle delay.
pub fn session_config(output_dir: &Path) -> SessionConfig {
    session_config_with(output_dir, |_| {})
}

/// Same as `session_config`, with `edit` applied to the file-level config
/// before the session is built.
pub fn session_config_with(output_dir: &Path, edit: impl FnOnce(&mut Config)) -> SessionConfig {
    let mut config = Config::default();
    config.meeting.url = "https://meet.example.org/platformPlanning".to_string();
    config.browser.element_timeout_seconds = 30;
    config.browser.settle_seconds = 0;
    config.capture.duration_seconds = 20;
    config.capture.stop_grace_seconds = 5;
    config.capture.output_dir = output_dir.to_path_buf();
    edit(&mut config);
    SessionConfig::from_config(&config, &SessionOverrides::default()).unwrap()
}

pub fn page(config: &SessionConfig, name_input: bool, consent: bool) -> FakePage {
    let mut page = FakePage::default();
    if name_input {
        page.present.insert(config.selectors.name_input.clone());
    }
    if consent {
        page.present.insert(config.selectors.consent_control.clone());
    }
    page
}

pub fn launcher(page: FakePage, log: &Arc<CallLog>) -> FakeLauncher {
    FakeLauncher {
        page: Arc::new(page),
        log: log.clone(),
        fail_launch: false,
    }
}

/// `meeting_audio_YYYYMMDD_HHMMSS.<ext>`
pub fn is_timestamped_name(path: &Path, extension: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let Some(stamp) = name
        .strip_prefix("meeting_audio_")
        .and_then(|rest| rest.strip_suffix(&format!(".{extension}")))
    else {
        return false;
    };
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}
