//! Immutable per-run configuration.
//!
//! `SessionConfig` is built once from the config file plus CLI overrides and
//! then only ever handed out by reference.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Config;

/// How to locate a page element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css:{s}"),
            Selector::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

impl Selector {
    fn is_blank(&self) -> bool {
        match self {
            Selector::Css(s) | Selector::XPath(s) => s.trim().is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSet {
    pub name_input: Selector,
    pub consent_control: Selector,
    pub joined_indicator: Option<Selector>,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: PathBuf,
    pub window_size: (u32, u32),
    pub audio_output_device: Option<String>,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub encoder_path: PathBuf,
    pub input_format: String,
    pub device: String,
    pub duration: Duration,
    pub output_dir: PathBuf,
    pub extension: String,
    pub stop_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct HookSettings {
    pub command: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub meeting_url: String,
    pub username: String,
    pub selectors: SelectorSet,
    pub browser: BrowserSettings,
    pub ui_timeout: Duration,
    pub poll_interval: Duration,
    pub settle_interval: Duration,
    pub capture: CaptureSettings,
    pub hook: Option<HookSettings>,
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub duration_seconds: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub device: Option<String>,
}

impl SessionConfig {
    pub fn from_config(config: &Config, overrides: &SessionOverrides) -> Result<Self> {
        let hook = if config.hook.post_command.trim().is_empty() {
            None
        } else {
            Some(HookSettings {
                command: config.hook.post_command.clone(),
                timeout: Duration::from_secs(config.hook.timeout_seconds),
            })
        };

        let session = Self {
            meeting_url: overrides
                .url
                .clone()
                .unwrap_or_else(|| config.meeting.url.clone()),
            username: overrides
                .username
                .clone()
                .unwrap_or_else(|| config.meeting.username.clone()),
            selectors: SelectorSet {
                name_input: config.selectors.name_input.clone(),
                consent_control: config.selectors.consent_control.clone(),
                joined_indicator: config.selectors.joined_indicator.clone(),
            },
            browser: BrowserSettings {
                executable: resolve_binary(&config.browser.executable),
                window_size: (config.browser.window_width, config.browser.window_height),
                audio_output_device: config.browser.audio_output_device.clone(),
                extra_args: config.browser.extra_args.clone(),
            },
            ui_timeout: Duration::from_secs(config.browser.element_timeout_seconds),
            poll_interval: Duration::from_millis(config.browser.poll_interval_ms),
            settle_interval: Duration::from_secs(config.browser.settle_seconds),
            capture: CaptureSettings {
                encoder_path: resolve_binary(&config.capture.encoder_path),
                input_format: config.capture.input_format.clone(),
                device: overrides
                    .device
                    .clone()
                    .unwrap_or_else(|| config.capture.device.clone()),
                duration: Duration::from_secs(
                    overrides
                        .duration_seconds
                        .unwrap_or(config.capture.duration_seconds),
                ),
                output_dir: overrides
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| config.capture.output_dir.clone()),
                extension: config.capture.extension.trim_start_matches('.').to_string(),
                stop_grace: Duration::from_secs(config.capture.stop_grace_seconds),
            },
            hook,
        };

        session.validate()?;
        Ok(session)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.meeting_url.trim();
        if url.is_empty() {
            bail!("meeting url is empty");
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            bail!("meeting url must be http(s): {}", url);
        }
        if self.username.trim().is_empty() {
            bail!("display username is empty");
        }
        if self.selectors.name_input.is_blank() || self.selectors.consent_control.is_blank() {
            bail!("name_input and consent_control selectors must not be empty");
        }
        if self.ui_timeout.is_zero() {
            bail!("browser.element_timeout_seconds must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            bail!("browser.poll_interval_ms must be greater than zero");
        }
        if self.capture.duration.is_zero() {
            bail!("capture duration must be greater than zero");
        }
        if self.capture.stop_grace.is_zero() {
            bail!("capture.stop_grace_seconds must be greater than zero");
        }
        if self.capture.device.trim().is_empty() {
            bail!("capture device is empty");
        }
        if self.capture.input_format.trim().is_empty() {
            bail!("capture input_format is empty");
        }
        if self.capture.extension.is_empty() {
            bail!("capture extension is empty");
        }
        Ok(())
    }
}

/// Bare names are looked up on `PATH`. Anything unresolvable is kept as-is
/// so the stage that needs the binary reports it missing.
pub fn resolve_binary(raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.components().count() > 1 || path.is_absolute() {
        return path.to_path_buf();
    }
    which::which(raw).unwrap_or_else(|_| path.to_path_buf())
}
