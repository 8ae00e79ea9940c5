mod session;

pub use session::{
    BrowserSettings, CaptureSettings, HookSettings, Selector, SelectorSet, SessionConfig,
    SessionOverrides,
};

use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub meeting: MeetingConfig,
    pub selectors: SelectorsConfig,
    pub browser: BrowserConfig,
    pub capture: CaptureConfig,
    pub hook: HookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    pub url: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorsConfig {
    pub name_input: Selector,
    pub consent_control: Selector,
    /// Element that only exists once the meeting is connected (e.g. the
    /// toolbox mute button). Without it the join settles on a fixed delay.
    pub joined_indicator: Option<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome/Chromium binary, either a path or a name looked up on `PATH`.
    pub executable: String,
    pub element_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub settle_seconds: u64,
    pub window_width: u32,
    pub window_height: u32,
    /// ALSA device the browser plays meeting audio into (`--alsa-output-device`).
    pub audio_output_device: Option<String>,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub encoder_path: String,
    /// Encoder demuxer for the device (`alsa`, `pulse`, ...).
    pub input_format: String,
    pub device: String,
    pub duration_seconds: u64,
    pub output_dir: PathBuf,
    pub extension: String,
    pub stop_grace_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Shell command to run after a successful capture. Empty disables it.
    /// Env vars: MEETBOT_RUN_ID, MEETBOT_AUDIO_PATH, MEETBOT_DURATION_SECONDS
    pub post_command: String,
    pub timeout_seconds: u64,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            url: "https://meet.jit.si/meetbot-room".to_string(),
            username: "AutoBot".to_string(),
        }
    }
}

impl Default for SelectorsConfig {
    fn default() -> Self {
        Self {
            name_input: Selector::XPath("//*[@id='premeeting-name-input']".to_string()),
            consent_control: Selector::Css("[data-testid='prejoin.joinMeeting']".to_string()),
            joined_indicator: None,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: "chromium".to_string(),
            element_timeout_seconds: 30,
            poll_interval_ms: 250,
            settle_seconds: 10,
            window_width: 1920,
            window_height: 1080,
            audio_output_device: None,
            extra_args: Vec::new(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            encoder_path: "ffmpeg".to_string(),
            input_format: "alsa".to_string(),
            device: "hw:0,0".to_string(),
            duration_seconds: 1800,
            output_dir: PathBuf::from("voice"),
            extension: "mp3".to_string(),
            stop_grace_seconds: 5,
        }
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            post_command: String::new(),
            timeout_seconds: 600,
        }
    }
}

impl Config {
    /// Load the config at `path`, or the default location when `None`.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.capture.device, "hw:0,0");
        assert_eq!(config.browser.element_timeout_seconds, 30);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
[meeting]
url = "https://meet.example.org/planning"

[selectors]
consent_control = { xpath = "//*[@id='accept']" }
joined_indicator = { css = "#toolbox .mute" }

[capture]
duration_seconds = 25
"##,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.meeting.url, "https://meet.example.org/planning");
        assert_eq!(config.meeting.username, "AutoBot");
        assert_eq!(
            config.selectors.consent_control,
            Selector::XPath("//*[@id='accept']".to_string())
        );
        assert_eq!(
            config.selectors.joined_indicator,
            Some(Selector::Css("#toolbox .mute".to_string()))
        );
        assert_eq!(config.capture.duration_seconds, 25);
        assert_eq!(config.capture.extension, "mp3");
    }

    #[test]
    fn test_save_round_trips_selectors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        Config::default().save_to(&path).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(
            loaded.selectors.name_input,
            SelectorsConfig::default().name_input
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[capture]\nduration_seconds = \"soon\"\n").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }
}
