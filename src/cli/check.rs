//! Preflight: are the external binaries and the output directory usable?

use std::path::Path;

use crate::config::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightItem {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

pub fn preflight(config: &SessionConfig) -> Vec<PreflightItem> {
    vec![
        binary_item("browser", &config.browser.executable),
        binary_item("encoder", &config.capture.encoder_path),
        output_dir_item(&config.capture.output_dir),
    ]
}

fn binary_item(name: &'static str, path: &Path) -> PreflightItem {
    if path.is_file() {
        PreflightItem {
            name,
            ok: true,
            detail: path.display().to_string(),
        }
    } else {
        PreflightItem {
            name,
            ok: false,
            detail: format!("not found: {}", path.display()),
        }
    }
}

fn output_dir_item(dir: &Path) -> PreflightItem {
    match std::fs::create_dir_all(dir) {
        Ok(()) => PreflightItem {
            name: "output_dir",
            ok: true,
            detail: dir.display().to_string(),
        },
        Err(e) => PreflightItem {
            name: "output_dir",
            ok: false,
            detail: format!("cannot create {}: {e}", dir.display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SessionOverrides};
    use tempfile::TempDir;

    #[test]
    fn test_reports_missing_binaries() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.browser.executable = "/nonexistent/chromium".to_string();
        config.capture.encoder_path = "/nonexistent/ffmpeg".to_string();
        config.capture.output_dir = dir.path().join("voice");
        let session = SessionConfig::from_config(&config, &SessionOverrides::default()).unwrap();

        let items = preflight(&session);
        assert_eq!(items.len(), 3);
        assert!(!items[0].ok);
        assert!(!items[1].ok);
        assert!(items[1].detail.contains("/nonexistent/ffmpeg"));
        assert!(items[2].ok);
        assert!(dir.path().join("voice").is_dir());
    }

    #[test]
    fn test_existing_binary_passes() {
        let item = binary_item("encoder", Path::new("/bin/sh"));
        assert!(item.ok);
    }
}
