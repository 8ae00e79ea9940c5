//! Chrome/Chromium over the DevTools protocol (`chromiumoxide`).

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{UiError, UiLauncher, UiSession};
use crate::config::{Selector, SessionConfig};

/// How long a closing browser gets before it is killed.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// The page auto-plays meeting audio and asks for mic/camera, so the browser
/// runs headless with media permissions pre-granted.
const MEDIA_ARGS: &[&str] = &[
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--use-fake-ui-for-media-stream",
    "--autoplay-policy=no-user-gesture-required",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLauncher;

impl ChromeLauncher {
    pub fn new() -> Self {
        Self
    }

    fn browser_config(config: &SessionConfig) -> Result<BrowserConfig, UiError> {
        let settings = &config.browser;
        let (width, height) = settings.window_size;

        let mut args: Vec<String> = MEDIA_ARGS.iter().map(|a| a.to_string()).collect();
        if let Some(device) = &settings.audio_output_device {
            args.push(format!("--alsa-output-device={device}"));
        }
        args.extend(settings.extra_args.iter().cloned());

        BrowserConfig::builder()
            .chrome_executable(&settings.executable)
            .no_sandbox()
            .window_size(width, height)
            .request_timeout(config.ui_timeout)
            .args(args)
            .build()
            .map_err(UiError::Launch)
    }
}

#[async_trait]
impl UiLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self, config: &SessionConfig) -> Result<ChromeSession, UiError> {
        let executable = &config.browser.executable;
        if !executable.exists() {
            return Err(UiError::Launch(format!(
                "browser executable not found: {}",
                executable.display()
            )));
        }

        let browser_config = Self::browser_config(config)?;
        info!("Launching headless browser: {:?}", executable);

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| UiError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler error: {}", e);
                }
            }
            debug!("DevTools handler finished");
        });

        let mut session = ChromeSession {
            browser: None,
            page: None,
            handler: Some(handler_task),
        };

        match browser.new_page("about:blank").await {
            Ok(page) => {
                session.browser = Some(browser);
                session.page = Some(page);
                Ok(session)
            }
            Err(e) => {
                session.browser = Some(browser);
                session.close().await;
                Err(UiError::Launch(format!("failed to open page: {e}")))
            }
        }
    }
}

pub struct ChromeSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
}

impl ChromeSession {
    fn page(&self) -> Result<&Page, UiError> {
        self.page
            .as_ref()
            .ok_or_else(|| UiError::Interaction("browser session is closed".to_string()))
    }
}

#[async_trait]
impl UiSession for ChromeSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), UiError> {
        info!("Navigating to {}", url);
        self.page()
            .map_err(|e| UiError::Launch(e.to_string()))?
            .goto(url)
            .await
            .map_err(|e| UiError::Launch(format!("navigation to {url} failed: {e}")))?;
        Ok(())
    }

    async fn find_element(&self, selector: &Selector) -> Result<Option<Element>, UiError> {
        let page = self.page()?;
        let found = match selector {
            Selector::Css(css) => page.find_elements(css.as_str()).await,
            Selector::XPath(xpath) => page.find_xpaths(xpath.as_str()).await,
        };

        match found {
            Ok(elements) => Ok(elements.into_iter().next()),
            Err(e) if is_absent(&e) => {
                debug!("{} not found yet: {}", selector, e);
                Ok(None)
            }
            Err(e) => Err(UiError::Interaction(format!(
                "lookup of {selector} failed: {e}"
            ))),
        }
    }

    async fn click(&self, element: &Element) -> Result<(), UiError> {
        element
            .click()
            .await
            .map_err(|e| UiError::Interaction(format!("click failed: {e}")))?;
        Ok(())
    }

    async fn type_text(&self, element: &Element, text: &str) -> Result<(), UiError> {
        element
            .focus()
            .await
            .map_err(|e| UiError::Interaction(format!("focus failed: {e}")))?;
        element
            .type_str(text)
            .await
            .map_err(|e| UiError::Interaction(format!("typing failed: {e}")))?;
        Ok(())
    }

    async fn close(&mut self) {
        self.page = None;

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser did not accept close request: {}", e);
            }
            match tokio::time::timeout(CLOSE_GRACE, browser.wait()).await {
                Ok(Ok(_)) => info!("Browser closed"),
                Ok(Err(e)) => warn!("Failed to wait for browser exit: {}", e),
                Err(_) => {
                    warn!(
                        "Browser still running after {}s, killing it",
                        CLOSE_GRACE.as_secs()
                    );
                    if let Some(Err(e)) = browser.kill().await {
                        warn!("Failed to kill browser: {}", e);
                    }
                }
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// The browser answered, but the node is not (or no longer) in the document.
/// Transport failures mean the browser itself is gone.
fn is_absent(err: &CdpError) -> bool {
    matches!(err, CdpError::Chrome(_) | CdpError::NotFound)
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if self.browser.is_some() {
            debug!("Dropping open ChromeSession, browser process is killed with it");
        }
    }
}
