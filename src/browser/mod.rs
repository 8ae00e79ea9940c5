//! Remote UI session: the browser the bot drives through the join page.
//!
//! The orchestrator only talks to the `UiLauncher`/`UiSession` traits so the
//! join flow can be exercised against scripted doubles. `ChromeLauncher` is
//! the real implementation over the DevTools protocol.

mod chrome;
mod wait;

pub use chrome::{ChromeLauncher, ChromeSession};
pub use wait::WaitPolicy;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::{Selector, SessionConfig};

#[derive(Debug, Error)]
pub enum UiError {
    #[error("browser launch failed: {0}")]
    Launch(String),
    #[error("element {selector} did not appear within {timeout:?}")]
    ElementTimeout { selector: String, timeout: Duration },
    #[error("interaction rejected: {0}")]
    Interaction(String),
    #[error("cancelled while waiting for {selector}")]
    Cancelled { selector: String },
}

/// Starts a browser configured for unattended media pages.
#[async_trait]
pub trait UiLauncher: Send + Sync {
    type Session: UiSession;

    async fn launch(&self, config: &SessionConfig) -> Result<Self::Session, UiError>;
}

/// A live browser session. Exclusively owned by one run.
#[async_trait]
pub trait UiSession: Send + Sync {
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), UiError>;

    /// One lookup attempt; `Ok(None)` when the element is not on the page yet.
    async fn find_element(&self, selector: &Selector) -> Result<Option<Self::Element>, UiError>;

    async fn click(&self, element: &Self::Element) -> Result<(), UiError>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), UiError>;

    /// Release the browser and everything it spawned. Safe to call repeatedly.
    async fn close(&mut self);

    /// Poll `find_element` until it matches, the policy's timeout elapses or
    /// `cancel` fires.
    async fn wait_for_element(
        &self,
        selector: &Selector,
        policy: WaitPolicy,
        cancel: &CancellationToken,
    ) -> Result<Self::Element, UiError> {
        wait::poll_for_element(self, selector, policy, cancel).await
    }
}
