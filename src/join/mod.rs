//! Join flow: drives a UI session from the landing page into the meeting.
//!
//! `Start → Launched → NameEntered → ConsentAccepted → Joined`, with
//! `Failed(cause)` reachable from every non-terminal state. Each control gets
//! its own bounded wait so a failure names the control that regressed.

mod state;

pub use state::{JoinFailure, JoinOutcome, JoinStage, JoinState};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::browser::{UiError, UiLauncher, UiSession, WaitPolicy};
use crate::config::SessionConfig;

pub struct JoinFlow<'a> {
    config: &'a SessionConfig,
    cancel: CancellationToken,
    trace: Vec<JoinState>,
}

impl<'a> JoinFlow<'a> {
    pub fn new(config: &'a SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            trace: vec![JoinState::Start],
        }
    }

    pub fn state(&self) -> &JoinState {
        self.trace.last().unwrap_or(&JoinState::Start)
    }

    /// Every state visited so far, in order.
    pub fn trace(&self) -> &[JoinState] {
        &self.trace
    }

    /// Run the flow to a terminal state. A launched session is parked in
    /// `slot` immediately so the caller owns its teardown whatever happens next.
    pub async fn run<L: UiLauncher>(
        &mut self,
        launcher: &L,
        slot: &mut Option<L::Session>,
    ) -> JoinOutcome {
        match self.drive(launcher, slot).await {
            Ok(()) => {
                self.enter(JoinState::Joined);
                info!("Joined meeting as {}", self.config.username);
                JoinOutcome::Joined
            }
            Err(failure) => {
                error!("Join failed in state {}: {}", self.state().as_str(), failure);
                self.enter(JoinState::Failed(failure.clone()));
                JoinOutcome::Failed(failure)
            }
        }
    }

    async fn drive<L: UiLauncher>(
        &mut self,
        launcher: &L,
        slot: &mut Option<L::Session>,
    ) -> Result<(), JoinFailure> {
        let config = self.config;

        info!("Joining meeting: {}", config.meeting_url);
        let session = launcher
            .launch(config)
            .await
            .map_err(|e| JoinFailure::LaunchFailure {
                message: e.to_string(),
            })?;
        let session: &L::Session = slot.insert(session);

        session
            .navigate(&config.meeting_url)
            .await
            .map_err(|e| JoinFailure::LaunchFailure {
                message: e.to_string(),
            })?;
        self.enter(JoinState::Launched);

        info!("Waiting for name input...");
        let name_input = self
            .wait(session, JoinStage::NameInput, &config.selectors.name_input)
            .await?;
        session
            .type_text(&name_input, &config.username)
            .await
            .map_err(|e| stage_failure(JoinStage::NameInput, e))?;
        self.enter(JoinState::NameEntered);
        info!("Name entered");

        info!("Waiting for consent control...");
        let consent = self
            .wait(
                session,
                JoinStage::ConsentControl,
                &config.selectors.consent_control,
            )
            .await?;
        session
            .click(&consent)
            .await
            .map_err(|e| stage_failure(JoinStage::ConsentControl, e))?;
        self.enter(JoinState::ConsentAccepted);
        info!("Consent accepted");

        match &config.selectors.joined_indicator {
            Some(indicator) => {
                info!("Waiting for joined indicator...");
                self.wait(session, JoinStage::JoinedIndicator, indicator)
                    .await?;
            }
            None => {
                // No connected signal on the page; give the conference a
                // fixed interval to come up.
                info!(
                    "Waiting {}s for the meeting connection to settle",
                    config.settle_interval.as_secs()
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        return Err(JoinFailure::Cancelled { stage: JoinStage::Settle });
                    }
                    _ = sleep(config.settle_interval) => {}
                }
            }
        }

        Ok(())
    }

    async fn wait<S: UiSession>(
        &self,
        session: &S,
        stage: JoinStage,
        selector: &crate::config::Selector,
    ) -> Result<S::Element, JoinFailure> {
        let policy = WaitPolicy {
            timeout: self.config.ui_timeout,
            poll_interval: self.config.poll_interval,
        };
        session
            .wait_for_element(selector, policy, &self.cancel)
            .await
            .map_err(|e| stage_failure(stage, e))
    }

    fn enter(&mut self, state: JoinState) {
        if !self.state().is_terminal() {
            self.trace.push(state);
        }
    }
}

fn stage_failure(stage: JoinStage, err: UiError) -> JoinFailure {
    match err {
        UiError::ElementTimeout { .. } => JoinFailure::ElementTimeout { stage },
        UiError::Cancelled { .. } => JoinFailure::Cancelled { stage },
        UiError::Interaction(message) | UiError::Launch(message) => {
            JoinFailure::InteractionFailure { stage, message }
        }
    }
}
