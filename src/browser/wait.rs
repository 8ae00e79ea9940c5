use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{UiError, UiSession};
use crate::config::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub(super) async fn poll_for_element<S>(
    session: &S,
    selector: &Selector,
    policy: WaitPolicy,
    cancel: &CancellationToken,
) -> Result<S::Element, UiError>
where
    S: UiSession + ?Sized,
{
    let deadline = Instant::now() + policy.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(element) = session.find_element(selector).await? {
            debug!("Found {} after {} attempt(s)", selector, attempts);
            return Ok(element);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(UiError::ElementTimeout {
                selector: selector.to_string(),
                timeout: policy.timeout,
            });
        }

        let pause = policy.poll_interval.min(deadline - now);
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(UiError::Cancelled {
                    selector: selector.to_string(),
                });
            }
            _ = sleep(pause) => {}
        }
    }
}
