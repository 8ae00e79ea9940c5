//! Join flow states and failure causes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// UI control a stage waits on. The stage name pinpoints which part of the
/// (externally owned) page changed when a join fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinStage {
    Launch,
    NameInput,
    ConsentControl,
    JoinedIndicator,
    Settle,
}

impl JoinStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Launch => "launch",
            Self::NameInput => "name-input",
            Self::ConsentControl => "consent-control",
            Self::JoinedIndicator => "joined-indicator",
            Self::Settle => "settle",
        }
    }
}

impl fmt::Display for JoinStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinFailure {
    LaunchFailure { message: String },
    ElementTimeout { stage: JoinStage },
    InteractionFailure { stage: JoinStage, message: String },
    Cancelled { stage: JoinStage },
}

impl JoinFailure {
    pub fn stage(&self) -> JoinStage {
        match self {
            Self::LaunchFailure { .. } => JoinStage::Launch,
            Self::ElementTimeout { stage }
            | Self::InteractionFailure { stage, .. }
            | Self::Cancelled { stage } => *stage,
        }
    }
}

impl fmt::Display for JoinFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaunchFailure { message } => write!(f, "launch failure: {message}"),
            Self::ElementTimeout { stage } => write!(f, "element timeout ({stage})"),
            Self::InteractionFailure { stage, message } => {
                write!(f, "interaction failure ({stage}): {message}")
            }
            Self::Cancelled { stage } => write!(f, "cancelled ({stage})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    Start,
    Launched,
    NameEntered,
    ConsentAccepted,
    Joined,
    Failed(JoinFailure),
}

impl JoinState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Launched => "launched",
            Self::NameEntered => "name_entered",
            Self::ConsentAccepted => "consent_accepted",
            Self::Joined => "joined",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Joined | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Failed(JoinFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(JoinStage::NameInput.as_str(), "name-input");
        assert_eq!(JoinStage::ConsentControl.as_str(), "consent-control");
        assert_eq!(JoinStage::JoinedIndicator.to_string(), "joined-indicator");
    }

    #[test]
    fn test_failure_serialization() {
        let failure = JoinFailure::ElementTimeout {
            stage: JoinStage::NameInput,
        };
        let json = serde_json::to_string(&failure).unwrap();
        assert_eq!(json, r#"{"kind":"element_timeout","stage":"name-input"}"#);
        assert_eq!(failure.to_string(), "element timeout (name-input)");
    }

    #[test]
    fn test_terminal_states() {
        assert!(JoinState::Joined.is_terminal());
        assert!(JoinState::Failed(JoinFailure::Cancelled {
            stage: JoinStage::Settle
        })
        .is_terminal());
        assert!(!JoinState::NameEntered.is_terminal());
        assert_eq!(JoinState::ConsentAccepted.as_str(), "consent_accepted");
    }
}
