//! Trigger event arguments
//!
//! Shared by `run` and `plan`. Hosting platforms can pass the same values
//! through DOCKHAND_EVENT, DOCKHAND_REF and DOCKHAND_SHA.

use anyhow::Result;
use clap::{Args, ValueEnum};
use dockhand_core::domain::trigger::TriggerEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventKind {
    Push,
    Manual,
    PullRequest,
    Schedule,
}

#[derive(Debug, Clone, Args)]
pub struct EventArgs {
    /// Trigger event type
    #[arg(long, value_enum, env = "DOCKHAND_EVENT")]
    pub event: EventKind,

    /// Git ref of the event (e.g. refs/heads/main)
    #[arg(long = "ref", env = "DOCKHAND_REF")]
    pub git_ref: Option<String>,

    /// Commit id of a push event
    #[arg(long, env = "DOCKHAND_SHA")]
    pub sha: Option<String>,

    /// Pull request number
    #[arg(long, default_value_t = 0)]
    pub pr: u64,
}

impl EventArgs {
    /// Builds the trigger event
    pub fn to_event(&self) -> Result<TriggerEvent> {
        let git_ref = self.git_ref.clone().filter(|r| !r.trim().is_empty());

        let event = match self.event {
            EventKind::Push => TriggerEvent::Push {
                git_ref: git_ref
                    .ok_or_else(|| anyhow::anyhow!("--ref is required for push events"))?,
                commit: self.sha.clone().filter(|s| !s.trim().is_empty()),
            },
            EventKind::Manual => TriggerEvent::ManualDispatch { git_ref },
            EventKind::PullRequest => TriggerEvent::PullRequest {
                number: self.pr,
                head_ref: git_ref
                    .ok_or_else(|| anyhow::anyhow!("--ref is required for pull request events"))?,
            },
            EventKind::Schedule => TriggerEvent::Schedule,
        };

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(event: EventKind, git_ref: Option<&str>, sha: Option<&str>) -> EventArgs {
        EventArgs {
            event,
            git_ref: git_ref.map(str::to_string),
            sha: sha.map(str::to_string),
            pr: 0,
        }
    }

    #[test]
    fn test_push_event() {
        let event = args(EventKind::Push, Some("refs/heads/main"), Some("abc"))
            .to_event()
            .unwrap();
        assert_eq!(
            event,
            TriggerEvent::Push {
                git_ref: "refs/heads/main".to_string(),
                commit: Some("abc".to_string()),
            }
        );
    }

    #[test]
    fn test_push_requires_ref() {
        assert!(args(EventKind::Push, None, None).to_event().is_err());
        assert!(args(EventKind::Push, Some(" "), None).to_event().is_err());
    }

    #[test]
    fn test_manual_event() {
        let event = args(EventKind::Manual, None, Some("ignored"))
            .to_event()
            .unwrap();
        assert_eq!(event, TriggerEvent::ManualDispatch { git_ref: None });
    }
}
