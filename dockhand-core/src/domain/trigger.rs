//! Trigger domain types
//!
//! A trigger event is produced by the hosting platform (or the CLI acting on
//! its behalf). A workflow declares which events start a run through its
//! trigger filter; events that do not match never reach the runner.

use serde::{Deserialize, Serialize};

const BRANCH_PREFIX: &str = "refs/heads/";

/// Event delivered by the hosting platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// A push to a ref, optionally pinned to the pushed commit
    Push {
        git_ref: String,
        commit: Option<String>,
    },
    /// A manual run request, with no parameters beyond an optional ref
    ManualDispatch { git_ref: Option<String> },
    PullRequest { number: u64, head_ref: String },
    Schedule,
}

impl TriggerEvent {
    /// Short event name as shown in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::Push { .. } => "push",
            TriggerEvent::ManualDispatch { .. } => "manual",
            TriggerEvent::PullRequest { .. } => "pull-request",
            TriggerEvent::Schedule => "schedule",
        }
    }

    /// The ref the event points at, if any
    pub fn git_ref(&self) -> Option<&str> {
        match self {
            TriggerEvent::Push { git_ref, .. } => Some(git_ref),
            TriggerEvent::ManualDispatch { git_ref } => git_ref.as_deref(),
            TriggerEvent::PullRequest { head_ref, .. } => Some(head_ref),
            TriggerEvent::Schedule => None,
        }
    }

    /// The commit id carried by a push event
    pub fn commit(&self) -> Option<&str> {
        match self {
            TriggerEvent::Push { commit, .. } => commit.as_deref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.git_ref() {
            Some(git_ref) => write!(f, "{} ({})", self.name(), git_ref),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Returns the branch name for a ref
///
/// Accepts both `refs/heads/<branch>` and a bare branch name. Other fully
/// qualified refs (tags, pull request refs) are not branches.
pub fn branch_name(git_ref: &str) -> Option<&str> {
    if let Some(branch) = git_ref.strip_prefix(BRANCH_PREFIX) {
        return (!branch.is_empty()).then_some(branch);
    }
    if git_ref.is_empty() || git_ref.starts_with("refs/") {
        return None;
    }
    Some(git_ref)
}

/// Conditions under which a workflow runs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerFilter {
    /// Branches whose pushes start a run
    pub push_branches: Vec<String>,
    /// Whether manual dispatch starts a run
    pub manual: bool,
}

impl TriggerFilter {
    /// Push-to-main plus manual dispatch
    pub fn main_or_manual() -> Self {
        Self {
            push_branches: vec!["main".to_string()],
            manual: true,
        }
    }

    /// Returns true if the event should start a run
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        match event {
            TriggerEvent::Push { git_ref, .. } => match branch_name(git_ref) {
                Some(branch) => self
                    .push_branches
                    .iter()
                    .any(|b| branch_name(b) == Some(branch)),
                None => false,
            },
            TriggerEvent::ManualDispatch { .. } => self.manual,
            TriggerEvent::PullRequest { .. } | TriggerEvent::Schedule => false,
        }
    }

    /// First declared push branch that is not a branch ref
    pub fn invalid_branch(&self) -> Option<&str> {
        self.push_branches
            .iter()
            .map(String::as_str)
            .find(|b| branch_name(b).is_none())
    }

    /// True if no event can ever match
    pub fn is_empty(&self) -> bool {
        self.push_branches.is_empty() && !self.manual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(git_ref: &str) -> TriggerEvent {
        TriggerEvent::Push {
            git_ref: git_ref.to_string(),
            commit: None,
        }
    }

    #[test]
    fn test_branch_name() {
        assert_eq!(branch_name("refs/heads/main"), Some("main"));
        assert_eq!(branch_name("main"), Some("main"));
        assert_eq!(branch_name("refs/heads/feature/x"), Some("feature/x"));
        assert_eq!(branch_name("refs/tags/v1.0"), None);
        assert_eq!(branch_name("refs/heads/"), None);
        assert_eq!(branch_name(""), None);
    }

    #[test]
    fn test_filter_matches_push_to_main() {
        let filter = TriggerFilter::main_or_manual();
        assert!(filter.matches(&push("refs/heads/main")));
        assert!(filter.matches(&push("main")));
    }

    #[test]
    fn test_filter_rejects_other_pushes() {
        let filter = TriggerFilter::main_or_manual();
        assert!(!filter.matches(&push("refs/heads/develop")));
        assert!(!filter.matches(&push("refs/tags/main")));
        assert!(!filter.matches(&push("refs/heads/main-old")));
    }

    #[test]
    fn test_filter_accepts_qualified_branches() {
        let filter = TriggerFilter {
            push_branches: vec!["refs/heads/main".to_string()],
            manual: false,
        };
        assert!(filter.matches(&push("refs/heads/main")));
        assert!(filter.matches(&push("main")));
        assert!(!filter.matches(&push("refs/heads/develop")));
        assert_eq!(filter.invalid_branch(), None);
    }

    #[test]
    fn test_filter_reports_non_branch_entries() {
        let filter = TriggerFilter {
            push_branches: vec!["main".to_string(), "refs/tags/v1".to_string()],
            manual: false,
        };
        assert_eq!(filter.invalid_branch(), Some("refs/tags/v1"));
        assert!(!filter.matches(&push("refs/tags/v1")));
    }

    #[test]
    fn test_filter_manual_dispatch() {
        let filter = TriggerFilter::main_or_manual();
        assert!(filter.matches(&TriggerEvent::ManualDispatch { git_ref: None }));

        let push_only = TriggerFilter {
            push_branches: vec!["main".to_string()],
            manual: false,
        };
        assert!(!push_only.matches(&TriggerEvent::ManualDispatch { git_ref: None }));
    }

    #[test]
    fn test_filter_rejects_undeclared_events() {
        let filter = TriggerFilter::main_or_manual();
        assert!(!filter.matches(&TriggerEvent::Schedule));
        assert!(!filter.matches(&TriggerEvent::PullRequest {
            number: 7,
            head_ref: "main".to_string(),
        }));
    }

    #[test]
    fn test_event_accessors() {
        let event = TriggerEvent::Push {
            git_ref: "refs/heads/main".to_string(),
            commit: Some("abc123".to_string()),
        };
        assert_eq!(event.name(), "push");
        assert_eq!(event.git_ref(), Some("refs/heads/main"));
        assert_eq!(event.commit(), Some("abc123"));
        assert_eq!(event.to_string(), "push (refs/heads/main)");
        assert_eq!(TriggerEvent::Schedule.to_string(), "schedule");
    }
}
