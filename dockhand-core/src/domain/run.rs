//! Run domain types
//!
//! A run owns one record per declared step. Step and run status only ever move
//! forward: Pending -> Running -> Succeeded | Failed. Nothing here outlives
//! the run except the serialized report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::image::ImageTag;
use crate::domain::log::LogEntry;
use crate::domain::trigger::TriggerEvent;
use crate::domain::workflow::{ActionRef, WorkflowDefinition};
use crate::error::{FailureKind, StepError};

/// Step execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Run execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "Pending"),
            RunStatus::Running => write!(f, "Running"),
            RunStatus::Succeeded => write!(f, "Succeeded"),
            RunStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Per-step record within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub action: ActionRef,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The failure that ended a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a single run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub workflow: String,
    pub trigger: TriggerEvent,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only when the image was pushed
    pub published: Option<ImageTag>,
    pub failure: Option<StepFailure>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl RunReport {
    /// Creates a report with every step Pending
    pub fn new(run_id: Uuid, workflow: &WorkflowDefinition, trigger: TriggerEvent) -> Self {
        Self {
            run_id,
            workflow: workflow.name.clone(),
            trigger,
            status: RunStatus::Pending,
            steps: workflow
                .steps
                .iter()
                .map(|step| StepRecord {
                    name: step.name.clone(),
                    action: step.action,
                    status: StepStatus::Pending,
                    started_at: None,
                    completed_at: None,
                })
                .collect(),
            started_at: Utc::now(),
            completed_at: None,
            published: None,
            failure: None,
            logs: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Utc::now();
    }

    pub fn step_started(&mut self, index: usize) {
        if let Some(record) = self.steps.get_mut(index) {
            record.status = StepStatus::Running;
            record.started_at = Some(Utc::now());
        }
    }

    pub fn step_succeeded(&mut self, index: usize) {
        if let Some(record) = self.steps.get_mut(index) {
            record.status = StepStatus::Succeeded;
            record.completed_at = Some(Utc::now());
        }
    }

    /// Marks the step and the run as failed
    pub fn step_failed(&mut self, index: usize, error: &StepError) {
        if let Some(record) = self.steps.get_mut(index) {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Utc::now());
            self.failure = Some(StepFailure {
                step: record.name.clone(),
                kind: error.kind(),
                message: error.to_string(),
            });
        }
        self.finish(RunStatus::Failed);
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Index of the step that failed, if any
    pub fn failed_step(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| step.status == StepStatus::Failed)
    }
}
