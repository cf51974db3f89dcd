// Lifecycle status enums for workflows and activities.

use serde::{Deserialize, Serialize};

/// Coarse-grained workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Finished,
}

/// Fine-grained workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowSubStatus {
    Pending,
    Executing,
    Suspended,
    Finished,
    Faulted,
    Cancelled,
}

impl WorkflowSubStatus {
    /// The `WorkflowStatus` implied by this sub-status.
    pub fn status(&self) -> WorkflowStatus {
        match self {
            WorkflowSubStatus::Finished
            | WorkflowSubStatus::Faulted
            | WorkflowSubStatus::Cancelled => WorkflowStatus::Finished,
            _ => WorkflowStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowSubStatus::Finished
                | WorkflowSubStatus::Faulted
                | WorkflowSubStatus::Cancelled
        )
    }
}

impl std::fmt::Display for WorkflowSubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowSubStatus::Pending => "pending",
            WorkflowSubStatus::Executing => "executing",
            WorkflowSubStatus::Suspended => "suspended",
            WorkflowSubStatus::Finished => "finished",
            WorkflowSubStatus::Faulted => "faulted",
            WorkflowSubStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Per-activity lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Running,
    Completed,
    Faulted,
    Cancelled,
}

impl ActivityStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivityStatus::Completed | ActivityStatus::Faulted | ActivityStatus::Cancelled
        )
    }
}
