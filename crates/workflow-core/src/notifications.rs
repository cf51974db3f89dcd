// Lifecycle notifications (SPEC_FULL.md §4.6)
//
// Emission order is a correctness property of the engine (§8, property 4),
// not just documentation: the drain loop and runner emit these at the exact
// points named in §4.6 regardless of which `NotificationSink` a host installs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use workflow_contracts::{AecId, InstanceId, NodeId, WorkflowSubStatus};

use crate::error::Result;

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    WorkflowExecuting {
        instance_id: InstanceId,
        at: DateTime<Utc>,
    },
    WorkflowStarted {
        instance_id: InstanceId,
        at: DateTime<Utc>,
    },
    ActivityExecuting {
        instance_id: InstanceId,
        activity_instance_id: AecId,
        activity_node_id: NodeId,
        at: DateTime<Utc>,
    },
    ActivityExecuted {
        instance_id: InstanceId,
        activity_instance_id: AecId,
        activity_node_id: NodeId,
        faulted: bool,
        at: DateTime<Utc>,
    },
    WorkflowFinished {
        instance_id: InstanceId,
        sub_status: WorkflowSubStatus,
        at: DateTime<Utc>,
    },
    WorkflowExecuted {
        instance_id: InstanceId,
        sub_status: WorkflowSubStatus,
        at: DateTime<Utc>,
    },
}

impl LifecycleEvent {
    pub fn workflow_executing(instance_id: InstanceId) -> Self {
        LifecycleEvent::WorkflowExecuting {
            instance_id,
            at: Utc::now(),
        }
    }

    pub fn workflow_started(instance_id: InstanceId) -> Self {
        LifecycleEvent::WorkflowStarted {
            instance_id,
            at: Utc::now(),
        }
    }

    pub fn activity_executing(
        instance_id: InstanceId,
        activity_instance_id: AecId,
        activity_node_id: impl Into<String>,
    ) -> Self {
        LifecycleEvent::ActivityExecuting {
            instance_id,
            activity_instance_id,
            activity_node_id: activity_node_id.into(),
            at: Utc::now(),
        }
    }

    pub fn activity_executed(
        instance_id: InstanceId,
        activity_instance_id: AecId,
        activity_node_id: impl Into<String>,
        faulted: bool,
    ) -> Self {
        LifecycleEvent::ActivityExecuted {
            instance_id,
            activity_instance_id,
            activity_node_id: activity_node_id.into(),
            faulted,
            at: Utc::now(),
        }
    }

    pub fn workflow_finished(instance_id: InstanceId, sub_status: WorkflowSubStatus) -> Self {
        LifecycleEvent::WorkflowFinished {
            instance_id,
            sub_status,
            at: Utc::now(),
        }
    }

    pub fn workflow_executed(instance_id: InstanceId, sub_status: WorkflowSubStatus) -> Self {
        LifecycleEvent::WorkflowExecuted {
            instance_id,
            sub_status,
            at: Utc::now(),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        match self {
            LifecycleEvent::WorkflowExecuting { instance_id, .. }
            | LifecycleEvent::WorkflowStarted { instance_id, .. }
            | LifecycleEvent::ActivityExecuting { instance_id, .. }
            | LifecycleEvent::ActivityExecuted { instance_id, .. }
            | LifecycleEvent::WorkflowFinished { instance_id, .. }
            | LifecycleEvent::WorkflowExecuted { instance_id, .. } => *instance_id,
        }
    }
}

/// Delivery sink for lifecycle events. A subscriber's failure is recorded as
/// an incident on the workflow (by the caller of `notify`), not propagated
/// as a turn failure — see SPEC_FULL.md §4.6.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: LifecycleEvent) -> Result<()>;

    async fn notify_batch(&self, events: Vec<LifecycleEvent>) -> Result<()> {
        for event in events {
            self.notify(event).await?;
        }
        Ok(())
    }
}
