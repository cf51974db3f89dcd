// WorkflowState: the persisted, schema-versioned snapshot of a WEC.
//
// This is the only type in this crate that a storage layer actually needs to
// round-trip to bytes; everything else here exists to give its fields a
// name. See workflow_core::state for Extract/Apply, which convert between
// this document and the live runtime (WEC + AEC forest).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bookmark::Bookmark;
use crate::ids::{AecId, BlockId, InstanceId, NodeId};
use crate::status::{ActivityStatus, WorkflowStatus, WorkflowSubStatus};
use crate::work_item::WorkItem;

/// Current schema version this crate writes and reads without migration.
/// `Apply` rejects documents with a newer version (`StateVersionMismatch`);
/// older versions are expected to go through declared migrations before
/// reaching `Apply` (migrations are a hosting-layer concern, not modeled here).
pub const STATE_FORMAT_VERSION: u32 = 1;

/// A recorded fault, attached to the WEC and (via `activity_instance_id`) to
/// the AEC whose callback raised it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: uuid::Uuid,
    pub activity_instance_id: Option<AecId>,
    pub activity_node_id: Option<NodeId>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7(),
            activity_instance_id: None,
            activity_node_id: None,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn at_activity(mut self, aec_id: AecId, node_id: impl Into<String>) -> Self {
        self.activity_instance_id = Some(aec_id);
        self.activity_node_id = Some(node_id.into());
        self
    }
}

/// Flat, persisted record of one Activity Execution Context. Parent
/// relationships are recorded by id, not by in-memory reference, so the
/// forest serializes without cycles (see SPEC_FULL.md §9, "Cyclic references").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedAec {
    pub id: AecId,
    pub activity_node_id: NodeId,
    pub parent_id: Option<AecId>,
    pub status: ActivityStatus,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub input: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub output: HashMap<String, serde_json::Value>,
    /// This AEC's local register entries, keyed by block id.
    #[serde(default)]
    pub local_variable_values: HashMap<BlockId, serde_json::Value>,
    pub tag: Option<String>,
    pub is_executing: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The full, structural snapshot of a WEC: everything `Apply` needs to
/// reconstruct an executable WEC equivalent to the one at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub state_format_version: u32,
    pub instance_id: InstanceId,
    pub definition_id: String,
    pub version: u32,
    pub tenant_id: Option<String>,
    pub correlation_id: Option<String>,
    pub parent_instance_id: Option<InstanceId>,
    pub status: WorkflowStatus,
    pub sub_status: WorkflowSubStatus,
    #[serde(default)]
    pub input: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub output: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    /// Root-register variable values keyed by block id.
    #[serde(default)]
    pub variables: HashMap<BlockId, serde_json::Value>,
    pub activity_execution_contexts: Vec<PersistedAec>,
    pub bookmarks: Vec<Bookmark>,
    pub incidents: Vec<Incident>,
    /// The scheduler's queue at snapshot time, empty if the workflow
    /// finished or if the queue fully drained before suspension.
    pub scheduler: Vec<WorkItem>,
    pub execution_log: Vec<ExecutionLogEntry>,
}

/// One entry in the append-only execution journal.
///
/// Modeled as a typed enum (rather than free-form strings) so the log is
/// useful as a diagnostic trail and trivially serializable as part of
/// `WorkflowState` - see SPEC_FULL.md §10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionLogEntry {
    WorkflowStarted {
        at: DateTime<Utc>,
    },
    ActivityScheduled {
        activity_node_id: NodeId,
        at: DateTime<Utc>,
    },
    ActivityCompleted {
        activity_instance_id: AecId,
        at: DateTime<Utc>,
    },
    ActivityFaulted {
        activity_instance_id: AecId,
        message: String,
        at: DateTime<Utc>,
    },
    BookmarkCreated {
        bookmark_id: uuid::Uuid,
        at: DateTime<Utc>,
    },
    BookmarkBurned {
        bookmark_id: uuid::Uuid,
        at: DateTime<Utc>,
    },
    WorkflowSuspended {
        at: DateTime<Utc>,
    },
    WorkflowFinished {
        sub_status: WorkflowSubStatus,
        at: DateTime<Utc>,
    },
}
