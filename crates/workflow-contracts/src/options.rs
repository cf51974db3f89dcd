// Caller-facing options for a Run(graph, state?, options?) call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::ids::{AecId, InstanceId};

/// Targets a specific activity for resumption, by whichever handle the
/// caller has on hand. Mutually exclusive with `BookmarkId` on
/// `RunWorkflowOptions` - see `RunWorkflowOptions::validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActivityHandle {
    /// Resume this exact, already-live AEC.
    ActivityInstanceId(AecId),
    /// Resolve by the activity's path in the graph.
    NodeId(String),
    /// Resolve by the author-declared activity id.
    ActivityId(String),
    /// Resolve by the activity's tag (first match).
    Name(String),
}

/// What happens to a workflow when an activity fault is not handled by any
/// enclosing composite: propagate it toward the root (faulting the workflow),
/// or contain it (the workflow keeps running with the fault recorded as an
/// incident).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultStrategy {
    PropagateToRoot,
    Contain,
}

impl Default for FaultStrategy {
    fn default() -> Self {
        FaultStrategy::PropagateToRoot
    }
}

/// Options recognized by `Runner::run`. See §4.7 and §6 of the specification
/// for the seeding decision tree these options feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunWorkflowOptions {
    /// Use this instance id (else the runner generates one).
    pub workflow_instance_id: Option<InstanceId>,
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub input: HashMap<String, serde_json::Value>,
    /// Dynamic variables seeded on the root AEC's register.
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    /// Resume from this bookmark (seeding priority 1).
    pub bookmark_id: Option<Uuid>,
    /// Payload to apply when resuming the bookmark (matched against the
    /// bookmark's fingerprint together with the bookmark's recorded name).
    pub bookmark_payload: Option<serde_json::Value>,
    /// Resume this activity (seeding priority 2).
    pub activity_handle: Option<ActivityHandle>,
    /// Activity that caused this invocation, recorded as metadata only.
    pub trigger_activity_id: Option<String>,
    pub parent_workflow_instance_id: Option<InstanceId>,
    #[serde(default)]
    pub fault_strategy: FaultStrategy,
}

impl RunWorkflowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bookmark(mut self, bookmark_id: Uuid, payload: Option<serde_json::Value>) -> Self {
        self.bookmark_id = Some(bookmark_id);
        self.bookmark_payload = payload;
        self
    }

    pub fn with_activity_handle(mut self, handle: ActivityHandle) -> Self {
        self.activity_handle = Some(handle);
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// `BookmarkId` and `ActivityHandle` are mutually exclusive seeding
    /// intents - the runner refuses to guess a precedence between them
    /// (see the resolved Open Question in SPEC_FULL.md §9).
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.bookmark_id.is_some() && self.activity_handle.is_some() {
            return Err("BookmarkId and ActivityHandle are mutually exclusive");
        }
        Ok(())
    }
}
