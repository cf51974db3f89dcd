// WorkItem: the unit the Scheduler queues and the Pipeline drains.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{AecId, NodeId};

/// An intent to either start a new AEC for an activity, or resume an
/// existing one. `existing_aec` being set means "resume"; a `WorkItem`
/// never carries both a fresh-start and a resume intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Node id of the activity this work item targets.
    pub activity_node_id: NodeId,
    /// AEC id of the activity that scheduled this work item, if any
    /// (absent only for the very first work item scheduling the root).
    pub owner: Option<AecId>,
    /// Optional tag carried through to the resulting AEC (diagnostic/lookup).
    pub tag: Option<String>,
    /// Dynamic variable bindings to apply to the new/resumed AEC's register
    /// before execution.
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,
    /// Set when this work item resumes an already-live AEC rather than
    /// starting a new one.
    pub existing_aec: Option<AecId>,
    /// Input payload for the activity (e.g. a bookmark resumption payload).
    #[serde(default)]
    pub input: Option<serde_json::Value>,
    /// Set when this resumption was triggered by a `Bookmark` with
    /// `auto_complete: true` — the drain loop completes the target AEC
    /// directly instead of invoking its behavior's `execute` callback.
    #[serde(default)]
    pub auto_complete: bool,
}

impl WorkItem {
    /// A work item that starts a fresh AEC for `activity_node_id`.
    pub fn start(activity_node_id: impl Into<String>, owner: Option<AecId>) -> Self {
        Self {
            activity_node_id: activity_node_id.into(),
            owner,
            tag: None,
            variables: HashMap::new(),
            existing_aec: None,
            input: None,
            auto_complete: false,
        }
    }

    /// A work item that resumes an already-live AEC.
    pub fn resume(activity_node_id: impl Into<String>, existing_aec: AecId) -> Self {
        Self {
            activity_node_id: activity_node_id.into(),
            owner: None,
            tag: None,
            variables: HashMap::new(),
            existing_aec: Some(existing_aec),
            input: None,
            auto_complete: false,
        }
    }

    pub fn with_auto_complete(mut self, auto_complete: bool) -> Self {
        self.auto_complete = auto_complete;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, serde_json::Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn is_resumption(&self) -> bool {
        self.existing_aec.is_some()
    }
}
