// Identifier types
//
// All runtime identifiers are UUID v7 so that records emitted by the engine
// sort by creation order without a separate sequence counter. NodeId and
// BlockId are structural, not random: they are derived from the workflow
// definition (graph position, declared variable name) so they are stable
// across runs of the same definition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a workflow instance (one WEC).
pub type InstanceId = Uuid;

/// Unique identifier for an Activity Execution Context.
pub type AecId = Uuid;

/// Path-based identifier for an activity's position in the workflow graph,
/// e.g. `"0.1.2"` for the third child of the second child of the root.
/// Stable across runs of the same `WorkflowGraph`, unlike `AecId` which is
/// minted fresh per execution.
pub type NodeId = String;

/// Identity of a memory block (a declared or dynamic variable), stable
/// across runs of the same workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
