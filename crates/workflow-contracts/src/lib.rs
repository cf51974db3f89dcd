// Workflow Contracts
//
// Public data model for the workflow execution engine: activity definitions,
// the materialized workflow graph, variables, bookmarks, work items, and the
// persisted workflow state document.
//
// Key design decisions:
// - Pure data: no execution logic lives here, only types and their invariants.
// - Everything that crosses a persistence or process boundary is Serialize +
//   Deserialize.
// - IDs are UUID v7 so persisted records sort by creation time.

pub mod activity;
pub mod bookmark;
pub mod ids;
pub mod options;
pub mod state;
pub mod status;
pub mod variable;
pub mod work_item;

pub use activity::{Activity, ActivityKind, WorkflowGraph};
pub use bookmark::{Bookmark, BookmarkOptions};
pub use ids::{AecId, BlockId, InstanceId, NodeId};
pub use options::{ActivityHandle, FaultStrategy, RunWorkflowOptions};
pub use state::{
    ExecutionLogEntry, Incident, PersistedAec, WorkflowState, STATE_FORMAT_VERSION,
};
pub use status::{ActivityStatus, WorkflowStatus, WorkflowSubStatus};
pub use variable::{BlockKind, Variable, VariableScope};
pub use work_item::WorkItem;
