// Workflow Execution Engine
//
// Drives a workflow graph to completion or to a suspension point: a
// scheduler over pending work items, a state machine for workflow and
// activity lifecycles, a middleware pipeline around each turn and each
// activity invocation, a state extractor/applicator for resumable
// persistence, and a variable/memory system with lexically-scoped registers.
//
// Key design decisions:
// - Dispatch to activity behavior is by registered `kind` string
//   (`ActivityRegistry`), never by downcasting a trait object.
// - The AEC forest lives flattened in a table keyed by `AecId`, owned by the
//   WEC; navigation is by id lookup, not in-memory parent pointers.
// - No process-global state: identifier issuance, persistence, and
//   notification delivery are all supplied per `Runner` instance via traits
//   (`IdGenerator`, `StateCommitter`, `NotificationSink`, `ActivityBehavior`).
// - Error handling distinguishes engine-recognized failure kinds
//   (`EngineError`) from unmodeled collaborator failures (`Internal`).

pub mod activity_api;
pub mod aec;
pub mod config;
pub mod error;
pub mod notifications;
pub mod pipeline;
pub mod register;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod state;
pub mod traits;
pub mod variable_stores;
pub mod wec;

// In-memory implementations for tests and demos.
pub mod testing;

// Re-exports for convenience
pub use activity_api::ActivityApi;
pub use aec::ActivityExecutionContext;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{EngineError, Result};
pub use notifications::{LifecycleEvent, NotificationSink};
pub use pipeline::{
    default_activity_middlewares, default_turn_middlewares, ActivityContext, ActivityMiddleware,
    CancellationToken, FaultTrappingMiddleware, LoggingScopeMiddleware, NextActivity, NextTurn,
    TurnContext, TurnMiddleware,
};
pub use register::{MemoryBlock, MemoryRegister};
pub use registry::ActivityRegistry;
pub use runner::{RunResult, Runner};
pub use scheduler::Scheduler;
pub use traits::{ActivityBehavior, IdGenerator, StateCommitter, VariableStore};
pub use variable_stores::VariableStoreRegistry;
pub use wec::WorkflowExecutionContext;

// Re-export the data model crate's public surface for callers that only
// depend on `workflow-core`.
pub use workflow_contracts::{
    Activity, ActivityHandle, ActivityKind, ActivityStatus, AecId, Bookmark, BookmarkOptions,
    BlockId, BlockKind, ExecutionLogEntry, FaultStrategy, Incident, InstanceId, NodeId,
    PersistedAec, RunWorkflowOptions, Variable, VariableScope, WorkflowGraph, WorkflowState,
    WorkflowStatus, WorkflowSubStatus, WorkItem, STATE_FORMAT_VERSION,
};
