// Injected collaborators (SPEC_FULL.md §9 "Global state")
//
// The engine holds no process-global state: identifier issuance, state
// persistence, and activity behavior are all supplied per `Runner` instance.
// Notification delivery has its own trait in `notifications.rs`.

use async_trait::async_trait;

use workflow_contracts::{InstanceId, WorkflowState};

use crate::activity_api::ActivityApi;
use crate::error::Result;

/// Issues identifiers the engine cannot derive deterministically from the
/// graph (AEC ids, bookmark ids, workflow instance ids when the caller
/// doesn't supply one).
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> uuid::Uuid;
}

/// Persists and loads a workflow's serialized state. The engine only ever
/// sees the document shape (`WorkflowState`); where and how it is stored
/// (database, object store, in-memory map) is entirely up to the
/// implementation.
#[async_trait]
pub trait StateCommitter: Send + Sync {
    async fn commit(&self, state: &WorkflowState) -> Result<()>;

    async fn load(&self, instance_id: InstanceId) -> Result<Option<WorkflowState>>;
}

/// One registered activity type's runtime behavior. Dispatch happens by the
/// `kind` string recorded on each `Activity`, via `ActivityRegistry` — not by
/// downcasting a trait object (SPEC_FULL.md §9, "Polymorphic activities").
///
/// An implementation should either complete synchronously
/// (`ctx.set_output`/returning `Ok(())` and letting the drain loop call
/// `complete`), or leave the AEC suspended by creating a bookmark or
/// scheduling children and returning without completing — the activity
/// contract in SPEC_FULL.md §6.
#[async_trait]
pub trait ActivityBehavior: Send + Sync {
    /// The `ActivityKind` this behavior answers for.
    fn kind(&self) -> &str;

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()>;
}

/// An external key-value store a `Variable` delegates `Get`/`Set` to, named
/// by `Variable::storage_driver` and resolved via `VariableStoreRegistry`
/// (SPEC_FULL.md §4.1). The engine keeps no storage-backed variables of its
/// own; every driver is supplied by the hosting layer.
#[async_trait]
pub trait VariableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}
