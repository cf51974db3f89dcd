// In-memory collaborators and sample `ActivityBehavior`s, built for tests
// and demos rather than production hosting (SPEC_FULL.md §8 scenarios).
//
// None of this is exercised by the engine itself; it exists so integration
// tests and `demos/` binaries can stand up a `Runner` without a real
// database, clock, or notification transport.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use workflow_contracts::{BlockId, BookmarkOptions, InstanceId, WorkflowState};

use crate::activity_api::ActivityApi;
use crate::error::{EngineError, Result};
use crate::notifications::{LifecycleEvent, NotificationSink};
use crate::traits::{ActivityBehavior, IdGenerator, StateCommitter, VariableStore};

/// Mints sequential UUIDv7s. Real time ordering isn't needed in tests, only
/// distinct, stable ids.
#[derive(Debug, Default)]
pub struct InMemoryIdGenerator;

impl IdGenerator for InMemoryIdGenerator {
    fn new_id(&self) -> uuid::Uuid {
        uuid::Uuid::now_v7()
    }
}

/// Collects every event it receives, in order, for assertions.
#[derive(Debug, Default)]
pub struct InMemoryNotificationSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for InMemoryNotificationSink {
    async fn notify(&self, event: LifecycleEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Drops every event on the floor. Useful when a test only cares about the
/// resulting `WorkflowState`, not the notification trail.
#[derive(Debug, Default)]
pub struct NoOpNotificationSink;

#[async_trait]
impl NotificationSink for NoOpNotificationSink {
    async fn notify(&self, _event: LifecycleEvent) -> Result<()> {
        Ok(())
    }
}

/// `StateCommitter` backed by a `HashMap`, keyed by instance id.
#[derive(Debug, Default)]
pub struct InMemoryStateCommitter {
    states: Mutex<HashMap<InstanceId, WorkflowState>>,
}

impl InMemoryStateCommitter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateCommitter for InMemoryStateCommitter {
    async fn commit(&self, state: &WorkflowState) -> Result<()> {
        self.states
            .lock()
            .unwrap()
            .insert(state.instance_id, state.clone());
        Ok(())
    }

    async fn load(&self, instance_id: InstanceId) -> Result<Option<WorkflowState>> {
        Ok(self.states.lock().unwrap().get(&instance_id).cloned())
    }
}

/// Fails every `commit`, for exercising the "commit fails mid-turn" scenario
/// (SPEC_FULL.md §8, Scenario S5) without touching storage at all.
#[derive(Debug, Default)]
pub struct FailingCommitter;

#[async_trait]
impl StateCommitter for FailingCommitter {
    async fn commit(&self, _state: &WorkflowState) -> Result<()> {
        Err(EngineError::Internal(anyhow::anyhow!("commit sink unavailable")))
    }

    async fn load(&self, _instance_id: InstanceId) -> Result<Option<WorkflowState>> {
        Ok(None)
    }
}

/// `VariableStore` backed by a `HashMap`, keyed by the block name passed to
/// `get`/`set`. Stands in for a real external key-value store in tests of
/// `Variable::storage_driver` delegation.
#[derive(Debug, Default)]
pub struct InMemoryVariableStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VariableStore for InMemoryVariableStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        self.values.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// `Sequence`: runs each child in declaration order, completing once every
/// child has. Progress (the index of the next child to schedule) is tracked
/// in a dynamic variable bound on this activity's own AEC, so a resumed
/// invocation can tell where it left off without re-deriving it from the
/// children list (SPEC_FULL.md §8, Scenario S1).
pub struct SequenceBehavior;

const SEQUENCE_PROGRESS_BLOCK: &str = "__sequence_progress";

#[async_trait]
impl ActivityBehavior for SequenceBehavior {
    fn kind(&self) -> &str {
        "Sequence"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        let children = ctx.child_node_ids();
        let progress = BlockId::new(SEQUENCE_PROGRESS_BLOCK);
        let next_index = if ctx.resumed() {
            ctx.get_variable(&progress)
                .await?
                .and_then(|v| v.as_u64())
                .map(|i| i as usize + 1)
                .unwrap_or(0)
        } else {
            0
        };

        if next_index >= children.len() {
            ctx.complete()?;
            return Ok(());
        }

        ctx.set_variable(progress, serde_json::json!(next_index)).await?;
        ctx.schedule_child(children[next_index].clone(), None, true);
        Ok(())
    }
}

/// `Parallel`: schedules every child at once on first execution, then
/// completes once every child AEC it spawned has reached a terminal status
/// (SPEC_FULL.md §8, Scenario S4).
pub struct ParallelBehavior;

#[async_trait]
impl ActivityBehavior for ParallelBehavior {
    fn kind(&self) -> &str {
        "Parallel"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        if !ctx.resumed() {
            let children = ctx.child_node_ids();
            ctx.schedule_children(children);
            return Ok(());
        }

        let aec_id = ctx.aec_id();
        let all_done = ctx
            .wec()
            .aec(aec_id)
            .map(|aec| {
                !aec.children.is_empty()
                    && aec.children.iter().all(|child_id| {
                        ctx.wec()
                            .aec(*child_id)
                            .map(|child| child.status.is_terminal())
                            .unwrap_or(false)
                    })
            })
            .unwrap_or(false);

        if all_done {
            ctx.complete()?;
        }
        Ok(())
    }
}

/// Writes `input["value"]` to the variable named by `input["block"]`, then
/// completes immediately. The simplest possible leaf activity.
pub struct SetVariableBehavior;

#[async_trait]
impl ActivityBehavior for SetVariableBehavior {
    fn kind(&self) -> &str {
        "SetVariable"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        let block = ctx
            .input("block")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| EngineError::activity_fault("SetVariable requires an input named \"block\""))?;
        let value = ctx.input("value").cloned().unwrap_or(serde_json::Value::Null);
        ctx.set_variable(BlockId::new(block), value).await?;
        ctx.complete()?;
        Ok(())
    }
}

/// Creates a bookmark named by `input["event"]` on first execution and
/// suspends. Completes as soon as it is resumed, regardless of the
/// resumption payload (SPEC_FULL.md §8, Scenarios S2 and S4).
pub struct WaitBehavior;

#[async_trait]
impl ActivityBehavior for WaitBehavior {
    fn kind(&self) -> &str {
        "Wait"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        if ctx.resumed() {
            ctx.complete()?;
            return Ok(());
        }
        let event_name = ctx
            .input("event")
            .and_then(|v| v.as_str())
            .unwrap_or("default")
            .to_string();
        ctx.create_bookmark(event_name, None, BookmarkOptions::default());
        Ok(())
    }
}

/// Creates a bookmark with `auto_complete: true` on first execution, then
/// suspends. If its `execute` callback is ever invoked a second time, it
/// faults — which only happens if the drain loop fails to skip the callback
/// on an auto-completing resumption (SPEC_FULL.md §4.2, the `Bookmark`
/// `auto_complete` property).
pub struct AutoCompleteWaitBehavior;

#[async_trait]
impl ActivityBehavior for AutoCompleteWaitBehavior {
    fn kind(&self) -> &str {
        "AutoCompleteWait"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        if ctx.resumed() {
            return Err(EngineError::activity_fault(
                "AutoCompleteWait callback invoked on resumption; auto_complete should have skipped it",
            ));
        }
        let event_name = ctx
            .input("event")
            .and_then(|v| v.as_str())
            .unwrap_or("default")
            .to_string();
        ctx.create_bookmark(event_name, None, BookmarkOptions::default().auto_complete(true));
        Ok(())
    }
}

/// Always faults, carrying `input["message"]` (or a default) as the fault
/// message. Used to exercise fault propagation (SPEC_FULL.md §8, Scenario S3).
pub struct ThrowBehavior;

#[async_trait]
impl ActivityBehavior for ThrowBehavior {
    fn kind(&self) -> &str {
        "Throw"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        let message = ctx
            .input("message")
            .and_then(|v| v.as_str())
            .unwrap_or("activity fault")
            .to_string();
        Err(EngineError::activity_fault(message))
    }
}

/// Appends `input["name"]` to a workflow-scoped `trace` array variable, then
/// completes. Declare `trace` as a `Workflow`-scoped variable on the root
/// activity so every sibling under a `Sequence`/`Parallel` shares one list
/// (SPEC_FULL.md §8, Scenario S1).
pub struct TraceStepBehavior;

#[async_trait]
impl ActivityBehavior for TraceStepBehavior {
    fn kind(&self) -> &str {
        "TraceStep"
    }

    async fn execute(&self, ctx: &mut ActivityApi<'_>) -> Result<()> {
        let name = ctx
            .input("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let block = BlockId::new("trace");
        let mut trace: Vec<serde_json::Value> = ctx
            .get_variable(&block)
            .await?
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default();
        trace.push(serde_json::Value::String(name));
        ctx.set_variable(block, serde_json::Value::Array(trace)).await?;
        ctx.complete()?;
        Ok(())
    }
}
