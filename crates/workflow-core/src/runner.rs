// Runner: orchestrator tying graph, registry, and injected collaborators
// together into one `run` call (SPEC_FULL.md §4.7, §6).

use std::sync::Arc;

use tracing::{info, instrument};

use workflow_contracts::{
    ActivityHandle, BlockId, ExecutionLogEntry, InstanceId, RunWorkflowOptions, WorkItem,
    WorkflowGraph, WorkflowState, WorkflowSubStatus,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::notifications::{LifecycleEvent, NotificationSink};
use crate::pipeline::{
    default_activity_middlewares, default_turn_middlewares, notify_or_record_incident,
    ActivityMiddleware, CancellationToken, NextTurn, TurnContext, TurnMiddleware,
};
use crate::registry::ActivityRegistry;
use crate::state;
use crate::traits::{IdGenerator, StateCommitter};
use crate::variable_stores::VariableStoreRegistry;
use crate::wec::WorkflowExecutionContext;

/// The result of one `Runner::run` call (SPEC_FULL.md §6).
pub struct RunResult {
    pub wec: WorkflowExecutionContext,
    pub workflow_state: WorkflowState,
    /// Value bound to the workflow's declared `result` variable, if any,
    /// read from the root memory register after the turn finishes.
    pub result: Option<serde_json::Value>,
}

/// Orchestrates a workflow graph against its registered activity behaviors
/// and a set of injected collaborators. One `Runner` per workflow
/// definition (or per host, if the graph is looked up per call) is the
/// expected lifetime; `run` is safe to call repeatedly/concurrently for
/// different instance ids — see SPEC_FULL.md §5 on the single-instance
/// serialization the hosting layer owns.
pub struct Runner {
    graph: WorkflowGraph,
    registry: ActivityRegistry,
    id_gen: Arc<dyn IdGenerator>,
    notifications: Arc<dyn NotificationSink>,
    committer: Arc<dyn StateCommitter>,
    config: EngineConfig,
    turn_middlewares: Vec<Arc<dyn TurnMiddleware>>,
    activity_middlewares: Vec<Arc<dyn ActivityMiddleware>>,
    variable_stores: VariableStoreRegistry,
}

impl Runner {
    pub fn new(
        graph: WorkflowGraph,
        registry: ActivityRegistry,
        id_gen: Arc<dyn IdGenerator>,
        notifications: Arc<dyn NotificationSink>,
        committer: Arc<dyn StateCommitter>,
        config: EngineConfig,
    ) -> Self {
        Self {
            graph,
            registry,
            id_gen,
            notifications,
            committer,
            config,
            turn_middlewares: default_turn_middlewares(),
            activity_middlewares: default_activity_middlewares(),
            variable_stores: VariableStoreRegistry::new(),
        }
    }

    pub fn with_turn_middlewares(mut self, middlewares: Vec<Arc<dyn TurnMiddleware>>) -> Self {
        self.turn_middlewares = middlewares;
        self
    }

    pub fn with_activity_middlewares(mut self, middlewares: Vec<Arc<dyn ActivityMiddleware>>) -> Self {
        self.activity_middlewares = middlewares;
        self
    }

    pub fn with_variable_stores(mut self, variable_stores: VariableStoreRegistry) -> Self {
        self.variable_stores = variable_stores;
        self
    }

    /// Run fresh (no prior state) or resume a persisted run, per the seeding
    /// decision tree in SPEC_FULL.md §4.7.
    #[instrument(skip_all, fields(definition_id = %self.graph.definition_id))]
    pub async fn run(
        &self,
        state: Option<WorkflowState>,
        options: RunWorkflowOptions,
        cancellation: &CancellationToken,
    ) -> Result<RunResult> {
        options
            .validate()
            .map_err(|msg| EngineError::invalid_seeding_options(msg))?;

        let is_fresh = state.is_none();
        let mut wec = match state {
            Some(persisted) => state::apply(persisted, &self.graph)?,
            None => self.fresh_wec(&options),
        };
        wec.correlation_id = options.correlation_id.clone().or(wec.correlation_id.clone());
        wec.parent_instance_id = options.parent_workflow_instance_id.or(wec.parent_instance_id);
        for (k, v) in options.input.clone() {
            wec.input.insert(k, v);
        }
        for (k, v) in options.properties.clone() {
            wec.properties.insert(k, v);
        }

        if let Some(trigger_activity_id) = options.trigger_activity_id.clone() {
            wec.properties
                .insert("trigger_activity_id".to_string(), serde_json::Value::String(trigger_activity_id));
        }

        let was_pending = wec.sub_status == WorkflowSubStatus::Pending;

        notify_or_record_incident(
            &mut wec,
            self.notifications.as_ref(),
            LifecycleEvent::workflow_executing(wec.instance_id),
        )
        .await;

        if is_fresh {
            // §4.7 step 1: a brand new WEC always just schedules its root,
            // bypassing the resumption priority tree entirely.
            wec.scheduler
                .schedule(WorkItem::start(self.graph.root_node_id(), None));
        } else {
            self.seed(&mut wec, &options)?;
        }
        wec.seed_root_dynamic_variables(options.variables.clone());

        if was_pending {
            wec.set_sub_status(WorkflowSubStatus::Executing);
            notify_or_record_incident(
                &mut wec,
                self.notifications.as_ref(),
                LifecycleEvent::workflow_started(wec.instance_id),
            )
            .await;
        }

        let mut per_run_config = self.config.clone();
        per_run_config.default_fault_strategy = options.fault_strategy;

        let turn_chain = Arc::new(self.turn_middlewares.clone());
        let activity_chain = Arc::new(self.activity_middlewares.clone());
        let mut turn_ctx = TurnContext {
            wec: &mut wec,
            graph: &self.graph,
            registry: &self.registry,
            variable_stores: &self.variable_stores,
            id_gen: self.id_gen.as_ref(),
            notifications: self.notifications.as_ref(),
            config: &per_run_config,
            cancellation,
            activity_middlewares: activity_chain,
        };
        NextTurn::new(turn_chain).run(&mut turn_ctx).await?;

        if wec.sub_status == WorkflowSubStatus::Finished {
            notify_or_record_incident(
                &mut wec,
                self.notifications.as_ref(),
                LifecycleEvent::workflow_finished(wec.instance_id, wec.sub_status),
            )
            .await;
        }
        notify_or_record_incident(
            &mut wec,
            self.notifications.as_ref(),
            LifecycleEvent::workflow_executed(wec.instance_id, wec.sub_status),
        )
        .await;

        let result = wec.root_register.get_local(&BlockId::new("result")).cloned();
        let workflow_state = state::extract(&wec, &self.graph);
        self.committer.commit(&workflow_state).await?;

        info!(instance_id = %wec.instance_id, sub_status = %wec.sub_status, "run complete");

        Ok(RunResult {
            wec,
            workflow_state,
            result,
        })
    }

    fn fresh_wec(&self, options: &RunWorkflowOptions) -> WorkflowExecutionContext {
        let instance_id = options.workflow_instance_id.unwrap_or_else(|| self.id_gen.new_id());
        let root_aec_id = self.id_gen.new_id();
        let mut wec = WorkflowExecutionContext::new(
            instance_id,
            self.graph.definition_id.clone(),
            self.graph.version,
            root_aec_id,
            self.graph.root_node_id(),
        );
        wec.declare_variables(&self.graph.root().variables);
        wec.record_log(ExecutionLogEntry::WorkflowStarted { at: chrono::Utc::now() });
        wec
    }

    /// Decide what to schedule for a *rehydrated* WEC, in the priority order
    /// of SPEC_FULL.md §4.7 step 2. Only called when resuming persisted
    /// state — a brand new WEC always takes step 1 instead (see `run`).
    fn seed(&self, wec: &mut WorkflowExecutionContext, options: &RunWorkflowOptions) -> Result<()> {
        if let Some(bookmark_id) = options.bookmark_id {
            let bookmark = wec
                .find_bookmark(bookmark_id)
                .cloned()
                .ok_or_else(|| EngineError::bookmark_not_found(bookmark_id))?;
            let node_id = bookmark.activity_node_id.clone();
            let mut item = WorkItem::resume(node_id, bookmark.activity_instance_id);
            item.input = options.bookmark_payload.clone();
            item.auto_complete = bookmark.auto_complete;
            wec.scheduler.schedule(item);
            if bookmark.auto_burn {
                wec.remove_bookmark(bookmark.id);
            }
            return Ok(());
        }

        if let Some(handle) = &options.activity_handle {
            let item = self.resolve_activity_handle(wec, handle)?;
            wec.scheduler.schedule(item);
            return Ok(());
        }

        if wec.scheduler.has_any() {
            return Ok(());
        }

        let executing = wec.executing_aecs_by_start();
        if !executing.is_empty() {
            for aec_id in executing {
                let node_id = wec.require_aec(aec_id)?.activity_node_id.clone();
                wec.scheduler.schedule(WorkItem::resume(node_id, aec_id));
            }
            return Ok(());
        }

        wec.scheduler
            .schedule(WorkItem::start(self.graph.root_node_id(), None));
        Ok(())
    }

    /// `ActivityInstanceId` resumes an already-live AEC; the other variants
    /// resolve a node in the graph and schedule a *fresh* start there
    /// (SPEC_FULL.md §4.7(b) — only the instance-id form is a resumption).
    fn resolve_activity_handle(
        &self,
        wec: &WorkflowExecutionContext,
        handle: &ActivityHandle,
    ) -> Result<WorkItem> {
        match handle {
            ActivityHandle::ActivityInstanceId(aec_id) => {
                let aec = wec.require_aec(*aec_id)?;
                Ok(WorkItem::resume(aec.activity_node_id.clone(), *aec_id))
            }
            ActivityHandle::NodeId(node_id) => {
                if self.graph.by_node_id(node_id).is_none() {
                    return Err(EngineError::activity_not_found(node_id.clone()));
                }
                Ok(WorkItem::start(node_id.clone(), None))
            }
            ActivityHandle::ActivityId(activity_id) => {
                let (node_id, _) = self
                    .graph
                    .by_activity_id(activity_id)
                    .ok_or_else(|| EngineError::activity_not_found(activity_id.clone()))?;
                Ok(WorkItem::start(node_id, None))
            }
            ActivityHandle::Name(tag) => {
                let node_id = self
                    .graph
                    .by_tag(tag)
                    .first()
                    .cloned()
                    .ok_or_else(|| EngineError::activity_not_found(tag.clone()))?;
                Ok(WorkItem::start(node_id, None))
            }
        }
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub async fn load(&self, instance_id: InstanceId) -> Result<Option<WorkflowState>> {
        self.committer.load(instance_id).await
    }
}
