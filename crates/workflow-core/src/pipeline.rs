// Execution Pipeline (SPEC_FULL.md §4.4)
//
// Two middleware chains, each terminating in a fixed drain stage:
//   - TurnMiddleware wraps one `Runner::run` turn, terminating in
//     `drain_turn`, which pops work items off the scheduler until it is
//     empty or the run is cancelled.
//   - ActivityMiddleware wraps a single activity's callback invocation,
//     terminating in `execute_activity`.
// Middlewares are plain `Arc<dyn Trait>` objects threaded through a small
// `Next*` cursor (SPEC_FULL.md §9, "Middleware chain" — a composed callable,
// no dynamic reflection).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, info_span, Instrument};

use workflow_contracts::{
    AecId, ActivityStatus, BlockId, ExecutionLogEntry, FaultStrategy, Incident, VariableScope,
    WorkflowGraph, WorkItem, WorkflowSubStatus,
};

use crate::activity_api::ActivityApi;
use crate::aec::ActivityExecutionContext;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::notifications::{LifecycleEvent, NotificationSink};
use crate::registry::ActivityRegistry;
use crate::traits::{ActivityBehavior, IdGenerator};
use crate::variable_stores::VariableStoreRegistry;
use crate::wec::WorkflowExecutionContext;

/// Notify `sink`, recording a failure as an incident on `wec` rather than
/// letting it abort the turn (SPEC_FULL.md §4.6). Shared with `runner.rs`,
/// whose own notify calls fall outside any turn.
pub(crate) async fn notify_or_record_incident(
    wec: &mut WorkflowExecutionContext,
    sink: &dyn NotificationSink,
    event: LifecycleEvent,
) {
    if let Err(err) = sink.notify(event).await {
        wec.record_incident(Incident::new(format!("notification delivery failed: {err}")));
    }
}

/// Cooperative cancellation flag threaded from `Runner::run` into the WEC
/// and checked between scheduler pops (SPEC_FULL.md §5).
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a `TurnMiddleware` or the terminal drain stage needs for one
/// `Runner::run` call.
pub struct TurnContext<'a> {
    pub wec: &'a mut WorkflowExecutionContext,
    pub graph: &'a WorkflowGraph,
    pub registry: &'a ActivityRegistry,
    pub variable_stores: &'a VariableStoreRegistry,
    pub id_gen: &'a dyn IdGenerator,
    pub notifications: &'a dyn NotificationSink,
    pub config: &'a EngineConfig,
    pub cancellation: &'a CancellationToken,
    /// Chain wrapping every activity callback invocation this turn. Built
    /// once by the `Runner` (defaulting to `default_activity_middlewares`)
    /// rather than per-activity, so a host-supplied chain applies uniformly.
    pub activity_middlewares: Arc<Vec<Arc<dyn ActivityMiddleware>>>,
}

#[async_trait]
pub trait TurnMiddleware: Send + Sync {
    async fn handle(&self, ctx: &mut TurnContext<'_>, next: NextTurn) -> Result<()>;
}

#[derive(Clone)]
pub struct NextTurn {
    middlewares: Arc<Vec<Arc<dyn TurnMiddleware>>>,
    index: usize,
}

impl NextTurn {
    pub fn new(middlewares: Arc<Vec<Arc<dyn TurnMiddleware>>>) -> Self {
        Self { middlewares, index: 0 }
    }

    pub async fn run(mut self, ctx: &mut TurnContext<'_>) -> Result<()> {
        match self.middlewares.get(self.index).cloned() {
            Some(mw) => {
                self.index += 1;
                mw.handle(ctx, self).await
            }
            None => drain_turn(ctx).await,
        }
    }
}

/// Everything an `ActivityMiddleware` or `execute_activity` needs for one
/// activity callback invocation.
pub struct ActivityContext<'a> {
    pub wec: &'a mut WorkflowExecutionContext,
    pub graph: &'a WorkflowGraph,
    pub variable_stores: &'a VariableStoreRegistry,
    pub aec_id: AecId,
    pub behavior: Arc<dyn ActivityBehavior>,
    pub id_gen: &'a dyn IdGenerator,
    pub resumed: bool,
    pub trigger_input: Option<serde_json::Value>,
}

#[async_trait]
pub trait ActivityMiddleware: Send + Sync {
    async fn handle(&self, ctx: &mut ActivityContext<'_>, next: NextActivity) -> Result<()>;
}

#[derive(Clone)]
pub struct NextActivity {
    middlewares: Arc<Vec<Arc<dyn ActivityMiddleware>>>,
    index: usize,
}

impl NextActivity {
    pub fn new(middlewares: Arc<Vec<Arc<dyn ActivityMiddleware>>>) -> Self {
        Self { middlewares, index: 0 }
    }

    pub async fn run(mut self, ctx: &mut ActivityContext<'_>) -> Result<()> {
        match self.middlewares.get(self.index).cloned() {
            Some(mw) => {
                self.index += 1;
                mw.handle(ctx, self).await
            }
            None => execute_activity(ctx).await,
        }
    }
}

/// Terminal stage of the per-activity pipeline: invoke the registered
/// behavior's callback. Faults are returned, not swallowed — trapping them
/// into `Incidents` is the job of `FaultTrappingMiddleware` and
/// `finalize_fault` below, which both have the WEC access this stage
/// deliberately does not reach for on its own.
async fn execute_activity(ctx: &mut ActivityContext<'_>) -> Result<()> {
    let behavior = ctx.behavior.clone();
    let mut api = ActivityApi::new(
        ctx.wec,
        ctx.graph,
        ctx.variable_stores,
        ctx.aec_id,
        ctx.id_gen,
        ctx.resumed,
        ctx.trigger_input.clone(),
    );
    behavior.execute(&mut api).await
}

/// Built-in per-activity middleware recording an incident for any fault
/// surfacing from the wrapped callback, then re-raising it so the drain loop
/// can apply the configured `FaultStrategy`.
pub struct FaultTrappingMiddleware;

#[async_trait]
impl ActivityMiddleware for FaultTrappingMiddleware {
    async fn handle(&self, ctx: &mut ActivityContext<'_>, next: NextActivity) -> Result<()> {
        let node_id = ctx
            .wec
            .aec(ctx.aec_id)
            .map(|a| a.activity_node_id.clone())
            .unwrap_or_default();
        match next.run(ctx).await {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(aec_id = %ctx.aec_id, node_id = %node_id, error = %err, "activity faulted");
                let incident = Incident::new(err.to_string()).at_activity(ctx.aec_id, node_id);
                ctx.wec.record_incident(incident);
                Err(err)
            }
        }
    }
}

/// Built-in turn middleware establishing a `tracing` span for the whole turn.
pub struct LoggingScopeMiddleware;

#[async_trait]
impl TurnMiddleware for LoggingScopeMiddleware {
    async fn handle(&self, ctx: &mut TurnContext<'_>, next: NextTurn) -> Result<()> {
        let span = info_span!("workflow_turn", instance_id = %ctx.wec.instance_id);
        async move {
            info!("turn started");
            let result = next.run(ctx).await;
            match &result {
                Ok(()) => info!(sub_status = %ctx.wec.sub_status, "turn finished"),
                Err(err) => error!(error = %err, "turn aborted"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Default built-in chains a `Runner` installs unless the caller supplies
/// its own (see `runner.rs`).
pub fn default_turn_middlewares() -> Vec<Arc<dyn TurnMiddleware>> {
    vec![Arc::new(LoggingScopeMiddleware)]
}

pub fn default_activity_middlewares() -> Vec<Arc<dyn ActivityMiddleware>> {
    vec![Arc::new(FaultTrappingMiddleware)]
}

/// Terminal stage of the per-turn pipeline: drain the scheduler until empty
/// or cancelled (SPEC_FULL.md §4.4).
pub async fn drain_turn(ctx: &mut TurnContext<'_>) -> Result<()> {
    let activity_chain = ctx.activity_middlewares.clone();
    let mut drained = 0usize;

    loop {
        if ctx.cancellation.is_cancelled() {
            ctx.wec.set_sub_status(WorkflowSubStatus::Cancelled);
            break;
        }
        if let Some(max) = ctx.config.max_activities_per_turn {
            if drained >= max {
                break;
            }
        }

        let Some(item) = ctx.wec.scheduler.next() else {
            break;
        };

        let aec_id = materialize_aec(ctx, &item).await?;
        let node_id = ctx.wec.require_aec(aec_id)?.activity_node_id.clone();

        ctx.wec.require_aec_mut(aec_id)?.mark_running();
        notify_or_record_incident(
            ctx.wec,
            ctx.notifications,
            LifecycleEvent::activity_executing(ctx.wec.instance_id, aec_id, node_id.clone()),
        )
        .await;

        // `auto_complete` (set when this item resumes a bookmark created
        // with `BookmarkOptions::auto_complete(true)`) completes the AEC
        // directly, with no behavior callback invoked at all.
        let result: Result<()> = if item.auto_complete {
            ctx.wec.require_aec_mut(aec_id)?.complete();
            Ok(())
        } else {
            let activity = ctx.graph.by_node_id(&node_id).ok_or_else(|| {
                EngineError::schedule_rejected(format!("no activity at node {node_id}"))
            })?;
            let behavior = ctx.registry.resolve(&activity.kind)?;
            let mut activity_ctx = ActivityContext {
                wec: &mut *ctx.wec,
                graph: ctx.graph,
                variable_stores: ctx.variable_stores,
                aec_id,
                behavior,
                id_gen: ctx.id_gen,
                resumed: item.is_resumption(),
                trigger_input: item.input.clone(),
            };
            NextActivity::new(activity_chain.clone()).run(&mut activity_ctx).await
        };
        let faulted = result.is_err();

        notify_or_record_incident(
            ctx.wec,
            ctx.notifications,
            LifecycleEvent::activity_executed(ctx.wec.instance_id, aec_id, node_id.clone(), faulted),
        )
        .await;

        match result {
            Ok(()) => finalize_success(ctx, aec_id)?,
            Err(err) => finalize_fault(ctx, aec_id, err)?,
        }

        if ctx.config.compact_after_each_activity {
            ctx.wec.compact();
        }
        drained += 1;
    }

    if !ctx.wec.scheduler.has_any()
        && !ctx.wec.all_aecs().any(|a| a.is_executing)
        && !ctx.wec.sub_status.is_terminal()
    {
        ctx.wec.set_sub_status(WorkflowSubStatus::Finished);
        ctx.wec.record_log(ExecutionLogEntry::WorkflowFinished {
            sub_status: ctx.wec.sub_status,
            at: chrono::Utc::now(),
        });
    } else if ctx.wec.scheduler.is_empty() && !ctx.wec.sub_status.is_terminal() {
        ctx.wec.set_sub_status(WorkflowSubStatus::Suspended);
        ctx.wec
            .record_log(ExecutionLogEntry::WorkflowSuspended { at: chrono::Utc::now() });
    }

    Ok(())
}

/// Look up the `WorkItem`'s target AEC (resumption) or mint a fresh one
/// (fresh start), applying any carried variables/input.
async fn materialize_aec(ctx: &mut TurnContext<'_>, item: &WorkItem) -> Result<AecId> {
    let aec_id = if let Some(existing) = item.existing_aec {
        ctx.wec.require_aec(existing)?;
        existing
    } else {
        let id = ctx.id_gen.new_id();
        let aec = ActivityExecutionContext::new(id, item.activity_node_id.clone(), item.owner)
            .with_tag(item.tag.clone());
        ctx.wec.insert_aec(aec);
        ctx.wec.record_log(ExecutionLogEntry::ActivityScheduled {
            activity_node_id: item.activity_node_id.clone(),
            at: chrono::Utc::now(),
        });
        // Local/Transient variables are scoped to this activity's own
        // register, not promoted onto the WEC root (SPEC_FULL.md §4.1). A
        // variable naming a `storage_driver` is never declared locally at
        // all — `get_variable`/`set_variable` delegate it to the resolved
        // `VariableStore` before ever consulting an in-memory register.
        if let Some(activity) = ctx.graph.by_node_id(&item.activity_node_id) {
            let declared_aec = ctx.wec.require_aec_mut(id)?;
            for var in &activity.variables {
                if matches!(var.scope, VariableScope::Local | VariableScope::Transient)
                    && var.storage_driver.is_none()
                {
                    declared_aec
                        .register
                        .declare(BlockId::new(var.name.clone()), var.default_value.clone());
                }
            }
        }
        id
    };

    for (name, value) in item.variables.clone() {
        ctx.wec
            .set_variable(ctx.graph, ctx.variable_stores, aec_id, BlockId::new(name), value)
            .await?;
    }
    if let Some(serde_json::Value::Object(map)) = &item.input {
        let aec = ctx.wec.require_aec_mut(aec_id)?;
        for (k, v) in map {
            aec.input.insert(k.clone(), v.clone());
        }
    }
    Ok(aec_id)
}

/// An activity callback returned `Ok`. If it explicitly completed itself
/// (`ActivityApi::complete`), burn its auto-burn bookmarks, log completion,
/// and schedule its parent for resumption so a composite parent gets a
/// chance to react (schedule the next child, or complete itself). An
/// activity that returned `Ok` without completing is left suspended,
/// awaiting the bookmark or children it scheduled.
fn finalize_success(ctx: &mut TurnContext<'_>, aec_id: AecId) -> Result<()> {
    let (status, parent) = {
        let aec = ctx.wec.require_aec(aec_id)?;
        (aec.status, aec.parent)
    };
    if status != ActivityStatus::Completed {
        return Ok(());
    }

    ctx.wec.burn_auto_bookmarks(aec_id);
    ctx.wec.record_log(ExecutionLogEntry::ActivityCompleted {
        activity_instance_id: aec_id,
        at: chrono::Utc::now(),
    });

    if let Some(parent_id) = parent {
        let parent_terminal = ctx
            .wec
            .aec(parent_id)
            .map(|p| p.status.is_terminal())
            .unwrap_or(true);
        if !parent_terminal {
            let parent_node_id = ctx.wec.require_aec(parent_id)?.activity_node_id.clone();
            ctx.wec
                .scheduler
                .schedule(WorkItem::resume(parent_node_id, parent_id));
        }
    }
    Ok(())
}

/// An activity callback faulted. Mark it `Faulted`, then apply the
/// configured fault strategy: `Contain` leaves the rest of the workflow
/// running; `PropagateToRoot` cascades the fault up the parent chain,
/// faulting every ancestor AEC in turn and clearing any sibling work those
/// ancestors had scheduled, without re-invoking their behavior (a faulted
/// ancestor never gets a chance to react, unlike a successful child
/// completion — see SPEC_FULL.md §9's resolved reading of §4.2/§7).
fn finalize_fault(ctx: &mut TurnContext<'_>, aec_id: AecId, err: EngineError) -> Result<()> {
    ctx.wec.require_aec_mut(aec_id)?.fault();
    ctx.wec.record_log(ExecutionLogEntry::ActivityFaulted {
        activity_instance_id: aec_id,
        message: err.to_string(),
        at: chrono::Utc::now(),
    });

    if ctx.config.default_fault_strategy == FaultStrategy::Contain {
        debug!(aec_id = %aec_id, "fault contained, workflow continues");
        return Ok(());
    }

    let mut current = ctx.wec.aec(aec_id).and_then(|a| a.parent);
    while let Some(id) = current {
        ctx.wec.scheduler.unschedule_owned_by(id);
        let parent = ctx.wec.require_aec_mut(id)?;
        if parent.status.is_terminal() {
            break;
        }
        parent.fault();
        current = parent.parent;
    }
    ctx.wec.scheduler.clear();
    ctx.wec.set_sub_status(WorkflowSubStatus::Faulted);
    Ok(())
}
