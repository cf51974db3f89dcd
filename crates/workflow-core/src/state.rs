// State Extractor / Applicator (SPEC_FULL.md §4.5)
//
// `extract` and `apply` are the only bridge between the live runtime (WEC +
// AEC forest, both holding borrowed/owned in-memory structure) and the
// schema-versioned `WorkflowState` document a `StateCommitter` actually
// persists. Neither function touches the scheduler's execution semantics —
// `apply` rebuilds a WEC that is executable but has not itself run anything.

use workflow_contracts::{PersistedAec, VariableScope, WorkflowGraph, WorkflowState, STATE_FORMAT_VERSION};

use crate::aec::ActivityExecutionContext;
use crate::error::{EngineError, Result};
use crate::wec::WorkflowExecutionContext;

/// Snapshot a live WEC into its persisted form. Walks the flat AEC table
/// (order is whatever the underlying map yields; `apply` does not depend on
/// it) and the root register, rendering everything `WorkflowState` names.
/// `Transient`-scoped variables are dropped here rather than persisted: they
/// are "not persisted across turns" by definition (SPEC_FULL.md §4.1), and
/// this is the one place the live runtime crosses into the persisted form.
pub fn extract(wec: &WorkflowExecutionContext, graph: &WorkflowGraph) -> WorkflowState {
    let activity_execution_contexts = wec
        .all_aecs()
        .map(|aec| PersistedAec {
            id: aec.id,
            activity_node_id: aec.activity_node_id.clone(),
            parent_id: aec.parent,
            status: aec.status,
            properties: aec.properties.clone(),
            input: aec.input.clone(),
            output: aec.output.clone(),
            local_variable_values: aec
                .register
                .iter()
                .filter(|(block_id, _)| {
                    !matches!(
                        graph
                            .declaring_variable(&aec.activity_node_id, block_id.as_str())
                            .map(|v| v.scope),
                        Some(VariableScope::Transient)
                    )
                })
                .map(|(block_id, value)| (block_id.clone(), value.clone()))
                .collect(),
            tag: aec.tag.clone(),
            is_executing: aec.is_executing,
            started_at: aec.started_at,
            completed_at: aec.completed_at,
        })
        .collect();

    WorkflowState {
        state_format_version: STATE_FORMAT_VERSION,
        instance_id: wec.instance_id,
        definition_id: wec.definition_id.clone(),
        version: wec.version,
        tenant_id: wec.tenant_id.clone(),
        correlation_id: wec.correlation_id.clone(),
        parent_instance_id: wec.parent_instance_id,
        status: wec.status,
        sub_status: wec.sub_status,
        input: wec.input.clone(),
        output: wec.output.clone(),
        properties: wec.properties.clone(),
        variables: wec
            .root_register
            .iter()
            .map(|(block_id, value)| (block_id.clone(), value.clone()))
            .collect(),
        activity_execution_contexts,
        bookmarks: wec.bookmarks.clone(),
        incidents: wec.incidents.clone(),
        scheduler: wec.scheduler.snapshot(),
        execution_log: wec.execution_log.clone(),
    }
}

/// Rebuild an executable WEC from a persisted `WorkflowState`. The result has
/// not executed anything yet; `Runner` drives it through the pipeline after
/// seeding per §4.7.
///
/// `graph` is accepted per the specification's `Apply(state, Graph) → WEC`
/// signature but is not otherwise consulted here: activity node ids in the
/// persisted AECs are resolved lazily, by the drain loop, the first time
/// each one is next scheduled.
pub fn apply(state: WorkflowState, _graph: &WorkflowGraph) -> Result<WorkflowExecutionContext> {
    if state.state_format_version > STATE_FORMAT_VERSION {
        return Err(EngineError::StateVersionMismatch {
            found: state.state_format_version,
            supported: STATE_FORMAT_VERSION,
        });
    }

    let root_aec_id = state
        .activity_execution_contexts
        .iter()
        .find(|aec| aec.parent_id.is_none())
        .map(|aec| aec.id)
        .ok_or_else(|| {
            EngineError::schedule_rejected("persisted state has no root activity execution context")
        })?;

    let mut wec = WorkflowExecutionContext::rehydrate(
        state.instance_id,
        state.definition_id,
        state.version,
        root_aec_id,
    );
    wec.tenant_id = state.tenant_id;
    wec.correlation_id = state.correlation_id;
    wec.parent_instance_id = state.parent_instance_id;
    wec.set_sub_status(state.sub_status);
    wec.input = state.input;
    wec.output = state.output;
    wec.properties = state.properties;
    for (block_id, value) in state.variables {
        wec.root_register.declare(block_id, Some(value));
    }

    // `insert_aec` links a child onto its parent's `children` list, so
    // parents must already be present when a non-root AEC is inserted.
    // The persisted order carries no such guarantee, so insert in
    // dependency order: repeatedly insert every AEC whose parent is
    // already in the WEC (the root has none), until nothing is left.
    let mut pending = state.activity_execution_contexts;
    while !pending.is_empty() {
        let mut remaining = Vec::with_capacity(pending.len());
        let mut progressed = false;
        for persisted in pending {
            let ready = persisted
                .parent_id
                .map(|parent_id| wec.aec(parent_id).is_some())
                .unwrap_or(true);
            if !ready {
                remaining.push(persisted);
                continue;
            }
            progressed = true;
            let mut aec = ActivityExecutionContext::new(
                persisted.id,
                persisted.activity_node_id,
                persisted.parent_id,
            );
            aec.status = persisted.status;
            aec.properties = persisted.properties;
            aec.input = persisted.input;
            aec.output = persisted.output;
            aec.tag = persisted.tag;
            aec.is_executing = persisted.is_executing;
            aec.started_at = persisted.started_at;
            aec.completed_at = persisted.completed_at;
            for (block_id, value) in persisted.local_variable_values {
                aec.register.declare(block_id, Some(value));
            }
            wec.insert_aec(aec);
        }
        if !progressed {
            return Err(EngineError::schedule_rejected(
                "persisted state has an activity execution context with an unresolved parent",
            ));
        }
        pending = remaining;
    }

    for bookmark in state.bookmarks {
        wec.add_bookmark(bookmark);
    }
    wec.incidents = state.incidents;
    wec.scheduler.replace(state.scheduler);
    wec.execution_log = state.execution_log;

    Ok(wec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use workflow_contracts::{Activity, BlockId};

    fn sample_graph() -> WorkflowGraph {
        WorkflowGraph::new("def-1", 1, Activity::new("root", "Sequence"))
    }

    #[test]
    fn round_trips_a_freshly_created_wec() {
        let graph = sample_graph();
        let root_id = uuid::Uuid::now_v7();
        let mut wec = WorkflowExecutionContext::new(uuid::Uuid::now_v7(), "def-1", 1, root_id, "0".to_string());
        wec.root_register.declare(BlockId::new("trace"), Some(serde_json::json!([])));

        let state = extract(&wec, &graph);
        let rehydrated = apply(state, &graph).expect("apply should succeed");

        assert_eq!(rehydrated.instance_id, wec.instance_id);
        assert_eq!(rehydrated.root_aec_id, wec.root_aec_id);
        assert_eq!(rehydrated.sub_status, wec.sub_status);
        assert_eq!(
            rehydrated.root_register.get_local(&BlockId::new("trace")),
            Some(&serde_json::json!([]))
        );
        assert!(rehydrated.aec(root_id).is_some());
    }

    #[test]
    fn rejects_a_newer_state_format_version() {
        let graph = sample_graph();
        let mut state = extract(
            &WorkflowExecutionContext::new(uuid::Uuid::now_v7(), "def-1", 1, uuid::Uuid::now_v7(), "0".to_string()),
            &graph,
        );
        state.state_format_version = STATE_FORMAT_VERSION + 1;
        let err = apply(state, &graph).unwrap_err();
        assert!(matches!(err, EngineError::StateVersionMismatch { .. }));
    }
}
