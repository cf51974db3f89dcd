// Scenario-level integration tests against the public `Runner` API
// (SPEC_FULL.md §8, Scenarios S1-S6), using the in-memory collaborators and
// sample activity behaviors from `workflow_core::testing`.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use workflow_core::testing::{
    AutoCompleteWaitBehavior, FailingCommitter, InMemoryIdGenerator, InMemoryNotificationSink,
    InMemoryStateCommitter, InMemoryVariableStore, ParallelBehavior, SequenceBehavior,
    SetVariableBehavior, ThrowBehavior, TraceStepBehavior, WaitBehavior,
};
use workflow_core::{
    state, Activity, ActivityRegistry, ActivityStatus, BlockId, CancellationToken, EngineConfig,
    LifecycleEvent, PersistedAec, RunWorkflowOptions, Runner, Variable, VariableScope,
    VariableStore, VariableStoreRegistry, WorkflowGraph, WorkflowState, WorkflowStatus,
    WorkflowSubStatus, STATE_FORMAT_VERSION,
};

fn runner_with(graph: WorkflowGraph, registry: ActivityRegistry) -> Runner {
    Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        Arc::new(InMemoryNotificationSink::new()),
        Arc::new(InMemoryStateCommitter::new()),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn s1_linear_sequence_traces_each_child_in_order() {
    let root = Activity::new("seq", "Sequence")
        .with_variables(vec![Variable::new("trace", VariableScope::Workflow).with_default(json!([]))])
        .with_children(vec![
            Activity::new("a", "TraceStep").with_input("name", json!("A")),
            Activity::new("b", "TraceStep").with_input("name", json!("B")),
            Activity::new("c", "TraceStep").with_input("name", json!("C")),
        ]);
    let graph = WorkflowGraph::new("s1-linear-sequence", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(TraceStepBehavior));
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let result = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("run should succeed");

    assert_eq!(result.wec.sub_status, WorkflowSubStatus::Finished);
    assert_eq!(result.result, None);
    assert_eq!(
        result.wec.root_register.get_local(&BlockId::new("trace")),
        Some(&json!(["A", "B", "C"]))
    );
    assert!(result.wec.bookmarks.is_empty());
    // Root Sequence AEC plus one per child.
    assert_eq!(result.wec.all_aecs().count(), 4);
    assert!(result.wec.all_aecs().all(|aec| aec.status == ActivityStatus::Completed));
}

fn s2_graph_and_registry() -> (WorkflowGraph, ActivityRegistry) {
    let root = Activity::new("seq", "Sequence")
        .with_variables(vec![
            Variable::new("x", VariableScope::Workflow),
            Variable::new("y", VariableScope::Workflow),
        ])
        .with_children(vec![
            Activity::new("set-x", "SetVariable")
                .with_input("block", json!("x"))
                .with_input("value", json!(1)),
            Activity::new("wait", "Wait").with_input("event", json!("evt")),
            Activity::new("set-y", "SetVariable")
                .with_input("block", json!("y"))
                .with_input("value", json!(2)),
        ]);
    let graph = WorkflowGraph::new("s2-bookmark-suspend-resume", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(SetVariableBehavior))
        .with(Arc::new(WaitBehavior));
    (graph, registry)
}

#[tokio::test]
async fn s2_bookmark_suspend_then_resume() {
    let (graph, registry) = s2_graph_and_registry();
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let first = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("first run should succeed");

    assert_eq!(first.wec.sub_status, WorkflowSubStatus::Suspended);
    assert_eq!(first.wec.root_register.get_local(&BlockId::new("x")), Some(&json!(1)));
    assert_eq!(first.wec.bookmarks.len(), 1);
    let bookmark = first.wec.bookmarks[0].clone();
    assert_eq!(bookmark.name, "evt");

    let resume_options = RunWorkflowOptions::new().with_bookmark(bookmark.id, Some(json!({})));
    let second = runner
        .run(Some(first.workflow_state), resume_options, &cancellation)
        .await
        .expect("resumed run should succeed");

    assert_eq!(second.wec.sub_status, WorkflowSubStatus::Finished);
    assert_eq!(second.wec.root_register.get_local(&BlockId::new("y")), Some(&json!(2)));
    assert!(second.wec.bookmarks.is_empty());
}

#[tokio::test]
async fn s3_fault_propagates_to_root_and_skips_later_siblings() {
    let root = Activity::new("seq", "Sequence").with_children(vec![
        Activity::new("a", "TraceStep").with_input("name", json!("A")),
        Activity::new("throw", "Throw").with_input("message", json!("boom")),
        Activity::new("c", "TraceStep").with_input("name", json!("C")),
    ]);
    let graph = WorkflowGraph::new("s3-fault-propagation", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(TraceStepBehavior))
        .with(Arc::new(ThrowBehavior));
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let result = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("run should succeed even though the workflow faults");

    assert_eq!(result.wec.sub_status, WorkflowSubStatus::Faulted);
    assert_eq!(result.wec.incidents.len(), 1);
    assert!(result.wec.incidents[0].message.contains("boom"));
    assert!(!result
        .wec
        .all_aecs()
        .any(|aec| aec.activity_node_id == "0.2"));
}

#[tokio::test]
async fn s4_parallel_composite_finishes_once_both_children_resume() {
    let root = Activity::new("par", "Parallel").with_children(vec![
        Activity::new("wa", "Wait").with_input("event", json!("a")),
        Activity::new("wb", "Wait").with_input("event", json!("b")),
    ]);
    let graph = WorkflowGraph::new("s4-parallel-composite", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(ParallelBehavior))
        .with(Arc::new(WaitBehavior));
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let first = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("fresh run should succeed");

    assert_eq!(first.wec.sub_status, WorkflowSubStatus::Suspended);
    assert_eq!(first.wec.bookmarks.len(), 2);
    assert!(first.wec.all_aecs().all(|aec| aec.is_executing));

    let bookmark_a = first.wec.bookmarks.iter().find(|b| b.name == "a").cloned().unwrap();
    let bookmark_b = first.wec.bookmarks.iter().find(|b| b.name == "b").cloned().unwrap();

    let second = runner
        .run(
            Some(first.workflow_state),
            RunWorkflowOptions::new().with_bookmark(bookmark_a.id, None),
            &cancellation,
        )
        .await
        .expect("resume by a should succeed");
    assert_eq!(second.wec.bookmarks.len(), 1);
    assert_eq!(second.wec.sub_status, WorkflowSubStatus::Suspended);

    let third = runner
        .run(
            Some(second.workflow_state),
            RunWorkflowOptions::new().with_bookmark(bookmark_b.id, None),
            &cancellation,
        )
        .await
        .expect("resume by b should succeed");
    assert_eq!(third.wec.sub_status, WorkflowSubStatus::Finished);
    assert!(third.wec.bookmarks.is_empty());
}

#[tokio::test]
async fn s5_interrupted_run_resumes_the_one_executing_aec() {
    let root = Activity::new("wait", "Wait").with_input("event", json!("w"));
    let graph = WorkflowGraph::new("s5-interrupted-resumption", 1, root);
    let registry = ActivityRegistry::new().with(Arc::new(WaitBehavior));
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    // Hand-build a `WorkflowState` that looks like the process crashed right
    // after marking the root AEC `Running`, before it created a bookmark or
    // the next turn committed anything — the scheduler queue is already
    // empty, so the runner's only signal that work is outstanding is the
    // `IsExecuting` AEC (SPEC_FULL.md §4.7 step 2d).
    let root_aec_id = uuid::Uuid::now_v7();
    let state = WorkflowState {
        state_format_version: STATE_FORMAT_VERSION,
        instance_id: uuid::Uuid::now_v7(),
        definition_id: "s5-interrupted-resumption".to_string(),
        version: 1,
        tenant_id: None,
        correlation_id: None,
        parent_instance_id: None,
        status: WorkflowStatus::Running,
        sub_status: WorkflowSubStatus::Executing,
        input: HashMap::new(),
        output: HashMap::new(),
        properties: HashMap::new(),
        variables: HashMap::new(),
        activity_execution_contexts: vec![PersistedAec {
            id: root_aec_id,
            activity_node_id: "0".to_string(),
            parent_id: None,
            status: ActivityStatus::Running,
            properties: HashMap::new(),
            input: HashMap::new(),
            output: HashMap::new(),
            local_variable_values: HashMap::new(),
            tag: None,
            is_executing: true,
            started_at: chrono::Utc::now(),
            completed_at: None,
        }],
        bookmarks: vec![],
        incidents: vec![],
        scheduler: vec![],
        execution_log: vec![],
    };

    let result = runner
        .run(Some(state), RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("resuming the interrupted run should succeed");

    assert_eq!(result.wec.sub_status, WorkflowSubStatus::Finished);
    assert!(!result.wec.all_aecs().any(|aec| aec.is_executing));
}

#[tokio::test]
async fn failing_committer_surfaces_as_an_error_from_run() {
    let root = Activity::new("seq", "Sequence").with_children(vec![
        Activity::new("a", "TraceStep").with_input("name", json!("A")),
    ]);
    let graph = WorkflowGraph::new("failing-committer", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(TraceStepBehavior));
    let runner = Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        Arc::new(InMemoryNotificationSink::new()),
        Arc::new(FailingCommitter),
        EngineConfig::default(),
    );
    let cancellation = CancellationToken::new();

    let err = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect_err("a failing committer should surface as a run error");
    assert!(err.to_string().contains("commit sink unavailable"));
}

#[tokio::test]
async fn notifications_fire_workflow_finished_distinct_from_workflow_executed() {
    let root = Activity::new("seq", "Sequence")
        .with_children(vec![Activity::new("a", "TraceStep").with_input("name", json!("A"))]);
    let graph = WorkflowGraph::new("notifications-finished-vs-executed", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(TraceStepBehavior));
    let sink = Arc::new(InMemoryNotificationSink::new());
    let runner = Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        sink.clone(),
        Arc::new(InMemoryStateCommitter::new()),
        EngineConfig::default(),
    );
    let cancellation = CancellationToken::new();

    let result = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("run should succeed");
    assert_eq!(result.wec.sub_status, WorkflowSubStatus::Finished);

    let events = sink.events();
    let finished_at = events
        .iter()
        .position(|e| matches!(e, LifecycleEvent::WorkflowFinished { .. }))
        .expect("a WorkflowFinished event should have fired");
    let executed_at = events
        .iter()
        .position(|e| matches!(e, LifecycleEvent::WorkflowExecuted { .. }))
        .expect("a WorkflowExecuted event should have fired");
    assert!(
        finished_at < executed_at,
        "WorkflowFinished should fire before WorkflowExecuted, got {events:?}"
    );
    assert!(matches!(events.first(), Some(LifecycleEvent::WorkflowExecuting { .. })));
    assert!(matches!(events.get(1), Some(LifecycleEvent::WorkflowStarted { .. })));
}

#[tokio::test]
async fn s2_bookmark_auto_complete_skips_the_behavior_callback() {
    let root = Activity::new("wait", "AutoCompleteWait").with_input("event", json!("w"));
    let graph = WorkflowGraph::new("auto-complete-bookmark", 1, root);
    let registry = ActivityRegistry::new().with(Arc::new(AutoCompleteWaitBehavior));
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let first = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("first run should suspend at the bookmark");
    assert_eq!(first.wec.sub_status, WorkflowSubStatus::Suspended);
    assert_eq!(first.wec.bookmarks.len(), 1);
    let bookmark_id = first.wec.bookmarks[0].id;

    let resume_options = RunWorkflowOptions::new().with_bookmark(bookmark_id, None);
    let second = runner
        .run(Some(first.workflow_state), resume_options, &cancellation)
        .await
        .expect("resumed run should succeed without invoking the behavior callback again");

    assert_eq!(second.wec.sub_status, WorkflowSubStatus::Finished);
    assert!(second.wec.incidents.is_empty());
}

#[tokio::test]
async fn storage_driven_variable_delegates_to_the_registered_store() {
    let root = Activity::new("seq", "Sequence")
        .with_variables(vec![
            Variable::new("x", VariableScope::Workflow).with_storage_driver("external"),
        ])
        .with_children(vec![
            Activity::new("set-x", "SetVariable")
                .with_input("block", json!("x"))
                .with_input("value", json!(42)),
        ]);
    let graph = WorkflowGraph::new("storage-driven-variable", 1, root);
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(SetVariableBehavior));
    let store = Arc::new(InMemoryVariableStore::new());
    let variable_stores = VariableStoreRegistry::new().with("external", store.clone());
    let runner = Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        Arc::new(InMemoryNotificationSink::new()),
        Arc::new(InMemoryStateCommitter::new()),
        EngineConfig::default(),
    )
    .with_variable_stores(variable_stores);
    let cancellation = CancellationToken::new();

    let result = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("run should succeed");

    assert_eq!(result.wec.sub_status, WorkflowSubStatus::Finished);
    // `x` is declared `storage_driver: "external"`, so it never lands in the
    // in-memory root register at all — it only ever exists in the store.
    assert_eq!(result.wec.root_register.get_local(&BlockId::new("x")), None);
    assert_eq!(
        store.get("x").await.expect("store get should succeed"),
        Some(json!(42))
    );
}

#[tokio::test]
async fn s6_extract_apply_round_trips_a_suspended_run() {
    let (graph, registry) = s2_graph_and_registry();
    let definition_id = graph.definition_id.clone();
    let version = graph.version;
    let runner = runner_with(graph, registry);
    let cancellation = CancellationToken::new();

    let first = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await
        .expect("first run should suspend at the bookmark");
    assert_eq!(first.wec.sub_status, WorkflowSubStatus::Suspended);

    let bytes = serde_json::to_vec(&first.workflow_state).expect("state should serialize");
    let decoded: WorkflowState = serde_json::from_slice(&bytes).expect("state should deserialize");

    let graph_for_apply = WorkflowGraph::new(definition_id, version, runner.graph().root().clone());
    let rehydrated = state::apply(decoded, &graph_for_apply).expect("apply should succeed");

    assert_eq!(rehydrated.sub_status, first.wec.sub_status);
    assert_eq!(rehydrated.bookmarks.len(), first.wec.bookmarks.len());
    assert_eq!(rehydrated.all_aecs().count(), first.wec.all_aecs().count());
    assert_eq!(
        rehydrated.root_register.get_local(&BlockId::new("x")),
        first.wec.root_register.get_local(&BlockId::new("x"))
    );
}
