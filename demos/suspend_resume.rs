//! Suspend/Resume Demo - a `Wait` activity parking on a bookmark, then a
//! second `Runner::run` call resuming it by that bookmark's id.
//!
//! The loop:
//! 1. **Run**: drive the workflow until it suspends on `Wait`.
//! 2. **Persist**: the first call's `RunResult::workflow_state` is what a
//!    host would hand to its own storage between these two steps.
//! 3. **Resume**: feed the persisted state and the bookmark id back in.
//!
//! Run with: cargo run -p workflow-demos --bin suspend_resume

use std::sync::Arc;

use serde_json::json;

use workflow_contracts::{Activity, BlockId, RunWorkflowOptions, Variable, VariableScope, WorkflowGraph};
use workflow_core::testing::{
    InMemoryIdGenerator, InMemoryStateCommitter, NoOpNotificationSink, SequenceBehavior,
    SetVariableBehavior, WaitBehavior,
};
use workflow_core::{ActivityRegistry, CancellationToken, EngineConfig, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Suspend/Resume (workflow-core) ===\n");

    let root = Activity::new("approval", "Sequence")
        .with_variables(vec![Variable::new("decision", VariableScope::Workflow)])
        .with_children(vec![
            Activity::new("wait-for-approval", "Wait").with_input("event", json!("approval-received")),
            Activity::new("record-decision", "SetVariable")
                .with_input("block", json!("decision"))
                .with_input("value", json!("approved")),
        ]);
    let graph = WorkflowGraph::new("suspend-resume-demo", 1, root);

    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(WaitBehavior))
        .with(Arc::new(SetVariableBehavior));

    let runner = Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        Arc::new(NoOpNotificationSink),
        Arc::new(InMemoryStateCommitter::new()),
        EngineConfig::default(),
    );
    let cancellation = CancellationToken::new();

    let first = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await?;
    println!("after first run: {:?}", first.wec.sub_status);

    let bookmark = first
        .wec
        .bookmarks
        .first()
        .cloned()
        .expect("Wait should have created a bookmark");
    println!("suspended on bookmark {:?} (\"{}\")", bookmark.id, bookmark.name);

    let resume_options = RunWorkflowOptions::new().with_bookmark(bookmark.id, Some(json!({"approved_by": "demo"})));
    let second = runner
        .run(Some(first.workflow_state), resume_options, &cancellation)
        .await?;

    println!("after resume: {:?}", second.wec.sub_status);
    println!(
        "decision: {:?}",
        second.wec.root_register.get_local(&BlockId::new("decision"))
    );

    Ok(())
}
