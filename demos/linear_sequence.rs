//! Linear Sequence Demo - a three-step `Sequence` run to completion.
//!
//! No persistence, no bookmarks, just the scheduler draining a turn.
//!
//! Run with: cargo run -p workflow-demos --bin linear_sequence

use std::sync::Arc;

use serde_json::json;

use workflow_contracts::{Activity, BlockId, RunWorkflowOptions, Variable, VariableScope, WorkflowGraph};
use workflow_core::testing::{
    InMemoryIdGenerator, InMemoryStateCommitter, NoOpNotificationSink, SequenceBehavior,
    TraceStepBehavior,
};
use workflow_core::{ActivityRegistry, CancellationToken, EngineConfig, Runner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Linear Sequence (workflow-core) ===\n");

    // 1. Build the workflow graph: Sequence[A, B, C], sharing a `trace` list.
    let root = Activity::new("greet", "Sequence")
        .with_variables(vec![Variable::new("trace", VariableScope::Workflow).with_default(json!([]))])
        .with_children(vec![
            Activity::new("a", "TraceStep").with_input("name", json!("fetch")),
            Activity::new("b", "TraceStep").with_input("name", json!("transform")),
            Activity::new("c", "TraceStep").with_input("name", json!("publish")),
        ]);
    let graph = WorkflowGraph::new("linear-sequence-demo", 1, root);

    // 2. Register the behaviors this graph's activity kinds dispatch to.
    let registry = ActivityRegistry::new()
        .with(Arc::new(SequenceBehavior))
        .with(Arc::new(TraceStepBehavior));

    // 3. Stand up in-memory collaborators - no real database or bus.
    let runner = Runner::new(
        graph,
        registry,
        Arc::new(InMemoryIdGenerator),
        Arc::new(NoOpNotificationSink),
        Arc::new(InMemoryStateCommitter::new()),
        EngineConfig::default(),
    );

    // 4. Run to completion in one call - nothing in this graph suspends.
    let cancellation = CancellationToken::new();
    let result = runner
        .run(None, RunWorkflowOptions::new(), &cancellation)
        .await?;

    println!("sub_status: {:?}", result.wec.sub_status);
    println!(
        "trace: {:?}",
        result.wec.root_register.get_local(&BlockId::new("trace"))
    );

    Ok(())
}
