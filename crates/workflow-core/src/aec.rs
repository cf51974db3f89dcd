// Activity Execution Context (SPEC_FULL.md §4.2)

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use workflow_contracts::{AecId, ActivityStatus, BlockId, NodeId};

use crate::register::MemoryRegister;

/// Runtime state for one activity execution. Forest linkage is by id
/// (`parent`), not by reference — the forest lives flattened in
/// `WorkflowExecutionContext::aecs` (see SPEC_FULL.md §9, "Cyclic references").
#[derive(Debug, Clone)]
pub struct ActivityExecutionContext {
    pub id: AecId,
    pub activity_node_id: NodeId,
    pub parent: Option<AecId>,
    pub children: Vec<AecId>,
    pub status: ActivityStatus,
    pub properties: HashMap<String, serde_json::Value>,
    pub input: HashMap<String, serde_json::Value>,
    pub output: HashMap<String, serde_json::Value>,
    pub register: MemoryRegister,
    /// Bookmark ids this AEC owns, so they can be swept on completion
    /// depending on each bookmark's `auto_burn` setting.
    pub bookmarks: Vec<uuid::Uuid>,
    pub tag: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// True until this AEC reaches a terminal status. Stays true across
    /// suspension (a bookmark or scheduled children with no explicit
    /// `complete()` call) — it only goes false when the activity callback
    /// itself calls `complete`/`fault`/`cancel` on its `ActivityApi`. This is
    /// what lets the runner find and resume interrupted AECs on reload
    /// (SPEC_FULL.md §4.7(d)).
    pub is_executing: bool,
}

impl ActivityExecutionContext {
    pub fn new(id: AecId, activity_node_id: impl Into<String>, parent: Option<AecId>) -> Self {
        Self {
            id,
            activity_node_id: activity_node_id.into(),
            parent,
            children: Vec::new(),
            status: ActivityStatus::Pending,
            properties: HashMap::new(),
            input: HashMap::new(),
            output: HashMap::new(),
            register: MemoryRegister::new(),
            bookmarks: Vec::new(),
            tag: None,
            started_at: Utc::now(),
            completed_at: None,
            is_executing: true,
        }
    }

    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag;
        self
    }

    pub fn mark_running(&mut self) {
        self.status = ActivityStatus::Running;
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.output.insert(name.into(), value);
    }

    pub fn get_output(&self, name: &str) -> Option<&serde_json::Value> {
        self.output.get(name)
    }

    /// Mark this AEC completed. Does not touch the scheduler or parent
    /// chain; that orchestration belongs to the pipeline (see `pipeline.rs`),
    /// which needs the WEC to look up the parent AEC.
    pub fn complete(&mut self) {
        self.status = ActivityStatus::Completed;
        self.is_executing = false;
        self.completed_at = Some(Utc::now());
    }

    pub fn fault(&mut self) {
        self.status = ActivityStatus::Faulted;
        self.is_executing = false;
        self.completed_at = Some(Utc::now());
    }

    pub fn cancel(&mut self) {
        self.status = ActivityStatus::Cancelled;
        self.is_executing = false;
        self.completed_at = Some(Utc::now());
    }

    /// No bookmarks and no live children: nothing keeps this AEC around
    /// after it terminates (see `WorkflowExecutionContext::compact`).
    pub fn is_removable(&self) -> bool {
        self.status.is_terminal() && self.bookmarks.is_empty() && self.children.is_empty()
    }

    pub fn declared_block_ids(&self) -> Vec<BlockId> {
        self.register.iter().map(|(id, _)| id.clone()).collect()
    }
}
