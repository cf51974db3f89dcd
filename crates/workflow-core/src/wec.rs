// Workflow Execution Context (SPEC_FULL.md §4, data model in §3)

use std::collections::HashMap;

use workflow_contracts::{
    AecId, Bookmark, BlockId, BlockKind, ExecutionLogEntry, Incident, InstanceId, NodeId, Variable,
    VariableScope, WorkflowGraph, WorkflowStatus, WorkflowSubStatus,
};

use crate::aec::ActivityExecutionContext;
use crate::error::{EngineError, Result};
use crate::register::MemoryRegister;
use crate::scheduler::Scheduler;
use crate::variable_stores::VariableStoreRegistry;

/// Per-run runtime state: the AEC forest (flattened, keyed by id), the
/// scheduler queue, bookmarks, incidents, and workflow status. Owns every
/// AEC outright, so navigation between AECs (and from an AEC to the
/// workflow-scoped root register) is always by id lookup through this type,
/// never through an in-memory parent pointer held by the AEC itself.
#[derive(Debug, Clone)]
pub struct WorkflowExecutionContext {
    pub instance_id: InstanceId,
    pub definition_id: String,
    pub version: u32,
    pub tenant_id: Option<String>,
    pub correlation_id: Option<String>,
    pub parent_instance_id: Option<InstanceId>,
    pub status: WorkflowStatus,
    pub sub_status: WorkflowSubStatus,
    pub input: HashMap<String, serde_json::Value>,
    pub output: HashMap<String, serde_json::Value>,
    pub properties: HashMap<String, serde_json::Value>,
    /// Workflow-scoped (`VariableScope::Workflow`) declared variables. Local
    /// (`VariableScope::Local`) variables live on the owning AEC's own
    /// register instead; both are reachable from any AEC via
    /// `get_variable`/`set_variable`, which walk the AEC's parent chain and
    /// fall through to this register once the chain is exhausted.
    pub root_register: MemoryRegister,
    pub root_aec_id: AecId,
    aecs: HashMap<AecId, ActivityExecutionContext>,
    pub bookmarks: Vec<Bookmark>,
    pub incidents: Vec<Incident>,
    pub scheduler: Scheduler,
    pub execution_log: Vec<ExecutionLogEntry>,
}

impl WorkflowExecutionContext {
    pub fn new(
        instance_id: InstanceId,
        definition_id: impl Into<String>,
        version: u32,
        root_aec_id: AecId,
        root_node_id: NodeId,
    ) -> Self {
        let mut aecs = HashMap::new();
        aecs.insert(
            root_aec_id,
            ActivityExecutionContext::new(root_aec_id, root_node_id, None),
        );
        Self {
            instance_id,
            definition_id: definition_id.into(),
            version,
            tenant_id: None,
            correlation_id: None,
            parent_instance_id: None,
            status: WorkflowStatus::Running,
            sub_status: WorkflowSubStatus::Pending,
            input: HashMap::new(),
            output: HashMap::new(),
            properties: HashMap::new(),
            root_register: MemoryRegister::new(),
            root_aec_id,
            aecs,
            bookmarks: Vec::new(),
            incidents: Vec::new(),
            scheduler: Scheduler::new(),
            execution_log: Vec::new(),
        }
    }

    /// An empty WEC with no root AEC inserted yet, for `state::apply` to
    /// populate from a persisted `WorkflowState` (which carries its own
    /// AEC records, including the root's).
    pub fn rehydrate(
        instance_id: InstanceId,
        definition_id: impl Into<String>,
        version: u32,
        root_aec_id: AecId,
    ) -> Self {
        Self {
            instance_id,
            definition_id: definition_id.into(),
            version,
            tenant_id: None,
            correlation_id: None,
            parent_instance_id: None,
            status: WorkflowStatus::Running,
            sub_status: WorkflowSubStatus::Pending,
            input: HashMap::new(),
            output: HashMap::new(),
            properties: HashMap::new(),
            root_register: MemoryRegister::new(),
            root_aec_id,
            aecs: HashMap::new(),
            bookmarks: Vec::new(),
            incidents: Vec::new(),
            scheduler: Scheduler::new(),
            execution_log: Vec::new(),
        }
    }

    pub fn record_log(&mut self, entry: ExecutionLogEntry) {
        self.execution_log.push(entry);
    }

    /// Declare workflow-scoped variables on the root register (called once
    /// while materializing the WEC from the graph's declared `Variable`s).
    /// A variable naming a `storage_driver` is never declared locally at
    /// all — it lives only in the resolved `VariableStore`, never in any
    /// in-memory register (SPEC_FULL.md §4.1).
    pub fn declare_variables(&mut self, variables: &[Variable]) {
        for var in variables {
            if var.scope == VariableScope::Workflow && var.storage_driver.is_none() {
                self.root_register
                    .declare(BlockId::new(var.name.clone()), var.default_value.clone());
            }
        }
    }

    pub fn set_sub_status(&mut self, sub_status: WorkflowSubStatus) {
        self.sub_status = sub_status;
        self.status = sub_status.status();
    }

    pub fn aec(&self, id: AecId) -> Option<&ActivityExecutionContext> {
        self.aecs.get(&id)
    }

    pub fn aec_mut(&mut self, id: AecId) -> Option<&mut ActivityExecutionContext> {
        self.aecs.get_mut(&id)
    }

    pub fn require_aec(&self, id: AecId) -> Result<&ActivityExecutionContext> {
        self.aecs.get(&id).ok_or_else(|| EngineError::context_not_found(id))
    }

    pub fn require_aec_mut(&mut self, id: AecId) -> Result<&mut ActivityExecutionContext> {
        self.aecs
            .get_mut(&id)
            .ok_or_else(|| EngineError::context_not_found(id))
    }

    pub fn all_aecs(&self) -> impl Iterator<Item = &ActivityExecutionContext> {
        self.aecs.values()
    }

    /// Insert a freshly created AEC and link it under its parent.
    pub fn insert_aec(&mut self, aec: ActivityExecutionContext) {
        let id = aec.id;
        if let Some(parent_id) = aec.parent {
            if let Some(parent) = self.aecs.get_mut(&parent_id) {
                parent.children.push(id);
            }
        }
        self.aecs.insert(id, aec);
    }

    /// AECs currently marked `is_executing`, ordered by `started_at`
    /// ascending — the order §4.7(d) requires for resuming an interrupted run.
    pub fn executing_aecs_by_start(&self) -> Vec<AecId> {
        let mut executing: Vec<&ActivityExecutionContext> =
            self.aecs.values().filter(|a| a.is_executing).collect();
        executing.sort_by_key(|a| a.started_at);
        executing.into_iter().map(|a| a.id).collect()
    }

    /// Resolve the value bound to `block_id`, visible from `aec_id`: local
    /// register first, then each ancestor in turn, then the workflow-scoped
    /// root register (SPEC_FULL.md §4.1). If the nearest ancestor that
    /// declares `block_id` names a `storage_driver`, delegates entirely to
    /// the resolved `VariableStore` instead of any in-memory register.
    pub async fn get_variable(
        &self,
        graph: &WorkflowGraph,
        variable_stores: &VariableStoreRegistry,
        aec_id: AecId,
        block_id: &BlockId,
    ) -> Result<Option<serde_json::Value>> {
        if let Some(driver) = self.declaring_storage_driver(graph, aec_id, block_id)? {
            let store = variable_stores.resolve(&driver)?;
            return store.get(block_id.as_str()).await;
        }
        let mut current = Some(aec_id);
        while let Some(id) = current {
            let aec = self.require_aec(id)?;
            if let Some(value) = aec.register.get_local(block_id) {
                return Ok(Some(value.clone()));
            }
            current = aec.parent;
        }
        Ok(self.root_register.get_local(block_id).cloned())
    }

    /// Bind `block_id` to `value`. If the nearest ancestor that declares
    /// `block_id` names a `storage_driver`, delegates entirely to the
    /// resolved `VariableStore`. Otherwise binds in the nearest register
    /// (walking from `aec_id` toward the root, then the workflow root
    /// register) that already declares the block; if none declares it, binds
    /// dynamically in `aec_id`'s own register (SPEC_FULL.md §4.1, §9
    /// "Dynamic variables").
    pub async fn set_variable(
        &mut self,
        graph: &WorkflowGraph,
        variable_stores: &VariableStoreRegistry,
        aec_id: AecId,
        block_id: BlockId,
        value: serde_json::Value,
    ) -> Result<()> {
        if let Some(driver) = self.declaring_storage_driver(graph, aec_id, &block_id)? {
            let store = variable_stores.resolve(&driver)?;
            return store.set(block_id.as_str(), value).await;
        }
        let mut current = Some(aec_id);
        while let Some(id) = current {
            let (declares, parent) = {
                let aec = self.require_aec(id)?;
                (aec.register.contains(&block_id), aec.parent)
            };
            if declares {
                self.aecs
                    .get_mut(&id)
                    .unwrap()
                    .register
                    .set_local(block_id, value, BlockKind::Declared);
                return Ok(());
            }
            current = parent;
        }
        if self.root_register.contains(&block_id) {
            self.root_register
                .set_local(block_id, value, BlockKind::Declared);
            return Ok(());
        }
        self.require_aec_mut(aec_id)?
            .register
            .set_local(block_id, value, BlockKind::Dynamic);
        Ok(())
    }

    /// Walk from `aec_id` toward the root looking for the nearest activity
    /// that declares `block_id` as one of its own `Variable`s, and return its
    /// `storage_driver` name if set. Mirrors the declaring-scope precedence
    /// `get_variable`/`set_variable` use for in-memory registers, so a
    /// storage-driven variable and a plain one compose under the same
    /// lexical-scoping rule.
    fn declaring_storage_driver(
        &self,
        graph: &WorkflowGraph,
        aec_id: AecId,
        block_id: &BlockId,
    ) -> Result<Option<String>> {
        let mut current = Some(aec_id);
        while let Some(id) = current {
            let aec = self.require_aec(id)?;
            if let Some(var) = graph.declaring_variable(&aec.activity_node_id, block_id.as_str()) {
                return Ok(var.storage_driver.clone());
            }
            current = aec.parent;
        }
        Ok(None)
    }

    /// Seed dynamic variables from `options.variables` onto the root AEC
    /// without shadowing declared blocks lower in the tree (§4.7 step 3):
    /// this always targets the root AEC's own register directly rather than
    /// going through the declaring-register search in `set_variable`.
    pub fn seed_root_dynamic_variables(&mut self, variables: HashMap<String, serde_json::Value>) {
        let root_id = self.root_aec_id;
        let root = self.aecs.get_mut(&root_id).expect("root AEC always present");
        for (name, value) in variables {
            root.register
                .set_local(BlockId::new(name), value, BlockKind::Dynamic);
        }
    }

    pub fn add_bookmark(&mut self, bookmark: Bookmark) {
        if let Some(owner) = self.aecs.get_mut(&bookmark.activity_instance_id) {
            owner.bookmarks.push(bookmark.id);
        }
        self.bookmarks.push(bookmark);
    }

    pub fn find_bookmark(&self, bookmark_id: uuid::Uuid) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == bookmark_id)
    }

    /// Remove a bookmark (resumed, or burned on owner completion).
    pub fn remove_bookmark(&mut self, bookmark_id: uuid::Uuid) {
        if let Some(pos) = self.bookmarks.iter().position(|b| b.id == bookmark_id) {
            let bookmark = self.bookmarks.remove(pos);
            if let Some(owner) = self.aecs.get_mut(&bookmark.activity_instance_id) {
                owner.bookmarks.retain(|id| *id != bookmark_id);
            }
        }
    }

    /// Burn every `auto_burn` bookmark owned by `aec_id`, typically called
    /// right after that AEC completes.
    pub fn burn_auto_bookmarks(&mut self, aec_id: AecId) {
        let to_burn: Vec<uuid::Uuid> = self
            .bookmarks
            .iter()
            .filter(|b| b.activity_instance_id == aec_id && b.auto_burn)
            .map(|b| b.id)
            .collect();
        for id in to_burn {
            self.remove_bookmark(id);
        }
    }

    pub fn record_incident(&mut self, incident: Incident) {
        self.incidents.push(incident);
    }

    /// Remove AECs that are terminal, bookmark-free, and childless, and
    /// detach them from any parent's child list. Supplemental operation
    /// named but not specified in detail by the distilled specification
    /// (SPEC_FULL.md §10).
    pub fn compact(&mut self) {
        let removable: Vec<AecId> = self
            .aecs
            .values()
            .filter(|a| a.id != self.root_aec_id && a.is_removable())
            .map(|a| a.id)
            .collect();
        for id in &removable {
            if let Some(aec) = self.aecs.remove(id) {
                if let Some(parent_id) = aec.parent {
                    if let Some(parent) = self.aecs.get_mut(&parent_id) {
                        parent.children.retain(|c| c != id);
                    }
                }
            }
        }
    }
}
