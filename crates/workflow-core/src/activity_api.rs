// The surface an ActivityBehavior::execute callback is given to read its
// input, write variables, suspend, or schedule children (SPEC_FULL.md §4.2).

use workflow_contracts::{
    AecId, Activity, Bookmark, BlockId, BookmarkOptions, NodeId, WorkItem, WorkflowGraph,
};

use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::traits::IdGenerator;
use crate::variable_stores::VariableStoreRegistry;
use crate::wec::WorkflowExecutionContext;

/// Borrowed view into the running turn, scoped to one AEC. Constructed fresh
/// by the drain loop for each activity callback invocation; never stored
/// past the call.
pub struct ActivityApi<'a> {
    wec: &'a mut WorkflowExecutionContext,
    graph: &'a WorkflowGraph,
    variable_stores: &'a VariableStoreRegistry,
    aec_id: AecId,
    id_gen: &'a dyn IdGenerator,
    /// Whether this invocation is resuming an already-live AEC rather than
    /// starting a fresh one.
    resumed: bool,
    /// Resumption payload carried by the `WorkItem` (e.g. a bookmark's
    /// payload), if any.
    trigger_input: Option<serde_json::Value>,
}

impl<'a> ActivityApi<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wec: &'a mut WorkflowExecutionContext,
        graph: &'a WorkflowGraph,
        variable_stores: &'a VariableStoreRegistry,
        aec_id: AecId,
        id_gen: &'a dyn IdGenerator,
        resumed: bool,
        trigger_input: Option<serde_json::Value>,
    ) -> Self {
        Self {
            wec,
            graph,
            variable_stores,
            aec_id,
            id_gen,
            resumed,
            trigger_input,
        }
    }

    /// This AEC's position in the graph.
    pub fn node_id(&self) -> NodeId {
        self.wec
            .aec(self.aec_id)
            .map(|a| a.activity_node_id.clone())
            .unwrap_or_default()
    }

    /// The activity definition this AEC is executing.
    pub fn activity(&self) -> Option<&'a Activity> {
        self.graph.by_node_id(&self.node_id())
    }

    /// Node ids of this activity's declared children, in declaration order.
    pub fn child_node_ids(&self) -> Vec<NodeId> {
        let node_id = self.node_id();
        self.activity()
            .map(|a| (0..a.children.len()).map(|i| format!("{node_id}.{i}")).collect())
            .unwrap_or_default()
    }

    pub fn aec_id(&self) -> AecId {
        self.aec_id
    }

    pub fn resumed(&self) -> bool {
        self.resumed
    }

    pub fn trigger_input(&self) -> Option<&serde_json::Value> {
        self.trigger_input.as_ref()
    }

    pub fn input(&self, port: &str) -> Option<&serde_json::Value> {
        self.wec.aec(self.aec_id)?.input.get(port)
    }

    pub fn set_output(&mut self, name: impl Into<String>, value: serde_json::Value) -> Result<()> {
        self.wec.require_aec_mut(self.aec_id)?.set_output(name, value);
        Ok(())
    }

    pub async fn get_variable(&self, block_id: &BlockId) -> Result<Option<serde_json::Value>> {
        self.wec
            .get_variable(self.graph, self.variable_stores, self.aec_id, block_id)
            .await
    }

    pub async fn set_variable(&mut self, block_id: BlockId, value: serde_json::Value) -> Result<()> {
        self.wec
            .set_variable(self.graph, self.variable_stores, self.aec_id, block_id, value)
            .await
    }

    /// Create a bookmark owned by this AEC, fully configured by `options`
    /// before it is ever recorded on the WEC. Does not itself suspend the
    /// AEC — most callers also return without calling `complete`, which the
    /// drain loop interprets as a suspend (see `pipeline.rs`).
    pub fn create_bookmark(
        &mut self,
        name: impl Into<String>,
        payload: Option<serde_json::Value>,
        options: BookmarkOptions,
    ) -> Bookmark {
        let node_id = self
            .wec
            .aec(self.aec_id)
            .map(|a| a.activity_node_id.clone())
            .unwrap_or_default();
        let bookmark = Bookmark::with_options(node_id, self.aec_id, name, payload, options);
        self.wec.add_bookmark(bookmark.clone());
        bookmark
    }

    /// Schedule a child activity under this AEC. `prepend` gives the
    /// depth-first, stack-like ordering composites rely on (SPEC_FULL.md
    /// §4.3). The child's AEC is minted by the drain loop when the work item
    /// is popped, not here.
    pub fn schedule_child(
        &mut self,
        child_node_id: impl Into<String>,
        tag: Option<String>,
        prepend: bool,
    ) {
        let child_node_id = child_node_id.into();
        let item = WorkItem::start(child_node_id, Some(self.aec_id));
        let item = match tag {
            Some(tag) => item.with_tag(tag),
            None => item,
        };
        if prepend {
            self.scheduler_mut().prepend(item);
        } else {
            self.scheduler_mut().schedule(item);
        }
    }

    /// Schedule several children at once, front-to-back in the given order,
    /// ahead of any sibling work already queued (used by `Parallel`).
    pub fn schedule_children(&mut self, child_node_ids: impl IntoIterator<Item = NodeId>) {
        let owner = self.aec_id;
        let items = child_node_ids
            .into_iter()
            .map(|node_id| WorkItem::start(node_id, Some(owner)));
        self.scheduler_mut().schedule_many_prepend(items);
    }

    /// Mint a fresh identifier via the injected generator, for callers that
    /// need one ahead of scheduling (e.g. pre-registering a bookmark target).
    pub fn new_id(&self) -> uuid::Uuid {
        self.id_gen.new_id()
    }

    /// Mark this AEC `Completed`. An activity that returns `Ok(())` without
    /// calling this stays `is_executing=true` — suspended, awaiting a
    /// bookmark resumption or scheduled children (SPEC_FULL.md §3, §4.2).
    pub fn complete(&mut self) -> Result<()> {
        self.wec.require_aec_mut(self.aec_id)?.complete();
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.wec.require_aec_mut(self.aec_id)?.cancel();
        Ok(())
    }

    fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.wec.scheduler
    }

    pub fn wec(&self) -> &WorkflowExecutionContext {
        self.wec
    }

    pub fn wec_mut(&mut self) -> &mut WorkflowExecutionContext {
        self.wec
    }
}
