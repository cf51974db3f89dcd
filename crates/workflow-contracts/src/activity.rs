// Activity and Workflow Graph data model
//
// Activities are immutable during execution: the graph built here is shared
// (read-only) across every run of the workflow definition it materializes.
// Dispatch to the behavior that actually runs an activity of a given `kind`
// is resolved at runtime by the engine (see workflow_core::registry), not
// modeled here - this crate only knows the shape of the tree.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::NodeId;
use crate::variable::Variable;

/// A registered activity type name, e.g. `"Sequence"`, `"Wait"`, `"SetVariable"`.
/// Dispatch to a behavior implementation happens by this tag, not by downcasting.
pub type ActivityKind = String;

/// An addressable node in a workflow definition.
///
/// Activities are values, not trait objects: the tree is plain data so it can
/// be constructed, indexed, and serialized without touching the engine. The
/// engine resolves `kind` against a registry of behaviors at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Stable identifier declared by the workflow author (unique within the graph).
    pub id: String,
    /// Registered type tag used for runtime dispatch.
    pub kind: ActivityKind,
    /// Optional free-form tag for lookup (`WorkflowGraph::by_tag`).
    #[serde(default)]
    pub tag: Option<String>,
    /// Declared input expressions/literals, keyed by port name.
    #[serde(default)]
    pub input: HashMap<String, serde_json::Value>,
    /// Declared output port names this activity may populate.
    #[serde(default)]
    pub output_ports: Vec<String>,
    /// Child activities, in declaration order. Composite activities schedule
    /// these (entirely, a subset, or none) when executed.
    #[serde(default)]
    pub children: Vec<Activity>,
    /// Declared variables scoped to this activity and its descendants.
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Activity {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            tag: None,
            input: HashMap::new(),
            output_ports: Vec::new(),
            children: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Activity>) -> Self {
        self.children = children;
        self
    }

    pub fn with_input(mut self, port: impl Into<String>, value: serde_json::Value) -> Self {
        self.input.insert(port.into(), value);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_variables(mut self, variables: Vec<Variable>) -> Self {
        self.variables = variables;
        self
    }
}

/// An entry in one of `WorkflowGraph`'s lookup indices.
#[derive(Debug, Clone)]
struct IndexedActivity {
    node_id: NodeId,
}

/// The materialized form of a workflow: the root activity plus indices
/// allowing lookup by `Id`, by `NodeId`, by `Type` (kind), and by `Tag`.
///
/// Built once per workflow definition and reused across every run - the
/// index pass walks the tree a single time at construction.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    pub definition_id: String,
    pub version: u32,
    root: Activity,
    by_node_id: HashMap<NodeId, IndexedActivity>,
    by_activity_id: HashMap<String, NodeId>,
    by_kind: HashMap<ActivityKind, Vec<NodeId>>,
    by_tag: HashMap<String, Vec<NodeId>>,
}

impl WorkflowGraph {
    /// Build a graph from a root activity, indexing the whole tree eagerly.
    pub fn new(definition_id: impl Into<String>, version: u32, root: Activity) -> Self {
        let mut graph = Self {
            definition_id: definition_id.into(),
            version,
            root,
            by_node_id: HashMap::new(),
            by_activity_id: HashMap::new(),
            by_kind: HashMap::new(),
            by_tag: HashMap::new(),
        };
        graph.reindex();
        graph
    }

    /// Recompute all lookup indices from the current tree. Called once at
    /// construction; exposed for callers that mutate `root_mut` directly
    /// (definition-time authoring, not execution-time - activities are
    /// immutable once a run starts).
    pub fn reindex(&mut self) {
        self.by_node_id.clear();
        self.by_activity_id.clear();
        self.by_kind.clear();
        self.by_tag.clear();
        let root = self.root.clone();
        Self::index_node(
            &root,
            "0".to_string(),
            &mut self.by_node_id,
            &mut self.by_activity_id,
            &mut self.by_kind,
            &mut self.by_tag,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn index_node(
        activity: &Activity,
        node_id: NodeId,
        by_node_id: &mut HashMap<NodeId, IndexedActivity>,
        by_activity_id: &mut HashMap<String, NodeId>,
        by_kind: &mut HashMap<ActivityKind, Vec<NodeId>>,
        by_tag: &mut HashMap<String, Vec<NodeId>>,
    ) {
        by_node_id.insert(
            node_id.clone(),
            IndexedActivity {
                node_id: node_id.clone(),
            },
        );
        by_activity_id.insert(activity.id.clone(), node_id.clone());
        by_kind
            .entry(activity.kind.clone())
            .or_default()
            .push(node_id.clone());
        if let Some(tag) = &activity.tag {
            by_tag.entry(tag.clone()).or_default().push(node_id.clone());
        }
        for (i, child) in activity.children.iter().enumerate() {
            let child_node_id = format!("{node_id}.{i}");
            Self::index_node(
                child,
                child_node_id,
                by_node_id,
                by_activity_id,
                by_kind,
                by_tag,
            );
        }
    }

    pub fn root(&self) -> &Activity {
        &self.root
    }

    pub fn root_node_id(&self) -> NodeId {
        "0".to_string()
    }

    /// Resolve an activity by its path-based `NodeId`.
    pub fn by_node_id(&self, node_id: &str) -> Option<&Activity> {
        self.by_node_id.get(node_id)?;
        self.resolve_path(node_id)
    }

    /// Resolve an activity by the author-declared `Activity::id`.
    pub fn by_activity_id(&self, id: &str) -> Option<(NodeId, &Activity)> {
        let node_id = self.by_activity_id.get(id)?;
        self.resolve_path(node_id).map(|a| (node_id.clone(), a))
    }

    /// All node ids of activities registered under the given `kind`.
    pub fn by_kind(&self, kind: &str) -> &[NodeId] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All node ids of activities carrying the given tag.
    pub fn by_tag(&self, tag: &str) -> &[NodeId] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The `Variable` declared by the activity at `node_id` named
    /// `block_name`, if any. Used to resolve a block's `storage_driver` (or
    /// its scope, for persistence filtering) without the caller walking the
    /// tree itself.
    pub fn declaring_variable(&self, node_id: &str, block_name: &str) -> Option<&Variable> {
        self.by_node_id(node_id)?
            .variables
            .iter()
            .find(|v| v.name == block_name)
    }

    fn resolve_path(&self, node_id: &str) -> Option<&Activity> {
        let mut segments = node_id.split('.');
        segments.next()?; // root segment "0"
        let mut current = &self.root;
        for seg in segments {
            let idx: usize = seg.parse().ok()?;
            current = current.children.get(idx)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph() -> WorkflowGraph {
        let root = Activity::new("seq", "Sequence").with_children(vec![
            Activity::new("a", "SetVariable").with_tag("first"),
            Activity::new("b", "Wait"),
            Activity::new("c", "SetVariable"),
        ]);
        WorkflowGraph::new("def-1", 1, root)
    }

    #[test]
    fn indexes_by_node_id() {
        let graph = sample_graph();
        assert_eq!(graph.by_node_id("0").unwrap().id, "seq");
        assert_eq!(graph.by_node_id("0.1").unwrap().id, "b");
    }

    #[test]
    fn indexes_by_activity_id() {
        let graph = sample_graph();
        let (node_id, activity) = graph.by_activity_id("c").unwrap();
        assert_eq!(node_id, "0.2");
        assert_eq!(activity.kind, "SetVariable");
    }

    #[test]
    fn indexes_by_kind_and_tag() {
        let graph = sample_graph();
        assert_eq!(graph.by_kind("SetVariable"), ["0.0", "0.2"]);
        assert_eq!(graph.by_tag("first"), ["0.0"]);
    }
}
