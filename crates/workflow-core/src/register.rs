// Memory Register & Variables (SPEC_FULL.md §4.1)
//
// Each AEC and the WEC's root own one of these. Scoping across the AEC
// forest (the "walk from AEC toward root" resolution rule) is implemented in
// `wec.rs`, which is the only place that can see the whole forest; this type
// only knows about the flat block map for a single register.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use workflow_contracts::{BlockId, BlockKind};

/// One entry in a register: the current value plus whether the block was
/// declared by the workflow definition or created dynamically at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub value: serde_json::Value,
    pub kind: BlockKind,
}

/// A single scope's key-value store. `Get`/`Set` as described in the
/// specification are cross-register operations (see
/// `WorkflowExecutionContext::get_variable` / `set_variable`); this type
/// exposes only the local, single-scope primitives they compose from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRegister {
    blocks: HashMap<BlockId, MemoryBlock>,
}

impl MemoryRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a block with an optional default value. Declaring an
    /// already-declared block overwrites its metadata but not callers that
    /// already hold a clone of the old value.
    pub fn declare(&mut self, block_id: BlockId, default_value: Option<serde_json::Value>) {
        self.blocks.insert(
            block_id,
            MemoryBlock {
                value: default_value.unwrap_or(serde_json::Value::Null),
                kind: BlockKind::Declared,
            },
        );
    }

    /// Whether this register (not an ancestor) declares or has bound `block_id`.
    pub fn contains(&self, block_id: &BlockId) -> bool {
        self.blocks.contains_key(block_id)
    }

    pub fn get_local(&self, block_id: &BlockId) -> Option<&serde_json::Value> {
        self.blocks.get(block_id).map(|b| &b.value)
    }

    /// Bind `block_id` in this register. `kind` is `Declared` when the
    /// binding target already declared the block, `Dynamic` when this is a
    /// fresh runtime binding (see SPEC_FULL.md §4.1 and §9's `BlockKind` note).
    pub fn set_local(&mut self, block_id: BlockId, value: serde_json::Value, kind: BlockKind) {
        self.blocks
            .entry(block_id)
            .and_modify(|b| b.value = value.clone())
            .or_insert(MemoryBlock { value, kind });
    }

    /// A fresh, empty register for a new scope. Named to match the
    /// specification's `CreateChild()` operation; resolution of an empty
    /// child register falls through to its ancestor via the AEC forest walk
    /// in `wec.rs`, so "child" here only means "starts with no bindings of
    /// its own", not a literal parent pointer.
    pub fn create_child() -> Self {
        Self::default()
    }

    /// All block ids and values currently bound in this register, e.g. for
    /// extracting into `WorkflowState`.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockId, &serde_json::Value)> {
        self.blocks.iter().map(|(k, v)| (k, &v.value))
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_then_get_local() {
        let mut reg = MemoryRegister::new();
        reg.declare(BlockId::new("x"), Some(serde_json::json!(1)));
        assert_eq!(reg.get_local(&BlockId::new("x")), Some(&serde_json::json!(1)));
    }

    #[test]
    fn set_local_on_undeclared_block_binds_dynamic() {
        let mut reg = MemoryRegister::new();
        assert!(!reg.contains(&BlockId::new("y")));
        reg.set_local(BlockId::new("y"), serde_json::json!(2), BlockKind::Dynamic);
        assert!(reg.contains(&BlockId::new("y")));
        assert_eq!(reg.get_local(&BlockId::new("y")), Some(&serde_json::json!(2)));
    }
}
