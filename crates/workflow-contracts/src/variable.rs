// Variable declarations and memory block metadata

use serde::{Deserialize, Serialize};

/// Storage scope declared for a variable at definition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    /// Visible for the lifetime of the workflow instance.
    Workflow,
    /// Visible only within the declaring activity and its descendants.
    Local,
    /// Not persisted across turns; dropped at the end of the turn that wrote it.
    Transient,
}

/// Whether a memory block was declared by the workflow definition or created
/// on the fly by a dynamic write (see `RunWorkflowOptions::variables` and
/// `MemoryRegister::set`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Declared,
    Dynamic,
}

/// A named slot declared on an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub scope: VariableScope,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    /// Name of an external storage driver this variable delegates `Get`/`Set`
    /// to, if any. The engine does not implement drivers; it resolves them by
    /// name via an injected registry (see `workflow_core::variable_stores`).
    #[serde(default)]
    pub storage_driver: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, scope: VariableScope) -> Self {
        Self {
            name: name.into(),
            scope,
            default_value: None,
            storage_driver: None,
        }
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_storage_driver(mut self, driver: impl Into<String>) -> Self {
        self.storage_driver = Some(driver.into());
        self
    }
}
