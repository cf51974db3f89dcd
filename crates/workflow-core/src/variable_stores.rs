// VariableStoreRegistry: resolves a Variable's `storage_driver` name to its
// external key-value store (SPEC_FULL.md §4.1), mirroring how
// `ActivityRegistry` resolves an `Activity::kind` to its behavior.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::traits::VariableStore;

#[derive(Clone, Default)]
pub struct VariableStoreRegistry {
    stores: HashMap<String, Arc<dyn VariableStore>>,
}

impl VariableStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: impl Into<String>, store: Arc<dyn VariableStore>) {
        self.stores.insert(driver.into(), store);
    }

    pub fn with(mut self, driver: impl Into<String>, store: Arc<dyn VariableStore>) -> Self {
        self.register(driver, store);
        self
    }

    pub fn resolve(&self, driver: &str) -> Result<Arc<dyn VariableStore>> {
        self.stores
            .get(driver)
            .cloned()
            .ok_or_else(|| EngineError::variable_store_not_found(driver))
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.stores.contains_key(driver)
    }
}

impl std::fmt::Debug for VariableStoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStoreRegistry")
            .field("drivers", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}
