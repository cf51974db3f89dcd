// ActivityRegistry: resolves an Activity's `kind` tag to its behavior.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::traits::ActivityBehavior;

#[derive(Clone, Default)]
pub struct ActivityRegistry {
    behaviors: HashMap<String, Arc<dyn ActivityBehavior>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, behavior: Arc<dyn ActivityBehavior>) {
        self.behaviors.insert(behavior.kind().to_string(), behavior);
    }

    pub fn with(mut self, behavior: Arc<dyn ActivityBehavior>) -> Self {
        self.register(behavior);
        self
    }

    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn ActivityBehavior>> {
        self.behaviors
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::activity_not_found(format!("no behavior registered for kind {kind:?}")))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.behaviors.contains_key(kind)
    }
}

impl std::fmt::Debug for ActivityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityRegistry")
            .field("kinds", &self.behaviors.keys().collect::<Vec<_>>())
            .finish()
    }
}
