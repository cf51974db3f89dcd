// Engine-level configuration: tunables that are not per-run options.
//
// Per-run intent (seeding, variables, fault strategy for that call) lives on
// `RunWorkflowOptions` instead; this is the handful of knobs a host sets
// once per `Runner` instance.

use serde::{Deserialize, Serialize};

use workflow_contracts::{FaultStrategy, STATE_FORMAT_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fault strategy applied when a run's options do not specify one.
    pub default_fault_strategy: FaultStrategy,
    /// Whether to run `WorkflowExecutionContext::compact` after each
    /// activity finishes, rather than only once at the end of the turn.
    pub compact_after_each_activity: bool,
    /// Newest `StateFormatVersion` this engine's `Applicator` accepts.
    pub state_format_version: u32,
    /// Upper bound on activities drained in a single turn, guarding against
    /// a misbehaving composite scheduling itself indefinitely. `None` means
    /// unbounded.
    pub max_activities_per_turn: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fault_strategy: FaultStrategy::default(),
            compact_after_each_activity: false,
            state_format_version: STATE_FORMAT_VERSION,
            max_activities_per_turn: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Fluent builder mirroring the rest of this codebase's config builders.
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_fault_strategy(mut self, strategy: FaultStrategy) -> Self {
        self.config.default_fault_strategy = strategy;
        self
    }

    pub fn compact_after_each_activity(mut self, value: bool) -> Self {
        self.config.compact_after_each_activity = value;
        self
    }

    pub fn max_activities_per_turn(mut self, max: usize) -> Self {
        self.config.max_activities_per_turn = Some(max);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}
