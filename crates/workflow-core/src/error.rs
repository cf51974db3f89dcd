// Error types for the workflow execution engine

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors the engine can surface to a caller or activity implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Resumption targeted an activity not present in the graph.
    #[error("activity not found: {0}")]
    ActivityNotFound(String),

    /// Resumption targeted an AEC id not present in state.
    #[error("activity execution context not found: {0}")]
    ContextNotFound(Uuid),

    /// `BookmarkId` did not match any persisted bookmark.
    #[error("bookmark not found: {0}")]
    BookmarkNotFound(Uuid),

    /// Persisted state is newer than this engine's known schema format.
    #[error("state format version {found} is newer than the supported version {supported}")]
    StateVersionMismatch { found: u32, supported: u32 },

    /// An activity callback faulted.
    #[error("activity fault: {0}")]
    ActivityFault(String),

    /// Scheduling an activity not reachable in the graph.
    #[error("schedule rejected: {0}")]
    ScheduleRejected(String),

    /// A `Variable` named a `storage_driver` with no matching entry in the
    /// `VariableStoreRegistry` the `Runner` was built with.
    #[error("no variable store registered for driver {0:?}")]
    VariableStoreNotFound(String),

    /// Caller supplied a combination of seeding options the runner refuses
    /// to disambiguate (e.g. both `BookmarkId` and `ActivityHandle`).
    #[error("invalid seeding options: {0}")]
    InvalidSeedingOptions(String),

    /// Error from an injected collaborator (id generator, notification sink,
    /// state committer) whose failure mode is not modeled structurally here.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn activity_not_found(handle: impl Into<String>) -> Self {
        EngineError::ActivityNotFound(handle.into())
    }

    pub fn context_not_found(aec_id: Uuid) -> Self {
        EngineError::ContextNotFound(aec_id)
    }

    pub fn bookmark_not_found(bookmark_id: Uuid) -> Self {
        EngineError::BookmarkNotFound(bookmark_id)
    }

    pub fn activity_fault(message: impl Into<String>) -> Self {
        EngineError::ActivityFault(message.into())
    }

    pub fn schedule_rejected(message: impl Into<String>) -> Self {
        EngineError::ScheduleRejected(message.into())
    }

    pub fn variable_store_not_found(driver: impl Into<String>) -> Self {
        EngineError::VariableStoreNotFound(driver.into())
    }

    pub fn invalid_seeding_options(message: impl Into<String>) -> Self {
        EngineError::InvalidSeedingOptions(message.into())
    }
}
