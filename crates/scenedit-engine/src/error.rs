use scenedit_common::{EntityId, ValidationError};

/// A table row and its feature disagree.
///
/// Edits and deletes write both views in one step, so this only appears when
/// the loaded data was already inconsistent or a bug broke the dual write.
/// It is not recoverable: callers must stop mutating and reload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("table `{table}` and feature collection `{collection}` disagree on `{entity}`: {detail}")]
pub struct ConsistencyViolation {
    pub table: String,
    pub collection: String,
    pub entity: EntityId,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("entity `{entity}` not found in `{table}`")]
    UnknownEntity { table: String, entity: EntityId },
    #[error("`{property}` is maintained by the editor and cannot be edited")]
    ImmutableProperty { property: String },
    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("schedules not loaded for {0:?}")]
    NotLoaded(Vec<EntityId>),
    #[error("`{entity}` has no {category}/{day} schedule")]
    UnknownSeries {
        entity: EntityId,
        category: String,
        day: String,
    },
    #[error("index {index} out of range for `{entity}` (len {len})")]
    IndexOutOfRange {
        entity: EntityId,
        index: usize,
        len: usize,
    },
    #[error("schedule values must be finite, got {0}")]
    NonFinite(f64),
    #[error("`{0}` is not a schedule coordinate")]
    InvalidKey(String),
}

/// Anything an [`crate::EditorState`] action can be rejected with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("no active table/layer for this action")]
    NoActiveLayer,
}

impl EngineError {
    /// True when the store can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Sync(SyncError::Consistency(_)))
    }
}
