pub mod change_log;
pub mod change_set;
pub mod error;
pub mod layout;
pub mod path;
pub mod schedule;
pub mod selection;
pub mod state;
pub mod store;
pub mod sync;
pub mod tracker;

pub use change_log::{ChangeEvent, ChangeLog};
pub use change_set::{ChangeSet, ChangeSummary, FieldDiff};
pub use error::{ConsistencyViolation, EngineError, ScheduleError, SyncError};
pub use layout::{DatasetLayout, EntityKind, TableLayout};
pub use schedule::{GridCell, MergedGrid, ScheduleCoord, ScheduleEditReport};
pub use selection::Selection;
pub use state::{Action, ActionOutcome, EditorState};
pub use store::{CanonicalStore, Feature, FeatureCollection, Row, Schedule, Table};
pub use sync::{DeleteReport, UpdateReport};
pub use tracker::{ChangeTracker, DiffOutcome};

pub use scenedit_common::{EntityId, PropertyValue};

#[cfg(test)]
mod tests;
