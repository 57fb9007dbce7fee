//! Meta crate that re-exports the scenario editor layers with sensible
//! defaults. Depend on this crate and opt into layers via feature flags, or
//! reach the underlying crates through the module re-exports.

pub use scenedit_common as common;
pub use scenedit_common::{ColumnSchema, ColumnSpec, EntityId, PropertyType, PropertyValue};

#[cfg(feature = "engine")]
pub use scenedit_engine as engine;

#[cfg(feature = "engine")]
pub use scenedit_engine::{
    Action, ActionOutcome, CanonicalStore, ChangeSet, ChangeSummary, DatasetLayout, EditorState,
    EntityKind, FieldDiff, GridCell, MergedGrid, Schedule,
};

#[cfg(feature = "session")]
pub use scenedit_session as session;

#[cfg(feature = "session")]
pub use scenedit_session::{
    EditorSession, ScenarioBackend, SelectionPolicy, SessionConfig, SessionError,
};

#[cfg(feature = "json")]
pub use scenedit_session::JsonAdapter;

#[cfg(feature = "json")]
pub mod doc_examples;
