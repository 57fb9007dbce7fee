pub mod backends;
pub mod config;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod session;
pub mod traits;

#[cfg(feature = "json")]
pub use backends::{JsonAdapter, JsonBackendError};
pub use config::{SelectionPolicy, SessionConfig};
pub use error::{BoxError, SessionError};
pub use fetch::{FetchOutcome, FetchTicket, FetchTracker};
pub use loader::{LoaderStats, ScenarioLoader};
pub use session::{
    DiscardReport, DispatchOutcome, EditorSession, FetchCompletion, SaveReceipt, SaveTicket,
};
pub use traits::{BaseDataset, SavePayload, ScenarioBackend, ScenarioPayload};

pub use scenedit_engine::{Action, ActionOutcome, ChangeSummary, EntityId, PropertyValue};
