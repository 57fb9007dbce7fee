use std::error::Error;

use scenedit_common::EntityId;
use scenedit_engine::{ConsistencyViolation, EngineError, ScheduleError, SyncError};

pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Loaded or re-fetched data whose tables and features disagree.
    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),

    #[error("{backend} error: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("a save is already in flight")]
    SaveInFlight,

    #[error("no save is in flight for this ticket")]
    NoSaveInFlight,

    #[error("edits are blocked while a save is in flight")]
    EditsBlocked,

    #[error("schedules still loading for {0:?}")]
    SchedulesLoading(Vec<EntityId>),

    #[error("schedule fetch failed for {0:?}")]
    ScheduleFetchFailed(Vec<EntityId>),

    #[error("session poisoned by an earlier consistency violation ({0}); discard to reload")]
    Poisoned(ConsistencyViolation),

    #[error("invalid session config: {0}")]
    Config(#[from] serde_json::Error),
}

impl SessionError {
    pub fn from_backend<E>(backend: &'static str, err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        SessionError::Backend {
            backend,
            source: Box::new(err),
        }
    }

    /// The consistency violation behind this error, if it is one.
    pub fn violation(&self) -> Option<&ConsistencyViolation> {
        match self {
            SessionError::Consistency(v) | SessionError::Poisoned(v) => Some(v),
            SessionError::Engine(EngineError::Sync(SyncError::Consistency(v))) => Some(v),
            _ => None,
        }
    }
}

impl From<SyncError> for SessionError {
    fn from(err: SyncError) -> Self {
        SessionError::Engine(err.into())
    }
}

impl From<ScheduleError> for SessionError {
    fn from(err: ScheduleError) -> Self {
        SessionError::Engine(err.into())
    }
}
