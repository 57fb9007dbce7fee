//! Shared backend and session helpers for the session integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io;

use scenedit_engine::Schedule;
use scenedit_session::{
    BaseDataset, EditorSession, EntityId, JsonAdapter, JsonBackendError, SavePayload,
    ScenarioBackend, ScenarioPayload, SessionConfig,
};
use scenedit_testkit::ScenarioDoc;

/// A JSON-backed scenario whose failures and laziness are scripted.
pub struct ScriptedBackend {
    pub inner: JsonAdapter,
    /// Leave schedules out of `load` so they have to be fetched.
    pub lazy_schedules: bool,
    pub fail_save: bool,
    pub fail_base: bool,
    pub failing_schedules: BTreeSet<String>,
    pub schedule_fetches: Vec<EntityId>,
    pub saves: usize,
}

impl ScriptedBackend {
    pub fn new(doc: &ScenarioDoc) -> Self {
        Self {
            inner: JsonAdapter::open_bytes(doc.to_bytes()).unwrap(),
            lazy_schedules: false,
            fail_save: false,
            fail_base: false,
            failing_schedules: BTreeSet::new(),
            schedule_fetches: Vec::new(),
            saves: 0,
        }
    }

    pub fn lazy(doc: &ScenarioDoc) -> Self {
        Self {
            lazy_schedules: true,
            ..Self::new(doc)
        }
    }

    pub fn failing_schedule(mut self, id: &str) -> Self {
        self.failing_schedules.insert(id.to_string());
        self
    }
}

fn scripted_failure(what: &str) -> JsonBackendError {
    JsonBackendError::Io(io::Error::other(format!("{what} unavailable")))
}

impl ScenarioBackend for ScriptedBackend {
    type Error = JsonBackendError;

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn load(&mut self) -> Result<ScenarioPayload, Self::Error> {
        let mut payload = self.inner.load()?;
        if self.lazy_schedules {
            payload.schedules.clear();
        }
        Ok(payload)
    }

    fn save(&mut self, payload: &SavePayload) -> Result<(), Self::Error> {
        if self.fail_save {
            return Err(scripted_failure("save"));
        }
        self.saves += 1;
        self.inner.save(payload)
    }

    fn fetch_base(&mut self) -> Result<BaseDataset, Self::Error> {
        if self.fail_base {
            return Err(scripted_failure("base dataset"));
        }
        self.inner.fetch_base()
    }

    fn fetch_schedule(&mut self, id: &EntityId) -> Result<Schedule, Self::Error> {
        self.schedule_fetches.push(id.clone());
        if self.failing_schedules.contains(id.as_str()) {
            return Err(scripted_failure("schedule"));
        }
        self.inner.fetch_schedule(id)
    }
}

pub fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

pub fn ids(names: &[&str]) -> Vec<EntityId> {
    names.iter().copied().map(EntityId::from).collect()
}

pub fn open(backend: &mut ScriptedBackend) -> EditorSession {
    EditorSession::open(backend, SessionConfig::default()).unwrap()
}

pub fn open_with(backend: &mut ScriptedBackend, config: SessionConfig) -> EditorSession {
    EditorSession::open(backend, config).unwrap()
}
