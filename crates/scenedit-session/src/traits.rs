use std::collections::BTreeMap;

use scenedit_common::{ColumnSchema, EntityId};
use scenedit_engine::{CanonicalStore, FeatureCollection, Schedule, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Everything a scenario load returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPayload {
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub geojsons: BTreeMap<String, FeatureCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
    #[serde(default)]
    pub schedules: BTreeMap<EntityId, Schedule>,
    #[serde(default)]
    pub columns: ColumnSchema,
}

impl ScenarioPayload {
    pub fn into_store(self) -> CanonicalStore {
        CanonicalStore::from_parts(
            self.tables,
            self.geojsons,
            self.crs,
            self.schedules,
            self.columns,
        )
    }
}

/// Full replacement payload sent on save. Not a diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavePayload {
    pub tables: BTreeMap<String, Table>,
    pub geojsons: BTreeMap<String, FeatureCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
    pub schedules: BTreeMap<EntityId, Schedule>,
}

impl SavePayload {
    pub fn from_store(store: &CanonicalStore) -> Self {
        Self {
            tables: store.tables().clone(),
            geojsons: store.geojsons().clone(),
            crs: store.crs().cloned(),
            schedules: store.schedules().clone(),
        }
    }
}

/// Authoritative dataset re-fetched on discard; schedules come separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseDataset {
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub geojsons: BTreeMap<String, FeatureCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
}

impl BaseDataset {
    /// Build a store from this dataset, reusing `schedules` and `columns`.
    pub fn into_store(
        self,
        schedules: BTreeMap<EntityId, Schedule>,
        columns: ColumnSchema,
    ) -> CanonicalStore {
        CanonicalStore::from_parts(self.tables, self.geojsons, self.crs, schedules, columns)
    }
}

/// The persistence boundary of a scenario.
///
/// Calls are synchronous; an async transport drives the session's two-phase
/// ticket API instead of implementing this trait.
pub trait ScenarioBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in error messages.
    fn name(&self) -> &'static str {
        "backend"
    }

    fn load(&mut self) -> Result<ScenarioPayload, Self::Error>;

    fn save(&mut self, payload: &SavePayload) -> Result<(), Self::Error>;

    fn fetch_base(&mut self) -> Result<BaseDataset, Self::Error>;

    /// One entity's schedule. Failures are per entity.
    fn fetch_schedule(&mut self, id: &EntityId) -> Result<Schedule, Self::Error>;
}

impl<B: ScenarioBackend + ?Sized> ScenarioBackend for &mut B {
    type Error = B::Error;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn load(&mut self) -> Result<ScenarioPayload, Self::Error> {
        (**self).load()
    }

    fn save(&mut self, payload: &SavePayload) -> Result<(), Self::Error> {
        (**self).save(payload)
    }

    fn fetch_base(&mut self) -> Result<BaseDataset, Self::Error> {
        (**self).fetch_base()
    }

    fn fetch_schedule(&mut self, id: &EntityId) -> Result<Schedule, Self::Error> {
        (**self).fetch_schedule(id)
    }
}
