use std::time::Instant;

use chrono::{DateTime, Utc};
use scenedit_engine::sync::verify_consistency;
use scenedit_engine::{CanonicalStore, DatasetLayout};
use serde::Serialize;

use crate::error::SessionError;
use crate::traits::{ScenarioBackend, ScenarioPayload};

#[derive(Debug, Default, Clone, Serialize)]
pub struct LoaderStats {
    pub tables_loaded: usize,
    pub rows_loaded: usize,
    pub features_loaded: usize,
    pub schedules_loaded: usize,
    pub columns_declared: usize,
    pub load_time_ms: u64,
    pub loaded_at: Option<DateTime<Utc>>,
}

pub struct ScenarioLoader<'a> {
    layout: &'a DatasetLayout,
    verify: bool,
    stats: LoaderStats,
}

impl<'a> ScenarioLoader<'a> {
    pub fn new(layout: &'a DatasetLayout, verify: bool) -> Self {
        Self {
            layout,
            verify,
            stats: LoaderStats::default(),
        }
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    pub fn into_stats(self) -> LoaderStats {
        self.stats
    }

    pub fn load<B: ScenarioBackend>(&mut self, backend: &mut B) -> Result<CanonicalStore, SessionError> {
        let start = Instant::now();
        let payload = backend
            .load()
            .map_err(|e| SessionError::from_backend(backend.name(), e))?;
        let store = self.load_payload(payload)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        self.stats.load_time_ms = elapsed_ms.max(1);
        Ok(store)
    }

    /// Turn an already fetched payload into a store, checking it on the way.
    pub fn load_payload(&mut self, payload: ScenarioPayload) -> Result<CanonicalStore, SessionError> {
        self.stats.tables_loaded = payload.tables.len();
        self.stats.rows_loaded = payload.tables.values().map(|t| t.len()).sum();
        self.stats.features_loaded = payload.geojsons.values().map(|fc| fc.len()).sum();
        self.stats.schedules_loaded = payload.schedules.len();
        self.stats.columns_declared = payload.columns.len();

        #[cfg(feature = "tracing")]
        self.warn_unpaired(&payload);

        let store = payload.into_store();
        if self.verify {
            verify_consistency(&store, self.layout)?;
        }
        self.stats.loaded_at = Some(Utc::now());

        #[cfg(feature = "tracing")]
        tracing::debug!(
            tables = self.stats.tables_loaded,
            rows = self.stats.rows_loaded,
            features = self.stats.features_loaded,
            schedules = self.stats.schedules_loaded,
            "scenario loaded"
        );
        Ok(store)
    }

    #[cfg(feature = "tracing")]
    fn warn_unpaired(&self, payload: &ScenarioPayload) {
        for (table, collection) in self.layout.geometry_tables() {
            if payload.tables.contains_key(table) != payload.geojsons.contains_key(collection) {
                tracing::warn!(
                    table,
                    collection,
                    "geometry-backed table loaded without its counterpart"
                );
            }
        }
    }
}
