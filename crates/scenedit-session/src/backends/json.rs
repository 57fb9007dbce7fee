use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use scenedit_common::EntityId;
use scenedit_engine::Schedule;

use crate::traits::{BaseDataset, SavePayload, ScenarioBackend, ScenarioPayload};

#[derive(Debug, thiserror::Error)]
pub enum JsonBackendError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("no schedule stored for `{0}`")]
    ScheduleNotFound(EntityId),
}

/// A scenario document in the load payload shape, held in memory and
/// optionally backed by a file that saves are written through to.
#[derive(Debug, Clone, Default)]
pub struct JsonAdapter {
    data: ScenarioPayload,
    path: Option<PathBuf>,
}

impl JsonAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_payload(data: ScenarioPayload) -> Self {
        Self { data, path: None }
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, JsonBackendError> {
        let file = File::open(path.as_ref())?;
        let data: ScenarioPayload = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self {
            data,
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    pub fn open_bytes(bytes: Vec<u8>) -> Result<Self, JsonBackendError> {
        let data: ScenarioPayload = serde_json::from_slice(&bytes)?;
        Ok(Self::from_payload(data))
    }

    pub fn payload(&self) -> &ScenarioPayload {
        &self.data
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn to_json_string(&self) -> Result<String, JsonBackendError> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    pub fn save_to_bytes(&self) -> Result<Vec<u8>, JsonBackendError> {
        Ok(serde_json::to_vec_pretty(&self.data)?)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonBackendError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(&mut writer, &self.data)?;
        writer.flush()?;
        Ok(())
    }

    fn apply_save(&mut self, payload: &SavePayload) {
        self.data.tables = payload.tables.clone();
        self.data.geojsons = payload.geojsons.clone();
        self.data.crs = payload.crs.clone();
        // Only loaded schedules travel with a save; keep the rest unless
        // their entity no longer exists.
        for (id, schedule) in &payload.schedules {
            self.data.schedules.insert(id.clone(), schedule.clone());
        }
        let tables = &self.data.tables;
        self.data
            .schedules
            .retain(|id, _| tables.values().any(|t| t.contains(id.as_str())));
    }
}

impl ScenarioBackend for JsonAdapter {
    type Error = JsonBackendError;

    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&mut self) -> Result<ScenarioPayload, Self::Error> {
        Ok(self.data.clone())
    }

    fn save(&mut self, payload: &SavePayload) -> Result<(), Self::Error> {
        self.apply_save(payload);
        if let Some(path) = &self.path {
            self.save_to_path(path)?;
        }
        Ok(())
    }

    fn fetch_base(&mut self) -> Result<BaseDataset, Self::Error> {
        Ok(BaseDataset {
            tables: self.data.tables.clone(),
            geojsons: self.data.geojsons.clone(),
            crs: self.data.crs.clone(),
        })
    }

    fn fetch_schedule(&mut self, id: &EntityId) -> Result<Schedule, Self::Error> {
        self.data
            .schedules
            .get(id)
            .cloned()
            .ok_or_else(|| JsonBackendError::ScheduleNotFound(id.clone()))
    }
}
