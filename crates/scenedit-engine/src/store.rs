//! The canonical store: the baseline dataset every view reads from.
//!
//! Pure data. Tables, one feature collection per geometry-backed table, the
//! CRS block, per-entity schedules and the column schema. Nothing in here
//! decides whether an edit is dirty; that is the tracker's job.

use std::collections::BTreeMap;

use scenedit_common::{ColumnSchema, EntityId, PropertyValue};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Property name → value for one entity in one table.
pub type Row = BTreeMap<String, PropertyValue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: BTreeMap<EntityId, Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row<I, K, V>(mut self, id: impl Into<EntityId>, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        let row = props
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.rows.insert(id.into(), row);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Row> {
        self.rows.get_mut(id)
    }

    pub fn value(&self, id: &str, property: &str) -> Option<&PropertyValue> {
        self.rows.get(id).and_then(|row| row.get(property))
    }

    pub fn insert(&mut self, id: EntityId, row: Row) -> Option<Row> {
        self.rows.insert(id, row)
    }

    pub fn remove(&mut self, id: &str) -> Option<Row> {
        self.rows.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.rows.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Row)> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

/// A GeoJSON feature. The geometry is opaque to the editor; only the
/// property block participates in synchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Row,
    #[serde(default)]
    pub geometry: JsonValue,
}

impl Feature {
    pub fn new(properties: Row, geometry: JsonValue) -> Self {
        Self {
            kind: feature_type(),
            properties,
            geometry,
        }
    }

    /// Does this feature's identifying property name `id`?
    pub fn is_entity(&self, id_property: &str, id: &str) -> bool {
        match self.properties.get(id_property) {
            Some(PropertyValue::Text(s)) => s == id,
            Some(PropertyValue::Null) | None => false,
            Some(other) => other.to_string() == id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<JsonValue>,
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self {
            kind: collection_type(),
            features: Vec::new(),
            crs: None,
        }
    }
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Index of the feature for `id`, matched by property equality, never by
    /// array position.
    pub fn position(&self, id_property: &str, id: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.is_entity(id_property, id))
    }

    pub fn feature(&self, id_property: &str, id: &str) -> Option<&Feature> {
        self.position(id_property, id).map(|i| &self.features[i])
    }

    pub fn feature_mut(&mut self, id_property: &str, id: &str) -> Option<&mut Feature> {
        self.position(id_property, id)
            .map(move |i| &mut self.features[i])
    }

    /// Remove every feature naming one of `ids`; returns how many were removed.
    pub fn remove_entities(&mut self, id_property: &str, ids: &[EntityId]) -> usize {
        let before = self.features.len();
        self.features
            .retain(|f| !ids.iter().any(|id| f.is_entity(id_property, id.as_str())));
        before - self.features.len()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Day name → hourly values.
pub type DaySchedules = BTreeMap<String, Vec<PropertyValue>>;

/// Operating schedule of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "MONTHLY_MULTIPLIER", default)]
    pub monthly_multiplier: Vec<f64>,
    #[serde(rename = "SCHEDULES", default)]
    pub schedules: BTreeMap<String, DaySchedules>,
}

impl Schedule {
    pub const MONTHS: usize = 12;
    pub const HOURS: usize = 24;

    pub fn new(monthly_multiplier: Vec<f64>) -> Self {
        Self {
            monthly_multiplier,
            schedules: BTreeMap::new(),
        }
    }

    pub fn with_hours(
        mut self,
        category: impl Into<String>,
        day: impl Into<String>,
        hours: Vec<PropertyValue>,
    ) -> Self {
        self.schedules
            .entry(category.into())
            .or_default()
            .insert(day.into(), hours);
        self
    }

    pub fn hours(&self, category: &str, day: &str) -> Option<&[PropertyValue]> {
        self.schedules
            .get(category)
            .and_then(|days| days.get(day))
            .map(Vec::as_slice)
    }

    pub fn hours_mut(&mut self, category: &str, day: &str) -> Option<&mut Vec<PropertyValue>> {
        self.schedules
            .get_mut(category)
            .and_then(|days| days.get_mut(day))
    }
}

/// Baseline dataset for one scenario.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalStore {
    tables: BTreeMap<String, Table>,
    geojsons: BTreeMap<String, FeatureCollection>,
    crs: Option<JsonValue>,
    schedules: BTreeMap<EntityId, Schedule>,
    columns: ColumnSchema,
}

impl CanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        tables: BTreeMap<String, Table>,
        geojsons: BTreeMap<String, FeatureCollection>,
        crs: Option<JsonValue>,
        schedules: BTreeMap<EntityId, Schedule>,
        columns: ColumnSchema,
    ) -> Self {
        Self {
            tables,
            geojsons,
            crs,
            schedules,
            columns,
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, table: Table) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    pub fn with_features(mut self, name: impl Into<String>, fc: FeatureCollection) -> Self {
        self.geojsons.insert(name.into(), fc);
        self
    }

    pub fn with_schedule(mut self, id: impl Into<EntityId>, schedule: Schedule) -> Self {
        self.schedules.insert(id.into(), schedule);
        self
    }

    pub fn with_columns(mut self, columns: ColumnSchema) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_crs(mut self, crs: JsonValue) -> Self {
        self.crs = Some(crs);
        self
    }

    // Tables

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn value(&self, table: &str, id: &str, property: &str) -> Option<&PropertyValue> {
        self.tables.get(table).and_then(|t| t.value(id, property))
    }

    pub(crate) fn tables_mut(&mut self) -> &mut BTreeMap<String, Table> {
        &mut self.tables
    }

    /// Split borrow of a table and a feature collection, for dual writes.
    pub(crate) fn table_and_features_mut(
        &mut self,
        table: &str,
        collection: Option<&str>,
    ) -> (Option<&mut Table>, Option<&mut FeatureCollection>) {
        let fc = collection.and_then(|c| self.geojsons.get_mut(c));
        (self.tables.get_mut(table), fc)
    }

    pub(crate) fn geojsons_mut(&mut self) -> &mut BTreeMap<String, FeatureCollection> {
        &mut self.geojsons
    }

    // Geometry

    pub fn features(&self, name: &str) -> Option<&FeatureCollection> {
        self.geojsons.get(name)
    }

    pub fn features_mut(&mut self, name: &str) -> Option<&mut FeatureCollection> {
        self.geojsons.get_mut(name)
    }

    pub fn geojsons(&self) -> &BTreeMap<String, FeatureCollection> {
        &self.geojsons
    }

    pub fn crs(&self) -> Option<&JsonValue> {
        self.crs.as_ref()
    }

    // Schedules

    pub fn schedule(&self, id: &str) -> Option<&Schedule> {
        self.schedules.get(id)
    }

    pub fn schedule_mut(&mut self, id: &str) -> Option<&mut Schedule> {
        self.schedules.get_mut(id)
    }

    pub fn has_schedule(&self, id: &str) -> bool {
        self.schedules.contains_key(id)
    }

    /// Store a freshly fetched schedule, replacing any previous one.
    pub fn set_schedule(&mut self, id: EntityId, schedule: Schedule) {
        self.schedules.insert(id, schedule);
    }

    pub fn remove_schedule(&mut self, id: &str) -> Option<Schedule> {
        self.schedules.remove(id)
    }

    pub fn schedules(&self) -> &BTreeMap<EntityId, Schedule> {
        &self.schedules
    }

    // Schema

    pub fn columns(&self) -> &ColumnSchema {
        &self.columns
    }

    pub fn into_parts(
        self,
    ) -> (
        BTreeMap<String, Table>,
        BTreeMap<String, FeatureCollection>,
        Option<JsonValue>,
        BTreeMap<EntityId, Schedule>,
        ColumnSchema,
    ) {
        (
            self.tables,
            self.geojsons,
            self.crs,
            self.schedules,
            self.columns,
        )
    }
}
