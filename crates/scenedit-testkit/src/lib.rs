//! Scenario documents for tests, in the JSON shape the editor loads.
//!
//! [`ScenarioDoc`] builds a document building by building; [`ScenarioDoc::cea`]
//! is the usual three-building fixture. Documents are plain
//! `serde_json::Value`s so this crate stays below every editor crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tempfile::TempDir;

const ID: &str = "Name";

fn point(x: f64, y: f64) -> Value {
    json!({"type": "Point", "coordinates": [x, y]})
}

fn footprint(x: f64, y: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + 10.0, y], [x + 10.0, y + 10.0], [x, y + 10.0], [x, y]]]
    })
}

/// Monthly multipliers all 1.0 plus the given hourly series.
pub fn schedule(series: &[(&str, &str, Value)]) -> Value {
    let mut categories = Map::new();
    for (category, day, hours) in series {
        let days = categories
            .entry(category.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(days) = days {
            days.insert(day.to_string(), hours.clone());
        }
    }
    json!({
        "MONTHLY_MULTIPLIER": vec![1.0; 12],
        "SCHEDULES": categories,
    })
}

/// A building schedule with `COOLING/MON` set to `cooling` and a three-hour
/// `OCCUPANCY/MON` text series.
pub fn building_schedule(cooling: &[i64]) -> Value {
    schedule(&[
        ("COOLING", "MON", json!(cooling)),
        ("OCCUPANCY", "MON", json!(["OFF", "ON", "ON"])),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct ScenarioDoc {
    tables: Map<String, Value>,
    geojsons: Map<String, Value>,
    schedules: Map<String, Value>,
    columns: Map<String, Value>,
    crs: Option<Value>,
}

impl ScenarioDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// B1..B3 (3, 4 and 5 floors) with typology and schedule rows and a
    /// loaded schedule each, tree T1, surrounding building S1, declared
    /// zone and typology columns, and a CRS block.
    pub fn cea() -> Self {
        Self::new()
            .building("B1", 3, &[1, 1, 1])
            .building("B2", 4, &[1, 0, 1])
            .building("B3", 5, &[1, 1, 1])
            .tree("T1", 8.0)
            .surrounding("S1", 2)
            .column("zone", "floors_ag", json!({"type": "int", "min": 0}))
            .column("zone", "height_ag", json!({"type": "float", "min": 0.0}))
            .column(
                "typology",
                "STANDARD",
                json!({"type": "choice", "choices": ["STANDARD1", "STANDARD2"]}),
            )
            .crs(json!({"type": "name", "properties": {"name": "EPSG:32632"}}))
    }

    /// A building in every structural table, with its footprint and a
    /// schedule whose `COOLING/MON` series is `cooling`.
    pub fn building(self, name: &str, floors: i64, cooling: &[i64]) -> Self {
        let offset = self.rows("zone") as f64 * 20.0;
        let props = json!({
            ID: name,
            "floors_ag": floors,
            "height_ag": floors as f64 * 3.0,
            "REFERENCE": "OSM",
        });
        self.row("zone", name, props.clone())
            .feature("zone", props, footprint(offset, 0.0))
            .row(
                "typology",
                name,
                json!({ID: name, "YEAR": 1990, "STANDARD": "STANDARD1"}),
            )
            .row("schedules", name, json!({ID: name, "USE": "OFFICE"}))
            .with_schedule(name, building_schedule(cooling))
    }

    pub fn tree(self, name: &str, height: f64) -> Self {
        let props = json!({ID: name, "height": height});
        let offset = self.rows("trees") as f64 * 5.0;
        self.row("trees", name, props.clone())
            .feature("trees", props, point(offset, 50.0))
    }

    pub fn surrounding(self, name: &str, floors: i64) -> Self {
        let props = json!({ID: name, "floors_ag": floors});
        let offset = self.rows("surroundings") as f64 * 20.0;
        self.row("surroundings", name, props.clone())
            .feature("surroundings", props, footprint(offset, -100.0))
    }

    pub fn row(mut self, table: &str, id: &str, props: Value) -> Self {
        let rows = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(rows) = rows {
            rows.insert(id.to_string(), props);
        }
        self
    }

    /// A feature without a matching row, or a row without its feature, is
    /// how tests provoke consistency failures.
    pub fn feature(mut self, collection: &str, props: Value, geometry: Value) -> Self {
        let fc = self
            .geojsons
            .entry(collection.to_string())
            .or_insert_with(|| json!({"type": "FeatureCollection", "features": []}));
        if let Some(Value::Array(features)) = fc.get_mut("features") {
            features.push(json!({"type": "Feature", "properties": props, "geometry": geometry}));
        }
        self
    }

    pub fn with_schedule(mut self, id: &str, schedule: Value) -> Self {
        self.schedules.insert(id.to_string(), schedule);
        self
    }

    /// Drop an entity's schedule so it has to be fetched.
    pub fn without_schedule(mut self, id: &str) -> Self {
        self.schedules.remove(id);
        self
    }

    /// Remove the feature of `id` from `collection`, leaving its row behind.
    pub fn without_feature(mut self, collection: &str, id: &str) -> Self {
        if let Some(Value::Array(features)) = self
            .geojsons
            .get_mut(collection)
            .and_then(|fc| fc.get_mut("features"))
        {
            features.retain(|f| f["properties"][ID] != id);
        }
        self
    }

    pub fn column(mut self, table: &str, property: &str, spec: Value) -> Self {
        let cols = self
            .columns
            .entry(table.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(cols) = cols {
            cols.insert(property.to_string(), spec);
        }
        self
    }

    pub fn crs(mut self, crs: Value) -> Self {
        self.crs = Some(crs);
        self
    }

    fn rows(&self, table: &str) -> usize {
        self.tables
            .get(table)
            .and_then(Value::as_object)
            .map_or(0, Map::len)
    }

    /// The full load document.
    pub fn to_value(&self) -> Value {
        let mut doc = json!({
            "tables": self.tables,
            "geojsons": self.geojsons,
            "schedules": self.schedules,
            "columns": self.columns,
        });
        if let (Some(crs), Value::Object(doc)) = (&self.crs, &mut doc) {
            doc.insert("crs".to_string(), crs.clone());
        }
        doc
    }

    /// Only the schedule of `id`, as a schedule fetch returns it.
    pub fn schedule_of(&self, id: &str) -> Option<&Value> {
        self.schedules.get(id)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.to_value()).unwrap_or_default()
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}

/// A document written to `scenario.json` in a fresh temp dir. Keep the
/// `TempDir` alive for as long as the file is needed.
pub fn temp_scenario(doc: &ScenarioDoc) -> io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scenario.json");
    doc.write_to(&path)?;
    Ok((dir, path))
}
