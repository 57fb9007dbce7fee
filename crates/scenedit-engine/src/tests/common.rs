//! Common test helpers
use scenedit_common::{ColumnSchema, ColumnSpec, PropertyType};
use serde_json::json;

use crate::store::{CanonicalStore, Feature, FeatureCollection, Row, Schedule, Table};
use crate::{DatasetLayout, EntityId, PropertyValue};

pub fn id(s: &str) -> EntityId {
    EntityId::from(s)
}

pub fn ids(names: &[&str]) -> Vec<EntityId> {
    names.iter().copied().map(EntityId::from).collect()
}

pub fn feature(props: &[(&str, PropertyValue)]) -> Feature {
    let row: Row = props
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Feature::new(row, json!({"type": "Point", "coordinates": [0.0, 0.0]}))
}

fn zone_row(name: &str, floors: i64) -> [(&'static str, PropertyValue); 4] {
    [
        ("Name", name.into()),
        ("floors_ag", floors.into()),
        ("height_ag", (floors as f64 * 3.0).into()),
        ("REFERENCE", "OSM".into()),
    ]
}

pub fn hourly(values: &[i64]) -> Vec<PropertyValue> {
    values.iter().copied().map(PropertyValue::Int).collect()
}

/// B1..B3 buildings in zone/typology/schedules, one tree, one surrounding
/// building, and a loaded schedule for each building.
pub fn scenario() -> CanonicalStore {
    let mut zone = Table::new();
    let mut zone_features = Vec::new();
    let mut typology = Table::new();
    let mut schedules = Table::new();
    for (name, floors) in [("B1", 3), ("B2", 4), ("B3", 5)] {
        zone = zone.with_row(name, zone_row(name, floors));
        zone_features.push(feature(&zone_row(name, floors)));
        typology = typology.with_row(
            name,
            [
                ("Name", PropertyValue::from(name)),
                ("YEAR", 1990.into()),
                ("STANDARD", "STANDARD1".into()),
            ],
        );
        schedules = schedules.with_row(
            name,
            [
                ("Name", PropertyValue::from(name)),
                ("USE", "OFFICE".into()),
            ],
        );
    }

    let trees = Table::new().with_row(
        "T1",
        [("Name", PropertyValue::from("T1")), ("height", 8.0.into())],
    );
    let surroundings = Table::new().with_row(
        "S1",
        [("Name", PropertyValue::from("S1")), ("floors_ag", 2.into())],
    );

    let columns = ColumnSchema::new()
        .with_column("zone", "floors_ag", ColumnSpec::new(PropertyType::Int))
        .with_column(
            "zone",
            "height_ag",
            ColumnSpec::new(PropertyType::Float).with_range(Some(0.0), None),
        )
        .with_column(
            "typology",
            "STANDARD",
            ColumnSpec::new(PropertyType::Choice).with_choices(["STANDARD1", "STANDARD2"]),
        );

    CanonicalStore::new()
        .with_table("zone", zone)
        .with_table("typology", typology)
        .with_table("schedules", schedules)
        .with_table("trees", trees)
        .with_table("surroundings", surroundings)
        .with_features("zone", FeatureCollection::new(zone_features))
        .with_features(
            "trees",
            FeatureCollection::new(vec![feature(&[
                ("Name", "T1".into()),
                ("height", 8.0.into()),
            ])]),
        )
        .with_features(
            "surroundings",
            FeatureCollection::new(vec![feature(&[
                ("Name", "S1".into()),
                ("floors_ag", 2.into()),
            ])]),
        )
        .with_schedule("B1", building_schedule(&[1, 1, 1]))
        .with_schedule("B2", building_schedule(&[1, 0, 1]))
        .with_schedule("B3", building_schedule(&[1, 1, 1]))
        .with_columns(columns)
}

pub fn building_schedule(cooling_mon: &[i64]) -> Schedule {
    Schedule::new(vec![1.0; Schedule::MONTHS])
        .with_hours("COOLING", "MON", hourly(cooling_mon))
        .with_hours(
            "OCCUPANCY",
            "MON",
            vec![PropertyValue::from("OFF"), "ON".into(), "ON".into()],
        )
}

pub fn layout() -> DatasetLayout {
    DatasetLayout::cea()
}
