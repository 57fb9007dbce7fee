//! Which tables exist, which carry geometry, and what kind of entity each
//! table holds.
//!
//! Deletion semantics depend on the entity kind. The kind is declared here
//! per table rather than inferred from ad hoc membership checks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::CanonicalStore;

/// Kind of entity, declared per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A building of the scenario. Its id appears in the base table and in
    /// every attribute table; deleting it removes it everywhere except the
    /// derived layers.
    Structural,
    /// A standalone layer entity (e.g. a tree). Lives in its own table and
    /// its own feature collection only.
    Peripheral,
}

/// Per-table layout entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub kind: EntityKind,
    /// Name of the feature collection mirroring this table, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    /// Derived layers are regenerated from other data and are never touched
    /// by structural deletes.
    #[serde(default)]
    pub derived: bool,
}

impl TableLayout {
    pub fn structural() -> Self {
        Self {
            kind: EntityKind::Structural,
            geometry: None,
            derived: false,
        }
    }

    pub fn peripheral() -> Self {
        Self {
            kind: EntityKind::Peripheral,
            geometry: None,
            derived: false,
        }
    }

    pub fn with_geometry(mut self, collection: impl Into<String>) -> Self {
        self.geometry = Some(collection.into());
        self
    }

    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }
}

fn default_id_property() -> String {
    "Name".to_string()
}

fn default_reference_property() -> String {
    "REFERENCE".to_string()
}

fn default_user_reference() -> String {
    "User - Input".to_string()
}

fn default_schedules_table() -> String {
    "schedules".to_string()
}

/// Dataset shape the synchronizer works against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
    /// Feature property holding the entity id.
    #[serde(default = "default_id_property")]
    pub id_property: String,
    /// Provenance property stamped on edited rows.
    #[serde(default = "default_reference_property")]
    pub reference_property: String,
    #[serde(default = "default_user_reference")]
    pub user_reference: String,
    /// Table receiving tracked schedule edits.
    #[serde(default = "default_schedules_table")]
    pub schedules_table: String,
    /// Structural base table; structural deletes are recorded under it.
    pub base_table: String,
    #[serde(default)]
    pub tables: BTreeMap<String, TableLayout>,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::cea()
    }
}

impl DatasetLayout {
    /// Building scenario layout: `zone` footprints, `surroundings`
    /// (derived), `trees` (peripheral), attribute tables keyed by building.
    pub fn cea() -> Self {
        let mut tables = BTreeMap::new();
        tables.insert(
            "zone".to_string(),
            TableLayout::structural().with_geometry("zone"),
        );
        tables.insert(
            "surroundings".to_string(),
            TableLayout::structural()
                .with_geometry("surroundings")
                .derived(),
        );
        tables.insert(
            "trees".to_string(),
            TableLayout::peripheral().with_geometry("trees"),
        );
        for attr in [
            "typology",
            "architecture",
            "air_conditioning",
            "internal_loads",
            "indoor_comfort",
            "supply_systems",
            "schedules",
        ] {
            tables.insert(attr.to_string(), TableLayout::structural());
        }
        Self {
            id_property: default_id_property(),
            reference_property: default_reference_property(),
            user_reference: default_user_reference(),
            schedules_table: default_schedules_table(),
            base_table: "zone".to_string(),
            tables,
        }
    }

    /// Layout with only a base table; add the rest with [`Self::with_table`].
    pub fn new(base_table: impl Into<String>) -> Self {
        Self {
            id_property: default_id_property(),
            reference_property: default_reference_property(),
            user_reference: default_user_reference(),
            schedules_table: default_schedules_table(),
            base_table: base_table.into(),
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, name: impl Into<String>, layout: TableLayout) -> Self {
        self.tables.insert(name.into(), layout);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableLayout> {
        self.tables.get(name)
    }

    /// Feature collection mirroring `table`, if it is geometry-backed.
    pub fn geometry_of(&self, table: &str) -> Option<&str> {
        self.tables.get(table).and_then(|t| t.geometry.as_deref())
    }

    /// Kind declared for `table`. Undeclared tables are treated as
    /// structural attribute tables.
    pub fn kind_of_table(&self, table: &str) -> EntityKind {
        self.tables
            .get(table)
            .map_or(EntityKind::Structural, |t| t.kind)
    }

    pub fn is_derived(&self, table: &str) -> bool {
        self.tables.get(table).is_some_and(|t| t.derived)
    }

    /// Find the table that owns `id` and the kind it implies.
    ///
    /// The base table wins, then peripheral layers, then any other
    /// non-derived table (attribute rows of a building whose footprint is
    /// absent still classify as structural).
    pub fn classify<'s>(
        &'s self,
        store: &'s CanonicalStore,
        id: &str,
    ) -> Option<(&'s str, EntityKind)> {
        if store
            .table(&self.base_table)
            .is_some_and(|t| t.contains(id))
        {
            return Some((self.base_table.as_str(), EntityKind::Structural));
        }
        for (name, layout) in &self.tables {
            if layout.kind == EntityKind::Peripheral
                && store.table(name).is_some_and(|t| t.contains(id))
            {
                return Some((name.as_str(), EntityKind::Peripheral));
            }
        }
        store
            .tables()
            .iter()
            .find(|(name, table)| {
                !self.is_derived(name)
                    && self.kind_of_table(name) == EntityKind::Structural
                    && table.contains(id)
            })
            .map(|(name, _)| (name.as_str(), EntityKind::Structural))
    }

    /// Geometry-backed `(table, collection)` pairs.
    pub fn geometry_tables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables
            .iter()
            .filter_map(|(name, t)| t.geometry.as_deref().map(|g| (name.as_str(), g)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Table;

    #[test]
    fn cea_layout_declares_kinds() {
        let layout = DatasetLayout::cea();
        assert_eq!(layout.kind_of_table("trees"), EntityKind::Peripheral);
        assert_eq!(layout.kind_of_table("typology"), EntityKind::Structural);
        assert!(layout.is_derived("surroundings"));
        assert_eq!(layout.geometry_of("zone"), Some("zone"));
        assert_eq!(layout.geometry_of("typology"), None);
    }

    #[test]
    fn classify_prefers_base_then_peripheral() {
        let layout = DatasetLayout::cea();
        let store = CanonicalStore::new()
            .with_table("zone", Table::new().with_row("B1", [("Name", "B1")]))
            .with_table("typology", Table::new().with_row("B1", [("Name", "B1")]))
            .with_table("trees", Table::new().with_row("T1", [("Name", "T1")]));
        assert_eq!(
            layout.classify(&store, "B1"),
            Some(("zone", EntityKind::Structural))
        );
        assert_eq!(
            layout.classify(&store, "T1"),
            Some(("trees", EntityKind::Peripheral))
        );
        assert_eq!(layout.classify(&store, "nope"), None);
    }

    #[test]
    fn layout_deserializes_with_defaults() {
        let layout: DatasetLayout = serde_json::from_str(
            r#"{"base_table": "zone", "tables": {"zone": {"kind": "structural", "geometry": "zone"}}}"#,
        )
        .unwrap();
        assert_eq!(layout.id_property, "Name");
        assert_eq!(layout.user_reference, "User - Input");
        assert_eq!(layout.geometry_of("zone"), Some("zone"));
    }
}
