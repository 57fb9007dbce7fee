//! Get-or-create and delete-then-prune over the nested update map.
//!
//! `update[table][entity][property]` is built on demand and must never keep
//! an empty table or entity node around once its last leaf is gone.

use scenedit_common::EntityId;

use crate::change_set::{EntityUpdates, FieldDiff, UpdateMap};

/// Get or create the property map for `(table, entity)`.
pub fn ensure_path<'a>(
    root: &'a mut UpdateMap,
    table: &str,
    entity: &EntityId,
) -> &'a mut EntityUpdates {
    root.entry(table.to_string())
        .or_default()
        .entry(entity.clone())
        .or_default()
}

/// Remove the leaf at `(table, entity, property)` and any ancestor left empty.
pub fn prune_path(
    root: &mut UpdateMap,
    table: &str,
    entity: &str,
    property: &str,
) -> Option<FieldDiff> {
    let entities = root.get_mut(table)?;
    let props = entities.get_mut(entity)?;
    let removed = props.remove(property);
    if props.is_empty() {
        entities.remove(entity);
    }
    if entities.is_empty() {
        root.remove(table);
    }
    removed
}

/// Remove every leaf under `(table, entity)` and prune the table node if it
/// became empty. Returns how many leaves were dropped.
pub fn prune_entity(root: &mut UpdateMap, table: &str, entity: &str) -> usize {
    let Some(entities) = root.get_mut(table) else {
        return 0;
    };
    let dropped = entities.remove(entity).map_or(0, |props| props.len());
    if entities.is_empty() {
        root.remove(table);
    }
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenedit_common::PropertyValue;

    fn diff(old: i64, new: i64) -> FieldDiff {
        FieldDiff {
            old_value: PropertyValue::Int(old),
            new_value: PropertyValue::Int(new),
        }
    }

    #[test]
    fn ensure_then_prune_leaves_no_empty_nodes() {
        let mut root = UpdateMap::new();
        let b1 = EntityId::from("B1");
        ensure_path(&mut root, "zone", &b1).insert("a".into(), diff(1, 2));
        ensure_path(&mut root, "zone", &b1).insert("b".into(), diff(1, 3));
        assert_eq!(root["zone"]["B1"].len(), 2);

        assert_eq!(prune_path(&mut root, "zone", "B1", "a"), Some(diff(1, 2)));
        assert!(root.contains_key("zone"));
        prune_path(&mut root, "zone", "B1", "b");
        assert!(root.is_empty());
    }

    #[test]
    fn prune_missing_path_is_a_no_op() {
        let mut root = UpdateMap::new();
        assert_eq!(prune_path(&mut root, "zone", "B1", "a"), None);
        assert_eq!(prune_entity(&mut root, "zone", "B1"), 0);
        assert!(root.is_empty());
    }

    #[test]
    fn prune_entity_keeps_siblings() {
        let mut root = UpdateMap::new();
        ensure_path(&mut root, "zone", &EntityId::from("B1")).insert("a".into(), diff(1, 2));
        ensure_path(&mut root, "zone", &EntityId::from("B2")).insert("a".into(), diff(1, 2));
        assert_eq!(prune_entity(&mut root, "zone", "B1"), 1);
        assert!(root["zone"].contains_key("B2"));
    }
}
