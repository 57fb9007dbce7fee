use indexmap::IndexSet;
use scenedit_common::EntityId;

/// Active entities, in the order they were selected, scoped to one
/// table/layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    active_layer: Option<String>,
    ids: IndexSet<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_layer(layer: impl Into<String>) -> Self {
        Self {
            active_layer: Some(layer.into()),
            ids: IndexSet::new(),
        }
    }

    pub fn active_layer(&self) -> Option<&str> {
        self.active_layer.as_deref()
    }

    /// Switch the active table/layer. Switching to a different layer drops
    /// the selection; re-selecting the current one keeps it.
    pub fn set_active_layer(&mut self, layer: Option<String>) -> bool {
        if self.active_layer == layer {
            return false;
        }
        self.active_layer = layer;
        self.ids.clear();
        true
    }

    /// Replace the selection with `ids`. Duplicates keep their first position.
    pub fn select<I>(&mut self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<EntityId>,
    {
        self.ids.clear();
        self.ids.extend(ids.into_iter().map(Into::into));
    }

    /// Add `id` if absent, remove it if present. Returns whether it is now
    /// selected.
    pub fn toggle(&mut self, id: impl Into<EntityId>) -> bool {
        let id = id.into();
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn select_all<I>(&mut self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<EntityId>,
    {
        self.select(ids);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist, keeping the order of the rest.
    pub fn retain(&mut self, mut keep: impl FnMut(&EntityId) -> bool) {
        self.ids.retain(|id| keep(id));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.ids.iter()
    }

    pub fn to_vec(&self) -> Vec<EntityId> {
        self.ids.iter().cloned().collect()
    }

    pub fn first(&self) -> Option<&EntityId> {
        self.ids.first()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
