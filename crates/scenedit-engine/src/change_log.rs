//! Ordered record of what the tracker decided and why an entry appeared,
//! moved or vanished. The change set says what is dirty; the log says how it
//! got there. Fan-out edits are bracketed by group markers.

use scenedit_common::{EntityId, PropertyValue};

/// A single decision taken by the change tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// First divergence from baseline: a new diff entry.
    FieldRecorded {
        table: String,
        entity: EntityId,
        property: String,
        old: PropertyValue,
        new: PropertyValue,
    },
    /// An existing entry received a new value; its baseline is untouched.
    FieldUpdated {
        table: String,
        entity: EntityId,
        property: String,
        previous: PropertyValue,
        new: PropertyValue,
    },
    /// The value returned to baseline and the entry was dropped.
    FieldCancelled {
        table: String,
        entity: EntityId,
        property: String,
    },
    EntitiesDeleted {
        layer: String,
        entities: Vec<EntityId>,
        dropped_fields: usize,
    },
    Reset,

    CompoundStart {
        /// e.g. `schedule edit SCHEDULES/COOLING/MON/1 x3`
        description: String,
        depth: usize,
    },
    CompoundEnd {
        depth: usize,
    },
}

#[derive(Debug)]
pub struct ChangeLog {
    events: Vec<ChangeEvent>,
    enabled: bool,
    compound_depth: usize,
}

impl Default for ChangeLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            enabled: true,
            compound_depth: 0,
        }
    }

    pub fn record(&mut self, event: ChangeEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    /// Open a group; groups nest.
    pub fn begin_compound(&mut self, description: String) {
        self.compound_depth += 1;
        if self.enabled {
            self.events.push(ChangeEvent::CompoundStart {
                description,
                depth: self.compound_depth,
            });
        }
    }

    /// Close the innermost group. Unbalanced calls are ignored.
    pub fn end_compound(&mut self) {
        let Some(depth) = self.compound_depth.checked_sub(1) else {
            return;
        };
        if self.enabled {
            self.events.push(ChangeEvent::CompoundEnd {
                depth: self.compound_depth,
            });
        }
        self.compound_depth = depth;
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.compound_depth = 0;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn compound_depth(&self) -> usize {
        self.compound_depth
    }

    /// Events of the most recent top-level compound, markers excluded.
    /// Falls back to the last event when it was recorded outside a compound.
    pub fn last_group(&self) -> &[ChangeEvent] {
        let Some(last) = self.events.last() else {
            return &[];
        };
        if !matches!(last, ChangeEvent::CompoundEnd { depth: 1 }) {
            return &self.events[self.events.len() - 1..];
        }
        let end = self.events.len() - 1;
        let start = self.events[..end]
            .iter()
            .rposition(|e| matches!(e, ChangeEvent::CompoundStart { depth: 1, .. }))
            .map_or(0, |i| i + 1);
        &self.events[start..end]
    }
}
