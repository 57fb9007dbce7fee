//! Bookkeeping for per-entity schedule fetches.
//!
//! A fetch is requested with [`FetchTracker::request`], which hands out a
//! [`FetchTicket`] stamped with the current epoch, and settled later with the
//! ticket. Discard bumps the epoch, so a ticket from before the discard can
//! still be settled but its result is dropped.

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;
use scenedit_common::EntityId;

/// Proof that a fetch for `entity` was requested in `epoch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub entity: EntityId,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded,
    Failed,
    /// Issued before the last discard; the result was ignored.
    Stale,
    /// The entity was deleted while the fetch was in flight; the result was
    /// ignored.
    Orphaned,
}

#[derive(Debug, Default)]
pub struct FetchTracker {
    epoch: u64,
    in_flight: FxHashSet<EntityId>,
    errors: BTreeMap<EntityId, String>,
}

impl FetchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tickets for the ids not yet loaded and not already in flight.
    /// Requesting an id that previously failed clears its error.
    pub fn request<'a, I>(&mut self, ids: I, is_loaded: impl Fn(&EntityId) -> bool) -> Vec<FetchTicket>
    where
        I: IntoIterator<Item = &'a EntityId>,
    {
        let mut tickets = Vec::new();
        for id in ids {
            if is_loaded(id) || self.in_flight.contains(id) {
                continue;
            }
            self.errors.remove(id);
            self.in_flight.insert(id.clone());
            tickets.push(FetchTicket {
                entity: id.clone(),
                epoch: self.epoch,
            });
        }
        tickets
    }

    /// Whether `ticket` belongs to the current epoch and is still pending.
    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.epoch == self.epoch && self.in_flight.contains(&ticket.entity)
    }

    /// Settle a current ticket. Returns false for stale tickets.
    pub fn settle(&mut self, ticket: &FetchTicket, error: Option<String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight.remove(&ticket.entity);
        if let Some(message) = error {
            self.errors.insert(ticket.entity.clone(), message);
        }
        true
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.contains(id)
    }

    pub fn in_flight_among<'a>(&self, ids: impl IntoIterator<Item = &'a EntityId>) -> Vec<EntityId> {
        ids.into_iter()
            .filter(|id| self.in_flight.contains(*id))
            .cloned()
            .collect()
    }

    pub fn failed_among<'a>(&self, ids: impl IntoIterator<Item = &'a EntityId>) -> Vec<EntityId> {
        ids.into_iter()
            .filter(|id| self.errors.contains_key(*id))
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> &BTreeMap<EntityId, String> {
        &self.errors
    }

    pub fn record_error(&mut self, id: EntityId, message: String) {
        self.errors.insert(id, message);
    }

    /// Forget everything in flight and every error, and start a new epoch.
    pub fn invalidate(&mut self) -> u64 {
        self.in_flight.clear();
        self.errors.clear();
        self.epoch += 1;
        self.epoch
    }
}
