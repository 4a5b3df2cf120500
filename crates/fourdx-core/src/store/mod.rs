//! Persistence port.
//!
//! Every collection lives behind the [`Store`] trait. Besides plain reads and
//! writes the trait carries the three atomic primitives the scoring engine
//! depends on:
//!
//! - [`Store::insert_commitment`] enforces the per-member weekly cap inside
//!   the write, so two concurrent creates cannot both take the third slot.
//! - [`Store::transition_commitment`] is a compare-and-swap keyed on the
//!   commitment status the caller observed. Exactly one of two racing status
//!   changes wins, and the owner's score moves in the same write or not at all.
//! - [`Store::update_member`] runs a read-modify-write on one member as a
//!   single unit, so score deltas and rollover guards never interleave.
//!
//! Implementations publish a [`ChangeEvent`] to their [`ChangeFeed`] after each
//! successful mutation.

pub mod db;
pub mod memory;

#[cfg(test)]
pub(crate) mod conformance;

pub use db::RedbStore;
pub use memory::MemoryStore;

use crate::commitment::{Commitment, CommitmentFilter};
use crate::error::Result;
use crate::member::TeamMember;
use crate::session::WigSession;
use crate::types::CommitmentStatus;
use crate::week::WeekId;
use serde::Serialize;
use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Members,
    Commitments,
    Sessions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Upsert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub id: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn upsert(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
            kind: ChangeKind::Upsert,
        }
    }

    pub fn delete(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
            kind: ChangeKind::Delete,
        }
    }
}

/// Read-modify-write applied to one member record.
pub type MemberUpdate<'a> = &'a mut dyn FnMut(&mut TeamMember) -> Result<()>;

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Fan-out of store mutations to any number of listeners. Transport-agnostic:
/// the server bridges it onto a broadcast channel, tests collect into a Vec.
#[derive(Default)]
pub struct ChangeFeed {
    listeners: Mutex<Vec<Listener>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push(Arc::new(listener));
        }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // Clone the list so listeners may subscribe or publish re-entrantly.
        let listeners: Vec<Listener> = match self.listeners.lock() {
            Ok(l) => l.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            listener(&event);
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub trait Store: Send + Sync {
    fn feed(&self) -> &ChangeFeed;

    // Members

    fn get_member(&self, id: &str) -> Result<Option<TeamMember>>;

    fn list_members(&self) -> Result<Vec<TeamMember>>;

    /// Insert a new member. Fails with `MemberExists` on a duplicate id or email.
    fn insert_member(&self, member: &TeamMember) -> Result<()>;

    /// Atomic read-modify-write of one member. `f` runs against the persisted
    /// record; if it returns an error nothing is written.
    fn update_member(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut TeamMember) -> Result<()>,
    ) -> Result<TeamMember>;

    fn delete_member(&self, id: &str) -> Result<()>;

    // Commitments

    fn get_commitment(&self, id: &str) -> Result<Option<Commitment>>;

    fn list_commitments(&self, filter: &CommitmentFilter) -> Result<Vec<Commitment>>;

    /// Insert `commitment` unless its member already holds `max_per_week`
    /// commitments for the same week (`CommitmentCapReached`).
    fn insert_commitment(&self, commitment: &Commitment, max_per_week: usize) -> Result<()>;

    /// Replace the stored record with `next` only if the stored status still
    /// equals `expected`. Fails with `ConcurrencyConflict` otherwise.
    ///
    /// `owner` runs against the commitment's member inside the same atomic
    /// write. If it fails, neither record changes. An owner that no longer
    /// exists is skipped and `None` is returned.
    fn transition_commitment(
        &self,
        expected: CommitmentStatus,
        next: &Commitment,
        owner: Option<MemberUpdate<'_>>,
    ) -> Result<Option<TeamMember>>;

    /// Remove and return a commitment.
    fn delete_commitment(&self, id: &str) -> Result<Commitment>;

    // Sessions

    fn get_session(&self, week: WeekId) -> Result<Option<WigSession>>;

    fn list_sessions(&self) -> Result<Vec<WigSession>>;

    /// Atomic read-modify-write of the session slot for `week`. `f` sees
    /// `None` when no session exists and may create one.
    fn update_session(
        &self,
        week: WeekId,
        f: &mut dyn FnMut(&mut Option<WigSession>) -> Result<()>,
    ) -> Result<Option<WigSession>>;

    /// Delete the session for `week`. Returns `false` if none existed.
    fn delete_session(&self, week: WeekId) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_fans_out_to_every_listener() {
        let feed = ChangeFeed::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            feed.subscribe(move |e| {
                seen.lock().unwrap().push(format!("{tag}:{}", e.id));
            });
        }
        feed.publish(ChangeEvent::upsert(Collection::Members, "m1"));
        assert_eq!(*seen.lock().unwrap(), vec!["a:m1", "b:m1"]);
    }
}
