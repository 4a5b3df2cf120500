//! Behaviour every [`Store`] implementation must share. Each backend's test
//! module calls these against a fresh instance.

use super::{ChangeEvent, ChangeFeed, ChangeKind, Collection, MemberUpdate, MemoryStore, Store};
use crate::commitment::{Commitment, CommitmentFilter};
use crate::error::FourdxError;
use crate::member::TeamMember;
use crate::session::WigSession;
use crate::types::{CommitmentStatus, Role};
use crate::week::WeekId;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn week(s: &str) -> WeekId {
    s.parse().unwrap()
}

pub(crate) fn member(id: &str, name: &str) -> TeamMember {
    TeamMember::provision(id, name, &format!("{id}@example.com"), Role::Staff).unwrap()
}

pub(crate) fn commitment(id: &str, member_id: &str, week_id: &str) -> Commitment {
    Commitment {
        id: id.to_string(),
        member_id: member_id.to_string(),
        week_id: week(week_id),
        description: format!("commitment {id}"),
        status: CommitmentStatus::Incomplete,
        created_at: Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap(),
        completion_note: None,
        completion_photo: None,
        lead_measure_id: None,
        lead_measure_name: None,
        aligned_by_ai: false,
    }
}

pub(crate) fn member_primitives(store: &dyn Store) {
    store.insert_member(&member("m1", "Zed")).unwrap();
    store.insert_member(&member("m2", "Ada")).unwrap();

    let names: Vec<String> = store
        .list_members()
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Ada", "Zed"]);

    // Same id, and same email under a different id, both collide.
    assert!(matches!(
        store.insert_member(&member("m1", "Other")),
        Err(FourdxError::MemberExists(_))
    ));
    let mut dup_email = member("m3", "Dup");
    dup_email.email = "m1@example.com".to_string();
    assert!(matches!(
        store.insert_member(&dup_email),
        Err(FourdxError::MemberExists(_))
    ));

    let updated = store
        .update_member("m1", &mut |m| {
            m.adjust_score(50);
            Ok(())
        })
        .unwrap();
    assert_eq!(updated.score, 50);
    assert_eq!(store.get_member("m1").unwrap().unwrap().score, 50);

    assert!(matches!(
        store.update_member("ghost", &mut |_| Ok(())),
        Err(FourdxError::MemberNotFound(_))
    ));

    store.delete_member("m2").unwrap();
    assert!(store.get_member("m2").unwrap().is_none());
    assert!(matches!(
        store.delete_member("m2"),
        Err(FourdxError::MemberNotFound(_))
    ));
}

pub(crate) fn commitment_cap_is_enforced_in_the_write(store: &dyn Store) {
    for id in ["c1", "c2", "c3"] {
        store
            .insert_commitment(&commitment(id, "m1", "2025-W10"), 3)
            .unwrap();
    }
    let err = store
        .insert_commitment(&commitment("c4", "m1", "2025-W10"), 3)
        .unwrap_err();
    assert!(matches!(
        err,
        FourdxError::CommitmentCapReached { limit: 3, .. }
    ));

    // Other weeks and other members are unaffected.
    store
        .insert_commitment(&commitment("c5", "m1", "2025-W11"), 3)
        .unwrap();
    store
        .insert_commitment(&commitment("c6", "m2", "2025-W10"), 3)
        .unwrap();

    let held = store
        .list_commitments(&CommitmentFilter::member_week("m1", week("2025-W10")))
        .unwrap();
    assert_eq!(held.len(), 3);
    assert_eq!(
        store
            .list_commitments(&CommitmentFilter::week(week("2025-W10")))
            .unwrap()
            .len(),
        4
    );
}

pub(crate) fn transition_rejects_stale_status(store: &dyn Store) {
    let c = commitment("c1", "m1", "2025-W10");
    store.insert_commitment(&c, 3).unwrap();

    let mut first = c.clone();
    first.status = CommitmentStatus::Completed;
    store
        .transition_commitment(CommitmentStatus::Incomplete, &first, None)
        .unwrap();

    // A second writer that also observed `incomplete` loses.
    let mut second = c.clone();
    second.status = CommitmentStatus::Partial;
    assert!(matches!(
        store.transition_commitment(CommitmentStatus::Incomplete, &second, None),
        Err(FourdxError::ConcurrencyConflict(_))
    ));
    assert_eq!(
        store.get_commitment("c1").unwrap().unwrap().status,
        CommitmentStatus::Completed
    );

    let mut missing = c.clone();
    missing.id = "nope".to_string();
    assert!(matches!(
        store.transition_commitment(CommitmentStatus::Incomplete, &missing, None),
        Err(FourdxError::CommitmentNotFound(_))
    ));

    let removed = store.delete_commitment("c1").unwrap();
    assert_eq!(removed.status, CommitmentStatus::Completed);
    assert!(store.get_commitment("c1").unwrap().is_none());
}

pub(crate) fn transition_is_all_or_nothing(store: &dyn Store) {
    store.insert_member(&member("m1", "Ada")).unwrap();
    let c = commitment("c1", "m1", "2025-W10");
    store.insert_commitment(&c, 3).unwrap();
    let mut done = c.clone();
    done.status = CommitmentStatus::Completed;

    // The owner write fails after touching the record: nothing lands.
    let err = store
        .transition_commitment(
            CommitmentStatus::Incomplete,
            &done,
            Some(&mut |m: &mut TeamMember| -> crate::Result<()> {
                m.adjust_score(50);
                Err(FourdxError::Store("disk full".to_string()))
            }),
        )
        .unwrap_err();
    assert!(matches!(err, FourdxError::Store(_)));
    assert_eq!(
        store.get_commitment("c1").unwrap().unwrap().status,
        CommitmentStatus::Incomplete
    );
    assert_eq!(store.get_member("m1").unwrap().unwrap().score, 0);

    let owner = store
        .transition_commitment(
            CommitmentStatus::Incomplete,
            &done,
            Some(&mut |m: &mut TeamMember| -> crate::Result<()> {
                m.adjust_score(50);
                Ok(())
            }),
        )
        .unwrap()
        .unwrap();
    assert_eq!(owner.score, 50);
    assert_eq!(store.get_member("m1").unwrap().unwrap().score, 50);
    assert_eq!(
        store.get_commitment("c1").unwrap().unwrap().status,
        CommitmentStatus::Completed
    );

    // An orphaned commitment still transitions; there is no one to score.
    let orphan = commitment("c2", "ghost", "2025-W10");
    store.insert_commitment(&orphan, 3).unwrap();
    let mut orphan_done = orphan.clone();
    orphan_done.status = CommitmentStatus::Completed;
    let owner = store
        .transition_commitment(
            CommitmentStatus::Incomplete,
            &orphan_done,
            Some(&mut |m: &mut TeamMember| -> crate::Result<()> {
                m.adjust_score(50);
                Ok(())
            }),
        )
        .unwrap();
    assert!(owner.is_none());
    assert_eq!(
        store.get_commitment("c2").unwrap().unwrap().status,
        CommitmentStatus::Completed
    );
}

pub(crate) fn session_slot_round_trip(store: &dyn Store) {
    let w = week("2025-W10");
    let now = Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap();
    assert!(store.get_session(w).unwrap().is_none());

    let created = store
        .update_session(w, &mut |slot| {
            assert!(slot.is_none());
            *slot = Some(WigSession::scheduled(w, now));
            Ok(())
        })
        .unwrap()
        .unwrap();
    assert_eq!(created.id, "wig-2025-W10");

    store
        .update_session(w, &mut |slot| {
            if let Some(s) = slot {
                s.notes = "ship the dashboard".to_string();
            }
            Ok(())
        })
        .unwrap();
    let stored = store.get_session(w).unwrap().unwrap();
    assert_eq!(stored.notes, "ship the dashboard");
    assert_eq!(store.list_sessions().unwrap().len(), 1);

    assert!(store.delete_session(w).unwrap());
    assert!(!store.delete_session(w).unwrap());
    assert!(store.get_session(w).unwrap().is_none());
}

pub(crate) fn mutations_publish_change_events(store: &dyn Store) {
    let seen: Arc<Mutex<Vec<ChangeEvent>>> = Arc::default();
    let sink = Arc::clone(&seen);
    store
        .feed()
        .subscribe(move |e| sink.lock().unwrap().push(e.clone()));

    store.insert_member(&member("m1", "Ada")).unwrap();
    store
        .insert_commitment(&commitment("c1", "m1", "2025-W10"), 3)
        .unwrap();
    store.delete_commitment("c1").unwrap();
    // A rejected write publishes nothing.
    let _ = store.insert_member(&member("m1", "Ada"));

    let events = seen.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            ChangeEvent::upsert(Collection::Members, "m1"),
            ChangeEvent::upsert(Collection::Commitments, "c1"),
            ChangeEvent::delete(Collection::Commitments, "c1"),
        ]
    );
    assert_eq!(events[2].kind, ChangeKind::Delete);
}

pub(crate) fn failed_update_writes_nothing(store: &dyn Store) {
    store.insert_member(&member("m1", "Ada")).unwrap();
    let err = store
        .update_member("m1", &mut |m| {
            m.adjust_score(500);
            Err(FourdxError::ConcurrencyConflict("m1".to_string()))
        })
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.get_member("m1").unwrap().unwrap().score, 0);

    let w = week("2025-W10");
    let _ = store.update_session(w, &mut |slot| {
        *slot = Some(WigSession::scheduled(w, Utc::now()));
        Err(FourdxError::InvalidStep(9))
    });
    assert!(store.get_session(w).unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Faulty
// ---------------------------------------------------------------------------

/// Delegates to a [`MemoryStore`] but can be told to misbehave: lose the next
/// `conflicts` transitions to a phantom writer, fail the next
/// `owner_failures` score writes, or hand out a stale member snapshot once.
#[derive(Default)]
pub(crate) struct Faulty {
    pub inner: MemoryStore,
    pub conflicts: AtomicUsize,
    pub owner_failures: AtomicUsize,
    pub stale_member: Mutex<Option<TeamMember>>,
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl Store for Faulty {
    fn feed(&self) -> &ChangeFeed {
        self.inner.feed()
    }
    fn get_member(&self, id: &str) -> crate::Result<Option<TeamMember>> {
        if let Some(stale) = self.stale_member.lock().unwrap().take() {
            return Ok(Some(stale));
        }
        self.inner.get_member(id)
    }
    fn list_members(&self) -> crate::Result<Vec<TeamMember>> {
        self.inner.list_members()
    }
    fn insert_member(&self, m: &TeamMember) -> crate::Result<()> {
        self.inner.insert_member(m)
    }
    fn update_member(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut TeamMember) -> crate::Result<()>,
    ) -> crate::Result<TeamMember> {
        self.inner.update_member(id, f)
    }
    fn delete_member(&self, id: &str) -> crate::Result<()> {
        self.inner.delete_member(id)
    }
    fn get_commitment(&self, id: &str) -> crate::Result<Option<Commitment>> {
        self.inner.get_commitment(id)
    }
    fn list_commitments(&self, f: &CommitmentFilter) -> crate::Result<Vec<Commitment>> {
        self.inner.list_commitments(f)
    }
    fn insert_commitment(&self, c: &Commitment, max: usize) -> crate::Result<()> {
        self.inner.insert_commitment(c, max)
    }
    fn transition_commitment(
        &self,
        expected: CommitmentStatus,
        next: &Commitment,
        owner: Option<MemberUpdate<'_>>,
    ) -> crate::Result<Option<TeamMember>> {
        if take_one(&self.conflicts) {
            return Err(FourdxError::ConcurrencyConflict(next.id.clone()));
        }
        match owner {
            Some(f) if take_one(&self.owner_failures) => self.inner.transition_commitment(
                expected,
                next,
                Some(&mut |m: &mut TeamMember| -> crate::Result<()> {
                    f(m)?;
                    Err(FourdxError::Store("disk full".to_string()))
                }),
            ),
            owner => self.inner.transition_commitment(expected, next, owner),
        }
    }
    fn delete_commitment(&self, id: &str) -> crate::Result<Commitment> {
        self.inner.delete_commitment(id)
    }
    fn get_session(&self, w: WeekId) -> crate::Result<Option<WigSession>> {
        self.inner.get_session(w)
    }
    fn list_sessions(&self) -> crate::Result<Vec<WigSession>> {
        self.inner.list_sessions()
    }
    fn update_session(
        &self,
        w: WeekId,
        f: &mut dyn FnMut(&mut Option<WigSession>) -> crate::Result<()>,
    ) -> crate::Result<Option<WigSession>> {
        self.inner.update_session(w, f)
    }
    fn delete_session(&self, w: WeekId) -> crate::Result<bool> {
        self.inner.delete_session(w)
    }
}
