use super::{ChangeEvent, ChangeFeed, Collection, MemberUpdate, Store};
use crate::commitment::{Commitment, CommitmentFilter};
use crate::error::{FourdxError, Result};
use crate::member::TeamMember;
use crate::session::WigSession;
use crate::types::CommitmentStatus;
use crate::week::WeekId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Collections {
    members: BTreeMap<String, TeamMember>,
    commitments: BTreeMap<String, Commitment>,
    sessions: BTreeMap<WeekId, WigSession>,
}

/// In-process store. One mutex covers every collection, so each primitive is
/// trivially atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
    feed: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| FourdxError::Store("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn get_member(&self, id: &str) -> Result<Option<TeamMember>> {
        Ok(self.lock()?.members.get(id).cloned())
    }

    fn list_members(&self) -> Result<Vec<TeamMember>> {
        let mut members: Vec<TeamMember> = self.lock()?.members.values().cloned().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    fn insert_member(&self, member: &TeamMember) -> Result<()> {
        {
            let mut inner = self.lock()?;
            if inner.members.contains_key(&member.id)
                || inner.members.values().any(|m| m.email == member.email)
            {
                return Err(FourdxError::MemberExists(member.id.clone()));
            }
            inner.members.insert(member.id.clone(), member.clone());
        }
        self.feed
            .publish(ChangeEvent::upsert(Collection::Members, &member.id));
        Ok(())
    }

    fn update_member(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut TeamMember) -> Result<()>,
    ) -> Result<TeamMember> {
        let updated = {
            let mut inner = self.lock()?;
            let mut member = inner
                .members
                .get(id)
                .cloned()
                .ok_or_else(|| FourdxError::MemberNotFound(id.to_string()))?;
            f(&mut member)?;
            inner.members.insert(id.to_string(), member.clone());
            member
        };
        self.feed.publish(ChangeEvent::upsert(Collection::Members, id));
        Ok(updated)
    }

    fn delete_member(&self, id: &str) -> Result<()> {
        if self.lock()?.members.remove(id).is_none() {
            return Err(FourdxError::MemberNotFound(id.to_string()));
        }
        self.feed.publish(ChangeEvent::delete(Collection::Members, id));
        Ok(())
    }

    fn get_commitment(&self, id: &str) -> Result<Option<Commitment>> {
        Ok(self.lock()?.commitments.get(id).cloned())
    }

    fn list_commitments(&self, filter: &CommitmentFilter) -> Result<Vec<Commitment>> {
        let mut list: Vec<Commitment> = self
            .lock()?
            .commitments
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    fn insert_commitment(&self, commitment: &Commitment, max_per_week: usize) -> Result<()> {
        {
            let mut inner = self.lock()?;
            let held = inner
                .commitments
                .values()
                .filter(|c| c.member_id == commitment.member_id && c.week_id == commitment.week_id)
                .count();
            if held >= max_per_week {
                return Err(FourdxError::CommitmentCapReached {
                    member: commitment.member_id.clone(),
                    week: commitment.week_id.to_string(),
                    limit: max_per_week,
                });
            }
            inner
                .commitments
                .insert(commitment.id.clone(), commitment.clone());
        }
        self.feed
            .publish(ChangeEvent::upsert(Collection::Commitments, &commitment.id));
        Ok(())
    }

    fn transition_commitment(
        &self,
        expected: CommitmentStatus,
        next: &Commitment,
        owner: Option<MemberUpdate<'_>>,
    ) -> Result<Option<TeamMember>> {
        let updated = {
            let mut inner = self.lock()?;
            let current = inner
                .commitments
                .get(&next.id)
                .ok_or_else(|| FourdxError::CommitmentNotFound(next.id.clone()))?;
            if current.status != expected {
                return Err(FourdxError::ConcurrencyConflict(next.id.clone()));
            }
            let updated = match (owner, inner.members.get(&next.member_id)) {
                (Some(f), Some(member)) => {
                    let mut member = member.clone();
                    f(&mut member)?;
                    Some(member)
                }
                _ => None,
            };
            inner.commitments.insert(next.id.clone(), next.clone());
            if let Some(m) = &updated {
                inner.members.insert(m.id.clone(), m.clone());
            }
            updated
        };
        self.feed
            .publish(ChangeEvent::upsert(Collection::Commitments, &next.id));
        if let Some(m) = &updated {
            self.feed.publish(ChangeEvent::upsert(Collection::Members, &m.id));
        }
        Ok(updated)
    }

    fn delete_commitment(&self, id: &str) -> Result<Commitment> {
        let removed = self
            .lock()?
            .commitments
            .remove(id)
            .ok_or_else(|| FourdxError::CommitmentNotFound(id.to_string()))?;
        self.feed
            .publish(ChangeEvent::delete(Collection::Commitments, id));
        Ok(removed)
    }

    fn get_session(&self, week: WeekId) -> Result<Option<WigSession>> {
        Ok(self.lock()?.sessions.get(&week).cloned())
    }

    fn list_sessions(&self) -> Result<Vec<WigSession>> {
        Ok(self.lock()?.sessions.values().cloned().collect())
    }

    fn update_session(
        &self,
        week: WeekId,
        f: &mut dyn FnMut(&mut Option<WigSession>) -> Result<()>,
    ) -> Result<Option<WigSession>> {
        let (slot, existed) = {
            let mut inner = self.lock()?;
            let mut slot = inner.sessions.get(&week).cloned();
            let existed = slot.is_some();
            f(&mut slot)?;
            match &slot {
                Some(s) => {
                    inner.sessions.insert(week, s.clone());
                }
                None => {
                    inner.sessions.remove(&week);
                }
            }
            (slot, existed)
        };
        let id = week.to_string();
        match (&slot, existed) {
            (Some(_), _) => self.feed.publish(ChangeEvent::upsert(Collection::Sessions, id)),
            (None, true) => self.feed.publish(ChangeEvent::delete(Collection::Sessions, id)),
            (None, false) => {}
        }
        Ok(slot)
    }

    fn delete_session(&self, week: WeekId) -> Result<bool> {
        let removed = self.lock()?.sessions.remove(&week).is_some();
        if removed {
            self.feed
                .publish(ChangeEvent::delete(Collection::Sessions, week.to_string()));
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn member_primitives() {
        conformance::member_primitives(&MemoryStore::new());
    }

    #[test]
    fn commitment_cap_is_enforced_in_the_write() {
        conformance::commitment_cap_is_enforced_in_the_write(&MemoryStore::new());
    }

    #[test]
    fn transition_rejects_stale_status() {
        conformance::transition_rejects_stale_status(&MemoryStore::new());
    }

    #[test]
    fn transition_is_all_or_nothing() {
        conformance::transition_is_all_or_nothing(&MemoryStore::new());
    }

    #[test]
    fn session_slot_round_trip() {
        conformance::session_slot_round_trip(&MemoryStore::new());
    }

    #[test]
    fn mutations_publish_change_events() {
        conformance::mutations_publish_change_events(&MemoryStore::new());
    }

    #[test]
    fn failed_update_writes_nothing() {
        conformance::failed_update_writes_nothing(&MemoryStore::new());
    }
}
