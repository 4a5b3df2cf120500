//! redb-backed store.
//!
//! # Table design
//!
//! Three tables, each keyed by a string and holding JSON-encoded records:
//!
//! ```text
//! members      member id        -> TeamMember
//! commitments  commitment id    -> Commitment
//! sessions     week id (string) -> WigSession
//! ```
//!
//! Every primitive runs inside a single write transaction. redb admits one
//! writer at a time, so the cap check, the compare-and-swap and the member
//! read-modify-write are atomic with respect to each other. A commitment
//! transition writes the commitments and members tables in one transaction,
//! so a status change never lands without its score. A primitive that fails
//! aborts its transaction and leaves the file untouched.

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ChangeEvent, ChangeFeed, Collection, MemberUpdate, Store};
use crate::commitment::{Commitment, CommitmentFilter};
use crate::error::{FourdxError, Result};
use crate::member::TeamMember;
use crate::session::WigSession;
use crate::types::CommitmentStatus;
use crate::week::WeekId;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const MEMBERS: TableDefinition<&str, &[u8]> = TableDefinition::new("members");
const COMMITMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("commitments");
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

fn store_err(e: impl std::fmt::Display) -> FourdxError {
    FourdxError::Store(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(store_err)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(store_err)
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

pub struct RedbStore {
    db: Database,
    feed: ChangeFeed,
}

impl RedbStore {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(MEMBERS).map_err(store_err)?;
        wt.open_table(COMMITMENTS).map_err(store_err)?;
        wt.open_table(SESSIONS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self {
            db,
            feed: ChangeFeed::new(),
        })
    }

    /// Run `f` in one write transaction: commit on `Ok`, abort on `Err`.
    fn write<T>(&self, f: impl FnOnce(&WriteTransaction) -> Result<T>) -> Result<T> {
        let wt = self.db.begin_write().map_err(store_err)?;
        match f(&wt) {
            Ok(value) => {
                wt.commit().map_err(store_err)?;
                Ok(value)
            }
            Err(e) => {
                wt.abort().map_err(store_err)?;
                Err(e)
            }
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(table).map_err(store_err)?;
        let value = match table.get(key).map_err(store_err)? {
            Some(v) => Some(decode(v.value())?),
            None => None,
        };
        Ok(value)
    }

    fn scan<T: DeserializeOwned>(&self, table: TableDefinition<&str, &[u8]>) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let table = rt.open_table(table).map_err(store_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(store_err)? {
            let (_, v) = entry.map_err(store_err)?;
            out.push(decode(v.value())?);
        }
        Ok(out)
    }
}

impl Store for RedbStore {
    fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn get_member(&self, id: &str) -> Result<Option<TeamMember>> {
        self.get(MEMBERS, id)
    }

    fn list_members(&self) -> Result<Vec<TeamMember>> {
        let mut members: Vec<TeamMember> = self.scan(MEMBERS)?;
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    fn insert_member(&self, member: &TeamMember) -> Result<()> {
        let value = encode(member)?;
        self.write(|wt| {
            let mut table = wt.open_table(MEMBERS).map_err(store_err)?;
            let mut taken = table.get(member.id.as_str()).map_err(store_err)?.is_some();
            if !taken {
                for entry in table.iter().map_err(store_err)? {
                    let (_, v) = entry.map_err(store_err)?;
                    let existing: TeamMember = decode(v.value())?;
                    if existing.email == member.email {
                        taken = true;
                        break;
                    }
                }
            }
            if taken {
                return Err(FourdxError::MemberExists(member.id.clone()));
            }
            table
                .insert(member.id.as_str(), value.as_slice())
                .map_err(store_err)?;
            Ok(())
        })?;
        self.feed
            .publish(ChangeEvent::upsert(Collection::Members, &member.id));
        Ok(())
    }

    fn update_member(
        &self,
        id: &str,
        f: &mut dyn FnMut(&mut TeamMember) -> Result<()>,
    ) -> Result<TeamMember> {
        let updated = self.write(|wt| {
            let mut table = wt.open_table(MEMBERS).map_err(store_err)?;
            let mut member: TeamMember = match table.get(id).map_err(store_err)? {
                Some(v) => decode(v.value())?,
                None => return Err(FourdxError::MemberNotFound(id.to_string())),
            };
            f(&mut member)?;
            let value = encode(&member)?;
            table.insert(id, value.as_slice()).map_err(store_err)?;
            Ok(member)
        })?;
        self.feed.publish(ChangeEvent::upsert(Collection::Members, id));
        Ok(updated)
    }

    fn delete_member(&self, id: &str) -> Result<()> {
        self.write(|wt| {
            let mut table = wt.open_table(MEMBERS).map_err(store_err)?;
            let removed = table.remove(id).map_err(store_err)?.is_some();
            if !removed {
                return Err(FourdxError::MemberNotFound(id.to_string()));
            }
            Ok(())
        })?;
        self.feed.publish(ChangeEvent::delete(Collection::Members, id));
        Ok(())
    }

    fn get_commitment(&self, id: &str) -> Result<Option<Commitment>> {
        self.get(COMMITMENTS, id)
    }

    fn list_commitments(&self, filter: &CommitmentFilter) -> Result<Vec<Commitment>> {
        let mut list: Vec<Commitment> = self
            .scan::<Commitment>(COMMITMENTS)?
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(list)
    }

    fn insert_commitment(&self, commitment: &Commitment, max_per_week: usize) -> Result<()> {
        let value = encode(commitment)?;
        self.write(|wt| {
            let mut table = wt.open_table(COMMITMENTS).map_err(store_err)?;
            let mut held = 0usize;
            for entry in table.iter().map_err(store_err)? {
                let (_, v) = entry.map_err(store_err)?;
                let c: Commitment = decode(v.value())?;
                if c.member_id == commitment.member_id && c.week_id == commitment.week_id {
                    held += 1;
                }
            }
            if held >= max_per_week {
                return Err(FourdxError::CommitmentCapReached {
                    member: commitment.member_id.clone(),
                    week: commitment.week_id.to_string(),
                    limit: max_per_week,
                });
            }
            table
                .insert(commitment.id.as_str(), value.as_slice())
                .map_err(store_err)?;
            Ok(())
        })?;
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
        let value = encode(next)?;
        let updated = self.write(|wt| {
            let mut commitments = wt.open_table(COMMITMENTS).map_err(store_err)?;
            let current: Commitment = match commitments.get(next.id.as_str()).map_err(store_err)? {
                Some(v) => decode(v.value())?,
                None => return Err(FourdxError::CommitmentNotFound(next.id.clone())),
            };
            if current.status != expected {
                return Err(FourdxError::ConcurrencyConflict(next.id.clone()));
            }

            let mut updated = None;
            if let Some(f) = owner {
                let mut members = wt.open_table(MEMBERS).map_err(store_err)?;
                let found: Option<TeamMember> =
                    match members.get(next.member_id.as_str()).map_err(store_err)? {
                        Some(v) => Some(decode(v.value())?),
                        None => None,
                    };
                if let Some(mut member) = found {
                    f(&mut member)?;
                    let encoded = encode(&member)?;
                    members
                        .insert(member.id.as_str(), encoded.as_slice())
                        .map_err(store_err)?;
                    updated = Some(member);
                }
            }

            commitments
                .insert(next.id.as_str(), value.as_slice())
                .map_err(store_err)?;
            Ok(updated)
        })?;
        self.feed
            .publish(ChangeEvent::upsert(Collection::Commitments, &next.id));
        if let Some(m) = &updated {
            self.feed.publish(ChangeEvent::upsert(Collection::Members, &m.id));
        }
        Ok(updated)
    }

    fn delete_commitment(&self, id: &str) -> Result<Commitment> {
        let removed = self.write(|wt| {
            let mut table = wt.open_table(COMMITMENTS).map_err(store_err)?;
            let removed: Option<Commitment> = match table.remove(id).map_err(store_err)? {
                Some(v) => Some(decode(v.value())?),
                None => None,
            };
            removed.ok_or_else(|| FourdxError::CommitmentNotFound(id.to_string()))
        })?;
        self.feed
            .publish(ChangeEvent::delete(Collection::Commitments, id));
        Ok(removed)
    }

    fn get_session(&self, week: WeekId) -> Result<Option<WigSession>> {
        self.get(SESSIONS, &week.to_string())
    }

    fn list_sessions(&self) -> Result<Vec<WigSession>> {
        // String keys of the form YYYY-Www sort chronologically.
        self.scan(SESSIONS)
    }

    fn update_session(
        &self,
        week: WeekId,
        f: &mut dyn FnMut(&mut Option<WigSession>) -> Result<()>,
    ) -> Result<Option<WigSession>> {
        let key = week.to_string();
        let (slot, existed) = self.write(|wt| {
            let mut table = wt.open_table(SESSIONS).map_err(store_err)?;
            let mut slot: Option<WigSession> = match table.get(key.as_str()).map_err(store_err)? {
                Some(v) => Some(decode(v.value())?),
                None => None,
            };
            let existed = slot.is_some();
            f(&mut slot)?;
            match &slot {
                Some(s) => {
                    let value = encode(s)?;
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(store_err)?;
                }
                None => {
                    table.remove(key.as_str()).map_err(store_err)?;
                }
            }
            Ok((slot, existed))
        })?;
        match (&slot, existed) {
            (Some(_), _) => self.feed.publish(ChangeEvent::upsert(Collection::Sessions, key)),
            (None, true) => self.feed.publish(ChangeEvent::delete(Collection::Sessions, key)),
            (None, false) => {}
        }
        Ok(slot)
    }

    fn delete_session(&self, week: WeekId) -> Result<bool> {
        let key = week.to_string();
        let removed = self.write(|wt| {
            let mut table = wt.open_table(SESSIONS).map_err(store_err)?;
            let removed = table.remove(key.as_str()).map_err(store_err)?.is_some();
            Ok(removed)
        })?;
        if removed {
            self.feed
                .publish(ChangeEvent::delete(Collection::Sessions, key));
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
