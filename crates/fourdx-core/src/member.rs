use crate::context::OpContext;
use crate::error::{FourdxError, Result};
use crate::types::Role;
use crate::week::WeekId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AchievementUnlock
// ---------------------------------------------------------------------------

/// A catalog achievement instantiated for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementUnlock {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub unlocked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// TeamMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub job_title: String,
    pub avatar: String,
    #[serde(default)]
    pub lead_measure_progress: BTreeMap<String, u32>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub achievements: Vec<AchievementUnlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_week_id: Option<WeekId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    /// Pre-lead-measure counters kept on old records. Read only by the
    /// dashboard rollup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walks_completed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_actions_completed: Option<u32>,
}

impl TeamMember {
    /// Build a freshly provisioned member with every gamification field zeroed.
    pub fn provision(
        id: impl Into<String>,
        name: impl Into<String>,
        email: &str,
        role: Role,
    ) -> Result<Self> {
        let id = id.into();
        let name = name.into();
        let email = email.trim().to_lowercase();
        if id.trim().is_empty() {
            return Err(FourdxError::InvalidMember("id must not be empty".into()));
        }
        if name.trim().is_empty() {
            return Err(FourdxError::InvalidMember("name must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(FourdxError::InvalidMember(format!(
                "'{email}' is not an email address"
            )));
        }
        Ok(Self {
            avatar: initials(&name),
            id,
            name,
            email,
            role,
            job_title: "Team Member".to_string(),
            lead_measure_progress: BTreeMap::new(),
            score: 0,
            streak: 0,
            longest_streak: 0,
            achievements: Vec::new(),
            last_active_week_id: None,
            last_login: None,
            walks_completed: None,
            value_actions_completed: None,
        })
    }

    /// A member counts toward team targets only when it has a real identifier.
    pub fn is_active(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    /// Add `delta` to the score, flooring at zero.
    pub fn adjust_score(&mut self, delta: i64) {
        self.score = clamp_add(self.score, delta);
    }

    /// Add `delta` to one lead measure's cumulative count, flooring at zero.
    pub fn adjust_progress(&mut self, measure_id: &str, delta: i64) {
        let entry = self
            .lead_measure_progress
            .entry(measure_id.to_string())
            .or_insert(0);
        *entry = clamp_add(*entry, delta);
    }
}

// ---------------------------------------------------------------------------
// MemberPatch
// ---------------------------------------------------------------------------

/// Profile edits. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        *self == MemberPatch::default()
    }

    /// Merge into `member`. A new name also refreshes the avatar initials.
    pub fn apply(&self, member: &mut TeamMember) -> Result<()> {
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(FourdxError::InvalidMember("name must not be empty".into()));
            }
            member.name = name.to_string();
            member.avatar = initials(name);
        }
        if let Some(job_title) = &self.job_title {
            member.job_title = job_title.trim().to_string();
        }
        if let Some(role) = self.role {
            member.role = role;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Roster operations
// ---------------------------------------------------------------------------

/// Provision a member and add it to the roster. A missing id gets a fresh uuid.
pub fn add(
    ctx: &OpContext<'_>,
    id: Option<&str>,
    name: &str,
    email: &str,
    role: Role,
) -> Result<TeamMember> {
    let id = match id {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };
    let member = TeamMember::provision(id, name, email, role)?;
    ctx.store.insert_member(&member)?;
    info!(member = %member.id, role = %member.role, "member provisioned");
    Ok(member)
}

pub fn get(ctx: &OpContext<'_>, id: &str) -> Result<TeamMember> {
    ctx.store
        .get_member(id)?
        .ok_or_else(|| FourdxError::MemberNotFound(id.to_string()))
}

pub fn list(ctx: &OpContext<'_>) -> Result<Vec<TeamMember>> {
    ctx.store.list_members()
}

/// Edit a member's profile. Members may edit their own name and job title;
/// role changes and edits to anyone else need ADMIN or MANAGER.
pub fn update(ctx: &OpContext<'_>, id: &str, patch: &MemberPatch) -> Result<TeamMember> {
    if patch.role.is_some() || ctx.actor_id() != Some(id) {
        ctx.require_privileged("edit another member's profile or role")?;
    }
    let updated = ctx.store.update_member(id, &mut |m| patch.apply(m))?;
    info!(member = %id, role = %updated.role, "member profile updated");
    Ok(updated)
}

/// Take a member off the roster. ADMIN or MANAGER only, and never oneself.
/// Their commitments stay on record and keep counting toward past weeks.
pub fn remove(ctx: &OpContext<'_>, id: &str) -> Result<TeamMember> {
    let actor = ctx.require_privileged("remove a team member")?;
    if actor.id == id {
        return Err(FourdxError::InvalidMember(
            "members cannot remove themselves".into(),
        ));
    }
    let removed = get(ctx, id)?;
    ctx.store.delete_member(id)?;
    info!(member = %id, by = %actor.id, "member removed");
    Ok(removed)
}

/// Stamp `last_login` for a member who just showed up.
pub fn touch(ctx: &OpContext<'_>, id: &str) -> Result<TeamMember> {
    let now = ctx.now;
    ctx.store.update_member(id, &mut |m| {
        m.last_login = Some(now);
        Ok(())
    })
}

fn clamp_add(value: u32, delta: i64) -> u32 {
    (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

/// Up to two upper-case initials from a display name: "Jane van Dyke" → "JV".
pub fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .filter(|c| c.is_alphanumeric())
        .take(2)
        .flat_map(|c| c.to_uppercase())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
