//! Points, streaks and achievements.
//!
//! Two entry points mutate member state. [`apply_status_change`] persists a
//! commitment status change and its score delta as one compare-and-swap
//! write, so each real transition is scored exactly once or not at all.
//! [`settle_member`] runs the weekly rollover inside the store's atomic member
//! update and re-checks the `last_active_week_id` guard there, so concurrent
//! callers settle a week at most once.

use crate::attribution;
use crate::commitment::{Commitment, CommitmentFilter};
use crate::context::OpContext;
use crate::error::Result;
use crate::member::{AchievementUnlock, TeamMember};
use crate::types::CommitmentStatus;
use crate::week::{self, WeekId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

pub const COMPLETION_POINTS: i64 = 50;
pub const PERFECT_WEEK_BONUS: u32 = 100;
pub const STREAK_MILESTONE_BONUS: u32 = 250;
pub const STREAK_MILESTONE_EVERY: u32 = 5;

// ---------------------------------------------------------------------------
// Per-transition scoring
// ---------------------------------------------------------------------------

/// Score delta for one status transition.
pub fn points_for(previous: CommitmentStatus, new: CommitmentStatus) -> i64 {
    match (previous.is_completed(), new.is_completed()) {
        (false, true) => COMPLETION_POINTS,
        (true, false) => -COMPLETION_POINTS,
        _ => 0,
    }
}

/// Lead-measure progress delta: the same direction as the points, one unit.
fn progress_for(previous: CommitmentStatus, new: CommitmentStatus) -> i64 {
    points_for(previous, new).signum()
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    unlocked_by: fn(&TeamMember) -> bool,
}

impl Achievement {
    pub fn is_met(&self, member: &TeamMember) -> bool {
        (self.unlocked_by)(member)
    }
}

/// Evaluated in this order.
pub const ACHIEVEMENTS: [Achievement; 3] = [
    Achievement {
        id: "first-step",
        title: "First Step",
        description: "Completed your first commitment.",
        icon: "footprints",
        unlocked_by: |m| m.score >= 50,
    },
    Achievement {
        id: "consistency-king",
        title: "Consistency King",
        description: "Three perfect weeks in a row.",
        icon: "crown",
        unlocked_by: |m| m.streak >= 3,
    },
    Achievement {
        id: "strategy-master",
        title: "Strategy Master",
        description: "Reached 1000 points.",
        icon: "trophy",
        unlocked_by: |m| m.score >= 1000,
    },
];

/// Append every catalog achievement the member now qualifies for and does not
/// already hold. Returns the new unlocks. Unlocks are never removed.
pub fn check_achievements(member: &mut TeamMember, now: DateTime<Utc>) -> Vec<AchievementUnlock> {
    let mut unlocked = Vec::new();
    for a in &ACHIEVEMENTS {
        if member.has_achievement(a.id) || !a.is_met(member) {
            continue;
        }
        let unlock = AchievementUnlock {
            id: a.id.to_string(),
            title: a.title.to_string(),
            description: a.description.to_string(),
            icon: a.icon.to_string(),
            unlocked_at: now,
        };
        member.achievements.push(unlock.clone());
        unlocked.push(unlock);
    }
    unlocked
}

// ---------------------------------------------------------------------------
// Weekly rollover
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RolloverOutcome {
    /// `last_week` is not yet over.
    NotDue,
    /// The member was already settled for `last_week` or a later week.
    AlreadySettled,
    /// No commitments in `last_week`; only the marker moved.
    NoCommitments,
    /// Every commitment completed.
    Perfect { streak: u32, bonus: u32 },
    /// At least one commitment left open; the streak reset.
    StreakBroken { previous_streak: u32 },
}

impl RolloverOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, RolloverOutcome::NotDue | RolloverOutcome::AlreadySettled)
    }
}

pub fn is_settled(member: &TeamMember, last_week: WeekId) -> bool {
    member
        .last_active_week_id
        .is_some_and(|settled| settled >= last_week)
}

/// Settle `member` for `last_week`. Pure and idempotent: the marker is set
/// last, and a second call for the same week is a no-op.
pub fn process_weekly_transition(
    member: &mut TeamMember,
    last_week: WeekId,
    current_week: WeekId,
    commitments: &[Commitment],
) -> RolloverOutcome {
    if !week::is_past(last_week, current_week) {
        return RolloverOutcome::NotDue;
    }
    if is_settled(member, last_week) {
        return RolloverOutcome::AlreadySettled;
    }

    let mine: Vec<&Commitment> = commitments
        .iter()
        .filter(|c| c.member_id == member.id && c.week_id == last_week)
        .collect();

    let outcome = if mine.is_empty() {
        RolloverOutcome::NoCommitments
    } else if mine.iter().all(|c| c.status.is_completed()) {
        member.streak += 1;
        member.longest_streak = member.longest_streak.max(member.streak);
        let mut bonus = PERFECT_WEEK_BONUS;
        if member.streak % STREAK_MILESTONE_EVERY == 0 {
            bonus += STREAK_MILESTONE_BONUS;
        }
        member.adjust_score(i64::from(bonus));
        RolloverOutcome::Perfect {
            streak: member.streak,
            bonus,
        }
    } else {
        let previous_streak = member.streak;
        member.streak = 0;
        RolloverOutcome::StreakBroken { previous_streak }
    };

    member.last_active_week_id = Some(last_week);
    outcome
}

// ---------------------------------------------------------------------------
// Store-backed operations
// ---------------------------------------------------------------------------

/// Persist `next` over a record last seen with status `previous` and score
/// the transition in the same store write. Adjusts score and the resolved
/// lead measure's progress, then evaluates achievements. Returns the updated
/// member, or `None` when the transition is worth nothing or the member no
/// longer exists.
pub fn apply_status_change(
    ctx: &OpContext<'_>,
    previous: CommitmentStatus,
    next: &Commitment,
) -> Result<Option<TeamMember>> {
    let points = points_for(previous, next.status);
    if points == 0 {
        ctx.store.transition_commitment(previous, next, None)?;
        return Ok(None);
    }
    let progress = progress_for(previous, next.status);
    let measure_id =
        attribution::resolve_measure(next, &ctx.config.lead_measures).map(|m| m.id.clone());

    let mut unlocked = Vec::new();
    let mut score = |m: &mut TeamMember| -> Result<()> {
        m.adjust_score(points);
        if let Some(id) = &measure_id {
            m.adjust_progress(id, progress);
        }
        unlocked = check_achievements(m, ctx.now);
        Ok(())
    };
    let owner = ctx
        .store
        .transition_commitment(previous, next, Some(&mut score))?;

    match owner {
        Some(member) => {
            info!(
                member = %member.id,
                commitment = %next.id,
                from = %previous.as_str(),
                to = %next.status.as_str(),
                points,
                score = member.score,
                "score adjusted"
            );
            for a in &unlocked {
                info!(member = %member.id, achievement = %a.id, "achievement unlocked");
            }
            Ok(Some(member))
        }
        None => {
            warn!(member = %next.member_id, commitment = %next.id, "commitment owner missing; score not applied");
            Ok(None)
        }
    }
}

/// Opportunistic weekly rollover for one member against the week before the
/// context's current week.
pub fn settle_member(ctx: &OpContext<'_>, member_id: &str) -> Result<RolloverOutcome> {
    let current = ctx.current_week();
    let last = week::previous_week_id(current);

    let member = ctx
        .store
        .get_member(member_id)?
        .ok_or_else(|| crate::FourdxError::MemberNotFound(member_id.to_string()))?;
    if is_settled(&member, last) {
        debug!(member = %member_id, week = %last, "already settled");
        return Ok(RolloverOutcome::AlreadySettled);
    }

    let commitments = ctx
        .store
        .list_commitments(&CommitmentFilter::member_week(member_id, last))?;

    let mut outcome = RolloverOutcome::AlreadySettled;
    let mut unlocked = Vec::new();
    ctx.store.update_member(member_id, &mut |m| {
        // Another writer may have settled between the read above and here.
        outcome = process_weekly_transition(m, last, current, &commitments);
        if outcome.changed() {
            unlocked = check_achievements(m, ctx.now);
        }
        Ok(())
    })?;

    if outcome.changed() {
        info!(member = %member_id, week = %last, outcome = ?outcome, "weekly rollover");
        for a in &unlocked {
            info!(member = %member_id, achievement = %a.id, "achievement unlocked");
        }
    }
    Ok(outcome)
}

/// Settle every member of the roster. Returns `(member id, outcome)` pairs.
pub fn settle_all(ctx: &OpContext<'_>) -> Result<Vec<(String, RolloverOutcome)>> {
    let mut out = Vec::new();
    for m in ctx.store.list_members()? {
        let outcome = settle_member(ctx, &m.id)?;
        out.push((m.id, outcome));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
