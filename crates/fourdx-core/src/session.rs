//! The weekly WIG session: a five-step agenda run by the whole team.
//!
//! ```text
//! (none) ──schedule──▶ scheduled ──start──▶ in_progress(1..=5) ──advance@5──▶ completed
//!    ▲                                                                          │
//!    └──────────────────────────── reset (ADMIN/MANAGER) ◀──────────────────────┘
//! ```
//!
//! Steps only move forward in live mode. A completed session can be walked
//! again through a [`ReviewCursor`], which never touches the stored record.

use crate::commitment::{Commitment, CommitmentFilter};
use crate::context::OpContext;
use crate::dashboard::{self, WeekDashboard};
use crate::error::{FourdxError, Result};
use crate::scoring;
use crate::types::SessionStatus;
use crate::week::{self, WeekId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const STEP_COUNT: u8 = 5;

// ---------------------------------------------------------------------------
// Agenda
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepInput {
    None,
    Notes,
    Obstacles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgendaStep {
    pub number: u8,
    pub title: &'static str,
    pub prompt: &'static str,
    pub duration_minutes: u32,
    pub input: StepInput,
}

pub const AGENDA: [AgendaStep; STEP_COUNT as usize] = [
    AgendaStep {
        number: 1,
        title: "Review Scoreboard",
        prompt: "Are we winning? Check the WIG score, then the lag and lead measures.",
        duration_minutes: 5,
        input: StepInput::None,
    },
    AgendaStep {
        number: 2,
        title: "Account for Commitments",
        prompt: "Go through last week's commitments. Did we do what we said we would?",
        duration_minutes: 10,
        input: StepInput::None,
    },
    AgendaStep {
        number: 3,
        title: "Learn from Success/Failure",
        prompt: "What worked and what got in the way? Capture quick wins and blockers.",
        duration_minutes: 5,
        input: StepInput::Notes,
    },
    AgendaStep {
        number: 4,
        title: "Plan New Commitments",
        prompt: "Pick the one to three things that will move a lead measure this week.",
        duration_minutes: 15,
        input: StepInput::None,
    },
    AgendaStep {
        number: 5,
        title: "Clear the Path",
        prompt: "Which obstacles need removing, and who needs help?",
        duration_minutes: 5,
        input: StepInput::Obstacles,
    },
];

pub fn agenda_step(number: u8) -> Result<&'static AgendaStep> {
    if !(1..=STEP_COUNT).contains(&number) {
        return Err(FourdxError::InvalidStep(number));
    }
    Ok(&AGENDA[usize::from(number - 1)])
}

pub fn total_minutes() -> u32 {
    AGENDA.iter().map(|s| s.duration_minutes).sum()
}

// ---------------------------------------------------------------------------
// WigSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WigSession {
    pub id: String,
    pub week_id: WeekId,
    pub status: SessionStatus,
    pub current_step: u8,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub obstacles: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl WigSession {
    pub fn session_id(week: WeekId) -> String {
        format!("wig-{week}")
    }

    pub fn scheduled(week: WeekId, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::session_id(week),
            week_id: week,
            status: SessionStatus::Scheduled,
            current_step: 1,
            notes: String::new(),
            obstacles: String::new(),
            scheduled_at: now,
            started_at: None,
            completed_at: None,
            attendees: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&'static AgendaStep> {
        match self.status {
            SessionStatus::InProgress => agenda_step(self.current_step).ok(),
            _ => None,
        }
    }

    fn transition_error(&self, reason: &str) -> FourdxError {
        FourdxError::InvalidSessionTransition {
            from: self.status.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::Scheduled {
            return Err(self.transition_error("only a scheduled session can start"));
        }
        self.status = SessionStatus::InProgress;
        self.current_step = 1;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::InProgress {
            return Err(self.transition_error("only a running session can advance"));
        }
        if self.current_step < STEP_COUNT {
            self.current_step += 1;
        } else {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(now);
        }
        Ok(())
    }

    pub fn set_notes(&mut self, text: &str) -> Result<()> {
        self.require_editable("notes")?;
        self.notes = text.to_string();
        Ok(())
    }

    pub fn set_obstacles(&mut self, text: &str) -> Result<()> {
        self.require_editable("obstacles")?;
        self.obstacles = text.to_string();
        Ok(())
    }

    fn require_editable(&self, field: &str) -> Result<()> {
        if self.status != SessionStatus::InProgress {
            return Err(self.transition_error(&format!("{field} are editable only while in progress")));
        }
        Ok(())
    }

    pub fn record_attendee(&mut self, member_id: &str) {
        if !self.attendees.iter().any(|a| a == member_id) {
            self.attendees.push(member_id.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Store-backed operations
// ---------------------------------------------------------------------------

pub fn get(ctx: &OpContext<'_>, week: WeekId) -> Result<Option<WigSession>> {
    ctx.store.get_session(week)
}

fn load(ctx: &OpContext<'_>, week: WeekId) -> Result<WigSession> {
    get(ctx, week)?.ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))
}

/// Read-modify-write an existing session, recording the actor as attendee.
fn mutate(
    ctx: &OpContext<'_>,
    week: WeekId,
    mut f: impl FnMut(&mut WigSession) -> Result<()>,
) -> Result<WigSession> {
    let actor = ctx.actor_id().map(str::to_string);
    let slot = ctx.store.update_session(week, &mut |slot| {
        let session = slot
            .as_mut()
            .ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))?;
        f(session)?;
        if let Some(id) = &actor {
            session.record_attendee(id);
        }
        Ok(())
    })?;
    slot.ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))
}

/// Create a `scheduled` session ahead of time. Scheduling an already scheduled
/// week returns the existing record.
pub fn schedule(ctx: &OpContext<'_>, week: WeekId) -> Result<WigSession> {
    let now = ctx.now;
    let slot = ctx.store.update_session(week, &mut |slot| {
        if let Some(s) = slot.as_ref() {
            if s.status != SessionStatus::Scheduled {
                return Err(s.transition_error("session already started"));
            }
            return Ok(());
        }
        *slot = Some(WigSession::scheduled(week, now));
        Ok(())
    })?;
    let session = slot.ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))?;
    info!(week = %week, "session scheduled");
    Ok(session)
}

/// Start the session for `week`, creating it if none exists. The actor is
/// settled for the week that just ended before the session opens.
pub fn start(ctx: &OpContext<'_>, week: WeekId) -> Result<WigSession> {
    if let Some(actor) = ctx.actor_id() {
        match scoring::settle_member(ctx, actor) {
            Ok(_) => {}
            Err(FourdxError::MemberNotFound(_)) => {
                warn!(member = %actor, "unknown actor; rollover skipped");
            }
            Err(e) => return Err(e),
        }
    }

    let now = ctx.now;
    let actor = ctx.actor_id().map(str::to_string);
    let slot = ctx.store.update_session(week, &mut |slot| {
        let session = slot.get_or_insert_with(|| WigSession::scheduled(week, now));
        session.start(now)?;
        if let Some(id) = &actor {
            session.record_attendee(id);
        }
        Ok(())
    })?;
    let session = slot.ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))?;
    info!(week = %week, "session started");
    Ok(session)
}

/// Move to the next step, or finish from step 5. With `expected_step` set the
/// advance only applies if the stored step still matches, so two attendees
/// clicking at once move the session one step, not two.
pub fn advance(ctx: &OpContext<'_>, week: WeekId, expected_step: Option<u8>) -> Result<WigSession> {
    let now = ctx.now;
    let session = mutate(ctx, week, |s| {
        if let Some(expected) = expected_step {
            if s.status == SessionStatus::InProgress && s.current_step != expected {
                return Err(s.transition_error(&format!(
                    "session is at step {}, not {expected}",
                    s.current_step
                )));
            }
        }
        s.advance(now)
    })?;
    match session.status {
        SessionStatus::Completed => info!(week = %week, "session completed"),
        _ => info!(week = %week, step = session.current_step, "session advanced"),
    }
    Ok(session)
}

/// Last write wins.
pub fn set_notes(ctx: &OpContext<'_>, week: WeekId, text: &str) -> Result<WigSession> {
    mutate(ctx, week, |s| s.set_notes(text))
}

/// Last write wins.
pub fn set_obstacles(ctx: &OpContext<'_>, week: WeekId, text: &str) -> Result<WigSession> {
    mutate(ctx, week, |s| s.set_obstacles(text))
}

/// Delete the session for `week` from any state. Destructive: requires an
/// ADMIN or MANAGER actor and explicit confirmation.
pub fn reset(ctx: &OpContext<'_>, week: WeekId, confirmed: bool) -> Result<()> {
    let actor = ctx.require_privileged("reset the WIG session")?;
    if !confirmed {
        return Err(FourdxError::ConfirmationRequired(format!(
            "resetting the session for {week} discards its notes and obstacles"
        )));
    }
    if !ctx.store.delete_session(week)? {
        return Err(FourdxError::SessionNotFound(week.to_string()));
    }
    warn!(week = %week, actor = %actor.id, "session reset");
    Ok(())
}

// ---------------------------------------------------------------------------
// Review mode
// ---------------------------------------------------------------------------

/// Local walk-through of a completed session. Owns no reference to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCursor {
    pub week_id: WeekId,
    pub step: u8,
    pub finished: bool,
}

impl ReviewCursor {
    pub fn open(session: &WigSession) -> Result<Self> {
        if session.status != SessionStatus::Completed {
            return Err(session.transition_error("only a completed session can be reviewed"));
        }
        Ok(Self {
            week_id: session.week_id,
            step: 1,
            finished: false,
        })
    }

    pub fn current(&self) -> Option<&'static AgendaStep> {
        if self.finished {
            None
        } else {
            agenda_step(self.step).ok()
        }
    }

    /// Step forward. Past step 5 the cursor lands on the completed view.
    pub fn step_forward(&mut self) -> Option<&'static AgendaStep> {
        if self.finished {
            return None;
        }
        if self.step < STEP_COUNT {
            self.step += 1;
        } else {
            self.finished = true;
        }
        self.current()
    }
}

// ---------------------------------------------------------------------------
// Step timer
// ---------------------------------------------------------------------------

/// Advisory countdown for the active step. Never persisted; reaching zero
/// blocks nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTimer {
    step: u8,
    started_at: DateTime<Utc>,
}

impl StepTimer {
    pub fn start(step: u8, now: DateTime<Utc>) -> Result<Self> {
        agenda_step(step)?;
        Ok(Self {
            step,
            started_at: now,
        })
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn budget(&self) -> Duration {
        let minutes = agenda_step(self.step).map_or(0, |s| s.duration_minutes);
        Duration::minutes(i64::from(minutes))
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.budget() - (now - self.started_at);
        left.max(Duration::zero())
    }

    pub fn is_overtime(&self, now: DateTime<Utc>) -> bool {
        now - self.started_at > self.budget()
    }
}

// ---------------------------------------------------------------------------
// Step content
// ---------------------------------------------------------------------------

/// One member's commitments from the week before the session.
#[derive(Debug, Clone, Serialize)]
pub struct MemberAccounting {
    pub member_id: String,
    pub name: String,
    pub avatar: String,
    pub commitments: Vec<Commitment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepView {
    Scoreboard { dashboard: WeekDashboard },
    Accounting { week_id: WeekId, members: Vec<MemberAccounting> },
    Notes { text: String, editable: bool },
    Plan { week_id: WeekId },
    Obstacles { text: String, editable: bool },
}

#[derive(Debug, Clone, Serialize)]
pub struct StepContent {
    pub step: AgendaStep,
    pub review: bool,
    pub view: StepView,
}

/// What step `number` of the session for `week` shows. Read-only. Free-text
/// steps are editable only in live mode while the session is in progress.
pub fn step_content(
    ctx: &OpContext<'_>,
    week: WeekId,
    number: u8,
    review: bool,
) -> Result<StepContent> {
    let step = *agenda_step(number)?;
    let session = load(ctx, week)?;
    let editable = !review && session.status == SessionStatus::InProgress;

    let view = match number {
        1 => StepView::Scoreboard {
            dashboard: dashboard::week_dashboard(ctx, week)?,
        },
        2 => {
            let prev = week::previous_week_id(week);
            StepView::Accounting {
                week_id: prev,
                members: accounting(ctx, prev)?,
            }
        }
        3 => StepView::Notes {
            text: session.notes,
            editable,
        },
        4 => StepView::Plan { week_id: week },
        _ => StepView::Obstacles {
            text: session.obstacles,
            editable,
        },
    };
    Ok(StepContent { step, review, view })
}

/// Every roster member with their commitments for `week`.
pub fn accounting(ctx: &OpContext<'_>, week: WeekId) -> Result<Vec<MemberAccounting>> {
    let commitments = ctx.store.list_commitments(&CommitmentFilter::week(week))?;
    let members = ctx.store.list_members()?;
    Ok(members
        .into_iter()
        .map(|m| MemberAccounting {
            commitments: commitments
                .iter()
                .filter(|c| c.member_id == m.id)
                .cloned()
                .collect(),
            member_id: m.id,
            name: m.name,
            avatar: m.avatar,
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
