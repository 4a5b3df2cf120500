//! Read-only rollups for one week, derived from the ledger, the roster and the
//! team configuration. Nothing here is cached.

use crate::attribution::{self, Attribution};
use crate::commitment::{Commitment, CommitmentFilter};
use crate::config::MetricType;
use crate::context::OpContext;
use crate::error::Result;
use crate::member::TeamMember;
use crate::session::WigSession;
use crate::types::{CommitmentStatus, Role, SessionStatus};
use crate::week::WeekId;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct WigSummary {
    pub title: String,
    pub description: String,
    pub metric_type: MetricType,
    pub current_value: f64,
    pub target_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeasureRollup {
    pub measure_id: String,
    pub name: String,
    pub unit: String,
    pub target_per_person: u32,
    pub team_target: u32,
    pub actual: u32,
    /// `actual / team_target` as a whole percentage, capped at 100.
    pub percent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRollup {
    pub member_id: String,
    pub name: String,
    pub avatar: String,
    pub role: Role,
    pub score: u32,
    pub streak: u32,
    pub longest_streak: u32,
    pub achievements: Vec<String>,
    pub committed: u32,
    pub completed: u32,
    pub partial: u32,
    /// Completed count per measure id for this week.
    pub measures: BTreeMap<String, u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_walks_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_value_actions_completed: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub status: SessionStatus,
    pub current_step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_title: Option<&'static str>,
}

impl From<&WigSession> for SessionSummary {
    fn from(s: &WigSession) -> Self {
        Self {
            status: s.status,
            current_step: s.current_step,
            step_title: s.current().map(|step| step.title),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekDashboard {
    pub week_id: WeekId,
    pub display: String,
    pub wig: WigSummary,
    pub measures: Vec<MeasureRollup>,
    pub members: Vec<MemberRollup>,
    /// True when no commitment this week carried attribution and every
    /// completion was credited to the first measure.
    pub attribution_fallback: bool,
    pub commitment_count: u32,
    pub completed_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}

fn percent(actual: u32, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    ((u64::from(actual) * 100 / u64::from(target)).min(100)) as u32
}

/// Per-measure rollup for `week_commitments` against the configured measures.
pub fn measure_rollups(
    ctx: &OpContext<'_>,
    members: &[TeamMember],
    week_commitments: &[Commitment],
) -> Vec<MeasureRollup> {
    let measures = &ctx.config.lead_measures;
    let actuals = attribution::measure_actuals(week_commitments, measures);
    measures
        .iter()
        .zip(actuals)
        .map(|(m, actual)| {
            let team_target = attribution::team_target(members, m);
            MeasureRollup {
                measure_id: m.id.clone(),
                name: m.name.clone(),
                unit: m.unit.clone(),
                target_per_person: m.target,
                team_target,
                actual,
                percent: percent(actual, team_target),
            }
        })
        .collect()
}

fn member_rollup(
    ctx: &OpContext<'_>,
    mode: Attribution,
    member: &TeamMember,
    week_commitments: &[Commitment],
) -> MemberRollup {
    let mine: Vec<Commitment> = week_commitments
        .iter()
        .filter(|c| c.member_id == member.id)
        .cloned()
        .collect();
    let count = |s: CommitmentStatus| mine.iter().filter(|c| c.status == s).count() as u32;
    let measures = &ctx.config.lead_measures;
    let per_measure = mode
        .actuals(&mine, measures)
        .into_iter()
        .zip(measures)
        .map(|(n, m)| (m.id.clone(), n))
        .collect();

    MemberRollup {
        member_id: member.id.clone(),
        name: member.name.clone(),
        avatar: member.avatar.clone(),
        role: member.role,
        score: member.score,
        streak: member.streak,
        longest_streak: member.longest_streak,
        achievements: member.achievements.iter().map(|a| a.id.clone()).collect(),
        committed: mine.len() as u32,
        completed: count(CommitmentStatus::Completed),
        partial: count(CommitmentStatus::Partial),
        measures: per_measure,
        legacy_walks_completed: member.walks_completed,
        legacy_value_actions_completed: member.value_actions_completed,
    }
}

/// Everything the scoreboard shows for `week`.
pub fn week_dashboard(ctx: &OpContext<'_>, week: WeekId) -> Result<WeekDashboard> {
    let members = ctx.store.list_members()?;
    let commitments = ctx.store.list_commitments(&CommitmentFilter::week(week))?;
    let session = ctx.store.get_session(week)?;
    let mode = Attribution::for_week(&commitments);
    let cfg = ctx.config;

    Ok(WeekDashboard {
        week_id: week,
        display: week.display(),
        wig: WigSummary {
            title: cfg.title.clone(),
            description: cfg.description.clone(),
            metric_type: cfg.metric_type,
            current_value: cfg.current_value,
            target_value: cfg.target_value,
        },
        measures: measure_rollups(ctx, &members, &commitments),
        members: members
            .iter()
            .filter(|m| m.is_active())
            .map(|m| member_rollup(ctx, mode, m, &commitments))
            .collect(),
        attribution_fallback: mode.is_fallback(),
        commitment_count: commitments.len() as u32,
        completed_count: commitments
            .iter()
            .filter(|c| c.status.is_completed())
            .count() as u32,
        session: session.as_ref().map(SessionSummary::from),
    })
}

/// Members ordered by score, highest first; ties by name.
pub fn leaderboard(ctx: &OpContext<'_>) -> Result<Vec<TeamMember>> {
    let mut members = ctx.store.list_members()?;
    members.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    Ok(members)
}
