//! The commitment ledger: the system of record for weekly commitments.
//!
//! Every status change is persisted with a compare-and-swap on the status the
//! caller observed, in the same write as its score. Lost races are retried
//! against fresh state a bounded number of times.

use crate::commitment::{
    validate_description, Commitment, CommitmentFilter, CommitmentPatch, MeasureLink,
    MAX_COMMITMENTS_PER_WEEK,
};
use crate::context::OpContext;
use crate::error::{FourdxError, Result};
use crate::scoring;
use crate::template;
use crate::types::CommitmentStatus;
use crate::week::{self, WeekId};
use tracing::{info, warn};
use uuid::Uuid;

const MAX_ATTEMPTS: usize = 3;

fn with_retry<T>(op: &str, id: &str, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match f() {
            Err(e) if e.is_conflict() && attempt < MAX_ATTEMPTS => {
                warn!(op, commitment = %id, attempt, "concurrent update; retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn load(ctx: &OpContext<'_>, id: &str) -> Result<Commitment> {
    ctx.store
        .get_commitment(id)?
        .ok_or_else(|| FourdxError::CommitmentNotFound(id.to_string()))
}

fn ensure_not_past(ctx: &OpContext<'_>, c: &Commitment) -> Result<()> {
    if week::is_past(c.week_id, ctx.current_week()) {
        return Err(FourdxError::PastWeekLocked {
            week: c.week_id.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Record a new commitment. A suggested measure link that names no configured
/// measure is dropped and the commitment is created unattributed.
pub fn create(
    ctx: &OpContext<'_>,
    member_id: &str,
    week: WeekId,
    description: &str,
    link: Option<MeasureLink>,
) -> Result<Commitment> {
    let description = validate_description(description)?;
    if ctx.store.get_member(member_id)?.is_none() {
        return Err(FourdxError::MemberNotFound(member_id.to_string()));
    }

    let (lead_measure_id, lead_measure_name) = match link {
        Some(link) => match ctx.config.measure(&link.id) {
            Some(m) => (Some(m.id.clone()), Some(link.name.unwrap_or_else(|| m.name.clone()))),
            None => {
                warn!(measure = %link.id, "suggested lead measure is not configured; dropping");
                (None, None)
            }
        },
        None => (None, None),
    };

    let c = Commitment {
        id: Uuid::new_v4().to_string(),
        member_id: member_id.to_string(),
        week_id: week,
        description,
        status: CommitmentStatus::Incomplete,
        created_at: ctx.now,
        completion_note: None,
        completion_photo: None,
        aligned_by_ai: lead_measure_id.is_some(),
        lead_measure_id,
        lead_measure_name,
    };
    ctx.store.insert_commitment(&c, MAX_COMMITMENTS_PER_WEEK)?;
    info!(commitment = %c.id, member = %member_id, week = %week, "commitment created");
    Ok(c)
}

/// Record a commitment from a template in the team's library. The template's
/// description is used as written, and the commitment is linked to the first
/// measure whose name mentions the template's category, if any.
pub fn create_from_template(
    ctx: &OpContext<'_>,
    member_id: &str,
    week: WeekId,
    template_id: &str,
) -> Result<Commitment> {
    let tmpl = template::find(ctx.config, template_id)?;
    let link = tmpl
        .measure_in(&ctx.config.lead_measures)
        .map(|m| MeasureLink {
            id: m.id.clone(),
            name: Some(m.name.clone()),
        });
    create(ctx, member_id, week, &tmpl.description, link)
}

/// incomplete → completed → partial → incomplete.
pub fn cycle_status(ctx: &OpContext<'_>, id: &str) -> Result<Commitment> {
    with_retry("cycle", id, || {
        let current = load(ctx, id)?;
        let mut next = current.clone();
        next.status = current.status.cycle();
        scoring::apply_status_change(ctx, current.status, &next)?;
        Ok(next)
    })
}

/// Merge `patch` into the commitment. A status change here is scored exactly
/// as one made through [`cycle_status`].
pub fn update(ctx: &OpContext<'_>, id: &str, patch: &CommitmentPatch) -> Result<Commitment> {
    with_retry("update", id, || {
        let current = load(ctx, id)?;
        if patch.description.is_some() {
            ensure_not_past(ctx, &current)?;
        }
        let mut next = current.clone();
        let previous = patch.apply(&mut next)?;
        scoring::apply_status_change(ctx, previous, &next)?;
        Ok(next)
    })
}

/// Remove a commitment. Points already awarded for it stay.
pub fn delete(ctx: &OpContext<'_>, id: &str) -> Result<Commitment> {
    let current = load(ctx, id)?;
    ensure_not_past(ctx, &current)?;
    let removed = ctx.store.delete_commitment(id)?;
    info!(commitment = %id, member = %removed.member_id, "commitment deleted");
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn get(ctx: &OpContext<'_>, id: &str) -> Result<Commitment> {
    load(ctx, id)
}

pub fn count_for_member_week(ctx: &OpContext<'_>, member_id: &str, week: WeekId) -> Result<usize> {
    Ok(list_for_member_week(ctx, member_id, week)?.len())
}

pub fn list_for_week(ctx: &OpContext<'_>, week: WeekId) -> Result<Vec<Commitment>> {
    ctx.store.list_commitments(&CommitmentFilter::week(week))
}

pub fn list_for_member_week(
    ctx: &OpContext<'_>,
    member_id: &str,
    week: WeekId,
) -> Result<Vec<Commitment>> {
    ctx.store
        .list_commitments(&CommitmentFilter::member_week(member_id, week))
}

/// All of a member's commitments, newest week first.
pub fn history_for_member(ctx: &OpContext<'_>, member_id: &str) -> Result<Vec<Commitment>> {
    let mut all = ctx.store.list_commitments(&CommitmentFilter::member(member_id))?;
    all.sort_by(|a, b| {
        b.week_id
            .cmp(&a.week_id)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    Ok(all)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WigConfig;
    use crate::store::conformance::{member, week, Faulty};
    use crate::store::{MemoryStore, Store};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::Ordering;
    use CommitmentStatus::*;

    // Wednesday of 2025-W11.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 10, 0, 0).unwrap()
    }

    fn setup() -> (MemoryStore, WigConfig) {
        let store = MemoryStore::new();
        store.insert_member(&member("m1", "Ada")).unwrap();
        (store, WigConfig::default())
    }

    fn score(store: &dyn Store) -> u32 {
        store.get_member("m1").unwrap().unwrap().score
    }

    #[test]
    fn create_trims_and_defaults() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "  walk floor 3  ", None).unwrap();
        assert_eq!(c.description, "walk floor 3");
        assert_eq!(c.status, Incomplete);
        assert_eq!(c.created_at, now());
        assert!(!c.aligned_by_ai);
        assert!(matches!(
            create(&ctx, "m1", week("2025-W11"), "   ", None),
            Err(FourdxError::EmptyDescription)
        ));
        assert!(matches!(
            create(&ctx, "ghost", week("2025-W11"), "x", None),
            Err(FourdxError::MemberNotFound(_))
        ));
    }

    #[test]
    fn fourth_commitment_is_rejected() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let w = week("2025-W11");
        for n in 0..3 {
            create(&ctx, "m1", w, &format!("task {n}"), None).unwrap();
        }
        assert_eq!(count_for_member_week(&ctx, "m1", w).unwrap(), 3);
        let err = create(&ctx, "m1", w, "task 4", None).unwrap_err();
        assert!(matches!(err, FourdxError::CommitmentCapReached { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert_eq!(count_for_member_week(&ctx, "m1", w).unwrap(), 3);
    }

    #[test]
    fn suggested_link_sets_attribution() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let link = MeasureLink {
            id: "lead-walks".into(),
            name: None,
        };
        let c = create(&ctx, "m1", week("2025-W11"), "walk", Some(link)).unwrap();
        assert!(c.aligned_by_ai);
        assert_eq!(c.lead_measure_id.as_deref(), Some("lead-walks"));
        assert_eq!(c.lead_measure_name.as_deref(), Some("Proactive Floor Walks"));

        let bogus = MeasureLink {
            id: "lead-nope".into(),
            name: Some("Nope".into()),
        };
        let c = create(&ctx, "m1", week("2025-W11"), "walk again", Some(bogus)).unwrap();
        assert!(!c.aligned_by_ai);
        assert!(c.lead_measure_id.is_none());
    }

    #[test]
    fn template_commitment_uses_description_and_matching_measure() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let walk = create_from_template(&ctx, "m1", week("2025-W11"), "tmpl-floor-labs").unwrap();
        assert!(walk.description.starts_with("Walk the teaching labs"));
        assert_eq!(walk.lead_measure_id.as_deref(), Some("lead-walks"));

        let doc = create_from_template(&ctx, "m1", week("2025-W11"), "tmpl-doc-guide").unwrap();
        assert!(doc.lead_measure_id.is_none());

        assert!(matches!(
            create_from_template(&ctx, "m1", week("2025-W11"), "tmpl-nope"),
            Err(FourdxError::TemplateNotFound(_))
        ));
        // Templates count against the weekly cap like any other commitment.
        assert!(matches!(
            create_from_template(&ctx, "m1", week("2025-W11"), "tmpl-train-micro")
                .and_then(|_| create_from_template(&ctx, "m1", week("2025-W11"), "tmpl-doc-audit")),
            Err(FourdxError::CommitmentCapReached { .. })
        ));
    }

    #[test]
    fn cycle_scores_each_transition_once() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();

        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Completed);
        assert_eq!(score(&store), 50);
        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Partial);
        assert_eq!(score(&store), 0);
        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Incomplete);
        assert_eq!(score(&store), 0);
        assert!(matches!(
            cycle_status(&ctx, "missing"),
            Err(FourdxError::CommitmentNotFound(_))
        ));
    }

    #[test]
    fn completed_partial_completed_nets_zero() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        update(&ctx, &c.id, &CommitmentPatch::status(Completed)).unwrap();
        let before = score(&store);
        update(&ctx, &c.id, &CommitmentPatch::status(Partial)).unwrap();
        assert_eq!(score(&store), before - 50);
        update(&ctx, &c.id, &CommitmentPatch::status(Completed)).unwrap();
        assert_eq!(score(&store), before);
    }

    #[test]
    fn repeated_identical_update_scores_once() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        update(&ctx, &c.id, &CommitmentPatch::status(Completed)).unwrap();
        update(&ctx, &c.id, &CommitmentPatch::status(Completed)).unwrap();
        assert_eq!(score(&store), 50);
    }

    #[test]
    fn completion_bumps_lead_measure_progress() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let link = MeasureLink {
            id: "lead-value".into(),
            name: None,
        };
        let c = create(&ctx, "m1", week("2025-W11"), "demo", Some(link)).unwrap();
        cycle_status(&ctx, &c.id).unwrap();
        let m = store.get_member("m1").unwrap().unwrap();
        assert_eq!(m.lead_measure_progress["lead-value"], 1);
    }

    #[test]
    fn delete_keeps_points() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        cycle_status(&ctx, &c.id).unwrap();
        delete(&ctx, &c.id).unwrap();
        assert_eq!(score(&store), 50);
        assert!(matches!(get(&ctx, &c.id), Err(FourdxError::CommitmentNotFound(_))));
    }

    #[test]
    fn past_week_locks_delete_and_description_but_not_status() {
        let (store, cfg) = setup();
        let earlier = OpContext::new(&store, &cfg, Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap());
        let c = create(&earlier, "m1", week("2025-W10"), "walk", None).unwrap();

        let ctx = OpContext::new(&store, &cfg, now());
        assert!(matches!(
            delete(&ctx, &c.id),
            Err(FourdxError::PastWeekLocked { .. })
        ));
        let rename = CommitmentPatch {
            description: Some("rewrite history".into()),
            ..CommitmentPatch::default()
        };
        assert!(matches!(
            update(&ctx, &c.id, &rename),
            Err(FourdxError::PastWeekLocked { .. })
        ));
        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Completed);
    }

    #[test]
    fn history_is_newest_week_first() {
        let (store, cfg) = setup();
        let ctx = OpContext::new(&store, &cfg, now());
        create(&ctx, "m1", week("2025-W09"), "old", None).unwrap();
        create(&ctx, "m1", week("2025-W11"), "new", None).unwrap();
        create(&ctx, "m1", week("2025-W10"), "mid", None).unwrap();
        let weeks: Vec<String> = history_for_member(&ctx, "m1")
            .unwrap()
            .into_iter()
            .map(|c| c.week_id.to_string())
            .collect();
        assert_eq!(weeks, vec!["2025-W11", "2025-W10", "2025-W09"]);
        assert_eq!(list_for_week(&ctx, week("2025-W10")).unwrap().len(), 1);
    }

    fn faulty() -> Faulty {
        let store = Faulty::default();
        store.insert_member(&member("m1", "Ada")).unwrap();
        store
    }

    #[test]
    fn lost_swaps_are_retried_and_scored_once() {
        let store = faulty();
        let cfg = WigConfig::default();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        store.conflicts.store(2, Ordering::SeqCst);

        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Completed);
        assert_eq!(score(&store), 50);
    }

    #[test]
    fn retries_are_bounded() {
        let store = faulty();
        let cfg = WigConfig::default();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        store.conflicts.store(MAX_ATTEMPTS, Ordering::SeqCst);

        assert!(matches!(
            cycle_status(&ctx, &c.id),
            Err(FourdxError::ConcurrencyConflict(_))
        ));
        assert_eq!(score(&store), 0);
        assert_eq!(get(&ctx, &c.id).unwrap().status, Incomplete);
    }

    #[test]
    fn failed_score_write_leaves_status_unchanged() {
        let store = faulty();
        let cfg = WigConfig::default();
        let ctx = OpContext::new(&store, &cfg, now());
        let c = create(&ctx, "m1", week("2025-W11"), "walk", None).unwrap();
        store.owner_failures.store(1, Ordering::SeqCst);

        assert!(matches!(cycle_status(&ctx, &c.id), Err(FourdxError::Store(_))));
        assert_eq!(get(&ctx, &c.id).unwrap().status, Incomplete);
        assert_eq!(score(&store), 0);

        // Trying again completes the commitment and scores it once.
        assert_eq!(cycle_status(&ctx, &c.id).unwrap().status, Completed);
        assert_eq!(score(&store), 50);
    }

    #[test]
    fn end_to_end_week() {
        let (store, cfg) = setup();
        let w11 = OpContext::new(&store, &cfg, now());
        let wk = week("2025-W11");
        let ids: Vec<String> = (0..2)
            .map(|n| create(&w11, "m1", wk, &format!("task {n}"), None).unwrap().id)
            .collect();
        for id in &ids {
            cycle_status(&w11, id).unwrap();
        }
        assert_eq!(score(&store), 100);

        // First visit in the following week settles 2025-W11.
        let w12 = OpContext::new(&store, &cfg, Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap());
        scoring::settle_member(&w12, "m1").unwrap();

        let m = store.get_member("m1").unwrap().unwrap();
        assert_eq!(m.score, 200);
        assert_eq!(m.streak, 1);
        assert!(m.has_achievement("first-step"));
        assert_eq!(m.last_active_week_id, Some(wk));
    }
}
