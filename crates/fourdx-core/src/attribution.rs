//! Commitment to lead-measure attribution.
//!
//! Records carry attribution in three historical shapes: the measure id in
//! `lead_measure_id`, the display name mistakenly stored in
//! `lead_measure_id`, or the display name in `lead_measure_name`. All three
//! are honoured.
//!
//! A week in which no commitment carries any attribution data falls back to
//! crediting every completed commitment to the first configured measure.
//! A single attributed commitment turns the fallback off for the whole week.

use crate::commitment::Commitment;
use crate::config::LeadMeasureDefinition;
use crate::member::TeamMember;

/// Tolerant three-way match of one commitment against one measure.
pub fn counts_toward(c: &Commitment, m: &LeadMeasureDefinition) -> bool {
    let id = c.lead_measure_id.as_deref();
    id == Some(m.id.as_str())
        || id == Some(m.name.as_str())
        || c.lead_measure_name.as_deref() == Some(m.name.as_str())
}

/// The first configured measure `c` matches, if any.
pub fn resolve_measure<'a>(
    c: &Commitment,
    measures: &'a [LeadMeasureDefinition],
) -> Option<&'a LeadMeasureDefinition> {
    measures.iter().find(|m| counts_toward(c, m))
}

/// Attribution mode for one week, decided from that week's full commitment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    fallback: bool,
}

impl Attribution {
    pub fn for_week(week_commitments: &[Commitment]) -> Self {
        Self {
            fallback: !week_commitments.iter().any(Commitment::has_attribution),
        }
    }

    pub fn is_fallback(self) -> bool {
        self.fallback
    }

    /// Completed counts per measure, index-aligned with `measures`. `subset`
    /// may be any slice of the week (one member's commitments, say); the mode
    /// stays the week's.
    pub fn actuals(self, subset: &[Commitment], measures: &[LeadMeasureDefinition]) -> Vec<u32> {
        let completed = subset.iter().filter(|c| c.status.is_completed());
        if self.fallback {
            let total = completed.count() as u32;
            return measures
                .iter()
                .enumerate()
                .map(|(i, _)| if i == 0 { total } else { 0 })
                .collect();
        }
        let completed: Vec<&Commitment> = completed.collect();
        measures
            .iter()
            .map(|m| completed.iter().filter(|&&c| counts_toward(c, m)).count() as u32)
            .collect()
    }
}

/// Completed counts per measure for a whole week.
pub fn measure_actuals(week_commitments: &[Commitment], measures: &[LeadMeasureDefinition]) -> Vec<u32> {
    Attribution::for_week(week_commitments).actuals(week_commitments, measures)
}

pub fn active_member_count(members: &[TeamMember]) -> u32 {
    members.iter().filter(|m| m.is_active()).count() as u32
}

/// Team-wide weekly target: active members times the per-person target.
/// Saturates at `u32::MAX`.
pub fn team_target(members: &[TeamMember], m: &LeadMeasureDefinition) -> u32 {
    active_member_count(members).saturating_mul(m.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance::{commitment, member};
    use crate::types::CommitmentStatus;

    fn measures() -> Vec<LeadMeasureDefinition> {
        vec![
            LeadMeasureDefinition::new("lead-a", "Proactive Wins", 2, "Wins"),
            LeadMeasureDefinition::new("lead-b", "Value-Add Actions", 1, "Actions"),
        ]
    }

    fn done(id: &str) -> Commitment {
        let mut c = commitment(id, "m1", "2025-W10");
        c.status = CommitmentStatus::Completed;
        c
    }

    #[test]
    fn three_way_match() {
        let ms = measures();
        let mut by_id = done("c1");
        by_id.lead_measure_id = Some("lead-a".into());
        let mut name_in_id = done("c2");
        name_in_id.lead_measure_id = Some("Proactive Wins".into());
        let mut by_name = done("c3");
        by_name.lead_measure_name = Some("Proactive Wins".into());

        for c in [&by_id, &name_in_id, &by_name] {
            assert!(counts_toward(c, &ms[0]), "{} should match", c.id);
            assert!(!counts_toward(c, &ms[1]));
        }
        assert_eq!(resolve_measure(&name_in_id, &ms).unwrap().id, "lead-a");
        assert!(resolve_measure(&done("c4"), &ms).is_none());
    }

    #[test]
    fn unattributed_week_credits_first_measure() {
        let mut open = done("c3");
        open.status = CommitmentStatus::Partial;
        let week = vec![done("c1"), done("c2"), open];
        let actuals = measure_actuals(&week, &measures());
        assert_eq!(actuals, vec![2, 0]);
        assert!(Attribution::for_week(&week).is_fallback());
    }

    #[test]
    fn one_attributed_commitment_disables_fallback() {
        let mut tagged = commitment("c9", "m2", "2025-W10");
        tagged.lead_measure_id = Some("lead-b".into());
        let week = vec![done("c1"), done("c2"), tagged];
        // The tagged commitment is not completed, so nothing counts anywhere.
        assert_eq!(measure_actuals(&week, &measures()), vec![0, 0]);
    }

    #[test]
    fn subset_uses_week_mode() {
        let mut other = done("c5");
        other.member_id = "m2".into();
        let week = vec![done("c1"), other];
        let mode = Attribution::for_week(&week);
        let mine: Vec<Commitment> = week.iter().filter(|c| c.member_id == "m1").cloned().collect();
        assert_eq!(mode.actuals(&mine, &measures()), vec![1, 0]);
    }

    #[test]
    fn team_target_counts_active_members() {
        let mut ghost = member("x", "Ghost");
        ghost.id = " ".into();
        let roster = vec![member("m1", "Ada"), member("m2", "Bo"), ghost];
        assert_eq!(team_target(&roster, &measures()[0]), 4);
        assert_eq!(team_target(&roster, &measures()[1]), 2);
    }

    #[test]
    fn huge_target_saturates() {
        let roster = vec![member("m1", "Ada"), member("m2", "Bo")];
        let huge = LeadMeasureDefinition::new("lead-huge", "Huge", u32::MAX, "Things");
        assert_eq!(team_target(&roster, &huge), u32::MAX);
    }

    #[test]
    fn no_measures_yields_empty_actuals() {
        assert!(measure_actuals(&[done("c1")], &[]).is_empty());
    }
}
