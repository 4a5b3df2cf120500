use crate::error::{FourdxError, Result};
use crate::types::CommitmentStatus;
use crate::week::WeekId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of commitments one member may hold for one week.
pub const MAX_COMMITMENTS_PER_WEEK: usize = 3;

// ---------------------------------------------------------------------------
// Commitment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: String,
    pub member_id: String,
    pub week_id: WeekId,
    pub description: String,
    #[serde(default)]
    pub status: CommitmentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_measure_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_measure_name: Option<String>,
    #[serde(default)]
    pub aligned_by_ai: bool,
}

impl Commitment {
    /// True when the record carries any attribution data at all.
    pub fn has_attribution(&self) -> bool {
        non_blank(&self.lead_measure_id) || non_blank(&self.lead_measure_name)
    }
}

fn non_blank(s: &Option<String>) -> bool {
    s.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Trim and validate a commitment description.
pub fn validate_description(description: &str) -> Result<String> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(FourdxError::EmptyDescription);
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Attribution pair
// ---------------------------------------------------------------------------

/// The (lead measure id, lead measure name) pair suggested for a new commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureLink {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// CommitmentPatch
// ---------------------------------------------------------------------------

/// Free-form field merge for [`crate::ledger::update`]. `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitmentPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<CommitmentStatus>,
    #[serde(default)]
    pub completion_note: Option<String>,
    #[serde(default)]
    pub completion_photo: Option<String>,
    #[serde(default)]
    pub lead_measure_id: Option<String>,
    #[serde(default)]
    pub lead_measure_name: Option<String>,
    #[serde(default)]
    pub aligned_by_ai: Option<bool>,
}

impl CommitmentPatch {
    pub fn status(status: CommitmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge every set field into `c`. Returns the status `c` had before.
    pub fn apply(&self, c: &mut Commitment) -> Result<CommitmentStatus> {
        let previous = c.status;
        if let Some(d) = &self.description {
            c.description = validate_description(d)?;
        }
        if let Some(s) = self.status {
            c.status = s;
        }
        if let Some(n) = &self.completion_note {
            c.completion_note = Some(n.clone());
        }
        if let Some(p) = &self.completion_photo {
            c.completion_photo = Some(p.clone());
        }
        if let Some(id) = &self.lead_measure_id {
            c.lead_measure_id = Some(id.clone());
        }
        if let Some(name) = &self.lead_measure_name {
            c.lead_measure_name = Some(name.clone());
        }
        if let Some(aligned) = self.aligned_by_ai {
            c.aligned_by_ai = aligned;
        }
        Ok(previous)
    }
}

// ---------------------------------------------------------------------------
// CommitmentFilter
// ---------------------------------------------------------------------------

/// Equality filters for a commitment scan. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CommitmentFilter {
    pub member_id: Option<String>,
    pub week_id: Option<WeekId>,
    pub status: Option<CommitmentStatus>,
}

impl CommitmentFilter {
    pub fn week(week_id: WeekId) -> Self {
        Self {
            week_id: Some(week_id),
            ..Self::default()
        }
    }

    pub fn member_week(member_id: &str, week_id: WeekId) -> Self {
        Self {
            member_id: Some(member_id.to_string()),
            week_id: Some(week_id),
            status: None,
        }
    }

    pub fn member(member_id: &str) -> Self {
        Self {
            member_id: Some(member_id.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, c: &Commitment) -> bool {
        self.member_id.as_deref().map_or(true, |m| c.member_id == m)
            && self.week_id.map_or(true, |w| c.week_id == w)
            && self.status.map_or(true, |s| c.status == s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Commitment {
        Commitment {
            id: "c1".into(),
            member_id: "m1".into(),
            week_id: "2025-W10".parse().unwrap(),
            description: "Walk the second floor".into(),
            status: CommitmentStatus::Incomplete,
            created_at: Utc::now(),
            completion_note: None,
            completion_photo: None,
            lead_measure_id: None,
            lead_measure_name: None,
            aligned_by_ai: false,
        }
    }

    #[test]
    fn description_is_trimmed_and_required() {
        assert_eq!(validate_description("  fix printer  ").unwrap(), "fix printer");
        assert!(matches!(
            validate_description("   "),
            Err(FourdxError::EmptyDescription)
        ));
    }

    #[test]
    fn patch_merges_and_reports_previous_status() {
        let mut c = sample();
        let patch = CommitmentPatch {
            status: Some(CommitmentStatus::Completed),
            completion_note: Some("done before lunch".into()),
            ..CommitmentPatch::default()
        };
        let prev = patch.apply(&mut c).unwrap();
        assert_eq!(prev, CommitmentStatus::Incomplete);
        assert_eq!(c.status, CommitmentStatus::Completed);
        assert_eq!(c.completion_note.as_deref(), Some("done before lunch"));
        assert_eq!(c.description, "Walk the second floor");
    }

    #[test]
    fn patch_rejects_blank_description() {
        let mut c = sample();
        let patch = CommitmentPatch {
            description: Some(" ".into()),
            ..CommitmentPatch::default()
        };
        assert!(patch.apply(&mut c).is_err());
        assert!(CommitmentPatch::default().is_empty());
    }

    #[test]
    fn attribution_presence_ignores_blank_strings() {
        let mut c = sample();
        assert!(!c.has_attribution());
        c.lead_measure_name = Some("  ".into());
        assert!(!c.has_attribution());
        c.lead_measure_id = Some("lead-walks".into());
        assert!(c.has_attribution());
    }

    #[test]
    fn filter_matches_on_set_fields() {
        let c = sample();
        assert!(CommitmentFilter::default().matches(&c));
        assert!(CommitmentFilter::member_week("m1", c.week_id).matches(&c));
        assert!(!CommitmentFilter::member("m2").matches(&c));
        assert!(!CommitmentFilter::week("2025-W11".parse().unwrap()).matches(&c));
    }
}
