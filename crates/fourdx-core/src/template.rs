//! Reusable commitment templates.
//!
//! A template is a ready-made commitment description with a category. The
//! library lives in the team config and is seeded on `init`; picking a
//! template creates an ordinary commitment, attributed to the first lead
//! measure whose name mentions the template's category.

use crate::config::{LeadMeasureDefinition, WigConfig};
use crate::error::{FourdxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    FloorWalk,
    PreventiveMaintenance,
    Documentation,
    Training,
    Infrastructure,
    Other,
}

impl TemplateCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateCategory::FloorWalk => "floor_walk",
            TemplateCategory::PreventiveMaintenance => "preventive_maintenance",
            TemplateCategory::Documentation => "documentation",
            TemplateCategory::Training => "training",
            TemplateCategory::Infrastructure => "infrastructure",
            TemplateCategory::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TemplateCategory::FloorWalk => "Floor Walk",
            TemplateCategory::PreventiveMaintenance => "Maintenance",
            TemplateCategory::Documentation => "Documentation",
            TemplateCategory::Training => "Training",
            TemplateCategory::Infrastructure => "Infrastructure",
            TemplateCategory::Other => "Other",
        }
    }

    /// The phrase looked for in lead measure names: the category id with its
    /// first underscore turned into a space ("floor_walk" → "floor walk").
    fn measure_hint(self) -> String {
        self.as_str().replacen('_', " ", 1)
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemplateCategory {
    type Err = FourdxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "floor_walk" => Ok(TemplateCategory::FloorWalk),
            "preventive_maintenance" | "maintenance" => Ok(TemplateCategory::PreventiveMaintenance),
            "documentation" => Ok(TemplateCategory::Documentation),
            "training" => Ok(TemplateCategory::Training),
            "infrastructure" => Ok(TemplateCategory::Infrastructure),
            "other" => Ok(TemplateCategory::Other),
            _ => Err(FourdxError::InvalidConfig(format!(
                "unknown template category '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: TemplateCategory,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub estimated_minutes: u32,
    #[serde(default)]
    pub potential_impact: String,
    #[serde(default)]
    pub suggested_frequency: Frequency,
}

impl CommitmentTemplate {
    /// First measure, in configured order, whose name mentions this
    /// template's category. Case-insensitive.
    pub fn measure_in<'a>(
        &self,
        measures: &'a [LeadMeasureDefinition],
    ) -> Option<&'a LeadMeasureDefinition> {
        let hint = self.category.measure_hint();
        measures
            .iter()
            .find(|m| m.name.to_lowercase().contains(&hint))
    }
}

#[allow(clippy::too_many_arguments)]
fn seed(
    id: &str,
    title: &str,
    description: &str,
    category: TemplateCategory,
    icon: &str,
    estimated_minutes: u32,
    potential_impact: &str,
    suggested_frequency: Frequency,
) -> CommitmentTemplate {
    CommitmentTemplate {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        category,
        icon: icon.to_string(),
        estimated_minutes,
        potential_impact: potential_impact.to_string(),
        suggested_frequency,
    }
}

/// The library a new workspace starts with.
pub fn default_templates() -> Vec<CommitmentTemplate> {
    use Frequency::*;
    use TemplateCategory::*;
    vec![
        seed(
            "tmpl-floor-labs",
            "Lab Sweep",
            "Walk the teaching labs, check projectors and peripherals, and log anything faulty.",
            FloorWalk,
            "building",
            30,
            "Prevent disruptions in high-demand rooms",
            Weekly,
        ),
        seed(
            "tmpl-floor-offices",
            "Office Quick Check",
            "Sweep the admin offices and ask three people whether anything small is bothering them.",
            FloorWalk,
            "footprints",
            15,
            "Catch silent issues before they become tickets",
            Biweekly,
        ),
        seed(
            "tmpl-maint-av",
            "Teaching Wall Health Check",
            "Test sound, video and touch input on one building's classroom screens and clean them.",
            PreventiveMaintenance,
            "monitor",
            40,
            "Prevent AV emergency tickets",
            Biweekly,
        ),
        seed(
            "tmpl-maint-printers",
            "Printer Station Audit",
            "Check toner, paper trays and paper paths on the shared printers.",
            PreventiveMaintenance,
            "printer",
            25,
            "Reduce paper jam tickets",
            Weekly,
        ),
        seed(
            "tmpl-doc-guide",
            "Create or Update a Help Guide",
            "Write or refresh one knowledge base article for a top-five recurring ticket category.",
            Documentation,
            "pencil",
            60,
            "Enable self-service resolution",
            Weekly,
        ),
        seed(
            "tmpl-doc-audit",
            "Guidance Audit",
            "Review five help guides and make sure their screenshots match current software.",
            Documentation,
            "search",
            30,
            "Keep support docs trustworthy",
            Monthly,
        ),
        seed(
            "tmpl-train-micro",
            "Micro-Training",
            "Spend ten minutes with one department showing them a did-you-know tip.",
            Training,
            "graduation-cap",
            15,
            "Increase user capability",
            Biweekly,
        ),
        seed(
            "tmpl-train-induct",
            "New Starter Check-in",
            "Visit staff who joined this term and check they are comfortable with the core systems.",
            Training,
            "wave",
            20,
            "Prevent onboarding friction",
            Monthly,
        ),
    ]
}

/// Look a template up in the team's library.
pub fn find<'a>(config: &'a WigConfig, id: &str) -> Result<&'a CommitmentTemplate> {
    config
        .templates
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| FourdxError::TemplateNotFound(id.to_string()))
}

/// Templates in library order, optionally narrowed to one category.
pub fn list(config: &WigConfig, category: Option<TemplateCategory>) -> Vec<&CommitmentTemplate> {
    config
        .templates
        .iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_library_is_seeded_with_unique_ids() {
        let cfg = WigConfig::default();
        assert_eq!(cfg.templates.len(), 8);
        let mut ids: Vec<&str> = cfg.templates.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn floor_walks_map_onto_the_walks_measure() {
        let cfg = WigConfig::default();
        let walk = find(&cfg, "tmpl-floor-labs").unwrap();
        assert_eq!(walk.measure_in(&cfg.lead_measures).unwrap().id, "lead-walks");

        // No default measure mentions documentation.
        let doc = find(&cfg, "tmpl-doc-guide").unwrap();
        assert!(doc.measure_in(&cfg.lead_measures).is_none());
    }

    #[test]
    fn unknown_template_is_not_found() {
        let cfg = WigConfig::default();
        assert!(matches!(
            find(&cfg, "tmpl-nope"),
            Err(FourdxError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn list_filters_by_category() {
        let cfg = WigConfig::default();
        let training = list(&cfg, Some(TemplateCategory::Training));
        assert_eq!(training.len(), 2);
        assert!(training.iter().all(|t| t.category == TemplateCategory::Training));
        assert_eq!(list(&cfg, None).len(), 8);
    }

    #[test]
    fn category_parses_loosely() {
        assert_eq!(
            "Floor-Walk".parse::<TemplateCategory>().unwrap(),
            TemplateCategory::FloorWalk
        );
        assert_eq!(
            "maintenance".parse::<TemplateCategory>().unwrap(),
            TemplateCategory::PreventiveMaintenance
        );
        assert!("gardening".parse::<TemplateCategory>().is_err());
    }
}
