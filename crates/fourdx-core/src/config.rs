use crate::error::{FourdxError, Result};
use crate::paths;
use crate::template::{self, CommitmentTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LeadMeasureDefinition
// ---------------------------------------------------------------------------

/// A team-configured weekly target. `target` is per person per week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadMeasureDefinition {
    pub id: String,
    pub name: String,
    pub target: u32,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LeadMeasureDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        target: u32,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            target,
            unit: unit.into(),
            definition: None,
            color: None,
        }
    }
}

fn default_lead_measures() -> Vec<LeadMeasureDefinition> {
    let mut walks = LeadMeasureDefinition::new("lead-walks", "Proactive Floor Walks", 2, "Walks");
    walks.color = Some("brand-green".to_string());
    let mut value = LeadMeasureDefinition::new("lead-value", "Value-Add Actions", 1, "Actions");
    value.color = Some("brand-navy".to_string());
    vec![walks, value]
}

// ---------------------------------------------------------------------------
// MetricType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    #[default]
    Percentage,
    Number,
    Currency,
}

// ---------------------------------------------------------------------------
// ConfigPatch
// ---------------------------------------------------------------------------

/// The parts of the WIG an admin may edit. `None` leaves a field as it is;
/// `lead_measures` replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metric_type: Option<MetricType>,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub lead_measures: Option<Vec<LeadMeasureDefinition>>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == ConfigPatch::default()
    }
}

// ---------------------------------------------------------------------------
// WigConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WigConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub target_value: f64,
    /// Ordered; index 0 receives unattributed completions.
    #[serde(default)]
    pub lead_measures: Vec<LeadMeasureDefinition>,
    /// Single-measure configuration from before `lead_measures` existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_measure_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_measure_name: Option<String>,
    #[serde(default)]
    pub templates: Vec<CommitmentTemplate>,
}

fn default_version() -> u32 {
    1
}

impl Default for WigConfig {
    fn default() -> Self {
        Self {
            version: 1,
            title: "Infrastructure Excellence".to_string(),
            description: "Maximise team proactive impact through high-value actions.".to_string(),
            metric_type: MetricType::Percentage,
            current_value: 70.0,
            target_value: 80.0,
            lead_measures: default_lead_measures(),
            lead_measure_target: None,
            lead_measure_name: None,
            templates: template::default_templates(),
        }
    }
}

impl WigConfig {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(FourdxError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let mut cfg: WigConfig = serde_yaml::from_str(&data)?;
        cfg.upgrade_legacy();
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Turn a legacy single-measure config into a one-element measure list.
    fn upgrade_legacy(&mut self) {
        if !self.lead_measures.is_empty() {
            return;
        }
        if let Some(target) = self.lead_measure_target {
            let name = self
                .lead_measure_name
                .clone()
                .unwrap_or_else(|| "Lead Measure".to_string());
            self.lead_measures
                .push(LeadMeasureDefinition::new("lead-legacy", name, target, "Actions"));
        }
    }

    /// A copy of this config with `patch` merged in. Fails with
    /// `InvalidConfig` when the result has a blank title, a non-finite lag
    /// value, or any error-level validation finding.
    pub fn patched(&self, patch: &ConfigPatch) -> Result<WigConfig> {
        let mut next = self.clone();
        if let Some(title) = &patch.title {
            next.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            next.description = description.trim().to_string();
        }
        if let Some(metric_type) = patch.metric_type {
            next.metric_type = metric_type;
        }
        if let Some(v) = patch.current_value {
            next.current_value = v;
        }
        if let Some(v) = patch.target_value {
            next.target_value = v;
        }
        if let Some(measures) = &patch.lead_measures {
            next.lead_measures = measures.clone();
            // An explicit list supersedes the legacy single measure.
            next.lead_measure_target = None;
            next.lead_measure_name = None;
        }

        if next.title.is_empty() {
            return Err(FourdxError::InvalidConfig("title must not be empty".into()));
        }
        if !next.current_value.is_finite() || !next.target_value.is_finite() {
            return Err(FourdxError::InvalidConfig(
                "lag values must be finite numbers".into(),
            ));
        }
        if let Some(w) = next.validate().into_iter().find(|w| w.level == WarnLevel::Error) {
            return Err(FourdxError::InvalidConfig(w.message));
        }
        Ok(next)
    }

    pub fn measure(&self, id: &str) -> Option<&LeadMeasureDefinition> {
        self.lead_measures.iter().find(|m| m.id == id)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.lead_measures.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no lead measures configured: dashboards will be empty".to_string(),
            });
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for m in &self.lead_measures {
            if m.id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("lead measure '{}' has an empty id", m.name),
                });
            }
            if !ids.insert(m.id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate lead measure id '{}'", m.id),
                });
            }
            if !names.insert(m.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "duplicate lead measure name '{}': legacy commitments may count twice",
                        m.name
                    ),
                });
            }
            if m.target == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("lead measure '{}' has a zero target", m.id),
                });
            }
        }

        let mut template_ids = HashSet::new();
        for t in &self.templates {
            if !template_ids.insert(t.id.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate template id '{}'", t.id),
                });
            }
            if t.description.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("template '{}' has an empty description", t.id),
                });
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_seeds_two_measures() {
        let cfg = WigConfig::default();
        assert_eq!(cfg.lead_measures.len(), 2);
        assert_eq!(cfg.lead_measures[0].id, "lead-walks");
        assert_eq!(cfg.lead_measures[1].target, 1);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let cfg = WigConfig::new("Customer Delight");
        cfg.save(dir.path()).unwrap();
        let loaded = WigConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.title, "Customer Delight");
        assert_eq!(loaded.lead_measures, cfg.lead_measures);
    }

    #[test]
    fn load_without_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            WigConfig::load(dir.path()),
            Err(FourdxError::NotInitialized)
        ));
    }

    #[test]
    fn legacy_single_measure_is_upgraded() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".fourdx")).unwrap();
        std::fs::write(
            dir.path().join(".fourdx/config.yaml"),
            "title: Old\nlead_measure_target: 3\nlead_measure_name: Floor Walks\n",
        )
        .unwrap();
        let cfg = WigConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.lead_measures.len(), 1);
        assert_eq!(cfg.lead_measures[0].name, "Floor Walks");
        assert_eq!(cfg.lead_measures[0].target, 3);
    }

    #[test]
    fn validate_flags_duplicates_and_zero_targets() {
        let mut cfg = WigConfig::default();
        cfg.lead_measures
            .push(LeadMeasureDefinition::new("lead-walks", "Proactive Floor Walks", 0, "Walks"));
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("duplicate lead measure id")));
        assert!(warnings.iter().any(|w| w.message.contains("duplicate lead measure name")));
        assert!(warnings.iter().any(|w| w.message.contains("zero target")));
    }

    #[test]
    fn patch_moves_the_lag_and_replaces_measures() {
        let cfg = WigConfig::default();
        let patch = ConfigPatch {
            current_value: Some(74.5),
            lead_measures: Some(vec![LeadMeasureDefinition::new(
                "lead-docs",
                "Help Guides",
                1,
                "Guides",
            )]),
            ..ConfigPatch::default()
        };
        let next = cfg.patched(&patch).unwrap();
        assert_eq!(next.current_value, 74.5);
        assert_eq!(next.target_value, cfg.target_value);
        assert_eq!(next.title, cfg.title);
        assert_eq!(next.lead_measures.len(), 1);
        assert_eq!(next.lead_measures[0].id, "lead-docs");
        // The original is untouched.
        assert_eq!(cfg.lead_measures.len(), 2);
    }

    #[test]
    fn patch_rejects_invalid_results() {
        let cfg = WigConfig::default();
        let blank = ConfigPatch {
            title: Some("   ".into()),
            ..ConfigPatch::default()
        };
        assert!(matches!(cfg.patched(&blank), Err(FourdxError::InvalidConfig(_))));

        let dup = LeadMeasureDefinition::new("lead-a", "A", 1, "Things");
        let dups = ConfigPatch {
            lead_measures: Some(vec![dup.clone(), dup]),
            ..ConfigPatch::default()
        };
        assert!(matches!(cfg.patched(&dups), Err(FourdxError::InvalidConfig(_))));

        let nan = ConfigPatch {
            target_value: Some(f64::NAN),
            ..ConfigPatch::default()
        };
        assert!(cfg.patched(&nan).is_err());
        assert!(ConfigPatch::default().is_empty());
        assert!(!nan.is_empty());
    }

    #[test]
    fn templates_survive_save_and_load() {
        let dir = TempDir::new().unwrap();
        WigConfig::default().save(dir.path()).unwrap();
        let loaded = WigConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.templates, WigConfig::default().templates);
    }

    #[test]
    fn empty_measure_list_warns() {
        let mut cfg = WigConfig::default();
        cfg.lead_measures.clear();
        assert_eq!(cfg.validate().len(), 1);
    }
}
