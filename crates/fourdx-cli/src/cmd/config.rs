use crate::env::Env;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use fourdx_core::config::{ConfigPatch, LeadMeasureDefinition, MetricType, WarnLevel, WigConfig};
use fourdx_core::workspace;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the WIG and its lead measures
    Show,
    /// Validate the config for common mistakes
    Validate,
    /// Edit the WIG (needs --as a manager)
    Set {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// percentage, number or currency
        #[arg(long, value_parser = parse_metric_type)]
        metric_type: Option<MetricType>,
        /// Where the lag measure stands now
        #[arg(long)]
        current: Option<f64>,
        /// Where the lag measure should end up
        #[arg(long)]
        target: Option<f64>,
        /// Replace the lead measures, in order: ID:TARGET:UNIT:NAME (repeatable)
        #[arg(long = "measure", value_parser = parse_measure)]
        measures: Vec<LeadMeasureDefinition>,
    },
}

pub fn run(env: &Env, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(env),
        ConfigSubcommand::Validate => validate(env),
        ConfigSubcommand::Set {
            title,
            description,
            metric_type,
            current,
            target,
            measures,
        } => {
            let patch = ConfigPatch {
                title,
                description,
                metric_type,
                current_value: current,
                target_value: target,
                lead_measures: (!measures.is_empty()).then_some(measures),
            };
            set(env, &patch)
        }
    }
}

fn parse_metric_type(raw: &str) -> Result<MetricType, String> {
    match raw.trim().to_lowercase().as_str() {
        "percentage" | "percent" => Ok(MetricType::Percentage),
        "number" => Ok(MetricType::Number),
        "currency" => Ok(MetricType::Currency),
        other => Err(format!("unknown metric type '{other}'")),
    }
}

/// `ID:TARGET:UNIT:NAME`. The name may itself contain colons.
fn parse_measure(raw: &str) -> Result<LeadMeasureDefinition, String> {
    let parts: Vec<&str> = raw.splitn(4, ':').map(str::trim).collect();
    let [id, target, unit, name] = parts.as_slice() else {
        return Err(format!("expected ID:TARGET:UNIT:NAME, got '{raw}'"));
    };
    let target: u32 = target
        .parse()
        .map_err(|_| format!("target '{target}' is not a whole number"))?;
    if id.is_empty() || name.is_empty() {
        return Err(format!("measure '{raw}' needs an id and a name"));
    }
    Ok(LeadMeasureDefinition::new(*id, *name, target, *unit))
}

fn set(env: &Env, patch: &ConfigPatch) -> anyhow::Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to change; pass --title, --current, --target, --measure, ...");
    }
    env.require_actor()?;
    let saved = env.with_ctx(|ctx| workspace::update_config(env.root(), ctx, patch))?;
    if env.json {
        return print_json(&saved);
    }
    println!(
        "Saved. Lag {} -> {}, {} lead measure(s).",
        saved.current_value,
        saved.target_value,
        saved.lead_measures.len()
    );
    Ok(())
}

fn load(env: &Env) -> anyhow::Result<WigConfig> {
    WigConfig::load(env.root()).context("failed to load config")
}

fn show(env: &Env) -> anyhow::Result<()> {
    let config = load(env)?;
    if env.json {
        return print_json(&config);
    }

    println!("WIG:     {}", config.title);
    if !config.description.is_empty() {
        println!("         {}", config.description);
    }
    println!(
        "Lag:     {} -> {} ({:?})",
        config.current_value, config.target_value, config.metric_type
    );
    println!();
    let rows = config
        .lead_measures
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.target.to_string(),
                m.unit.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "LEAD MEASURE", "TARGET/PERSON", "UNIT"], rows);
    Ok(())
}

fn validate(env: &Env) -> anyhow::Result<()> {
    let config = load(env)?;
    let warnings = config.validate();

    if env.json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_spec_parses_with_colons_in_name() {
        let m = parse_measure("lead-docs:2:Guides:Help Guides: Tier 1").unwrap();
        assert_eq!(m.id, "lead-docs");
        assert_eq!(m.target, 2);
        assert_eq!(m.unit, "Guides");
        assert_eq!(m.name, "Help Guides: Tier 1");
    }

    #[test]
    fn bad_measure_specs_are_rejected() {
        assert!(parse_measure("lead-docs:2:Guides").is_err());
        assert!(parse_measure("lead-docs:two:Guides:Docs").is_err());
        assert!(parse_measure(":2:Guides:Docs").is_err());
        assert!(parse_metric_type("vibes").is_err());
        assert_eq!(parse_metric_type("Currency").unwrap(), MetricType::Currency);
    }
}
