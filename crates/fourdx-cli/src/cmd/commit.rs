use crate::env::{resolve_week, Env};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use fourdx_core::commitment::{Commitment, CommitmentPatch, MeasureLink};
use fourdx_core::config::WigConfig;
use fourdx_core::ledger;
use fourdx_core::template::{self, TemplateCategory};
use fourdx_core::types::CommitmentStatus;

#[derive(Subcommand)]
pub enum CommitSubcommand {
    /// Record a commitment for a week (max 3 per member)
    Add {
        #[arg(required_unless_present = "template")]
        description: Option<String>,
        /// Use a library template's description and matching measure
        #[arg(long, conflicts_with_all = ["description", "measure"])]
        template: Option<String>,
        /// Owner (default: the --as member)
        #[arg(long)]
        member: Option<String>,
        /// current, previous, next or YYYY-Www
        #[arg(long)]
        week: Option<String>,
        /// Lead measure id this commitment drives
        #[arg(long)]
        measure: Option<String>,
        /// Display name stored with the measure link
        #[arg(long, requires = "measure")]
        measure_name: Option<String>,
    },
    /// List a week's commitments
    List {
        #[arg(long)]
        week: Option<String>,
        /// Only this member's commitments
        #[arg(long)]
        member: Option<String>,
    },
    /// incomplete -> completed -> partial -> incomplete
    Cycle { id: String },
    /// Change fields of a commitment
    Update {
        id: String,
        #[arg(long)]
        description: Option<String>,
        /// incomplete, partial or completed
        #[arg(long)]
        status: Option<CommitmentStatus>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        measure: Option<String>,
    },
    /// Delete a commitment (score already earned is kept)
    Delete { id: String },
    /// Browse the commitment template library
    Templates {
        /// floor_walk, preventive_maintenance, documentation, training, ...
        #[arg(long)]
        category: Option<TemplateCategory>,
    },
    /// Every commitment a member ever made, newest week first
    History {
        /// Member id (default: the --as member)
        member: Option<String>,
    },
}

pub fn run(env: &Env, subcmd: CommitSubcommand) -> anyhow::Result<()> {
    match subcmd {
        CommitSubcommand::Add {
            description,
            template,
            member,
            week,
            measure,
            measure_name,
        } => {
            let source = match template {
                Some(id) => Source::Template(id),
                None => Source::Text {
                    description: description.unwrap_or_default(),
                    link: measure.map(|id| MeasureLink {
                        id,
                        name: measure_name,
                    }),
                },
            };
            add(env, source, member.as_deref(), week.as_deref())
        }
        CommitSubcommand::Templates { category } => templates(env, category),
        CommitSubcommand::List { week, member } => list(env, week.as_deref(), member.as_deref()),
        CommitSubcommand::Cycle { id } => {
            let c = env.with_ctx(|ctx| ledger::cycle_status(ctx, &id))?;
            report(env, "Updated", &c)
        }
        CommitSubcommand::Update {
            id,
            description,
            status,
            note,
            measure,
        } => {
            let patch = CommitmentPatch {
                description,
                status,
                completion_note: note,
                lead_measure_id: measure,
                ..CommitmentPatch::default()
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update; pass --description, --status, --note or --measure");
            }
            let c = env.with_ctx(|ctx| ledger::update(ctx, &id, &patch))?;
            report(env, "Updated", &c)
        }
        CommitSubcommand::Delete { id } => {
            let c = env.with_ctx(|ctx| ledger::delete(ctx, &id))?;
            report(env, "Deleted", &c)
        }
        CommitSubcommand::History { member } => history(env, member.as_deref()),
    }
}

fn owner(env: &Env, member: Option<&str>) -> anyhow::Result<String> {
    match member {
        Some(m) => Ok(m.to_string()),
        None => Ok(env.require_actor()?.to_string()),
    }
}

enum Source {
    Text {
        description: String,
        link: Option<MeasureLink>,
    },
    Template(String),
}

fn add(env: &Env, source: Source, member: Option<&str>, week: Option<&str>) -> anyhow::Result<()> {
    let member = owner(env, member)?;
    let c = env
        .with_ctx(|ctx| {
            let week = resolve_week(ctx, week)?;
            match source {
                Source::Text { description, link } => {
                    ledger::create(ctx, &member, week, &description, link)
                }
                Source::Template(id) => ledger::create_from_template(ctx, &member, week, &id),
            }
        })
        .context("failed to record commitment")?;
    report(env, "Committed", &c)
}

fn templates(env: &Env, category: Option<TemplateCategory>) -> anyhow::Result<()> {
    let config = WigConfig::load(env.root()).context("failed to load config")?;
    let list = template::list(&config, category);
    if env.json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("No templates.");
        return Ok(());
    }
    let rows = list
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.category.label().to_string(),
                format!("{} min", t.estimated_minutes),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "CATEGORY", "TIME", "TITLE"], rows);
    Ok(())
}

fn report(env: &Env, verb: &str, c: &Commitment) -> anyhow::Result<()> {
    if env.json {
        return print_json(c);
    }
    println!("{verb} [{}] {} ({}, {})", c.id, c.description, c.week_id, c.status);
    Ok(())
}

fn rows(list: &[Commitment]) -> Vec<Vec<String>> {
    list.iter()
        .map(|c| {
            vec![
                c.id.clone(),
                c.week_id.to_string(),
                c.member_id.clone(),
                c.status.to_string(),
                c.lead_measure_name.clone().unwrap_or_default(),
                c.description.clone(),
            ]
        })
        .collect()
}

const HEADERS: [&str; 6] = ["ID", "WEEK", "MEMBER", "STATUS", "MEASURE", "DESCRIPTION"];

fn list(env: &Env, week: Option<&str>, member: Option<&str>) -> anyhow::Result<()> {
    let (week, list) = env.with_ctx(|ctx| {
        let week = resolve_week(ctx, week)?;
        let list = match member {
            Some(m) => ledger::list_for_member_week(ctx, m, week)?,
            None => ledger::list_for_week(ctx, week)?,
        };
        Ok((week, list))
    })?;

    if env.json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("No commitments for {week}.");
        return Ok(());
    }
    print_table(&HEADERS, rows(&list));
    Ok(())
}

fn history(env: &Env, member: Option<&str>) -> anyhow::Result<()> {
    let member = owner(env, member)?;
    let list = env.with_ctx(|ctx| ledger::history_for_member(ctx, &member))?;
    if env.json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("No commitments recorded for '{member}'.");
        return Ok(());
    }
    print_table(&HEADERS, rows(&list));
    Ok(())
}
