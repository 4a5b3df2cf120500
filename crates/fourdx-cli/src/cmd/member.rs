use crate::env::Env;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use fourdx_core::member::{self, MemberPatch, TeamMember};
use fourdx_core::scoring::{self, RolloverOutcome};
use fourdx_core::types::Role;
use fourdx_core::{dashboard, ledger};

#[derive(Subcommand)]
pub enum MemberSubcommand {
    /// Provision a team member
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// ADMIN, MANAGER or STAFF
        #[arg(long, default_value = "STAFF")]
        role: Role,
        /// Explicit id (default: generated)
        #[arg(long)]
        id: Option<String>,
    },
    /// List the roster
    List {
        /// Order by score, highest first
        #[arg(long)]
        by_score: bool,
    },
    /// Show one member's score, streaks and achievements
    Show { id: String },
    /// Edit a profile (role changes need --as a manager)
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        job_title: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Take a member off the roster (needs --as a manager)
    Remove {
        id: String,
        /// Skip the confirmation guard
        #[arg(long)]
        yes: bool,
    },
    /// Settle last week's streak and bonus (defaults to the --as member)
    Rollover {
        id: Option<String>,
        /// Settle every member
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

pub fn run(env: &Env, subcmd: MemberSubcommand) -> anyhow::Result<()> {
    match subcmd {
        MemberSubcommand::Add {
            name,
            email,
            role,
            id,
        } => add(env, id.as_deref(), &name, &email, role),
        MemberSubcommand::List { by_score } => list(env, by_score),
        MemberSubcommand::Show { id } => show(env, &id),
        MemberSubcommand::Update {
            id,
            name,
            job_title,
            role,
        } => update(
            env,
            &id,
            MemberPatch {
                name,
                job_title,
                role,
            },
        ),
        MemberSubcommand::Remove { id, yes } => remove(env, &id, yes),
        MemberSubcommand::Rollover { id, all } => rollover(env, id.as_deref(), all),
    }
}

fn add(env: &Env, id: Option<&str>, name: &str, email: &str, role: Role) -> anyhow::Result<()> {
    let m = env.with_ctx(|ctx| member::add(ctx, id, name, email, role))?;
    if env.json {
        return print_json(&m);
    }
    println!("Added {} ({}) as {} [{}].", m.name, m.email, m.role, m.id);
    Ok(())
}

fn list(env: &Env, by_score: bool) -> anyhow::Result<()> {
    let members = env.with_ctx(|ctx| {
        if by_score {
            dashboard::leaderboard(ctx)
        } else {
            member::list(ctx)
        }
    })?;

    if env.json {
        return print_json(&members);
    }
    if members.is_empty() {
        println!("No team members.");
        return Ok(());
    }
    let rows = members
        .iter()
        .map(|m| {
            vec![
                m.id.clone(),
                m.name.clone(),
                m.role.to_string(),
                m.score.to_string(),
                m.streak.to_string(),
                m.achievements.len().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "ROLE", "SCORE", "STREAK", "BADGES"], rows);
    Ok(())
}

fn show(env: &Env, id: &str) -> anyhow::Result<()> {
    let (m, history) = env.with_ctx(|ctx| {
        let m = member::get(ctx, id)?;
        let history = ledger::history_for_member(ctx, id)?;
        Ok((m, history))
    })?;

    if env.json {
        return print_json(&serde_json::json!({
            "member": m,
            "commitment_count": history.len(),
        }));
    }
    print_member(&m);
    println!("Commitments: {} recorded", history.len());
    Ok(())
}

fn update(env: &Env, id: &str, patch: MemberPatch) -> anyhow::Result<()> {
    if patch.is_empty() {
        anyhow::bail!("nothing to update; pass --name, --job-title or --role");
    }
    let m = env.with_ctx(|ctx| member::update(ctx, id, &patch))?;
    if env.json {
        return print_json(&m);
    }
    println!("Updated {} [{}]: {}, {}", m.name, m.id, m.job_title, m.role);
    Ok(())
}

fn remove(env: &Env, id: &str, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("removing '{id}' takes them off every leaderboard; pass --yes to confirm");
    }
    let m = env.with_ctx(|ctx| member::remove(ctx, id))?;
    if env.json {
        return print_json(&m);
    }
    println!("Removed {} [{}]. Their commitments stay on record.", m.name, m.id);
    Ok(())
}

fn print_member(m: &TeamMember) {
    println!("{} [{}]  {}  {}", m.name, m.avatar, m.email, m.role);
    println!("Score:   {}", m.score);
    println!("Streak:  {} (longest {})", m.streak, m.longest_streak);
    if let Some(w) = m.last_active_week_id {
        println!("Settled: {w}");
    }
    for (measure, n) in &m.lead_measure_progress {
        println!("  {measure}: {n}");
    }
    if m.achievements.is_empty() {
        println!("Achievements: (none)");
    } else {
        println!("Achievements:");
        for a in &m.achievements {
            println!("  {} {} ({})", a.icon, a.title, a.unlocked_at.date_naive());
        }
    }
}

fn describe(outcome: &RolloverOutcome) -> String {
    match outcome {
        RolloverOutcome::NotDue => "not due".to_string(),
        RolloverOutcome::AlreadySettled => "already settled".to_string(),
        RolloverOutcome::NoCommitments => "no commitments last week".to_string(),
        RolloverOutcome::Perfect { streak, bonus } => {
            format!("perfect week, streak {streak}, +{bonus}")
        }
        RolloverOutcome::StreakBroken { previous_streak } => {
            format!("streak of {previous_streak} broken")
        }
    }
}

fn rollover(env: &Env, id: Option<&str>, all: bool) -> anyhow::Result<()> {
    let outcomes = if all {
        env.with_ctx(scoring::settle_all)?
    } else {
        let id = match id {
            Some(id) => id.to_string(),
            None => env.require_actor()?.to_string(),
        };
        let outcome = env.with_ctx(|ctx| scoring::settle_member(ctx, &id))?;
        vec![(id, outcome)]
    };

    if env.json {
        let items: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|(id, o)| serde_json::json!({ "member_id": id, "rollover": o }))
            .collect();
        return print_json(&items);
    }
    for (id, o) in &outcomes {
        println!("{id}: {}", describe(o));
    }
    Ok(())
}
