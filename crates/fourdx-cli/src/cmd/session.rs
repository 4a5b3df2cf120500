use crate::cmd::dashboard::print_dashboard;
use crate::env::{resolve_week, Env};
use crate::output::print_json;
use clap::Subcommand;
use fourdx_core::error::FourdxError;
use fourdx_core::session::{self, ReviewCursor, StepContent, StepView, WigSession, AGENDA};
use fourdx_core::types::SessionStatus;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Show the session for a week
    Show {
        #[arg(long)]
        week: Option<String>,
    },
    /// Create a scheduled session ahead of time
    Schedule {
        #[arg(long)]
        week: Option<String>,
    },
    /// Start the session (settles your last week first)
    Start {
        #[arg(long)]
        week: Option<String>,
    },
    /// Move to the next agenda step, or finish after step 5
    Advance {
        #[arg(long)]
        week: Option<String>,
        /// Only advance if the session is still at this step
        #[arg(long, value_name = "STEP")]
        expect: Option<u8>,
    },
    /// Replace the step 3 notes
    Notes {
        text: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Replace the step 5 obstacles
    Obstacles {
        text: String,
        #[arg(long)]
        week: Option<String>,
    },
    /// Delete the session (ADMIN or MANAGER)
    Reset {
        #[arg(long)]
        week: Option<String>,
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Walk through every step of a completed session
    Review {
        #[arg(long)]
        week: Option<String>,
    },
    /// Show what one agenda step displays
    Step {
        /// 1-5
        number: u8,
        #[arg(long)]
        week: Option<String>,
        /// Read-only view of a completed session
        #[arg(long)]
        review: bool,
    },
}

pub fn run(env: &Env, subcmd: SessionSubcommand) -> anyhow::Result<()> {
    match subcmd {
        SessionSubcommand::Show { week } => show(env, week.as_deref()),
        SessionSubcommand::Schedule { week } => {
            let s = env.with_ctx(|ctx| session::schedule(ctx, resolve_week(ctx, week.as_deref())?))?;
            report(env, &s)
        }
        SessionSubcommand::Start { week } => {
            let s = env.with_ctx(|ctx| session::start(ctx, resolve_week(ctx, week.as_deref())?))?;
            report(env, &s)
        }
        SessionSubcommand::Advance { week, expect } => {
            let s = env.with_ctx(|ctx| {
                session::advance(ctx, resolve_week(ctx, week.as_deref())?, expect)
            })?;
            report(env, &s)
        }
        SessionSubcommand::Notes { text, week } => {
            let s = env.with_ctx(|ctx| {
                session::set_notes(ctx, resolve_week(ctx, week.as_deref())?, &text)
            })?;
            report(env, &s)
        }
        SessionSubcommand::Obstacles { text, week } => {
            let s = env.with_ctx(|ctx| {
                session::set_obstacles(ctx, resolve_week(ctx, week.as_deref())?, &text)
            })?;
            report(env, &s)
        }
        SessionSubcommand::Reset { week, yes } => {
            let week = env.with_ctx(|ctx| {
                let week = resolve_week(ctx, week.as_deref())?;
                session::reset(ctx, week, yes)?;
                Ok(week)
            })?;
            if env.json {
                return print_json(&serde_json::json!({ "week_id": week, "reset": true }));
            }
            println!("Session for {week} reset.");
            Ok(())
        }
        SessionSubcommand::Review { week } => review(env, week.as_deref()),
        SessionSubcommand::Step {
            number,
            week,
            review,
        } => {
            let content = env.with_ctx(|ctx| {
                session::step_content(ctx, resolve_week(ctx, week.as_deref())?, number, review)
            })?;
            if env.json {
                return print_json(&content);
            }
            print_step(&content);
            Ok(())
        }
    }
}

fn show(env: &Env, week: Option<&str>) -> anyhow::Result<()> {
    let (week, s) = env.with_ctx(|ctx| {
        let week = resolve_week(ctx, week)?;
        Ok((week, session::get(ctx, week)?))
    })?;
    if env.json {
        return print_json(&s);
    }
    match s {
        Some(s) => report(env, &s),
        None => {
            println!("No WIG session for {week}.");
            Ok(())
        }
    }
}

fn report(env: &Env, s: &WigSession) -> anyhow::Result<()> {
    if env.json {
        return print_json(s);
    }
    println!("WIG session {} [{}]", s.week_id, s.status);
    for step in &AGENDA {
        let marker = match s.status {
            SessionStatus::Completed => "x",
            SessionStatus::InProgress if step.number < s.current_step => "x",
            SessionStatus::InProgress if step.number == s.current_step => ">",
            _ => " ",
        };
        println!(
            "  [{marker}] {}. {} ({} min)",
            step.number, step.title, step.duration_minutes
        );
    }
    if !s.attendees.is_empty() {
        println!("Attendees: {}", s.attendees.join(", "));
    }
    Ok(())
}

fn review(env: &Env, week: Option<&str>) -> anyhow::Result<()> {
    let pages = env.with_ctx(|ctx| {
        let week = resolve_week(ctx, week)?;
        let s = session::get(ctx, week)?
            .ok_or_else(|| FourdxError::SessionNotFound(week.to_string()))?;
        let mut cursor = ReviewCursor::open(&s)?;
        let mut pages = Vec::new();
        while let Some(step) = cursor.current() {
            pages.push(session::step_content(ctx, week, step.number, true)?);
            cursor.step_forward();
        }
        Ok(pages)
    })?;

    if env.json {
        return print_json(&pages);
    }
    for page in &pages {
        print_step(page);
        println!();
    }
    println!("Session complete.");
    Ok(())
}

fn print_step(c: &StepContent) {
    println!(
        "Step {}/{}: {} ({} min)",
        c.step.number,
        AGENDA.len(),
        c.step.title,
        c.step.duration_minutes
    );
    println!("  {}", c.step.prompt);
    match &c.view {
        StepView::Scoreboard { dashboard } => print_dashboard(dashboard),
        StepView::Accounting { week_id, members } => {
            println!("Commitments for {week_id}:");
            for m in members {
                println!("  {} [{}]", m.name, m.avatar);
                if m.commitments.is_empty() {
                    println!("    (none)");
                }
                for commitment in &m.commitments {
                    println!(
                        "    {:<10} {}",
                        commitment.status.to_string(),
                        commitment.description
                    );
                }
            }
        }
        StepView::Notes { text, .. } | StepView::Obstacles { text, .. } => {
            if text.is_empty() {
                println!("  (empty)");
            } else {
                println!("{text}");
            }
        }
        StepView::Plan { week_id } => {
            println!("Add up to 3 commitments for {week_id}: fourdx commit add \"...\"");
        }
    }
}
