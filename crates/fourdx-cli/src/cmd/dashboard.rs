use crate::env::{resolve_week, Env};
use crate::output::{print_json, print_table, progress_bar};
use fourdx_core::dashboard::{self, WeekDashboard};

pub fn run(env: &Env, week: Option<&str>) -> anyhow::Result<()> {
    let d = env.with_ctx(|ctx| {
        let week = resolve_week(ctx, week)?;
        dashboard::week_dashboard(ctx, week)
    })?;
    if env.json {
        return print_json(&d);
    }
    print_dashboard(&d);
    Ok(())
}

pub fn print_dashboard(d: &WeekDashboard) {
    println!("{}  ({})", d.display, d.week_id);
    println!(
        "WIG: {}  {} -> {}",
        d.wig.title, d.wig.current_value, d.wig.target_value
    );
    println!();

    for m in &d.measures {
        println!(
            "{:<28} {} {:>3}%  {}/{} {}",
            m.name,
            progress_bar(m.percent, 20),
            m.percent,
            m.actual,
            m.team_target,
            m.unit
        );
    }
    if d.attribution_fallback && d.completed_count > 0 {
        println!("(no commitment carries a lead measure this week; all completions count toward the first)");
    }
    println!();

    let rows = d
        .members
        .iter()
        .map(|m| {
            vec![
                m.name.clone(),
                format!("{}/{}", m.completed, m.committed),
                m.partial.to_string(),
                m.score.to_string(),
                m.streak.to_string(),
            ]
        })
        .collect();
    print_table(&["MEMBER", "DONE", "PARTIAL", "SCORE", "STREAK"], rows);

    if let Some(s) = &d.session {
        println!();
        match s.step_title {
            Some(title) => println!("WIG session: {} (step {} - {title})", s.status, s.current_step),
            None => println!("WIG session: {}", s.status),
        }
    }
}
