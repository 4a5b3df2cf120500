use crate::env::Env;
use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use fourdx_core::week::{self, WeekId};

pub fn run(env: &Env, raw: Option<&str>) -> anyhow::Result<()> {
    let current = week::current_week_id(Utc::now());
    let w: WeekId = match raw {
        None | Some("current") => current,
        Some("previous") | Some("prev") => week::previous_week_id(current),
        Some("next") => week::next_week_id(current),
        Some(raw) => raw.parse().with_context(|| format!("bad week '{raw}'"))?,
    };

    if env.json {
        return print_json(&serde_json::json!({
            "week_id": w,
            "display": w.display(),
            "monday": w.monday(),
            "sunday": w.sunday(),
            "previous": week::previous_week_id(w),
            "next": week::next_week_id(w),
            "is_past": week::is_past(w, current),
            "is_current": w == current,
        }));
    }

    let tag = if w == current {
        " (current)"
    } else if week::is_past(w, current) {
        " (past, locked)"
    } else {
        ""
    };
    println!("{}{tag}", w.display());
    println!("  {}  {} .. {}", w, w.monday(), w.sunday());
    println!("  previous: {}  next: {}", week::previous_week_id(w), week::next_week_id(w));
    Ok(())
}
