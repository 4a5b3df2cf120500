use anyhow::Context;
use chrono::Utc;
use fourdx_core::context::{Actor, OpContext};
use fourdx_core::week::{self, WeekId};
use fourdx_core::workspace::Workspace;
use std::path::{Path, PathBuf};

/// Global flags shared by every subcommand.
pub struct Env {
    pub root: PathBuf,
    /// Member id from `--as`.
    pub actor: Option<String>,
    pub json: bool,
}

impl Env {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn open(&self) -> anyhow::Result<Workspace> {
        Workspace::open(&self.root).with_context(|| {
            format!(
                "cannot open workspace at {} (run `fourdx init` first)",
                self.root.display()
            )
        })
    }

    /// Open the workspace and run `f` with a context for the `--as` member.
    pub fn with_ctx<T>(
        &self,
        f: impl FnOnce(&OpContext<'_>) -> fourdx_core::Result<T>,
    ) -> anyhow::Result<T> {
        let ws = self.open()?;
        let mut ctx = ws.ctx(Utc::now());
        if let Some(id) = &self.actor {
            let actor = Actor::resolve(ctx.store, id)
                .with_context(|| format!("--as names no team member '{id}'"))?;
            ctx = ctx.with_actor(actor);
        }
        Ok(f(&ctx)?)
    }

    /// The `--as` member, or an error naming the flag.
    pub fn require_actor(&self) -> anyhow::Result<&str> {
        self.actor
            .as_deref()
            .context("this command needs --as <member-id> (or FOURDX_MEMBER)")
    }
}

/// `current`, `previous`, `next` or a literal `YYYY-Www`. Missing means current.
pub fn resolve_week(ctx: &OpContext<'_>, raw: Option<&str>) -> fourdx_core::Result<WeekId> {
    let current = ctx.current_week();
    match raw {
        None | Some("current") => Ok(current),
        Some("previous") | Some("prev") => Ok(week::previous_week_id(current)),
        Some("next") => Ok(week::next_week_id(current)),
        Some(raw) => raw.parse(),
    }
}
